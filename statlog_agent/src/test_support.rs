//! In-memory `MetricSource` for unit tests.

use crate::metrics::MetricSource;
use crate::types::MemoryTotals;
use anyhow::{anyhow, Result};
use std::collections::HashMap;

pub struct FakeSource {
    pub memory: Option<MemoryTotals>,
    pub cpus: usize,
    pub load: f64,
    pub connections: Option<String>,
    pub processes: Vec<(u32, String)>,
    pub process_table_fails: bool,
    pub ram: HashMap<u32, f64>,
    pub cpu: HashMap<u32, f64>,
    pub panic_on_memory: bool,
}

impl FakeSource {
    /// 16 GiB host, 16 cores, load 4.0, no processes.
    pub fn healthy() -> Self {
        Self {
            memory: Some(MemoryTotals {
                total: 17_179_869_184,
                available: 6_442_450_944,
                used: 10_737_418_240,
            }),
            cpus: 16,
            load: 4.0,
            connections: Some("3".into()),
            processes: Vec::new(),
            process_table_fails: false,
            ram: HashMap::new(),
            cpu: HashMap::new(),
            panic_on_memory: false,
        }
    }

    pub fn with_process(mut self, pid: u32, name: &str) -> Self {
        self.processes.push((pid, name.to_string()));
        self.ram.insert(pid, 10.0);
        self.cpu.insert(pid, 1.5);
        self
    }
}

impl MetricSource for FakeSource {
    fn memory(&mut self) -> Result<MemoryTotals> {
        if self.panic_on_memory {
            panic!("memory probe blew up");
        }
        self.memory.ok_or_else(|| anyhow!("memory unavailable"))
    }

    fn logical_cpus(&mut self) -> Result<usize> {
        Ok(self.cpus)
    }

    fn load_average(&mut self) -> Result<f64> {
        Ok(self.load)
    }

    fn connection_count(&mut self, _port: u16) -> Result<String> {
        self.connections
            .clone()
            .ok_or_else(|| anyhow!("netstat not found"))
    }

    fn processes(&mut self) -> Result<Vec<(u32, String)>> {
        if self.process_table_fails {
            return Err(anyhow!("access denied"));
        }
        Ok(self.processes.clone())
    }

    fn memory_percent(&mut self, pid: u32) -> Result<f64> {
        self.ram
            .get(&pid)
            .copied()
            .ok_or_else(|| anyhow!("no such process {pid}"))
    }

    fn user_cpu_seconds(&mut self, pid: u32) -> Result<f64> {
        self.cpu
            .get(&pid)
            .copied()
            .ok_or_else(|| anyhow!("no such process {pid}"))
    }
}
