//! Metrics collection using sysinfo for statlog_agent.

use crate::netstat::count_connections;
use crate::types::MemoryTotals;
use anyhow::{anyhow, Context, Result};
#[cfg(target_os = "linux")]
use std::fs;
#[cfg(target_os = "linux")]
use std::io;
use sysinfo::{
    CpuRefreshKind, MemoryRefreshKind, Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind,
    System,
};

/// Point-in-time OS queries used by the sampler. Every call may fail; callers decide what a
/// failure means for the cycle.
pub trait MetricSource {
    fn memory(&mut self) -> Result<MemoryTotals>;
    fn logical_cpus(&mut self) -> Result<usize>;
    /// 1-minute load average.
    fn load_average(&mut self) -> Result<f64>;
    fn connection_count(&mut self, port: u16) -> Result<String>;
    /// Current process table as (pid, name), one entry per process (no threads), by ascending pid.
    fn processes(&mut self) -> Result<Vec<(u32, String)>>;
    /// Resident memory of `pid` as a percentage of total memory (unrounded).
    fn memory_percent(&mut self, pid: u32) -> Result<f64>;
    /// Cumulative user-mode CPU time of `pid`, in seconds.
    fn user_cpu_seconds(&mut self, pid: u32) -> Result<f64>;
}

/// Live source backed by one persistent sysinfo handle.
pub struct SysinfoSource {
    sys: System,
}

impl SysinfoSource {
    pub fn new() -> Self {
        let refresh_kind = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::nothing())
            .with_memory(MemoryRefreshKind::everything());
        Self {
            sys: System::new_with_specifics(refresh_kind),
        }
    }

    fn refresh_one(&mut self, pid: u32) -> Result<&sysinfo::Process> {
        let pid = Pid::from_u32(pid);
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing()
                .with_memory()
                .with_cpu()
                .without_tasks(),
        );
        self.sys
            .process(pid)
            .ok_or_else(|| anyhow!("process {pid} is not running"))
    }
}

impl Default for SysinfoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricSource for SysinfoSource {
    fn memory(&mut self) -> Result<MemoryTotals> {
        self.sys.refresh_memory();
        let total = self.sys.total_memory();
        if total == 0 {
            return Err(anyhow!("total memory reported as zero"));
        }
        Ok(MemoryTotals {
            total,
            available: self.sys.available_memory(),
            used: self.sys.used_memory(),
        })
    }

    fn logical_cpus(&mut self) -> Result<usize> {
        if self.sys.cpus().is_empty() {
            self.sys.refresh_cpu_list(CpuRefreshKind::nothing());
        }
        match self.sys.cpus().len() {
            0 => Err(anyhow!("no logical cpus reported")),
            n => Ok(n),
        }
    }

    fn load_average(&mut self) -> Result<f64> {
        Ok(System::load_average().one)
    }

    fn connection_count(&mut self, port: u16) -> Result<String> {
        count_connections(port)
    }

    fn processes(&mut self) -> Result<Vec<(u32, String)>> {
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing().without_tasks(),
        );
        // Linux lists threads alongside processes; keep only thread-group leaders
        let mut list: Vec<(u32, String)> = self
            .sys
            .processes()
            .values()
            .filter(|p| p.thread_kind().is_none())
            .map(|p| (p.pid().as_u32(), p.name().to_string_lossy().into_owned()))
            .collect();
        if list.is_empty() {
            return Err(anyhow!("process table is empty"));
        }
        // the map iterates in hash order; pid order keeps "first match" stable across cycles
        list.sort_unstable_by_key(|(pid, _)| *pid);
        Ok(list)
    }

    fn memory_percent(&mut self, pid: u32) -> Result<f64> {
        if self.sys.total_memory() == 0 {
            self.sys.refresh_memory();
        }
        let total = self.sys.total_memory();
        let rss = self.refresh_one(pid)?.memory();
        if total == 0 {
            return Err(anyhow!("total memory reported as zero"));
        }
        Ok(rss as f64 / total as f64 * 100.0)
    }

    #[cfg(target_os = "linux")]
    fn user_cpu_seconds(&mut self, pid: u32) -> Result<f64> {
        let jiffies =
            read_user_jiffies(pid).with_context(|| format!("reading /proc/{pid}/stat"))?;
        Ok(jiffies as f64 / USER_HZ)
    }

    // sysinfo only exposes user+system time here.
    #[cfg(not(target_os = "linux"))]
    fn user_cpu_seconds(&mut self, pid: u32) -> Result<f64> {
        let ms = self.refresh_one(pid)?.accumulated_cpu_time();
        Ok(ms as f64 / 1000.0)
    }
}

// Kernel ABI tick rate for /proc time fields.
#[cfg(target_os = "linux")]
const USER_HZ: f64 = 100.0;

#[cfg(target_os = "linux")]
fn read_user_jiffies(pid: u32) -> io::Result<u64> {
    let s = fs::read_to_string(format!("/proc/{pid}/stat"))?;
    parse_utime(&s).ok_or_else(|| io::Error::other("malformed stat line"))
}

/// utime from a `/proc/<pid>/stat` line.
#[cfg(target_os = "linux")]
fn parse_utime(stat: &str) -> Option<u64> {
    // comm may contain spaces; everything after the last ')' is space-separated from "state"
    let rpar = stat.rfind(')')?;
    let after = stat.get(rpar + 2..)?;
    // utime (14th field) is offset 11 from "state"
    after.split_whitespace().nth(11)?.parse::<u64>().ok()
}
