//! Row types written to the statistics CSV.
//! Keep this module minimal and stable — field order here is the column order of the report.

use serde::Serialize;

/// Raw memory figures in bytes, as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryTotals {
    pub total: u64,
    pub available: u64,
    pub used: u64,
}

/// System-wide figures gathered once per cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct HostAggregates {
    pub total_ram: f64,
    pub free_ram: f64,
    pub used_ram: f64,
    pub cpu_total: usize,
    pub cpu_loadavg: f64,
    pub acs_8080: String,
    pub acs_8181: String,
    pub acs_8443: String,
    pub mysql: String,
    pub oracle: String,
}

/// Memory and CPU of one watched process. `None` when the process is missing or unreadable.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcessSample {
    pub ram: Option<f64>,
    pub cpu: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MetricsRecord {
    pub timestamp: String,
    pub total_ram: f64,
    pub free_ram: f64,
    pub used_ram: f64,
    pub cpu_total: usize,
    pub cpu_loadavg: f64,
    pub acs_8080: String,
    pub acs_8181: String,
    pub acs_8443: String,
    pub mysql: String,
    pub oracle: String,
    // absent samples serialize as empty cells
    pub iis_ram: Option<f64>,
    pub iis_cpu: Option<f64>,
    pub java_ram: Option<f64>,
    pub java_cpu: Option<f64>,
    pub mysqld_ram: Option<f64>,
    pub mysqld_cpu: Option<f64>,
}

impl MetricsRecord {
    pub fn new(
        timestamp: String,
        host: HostAggregates,
        iis: ProcessSample,
        java: ProcessSample,
        mysqld: ProcessSample,
    ) -> Self {
        Self {
            timestamp,
            total_ram: host.total_ram,
            free_ram: host.free_ram,
            used_ram: host.used_ram,
            cpu_total: host.cpu_total,
            cpu_loadavg: host.cpu_loadavg,
            acs_8080: host.acs_8080,
            acs_8181: host.acs_8181,
            acs_8443: host.acs_8443,
            mysql: host.mysql,
            oracle: host.oracle,
            iis_ram: iis.ram,
            iis_cpu: iis.cpu,
            java_ram: java.ram,
            java_cpu: java.cpu,
            mysqld_ram: mysqld.ram,
            mysqld_cpu: mysqld.cpu,
        }
    }
}

/// Header row, in column order.
pub const FIELD_NAMES: [&str; 17] = [
    "timestamp",
    "total_ram",
    "free_ram",
    "used_ram",
    "cpu_total",
    "cpu_loadavg",
    "acs_8080",
    "acs_8181",
    "acs_8443",
    "mysql",
    "oracle",
    "iis_ram",
    "iis_cpu",
    "java_ram",
    "java_cpu",
    "mysqld_ram",
    "mysqld_cpu",
];
