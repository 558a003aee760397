//! Agent configuration: fixed constants plus the values resolved once at startup.

use std::path::PathBuf;
use std::time::Duration;

/// Pause between the end of one cycle and the start of the next.
pub const CYCLE_INTERVAL: Duration = Duration::from_secs(30);

// Watched processes, matched as a substring of the process name.
#[cfg(windows)]
pub const IIS_PROCESS: &str = "w3wp.exe";
#[cfg(windows)]
pub const JAVA_PROCESS: &str = "java.exe";
#[cfg(windows)]
pub const MYSQLD_PROCESS: &str = "mysqld.exe";
#[cfg(not(windows))]
pub const IIS_PROCESS: &str = "w3wp";
#[cfg(not(windows))]
pub const JAVA_PROCESS: &str = "java";
#[cfg(not(windows))]
pub const MYSQLD_PROCESS: &str = "mysqld";

pub const PORT_ACS_HTTP: u16 = 8080;
pub const PORT_ACS_ALT: u16 = 8181;
pub const PORT_ACS_HTTPS: u16 = 8443;
pub const PORT_MYSQL: u16 = 3306;
pub const PORT_ORACLE: u16 = 1521;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub hostname: String,
    pub report_path: PathBuf,
    pub log_path: PathBuf,
    pub interval: Duration,
}

impl AgentConfig {
    /// Build the config for this host, with files in the working directory.
    pub fn for_host(hostname: impl Into<String>) -> Self {
        let hostname = hostname.into();
        Self {
            report_path: PathBuf::from(format!("{hostname}_statistics.csv")),
            log_path: PathBuf::from(format!("{hostname}_SystemInformation.log")),
            hostname,
            interval: CYCLE_INTERVAL,
        }
    }

    pub fn detect() -> Self {
        Self::for_host(local_hostname())
    }
}

pub fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|s| s.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string())
}
