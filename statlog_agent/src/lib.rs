//! statlog_agent: samples host and process resource usage into `<host>_statistics.csv`.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod netstat;
pub mod report;
pub mod sampler;
pub mod types;

#[cfg(test)]
mod test_support;
