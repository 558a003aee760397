//! Sampling cycle: host aggregates, watched processes, and the fixed-interval report loop.

use crate::config::{
    AgentConfig, IIS_PROCESS, JAVA_PROCESS, MYSQLD_PROCESS, PORT_ACS_ALT, PORT_ACS_HTTP,
    PORT_ACS_HTTPS, PORT_MYSQL, PORT_ORACLE,
};
use crate::metrics::MetricSource;
use crate::report::create_report;
use crate::types::{HostAggregates, MetricsRecord, ProcessSample};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tokio::time::sleep;
use tracing::{error, info, instrument};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H:%M:%S";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn bytes_to_mb(bytes: u64) -> f64 {
    round2(bytes as f64 / BYTES_PER_MB)
}

/// 1-minute load expressed as a percentage of all logical cores.
pub fn load_percent(load: f64, cores: usize) -> f64 {
    round2(load / cores.max(1) as f64 * 100.0)
}

/// First process whose name contains `name`, in enumeration order.
/// `Ok(None)` means nothing matched; `Err` means the process table could not be read.
#[instrument(skip_all)]
pub fn get_pid<S: MetricSource + ?Sized>(source: &mut S, name: &str) -> Result<Option<u32>> {
    let procs = match source.processes() {
        Ok(p) => p,
        Err(e) => {
            let e = e.context(format!("looking up process {name}"));
            error!("Process lookup unavailable: {e:?}");
            return Err(e);
        }
    };
    let pid = procs
        .into_iter()
        .find(|(_, pname)| pname.contains(name))
        .map(|(pid, _)| pid);
    match pid {
        Some(pid) => info!("Found PID {pid} for {name}"),
        None => info!("No running process matches {name}"),
    }
    Ok(pid)
}

/// Memory of `pid` as a percentage of system memory, 2 decimals.
#[instrument(skip_all)]
pub fn get_ram_usage<S: MetricSource + ?Sized>(source: &mut S, pid: u32) -> Option<f64> {
    match source.memory_percent(pid) {
        Ok(pct) => {
            let ram = round2(pct);
            info!("Calculated RAM {ram} for PID {pid}");
            Some(ram)
        }
        Err(e) => {
            error!("RAM read failed for PID {pid}: {e:?}");
            None
        }
    }
}

/// Cumulative user-mode CPU seconds of `pid`.
#[instrument(skip_all)]
pub fn get_cpu_usage<S: MetricSource + ?Sized>(source: &mut S, pid: u32) -> Option<f64> {
    match source.user_cpu_seconds(pid) {
        Ok(cpu) => {
            info!("Calculated CPU usage {cpu} for PID {pid}");
            Some(cpu)
        }
        Err(e) => {
            error!("CPU read failed for PID {pid}: {e:?}");
            None
        }
    }
}

pub fn sample_process<S: MetricSource + ?Sized>(source: &mut S, name: &str) -> ProcessSample {
    match get_pid(source, name) {
        Ok(Some(pid)) => ProcessSample {
            ram: get_ram_usage(source, pid),
            cpu: get_cpu_usage(source, pid),
        },
        _ => ProcessSample::default(),
    }
}

fn try_collect_host<S: MetricSource + ?Sized>(source: &mut S) -> Result<HostAggregates> {
    let mem = source.memory().context("reading memory totals")?;
    let cores = source.logical_cpus().context("counting logical cpus")?;
    if cores == 0 {
        return Err(anyhow!("logical cpu count is zero"));
    }
    let load = source.load_average().context("reading load average")?;
    let mut count = |port: u16| {
        source
            .connection_count(port)
            .with_context(|| format!("counting connections on port {port}"))
    };
    Ok(HostAggregates {
        total_ram: bytes_to_mb(mem.total),
        free_ram: bytes_to_mb(mem.available),
        used_ram: bytes_to_mb(mem.used),
        cpu_total: cores,
        cpu_loadavg: load_percent(load, cores),
        acs_8080: count(PORT_ACS_HTTP)?,
        acs_8181: count(PORT_ACS_ALT)?,
        acs_8443: count(PORT_ACS_HTTPS)?,
        mysql: count(PORT_MYSQL)?,
        oracle: count(PORT_ORACLE)?,
    })
}

/// System-wide figures for this cycle, or `None` if any of them could not be read.
#[instrument(skip_all)]
pub fn collect_host<S: MetricSource + ?Sized>(source: &mut S) -> Option<HostAggregates> {
    match try_collect_host(source) {
        Ok(host) => {
            info!("General system info obtained");
            Some(host)
        }
        Err(e) => {
            error!("Host aggregate collection failed: {e:?}");
            None
        }
    }
}

/// Assemble one record. Missing host aggregates drop the whole record; missing process
/// samples stay empty.
#[instrument(skip_all)]
pub fn evaluate<S: MetricSource + ?Sized>(
    source: &mut S,
    now: DateTime<Local>,
) -> Option<MetricsRecord> {
    let Some(host) = collect_host(source) else {
        error!("No record for this cycle: host aggregates unavailable");
        return None;
    };
    let iis = sample_process(source, IIS_PROCESS);
    let java = sample_process(source, JAVA_PROCESS);
    let mysqld = sample_process(source, MYSQLD_PROCESS);

    info!("Data for report generated");
    Some(MetricsRecord::new(
        now.format(TIMESTAMP_FORMAT).to_string(),
        host,
        iis,
        java,
        mysqld,
    ))
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

/// One report cycle. Never panics or errors past this point; returns whether a row was written.
#[instrument(skip_all)]
pub fn run_cycle<S: MetricSource + ?Sized>(config: &AgentConfig, source: &mut S) -> bool {
    match catch_unwind(AssertUnwindSafe(|| create_report(&config.report_path, source))) {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!("Report cycle failed: {:?}", anyhow::Error::new(e));
            false
        }
        Err(payload) => {
            error!("Report cycle panicked: {}", panic_message(payload.as_ref()));
            false
        }
    }
}

/// Report forever, pausing `config.interval` after each cycle. Returns only on Ctrl-C.
#[instrument(skip_all)]
pub async fn run<S: MetricSource + ?Sized>(config: &AgentConfig, source: &mut S) {
    loop {
        info!("Main loop start");
        run_cycle(config, source);
        info!("Main loop pause");
        tokio::select! {
            _ = sleep(config.interval) => {}
            res = tokio::signal::ctrl_c() => {
                match res {
                    Ok(()) => info!("Interrupted; stopping"),
                    Err(e) => error!("Signal handler failed; stopping: {e}"),
                }
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeSource;
    use chrono::TimeZone;

    #[test]
    fn load_average_is_share_of_all_cores() {
        assert_eq!(load_percent(4.0, 16), 25.0);
        assert_eq!(load_percent(1.0, 3), 33.33);
    }

    #[test]
    fn memory_is_reported_in_megabytes() {
        assert_eq!(bytes_to_mb(17_179_869_184), 16384.0);
        assert_eq!(bytes_to_mb(1_572_864), 1.5);
        assert_eq!(bytes_to_mb(1_000_000), 0.95);
    }

    #[test]
    fn lookup_returns_first_match_in_enumeration_order() {
        let mut src = FakeSource::healthy()
            .with_process(40, "mysqld-helper")
            .with_process(12, "mysqld");
        assert_eq!(get_pid(&mut src, "mysqld").unwrap(), Some(40));
        assert_eq!(get_pid(&mut src, "oracle").unwrap(), None);
    }

    #[test]
    fn lookup_unavailable_is_distinct_from_not_found() {
        let mut src = FakeSource::healthy();
        src.process_table_fails = true;
        assert!(get_pid(&mut src, "java").is_err());
    }

    #[test]
    fn process_read_failure_yields_absent_values() {
        let mut src = FakeSource::healthy().with_process(7, JAVA_PROCESS);
        src.ram.remove(&7);
        let s = sample_process(&mut src, JAVA_PROCESS);
        assert_eq!(s.ram, None);
        assert_eq!(s.cpu, Some(1.5));
    }

    #[test]
    fn evaluate_fills_fields_in_place() {
        let mut src = FakeSource::healthy()
            .with_process(1, IIS_PROCESS)
            .with_process(2, JAVA_PROCESS);
        src.ram.insert(2, 2.0249);
        let now = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let rec = evaluate(&mut src, now).expect("record");
        assert_eq!(rec.timestamp, "2024-03-09-14:05:07");
        assert_eq!(rec.total_ram, 16384.0);
        assert_eq!(rec.cpu_total, 16);
        assert_eq!(rec.cpu_loadavg, 25.0);
        assert_eq!(rec.acs_8443, "3");
        assert_eq!(rec.iis_ram, Some(10.0));
        assert_eq!(rec.java_ram, Some(2.02));
        assert_eq!(rec.java_cpu, Some(1.5));
        assert_eq!(rec.mysqld_ram, None);
        assert_eq!(rec.mysqld_cpu, None);
    }

    #[test]
    fn evaluate_drops_record_without_host_aggregates() {
        let mut src = FakeSource::healthy();
        src.memory = None;
        assert!(evaluate(&mut src, Local::now()).is_none());

        let mut src = FakeSource::healthy();
        src.connections = None;
        assert!(evaluate(&mut src, Local::now()).is_none());
    }

    #[test]
    fn cycle_survives_a_panicking_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AgentConfig::for_host("panicky");
        config.report_path = dir.path().join("out.csv");
        let mut src = FakeSource::healthy();
        src.panic_on_memory = true;
        assert!(!run_cycle(&config, &mut src));
        assert!(!config.report_path.exists());

        src.panic_on_memory = false;
        assert!(run_cycle(&config, &mut src));
        assert!(config.report_path.exists());
    }
}
