//! Connection counts via the platform shell (`netstat -an` filtered on a port).
//! The counter's output is kept verbatim; only the trailing line break is dropped.

use anyhow::{Context, Result};
use std::process::Command;
use tracing::warn;

#[cfg(not(windows))]
fn counter_command(port: u16) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(format!("netstat -an | grep -c {port}"));
    cmd
}

#[cfg(windows)]
fn counter_command(port: u16) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(format!("netstat -an | find /c \"{port}\""));
    cmd
}

/// Run the counter for `port`. The exit status is ignored: `grep -c` exits 1 on zero matches.
pub fn count_connections(port: u16) -> Result<String> {
    run_counter(counter_command(port), port)
}

fn run_counter(mut cmd: Command, port: u16) -> Result<String> {
    let output = cmd
        .output()
        .with_context(|| format!("spawning connection counter for port {port}"))?;
    let stderr = String::from_utf8_lossy(&output.stderr);
    if let Some(msg) = stderr_warning(&stderr) {
        warn!("Connection counter for port {port} reported: {msg}");
    }
    Ok(trim_output(&output.stdout))
}

/// Non-empty stderr from the counter, e.g. `sh: netstat: not found`; the count alone would hide it.
fn stderr_warning(stderr: &str) -> Option<&str> {
    let msg = stderr.trim();
    (!msg.is_empty()).then_some(msg)
}

fn trim_output(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_end_matches(['\r', '\n'])
        .to_string()
}
