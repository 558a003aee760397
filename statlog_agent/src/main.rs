//! Entry point for statlog_agent. Parses args, sets up logging, and runs the report loop.

use statlog_agent::config::AgentConfig;
use statlog_agent::logging;
use statlog_agent::metrics::SysinfoSource;
use statlog_agent::sampler::{run, run_cycle};
use std::env;
use tracing::info;

#[derive(Debug)]
struct ParsedArgs {
    once: bool,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "statlog_agent".into());
    let mut once = false; // --once

    for arg in it {
        match arg.as_str() {
            "-h" | "--help" => {
                return Err(format!("Usage: {prog} [--once]"));
            }
            "--once" => {
                once = true;
            }
            _ => {
                return Err(format!("Unexpected argument '{arg}'. Usage: {prog} [--once]"));
            }
        }
    }
    Ok(ParsedArgs { once })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
    };

    let config = AgentConfig::detect();
    logging::init(&config.log_path)?;
    info!(
        "statlog_agent {} sampling {} into {}",
        env!("CARGO_PKG_VERSION"),
        config.hostname,
        config.report_path.display()
    );

    let mut source = SysinfoSource::new();
    if parsed.once {
        run_cycle(&config, &mut source);
        return Ok(());
    }
    run(&config, &mut source).await;
    Ok(())
}
