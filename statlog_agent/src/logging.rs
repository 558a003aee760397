//! Log file setup. One line per event:
//! `<timestamp>  <LEVEL> : <module> -> <function> -> <message>`
//! where `function` is the innermost span (collectors are `#[instrument]`ed).

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use std::fmt;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

pub struct LineFormat;

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let module = meta.module_path().unwrap_or_else(|| meta.target());
        let module = module.rsplit("::").next().unwrap_or(module);
        let function = ctx.lookup_current().map(|span| span.name()).unwrap_or("-");
        write!(
            writer,
            "{}  {} : {} -> {} -> ",
            Local::now().format(LOG_TIME_FORMAT),
            meta.level(),
            module,
            function
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Install the global subscriber, appending to `path`. `RUST_LOG` overrides the `info` default.
pub fn init(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .event_format(LineFormat)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|e| anyhow!("installing log subscriber: {e}"))
}
