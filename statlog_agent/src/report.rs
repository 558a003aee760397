//! CSV report writer: one header when the file is new, then one row per cycle.

use crate::error::ReportError;
use crate::metrics::MetricSource;
use crate::sampler::evaluate;
use crate::types::MetricsRecord;
use chrono::Local;
use csv::{Terminator, WriterBuilder};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{info, instrument};

/// Sample once and append the row to `path`.
#[instrument(skip_all)]
pub fn create_report<S: MetricSource + ?Sized>(
    path: &Path,
    source: &mut S,
) -> Result<(), ReportError> {
    let file_exists = path.is_file();
    let record = evaluate(source, Local::now()).ok_or(ReportError::NoRecord)?;
    write_record(path, &record, !file_exists)?;
    info!("Done. Report saved to file {}", path.display());
    Ok(())
}

/// Append `record`, preceded by the header row when `with_header` is set.
/// Header and row go out in a single write so a failure never leaves a lone header.
pub fn write_record(
    path: &Path,
    record: &MetricsRecord,
    with_header: bool,
) -> Result<(), ReportError> {
    let bytes = render(record, with_header)?;
    let io_err = |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;
    file.write_all(&bytes).map_err(io_err)?;
    file.flush().map_err(io_err)
}

fn render(record: &MetricsRecord, with_header: bool) -> Result<Vec<u8>, ReportError> {
    let mut buf = Vec::new();
    {
        let mut wtr = WriterBuilder::new()
            .has_headers(with_header)
            .delimiter(b',')
            .terminator(Terminator::Any(b'\n'))
            .from_writer(&mut buf);
        wtr.serialize(record)?;
        wtr.flush().map_err(csv::Error::from)?;
    }
    Ok(buf)
}
