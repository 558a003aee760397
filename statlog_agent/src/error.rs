use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("no record produced for this cycle")]
    NoRecord,
    #[error("failed to write report {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode report row")]
    Csv(#[from] csv::Error),
}
