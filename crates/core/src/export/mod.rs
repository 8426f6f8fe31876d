//! Export of report rows to columnar artifact files

mod report;

use std::path::PathBuf;

use thiserror::Error;

pub use report::{
    REPORT_COLUMNS, read_report_parquet, report_batch, report_schema, write_report_parquet,
};

/// Errors raised while writing or reading an artifact
#[derive(Error, Debug)]
pub enum ExportError {
    /// File could not be created, renamed or read
    #[error("IO error with {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Rows could not be converted to Arrow arrays
    #[error("Arrow error: {0}")]
    Arrow(String),

    /// Parquet encoding or decoding failed
    #[error("Parquet error: {0}")]
    Parquet(String),
}

/// Result type for export operations
pub type ExportResult<T> = Result<T, ExportError>;
