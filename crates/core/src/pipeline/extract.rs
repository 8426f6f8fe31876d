//! Extract stage: source file to raw sales records

use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use super::error::ExtractError;
use crate::ids::resolve_id;
use crate::staging::{StoreHandle, read_sales_csv};

/// Outcome of one extract
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractSummary {
    pub extract_id: String,
    /// Raw records appended
    pub rows: usize,
    pub unparsed_dates: usize,
    pub unparsed_numbers: usize,
}

/// Append the rows of a source file to the sales table
///
/// Returns the extract id stamped on every appended row.
pub fn extract(
    source: &Path,
    run_id: &str,
    store: &StoreHandle,
    extract_id: Option<&str>,
) -> Result<String, ExtractError> {
    extract_records(source, run_id, store, extract_id).map(|summary| summary.extract_id)
}

/// Append the rows of a source file and report what was written
pub fn extract_records(
    source: &Path,
    run_id: &str,
    store: &StoreHandle,
    extract_id: Option<&str>,
) -> Result<ExtractSummary, ExtractError> {
    let extract_id = resolve_id(extract_id);
    info!(
        stage = "extract",
        run_id,
        extract_id = %extract_id,
        source = %source.display(),
        "Starting extract"
    );

    let batch = read_sales_csv(source)?;
    let captured_at = Utc::now();

    let mut db = store.open()?;
    let rows = db.append_raw_records(&batch.records, run_id, &extract_id, &captured_at)?;

    info!(
        stage = "extract",
        run_id,
        extract_id = %extract_id,
        rows,
        "Extract completed"
    );

    Ok(ExtractSummary {
        extract_id,
        rows,
        unparsed_dates: batch.unparsed_dates,
        unparsed_numbers: batch.unparsed_numbers,
    })
}
