//! Load stage: report rows of one transform to a Parquet artifact

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use super::error::LoadError;
use crate::export::write_report_parquet;
use crate::ids::{resolve_id, validate_identifier};
use crate::staging::StoreHandle;

/// File name prefix of report artifacts
pub const ARTIFACT_PREFIX: &str = "top10";

/// Outcome of one load
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSummary {
    pub load_id: String,
    pub transform_id: String,
    pub artifact: PathBuf,
    /// Report rows written to the artifact
    pub rows: usize,
    /// Artifact size in bytes
    pub bytes: u64,
    /// An earlier artifact at the same path was replaced
    pub overwritten: bool,
}

fn checked(id: &str) -> Result<&str, LoadError> {
    validate_identifier(id).map_err(|reason| LoadError::InvalidIdentifier {
        id: id.to_string(),
        reason,
    })?;
    Ok(id)
}

/// Artifact path for a run and transform
///
/// Both identifiers are validated before they become part of a file name.
pub fn artifact_path(
    output_dir: &Path,
    run_id: &str,
    transform_id: &str,
) -> Result<PathBuf, LoadError> {
    let run_id = checked(run_id)?;
    let transform_id = checked(transform_id)?;
    Ok(output_dir.join(format!("{ARTIFACT_PREFIX}_{run_id}_{transform_id}.parquet")))
}

/// Export the report rows of one transform
///
/// Returns the path of the written artifact.
pub fn load(
    store: &StoreHandle,
    output_dir: &Path,
    run_id: &str,
    transform_id: &str,
    load_id: Option<&str>,
) -> Result<PathBuf, LoadError> {
    load_report(store, output_dir, run_id, transform_id, load_id).map(|summary| summary.artifact)
}

/// Export one transform and report what was written
pub fn load_report(
    store: &StoreHandle,
    output_dir: &Path,
    run_id: &str,
    transform_id: &str,
    load_id: Option<&str>,
) -> Result<LoadSummary, LoadError> {
    let load_id = resolve_id(load_id);
    let artifact = artifact_path(output_dir, run_id, transform_id)?;
    info!(
        stage = "load",
        run_id,
        transform_id,
        load_id = %load_id,
        artifact = %artifact.display(),
        "Starting load"
    );

    std::fs::create_dir_all(output_dir).map_err(|source| LoadError::OutputDir {
        path: output_dir.to_path_buf(),
        source,
    })?;

    let rows = store.open()?.report_rows(transform_id)?;

    let overwritten = artifact.exists();
    if overwritten {
        warn!(
            stage = "load",
            run_id,
            transform_id,
            load_id = %load_id,
            artifact = %artifact.display(),
            "Artifact already exists and will be overwritten"
        );
    }

    let bytes = write_report_parquet(&rows, &artifact)?;

    info!(
        stage = "load",
        run_id,
        load_id = %load_id,
        rows = rows.len(),
        bytes,
        "Load completed"
    );

    Ok(LoadSummary {
        load_id,
        transform_id: transform_id.to_string(),
        artifact,
        rows: rows.len(),
        bytes,
        overwritten,
    })
}
