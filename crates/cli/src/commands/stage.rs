//! CLI commands for running a single stage
//!
//! These run one stage once, with explicit identifiers, so a stage that
//! failed inside `run` can be replayed by hand.

use std::path::PathBuf;

use sales_pipeline_core::pipeline::{extract_records, init_schema, load_report, transform_records};

use super::ConfigArgs;
use crate::error::CliError;

/// Arguments for the `extract` command
#[derive(Debug, Clone, Default)]
pub struct ExtractArgs {
    pub config: ConfigArgs,
    pub input: PathBuf,
    pub run_id: String,
    pub extract_id: Option<String>,
}

/// Arguments for the `transform` command
#[derive(Debug, Clone, Default)]
pub struct TransformArgs {
    pub config: ConfigArgs,
    pub run_id: String,
    pub extract_id: String,
    pub transform_id: Option<String>,
    pub top_n: Option<usize>,
}

/// Arguments for the `load` command
#[derive(Debug, Clone, Default)]
pub struct LoadArgs {
    pub config: ConfigArgs,
    pub output_dir: PathBuf,
    pub run_id: String,
    pub transform_id: String,
    pub load_id: Option<String>,
}

/// Handle the `init` command
pub fn handle_init(args: &ConfigArgs) -> Result<(), CliError> {
    let config = args.resolve()?;
    let store = config.store();
    init_schema(&store, &config.schema_definition())?;

    eprintln!("Store ready: {}", store.path().display());
    Ok(())
}

/// Handle the `extract` command, printing the extract id on stdout
pub fn handle_extract(args: &ExtractArgs) -> Result<String, CliError> {
    if !args.input.is_file() {
        return Err(CliError::FileNotFound(args.input.clone()));
    }

    let config = args.config.resolve()?;
    let summary = extract_records(
        &args.input,
        &args.run_id,
        &config.store(),
        args.extract_id.as_deref(),
    )?;

    eprintln!("Extracted {} rows", summary.rows);
    if summary.unparsed_dates > 0 || summary.unparsed_numbers > 0 {
        eprintln!(
            "  {} dates and {} numbers could not be parsed and were stored as null",
            summary.unparsed_dates, summary.unparsed_numbers
        );
    }
    println!("{}", summary.extract_id);
    Ok(summary.extract_id)
}

/// Handle the `transform` command, printing the transform id on stdout
pub fn handle_transform(args: &TransformArgs) -> Result<String, CliError> {
    let config = args.config.resolve()?;
    let top_n = args.top_n.unwrap_or(config.top_n);
    if top_n == 0 {
        return Err(CliError::InvalidArgument(
            "--top-n must be at least 1".to_string(),
        ));
    }

    let summary = transform_records(
        &args.run_id,
        &args.extract_id,
        &config.store(),
        args.transform_id.as_deref(),
        top_n,
    )?;

    eprintln!(
        "Wrote {} report rows from extract {}",
        summary.rows, summary.source_extract_id
    );
    println!("{}", summary.transform_id);
    Ok(summary.transform_id)
}

/// Handle the `load` command, printing the artifact path on stdout
pub fn handle_load(args: &LoadArgs) -> Result<PathBuf, CliError> {
    let config = args.config.resolve()?;
    let summary = load_report(
        &config.store(),
        &args.output_dir,
        &args.run_id,
        &args.transform_id,
        args.load_id.as_deref(),
    )?;

    let note = if summary.overwritten {
        " (replaced existing file)"
    } else {
        ""
    };
    eprintln!(
        "Load {} wrote {} rows{}",
        summary.load_id, summary.rows, note
    );
    println!("{}", summary.artifact.display());
    Ok(summary.artifact)
}
