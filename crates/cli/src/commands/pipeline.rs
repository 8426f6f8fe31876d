//! CLI command for full pipeline runs

use std::path::PathBuf;

use sales_pipeline_core::pipeline::{PipelineExecutor, StageIds};

use super::ConfigArgs;
use crate::error::CliError;

/// Arguments for the `run` command
#[derive(Debug, Clone, Default)]
pub struct PipelineRunArgs {
    pub config: ConfigArgs,
    /// Delimited sales file
    pub input: PathBuf,
    /// Directory receiving the Parquet artifact
    pub output_dir: PathBuf,
    /// Identifiers to use instead of generated ones
    pub ids: StageIds,
    /// Number of product types kept in the report
    pub top_n: Option<usize>,
    /// Retries after a failed stage attempt
    pub retries: Option<u32>,
    /// Seconds between attempts
    pub retry_delay: Option<u64>,
    /// Print the run report as JSON on stdout
    pub json: bool,
}

/// Handle the `run` command
///
/// Prints the artifact path (or the JSON report) on stdout and a summary on
/// stderr.
pub fn handle_pipeline_run(args: &PipelineRunArgs) -> Result<PathBuf, CliError> {
    if !args.input.is_file() {
        return Err(CliError::FileNotFound(args.input.clone()));
    }
    if args.output_dir.as_os_str().is_empty() {
        return Err(CliError::InvalidArgument(
            "output directory must not be empty".to_string(),
        ));
    }

    let mut config = args
        .config
        .resolve()?
        .with_source(&args.input)
        .with_output_dir(&args.output_dir);

    if let Some(top_n) = args.top_n {
        config = config.with_top_n(top_n);
    }
    if let Some(retries) = args.retries {
        config = config.with_max_retries(retries);
    }
    if let Some(delay) = args.retry_delay {
        config = config.with_retry_delay_secs(delay);
    }

    let executor = PipelineExecutor::new(config)?;

    eprintln!("Starting pipeline run for {}", args.input.display());

    let report = executor.run(args.ids.clone())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print_summary();
        println!("{}", report.artifact.display());
    }

    Ok(report.artifact)
}
