//! Run orchestration: schema init, extract, transform and load
//!
//! Each run gets a fresh run id. Every stage has its own id, generated once
//! before the stage's retry loop, and stamps it on everything it writes, so
//! any report row or artifact can be traced back to the extract and run
//! that produced it.
//!
//! # Example
//!
//! ```rust,ignore
//! use sales_pipeline_core::pipeline::{PipelineConfig, PipelineExecutor, StageIds};
//!
//! let config = PipelineConfig::new()
//!     .with_source("/data/sales.csv")
//!     .with_database("pipeline.duckdb")
//!     .with_output_dir("/data/output");
//!
//! let executor = PipelineExecutor::new(config)?;
//! let report = executor.run(StageIds::new())?;
//!
//! println!("Wrote {}", report.artifact.display());
//! ```
//!
//! # Pipeline Stages
//!
//! 1. **Init**: Create the `sales` and `top10` tables if missing
//! 2. **Extract**: Append source rows to `sales`, stamped with run and extract ids
//! 3. **Transform**: Append the top N product types by revenue to `top10`
//! 4. **Load**: Export the transform's rows to `top10_<run>_<transform>.parquet`
//!
//! # Replaying a stage
//!
//! Stage functions are public and take explicit identifiers, so a failed
//! stage can be re-run by hand:
//!
//! ```rust,ignore
//! let path = load(&store, output_dir, &run_id, &transform_id, None)?;
//! ```

mod config;
mod context;
mod error;
mod executor;
mod extract;
mod init;
mod load;
mod retry;
mod transform;

use std::path::PathBuf;

pub use config::{
    DEFAULT_DATABASE, DEFAULT_TOP_N, PipelineConfig, PipelineStage, RetryConfig,
};
pub use context::{RunContext, RunState};
pub use error::{
    ExtractError, LoadError, PipelineError, PipelineResult, StageError, TransformError,
};
pub use executor::{PipelineExecutor, PipelineReport, StageIds, StageTiming};
pub use extract::{ExtractSummary, extract, extract_records};
pub use init::init_schema;
pub use load::{ARTIFACT_PREFIX, LoadSummary, artifact_path, load, load_report};
pub use retry::{AttemptFailure, RetryPolicy, Retryable};
pub use transform::{TransformSummary, transform, transform_records};

/// Run a pipeline and return the artifact path
///
/// This is a convenience function for simple pipeline execution.
pub fn run_pipeline(config: PipelineConfig, ids: StageIds) -> PipelineResult<PathBuf> {
    let executor = PipelineExecutor::new(config)?;
    executor.run(ids).map(|report| report.artifact)
}
