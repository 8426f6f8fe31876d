//! Pipeline executor for running a full extract, transform and load

use std::path::PathBuf;
use std::time::Instant;

use serde::Serialize;
use tracing::{error, info, info_span};

use super::config::{PipelineConfig, PipelineStage};
use super::context::RunContext;
use super::error::{PipelineError, PipelineResult, StageError};
use super::extract::extract_records;
use super::init::init_schema;
use super::load::load_report;
use super::retry::{Retryable, RetryPolicy};
use super::transform::transform_records;
use crate::ids::{resolve_id, validate_identifier};

/// Identifiers supplied by the caller; missing ones are generated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageIds {
    pub run_id: Option<String>,
    pub extract_id: Option<String>,
    pub transform_id: Option<String>,
    pub load_id: Option<String>,
}

impl StageIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_run_id(mut self, id: impl Into<String>) -> Self {
        self.run_id = Some(id.into());
        self
    }

    pub fn with_extract_id(mut self, id: impl Into<String>) -> Self {
        self.extract_id = Some(id.into());
        self
    }

    pub fn with_transform_id(mut self, id: impl Into<String>) -> Self {
        self.transform_id = Some(id.into());
        self
    }

    pub fn with_load_id(mut self, id: impl Into<String>) -> Self {
        self.load_id = Some(id.into());
        self
    }

    /// Reject supplied identifiers that could not be used in a file name
    pub fn validate(&self) -> PipelineResult<()> {
        let supplied = [
            ("run id", &self.run_id),
            ("extract id", &self.extract_id),
            ("transform id", &self.transform_id),
            ("load id", &self.load_id),
        ];
        for (field, id) in supplied {
            if let Some(id) = id {
                validate_identifier(id).map_err(|reason| PipelineError::InvalidIdentifier {
                    field,
                    id: id.clone(),
                    reason,
                })?;
            }
        }
        Ok(())
    }
}

/// Duration of one completed stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    pub stage: PipelineStage,
    pub duration_ms: u64,
}

/// Pipeline executor that runs all stages
pub struct PipelineExecutor {
    config: PipelineConfig,
    policy: RetryPolicy,
}

impl PipelineExecutor {
    /// Create a new pipeline executor
    pub fn new(config: PipelineConfig) -> PipelineResult<Self> {
        config.validate().map_err(PipelineError::Config)?;
        let policy = config.retry.policy();
        Ok(Self { config, policy })
    }

    /// Replace the retry policy derived from the config
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run schema init, extract, transform and load for one run
    ///
    /// A failure stops the run in its current state. Rows written by earlier
    /// stages stay in the store.
    pub fn run(&self, ids: StageIds) -> PipelineResult<PipelineReport> {
        ids.validate()?;

        let mut ctx = RunContext::new(resolve_id(ids.run_id.as_deref()));
        let _span = info_span!("pipeline_run", run_id = %ctx.run_id()).entered();

        let start = Instant::now();
        let store = self.config.store();
        let schema = self.config.schema_definition();
        let (source, output_dir) = match (&self.config.source, &self.config.output_dir) {
            (Some(source), Some(output_dir)) => (source, output_dir),
            _ => {
                return Err(PipelineError::Config(
                    "source and output directory are required".to_string(),
                ));
            }
        };

        info!(
            run_id = %ctx.run_id(),
            source = %source.display(),
            database = %store.path().display(),
            output_dir = %output_dir.display(),
            "Starting pipeline"
        );

        let mut timings = Vec::with_capacity(4);

        let timer = Instant::now();
        self.run_stage(PipelineStage::Init, &ctx, None, || {
            init_schema(&store, &schema)
        })?;
        timings.push(elapsed(PipelineStage::Init, timer));

        let extract_id = resolve_id(ids.extract_id.as_deref());
        let timer = Instant::now();
        let extracted = self.run_stage(PipelineStage::Extract, &ctx, Some(&extract_id), || {
            extract_records(source, ctx.run_id(), &store, Some(&extract_id))
        })?;
        timings.push(elapsed(PipelineStage::Extract, timer));
        ctx.mark_extracted(extracted.extract_id)?;

        let source_extract_id = ctx.extract_id().unwrap_or_default().to_string();
        let transform_id = resolve_id(ids.transform_id.as_deref());
        let timer = Instant::now();
        let transformed =
            self.run_stage(PipelineStage::Transform, &ctx, Some(&transform_id), || {
                transform_records(
                    ctx.run_id(),
                    &source_extract_id,
                    &store,
                    Some(&transform_id),
                    self.config.top_n,
                )
            })?;
        timings.push(elapsed(PipelineStage::Transform, timer));
        ctx.mark_transformed(transformed.transform_id)?;

        let report_transform_id = ctx.transform_id().unwrap_or_default().to_string();
        let load_id = resolve_id(ids.load_id.as_deref());
        let timer = Instant::now();
        let loaded = self.run_stage(PipelineStage::Load, &ctx, Some(&load_id), || {
            load_report(
                &store,
                output_dir,
                ctx.run_id(),
                &report_transform_id,
                Some(&load_id),
            )
        })?;
        timings.push(elapsed(PipelineStage::Load, timer));
        ctx.mark_loaded(loaded.load_id, &loaded.artifact)?;

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            run_id = %ctx.run_id(),
            artifact = %loaded.artifact.display(),
            duration_ms,
            "Pipeline completed"
        );

        Ok(PipelineReport {
            run_id: ctx.run_id().to_string(),
            extract_id: source_extract_id,
            transform_id: report_transform_id,
            load_id: ctx.load_id().unwrap_or_default().to_string(),
            rows_ingested: extracted.rows,
            report_rows: transformed.rows,
            artifact: loaded.artifact,
            overwritten: loaded.overwritten,
            stage_timings: timings,
            duration_ms,
        })
    }

    /// Run one stage under the retry policy
    fn run_stage<T, E, F>(
        &self,
        stage: PipelineStage,
        ctx: &RunContext,
        stage_id: Option<&str>,
        op: F,
    ) -> PipelineResult<T>
    where
        E: Retryable + std::fmt::Display + Into<StageError>,
        F: FnMut() -> Result<T, E>,
    {
        let _span = info_span!(
            "pipeline_stage",
            stage = stage.name(),
            stage_id = stage_id.unwrap_or("-")
        )
        .entered();

        self.policy.run(stage, op).map_err(|failure| {
            error!(
                stage = stage.name(),
                run_id = %ctx.run_id(),
                stage_id = stage_id.unwrap_or("-"),
                attempts = failure.attempts,
                error = %failure.error,
                "Stage failed"
            );
            let own_id = |owner: PipelineStage| {
                if stage == owner {
                    stage_id.map(str::to_string)
                } else {
                    None
                }
            };
            PipelineError::StageFailed {
                stage,
                run_id: ctx.run_id().to_string(),
                stage_id: stage_id.map(str::to_string),
                extract_id: ctx
                    .extract_id()
                    .map(str::to_string)
                    .or_else(|| own_id(PipelineStage::Extract)),
                transform_id: ctx
                    .transform_id()
                    .map(str::to_string)
                    .or_else(|| own_id(PipelineStage::Transform)),
                attempts: failure.attempts,
                source: failure.error.into(),
            }
        })
    }
}

fn elapsed(stage: PipelineStage, since: Instant) -> StageTiming {
    StageTiming {
        stage,
        duration_ms: since.elapsed().as_millis() as u64,
    }
}

/// Report from a pipeline run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub run_id: String,
    pub extract_id: String,
    pub transform_id: String,
    pub load_id: String,
    /// Raw records appended by the extract
    pub rows_ingested: usize,
    /// Report rows appended by the transform
    pub report_rows: usize,
    /// Written Parquet file
    pub artifact: PathBuf,
    /// The artifact replaced an existing file
    pub overwritten: bool,
    pub stage_timings: Vec<StageTiming>,
    /// Total duration in milliseconds
    pub duration_ms: u64,
}

impl PipelineReport {
    /// Get formatted duration
    pub fn duration_formatted(&self) -> String {
        let secs = self.duration_ms / 1000;
        let mins = secs / 60;
        let remaining_secs = secs % 60;

        if mins > 0 {
            format!("{}m {}s", mins, remaining_secs)
        } else if secs > 0 {
            format!("{}s", secs)
        } else {
            format!("{}ms", self.duration_ms)
        }
    }

    /// Print summary to stderr
    pub fn print_summary(&self) {
        eprintln!();
        eprintln!("Pipeline {} - completed", self.run_id);
        eprintln!("Duration: {}", self.duration_formatted());
        eprintln!("  extract id:   {}", self.extract_id);
        eprintln!("  transform id: {}", self.transform_id);
        eprintln!("  load id:      {}", self.load_id);
        eprintln!("Rows ingested: {}", self.rows_ingested);
        eprintln!("Report rows:   {}", self.report_rows);

        for timing in &self.stage_timings {
            eprintln!("  - {}: ok ({}ms)", timing.stage.name(), timing.duration_ms);
        }

        let note = if self.overwritten { " (overwritten)" } else { "" };
        eprintln!("Artifact: {}{}", self.artifact.display(), note);
    }
}
