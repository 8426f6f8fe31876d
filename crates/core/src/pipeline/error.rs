//! Error types for pipeline operations
//!
//! Each stage has its own error type that knows whether another attempt
//! could succeed. The orchestrator wraps a stage failure in
//! [`PipelineError::StageFailed`], which keeps the identifiers needed to
//! replay the stage by hand.

use std::path::PathBuf;
use thiserror::Error;

use super::config::PipelineStage;
use super::retry::Retryable;
use crate::export::ExportError;
use crate::staging::{SchemaError, SourceError, StoreError};

/// Whether a store failure could clear up on a later attempt
fn store_is_transient(err: &StoreError) -> bool {
    matches!(err, StoreError::Unavailable { .. } | StoreError::Database(_))
}

/// Errors raised by the extract stage
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Source file missing or unreadable
    #[error("Source not available: {path} - {reason}")]
    SourceUnavailable { path: PathBuf, reason: String },

    /// Source file does not have the expected structure
    #[error("Malformed source {path} at line {line}: {reason}")]
    MalformedSource {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    /// Raw records could not be written
    #[error("Cannot write raw records: {0}")]
    StoreWrite(#[source] StoreError),
}

/// Errors raised by the transform stage
#[derive(Error, Debug)]
pub enum TransformError {
    /// Aggregation or write failed in the store
    #[error("Cannot compute report: {0}")]
    Store(#[source] StoreError),
}

/// Errors raised by the load stage
#[derive(Error, Debug)]
pub enum LoadError {
    /// Identifier cannot be used in a file name
    #[error("Invalid identifier: {reason}")]
    InvalidIdentifier { id: String, reason: String },

    /// Output directory could not be created
    #[error("Cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Report rows could not be read
    #[error("Cannot read report rows: {0}")]
    Store(#[source] StoreError),

    /// Artifact could not be written
    #[error("Cannot write artifact: {0}")]
    Write(#[source] ExportError),
}

/// Failure of one stage, whatever its kind
#[derive(Error, Debug)]
pub enum StageError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Errors that can occur during pipeline execution
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Pipeline configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A supplied identifier was rejected before any stage ran
    #[error("Invalid {field} '{id}': {reason}")]
    InvalidIdentifier {
        field: &'static str,
        id: String,
        reason: String,
    },

    /// Stage failed, either on a non-retryable error or after all retries
    ///
    /// `extract_id` and `transform_id` are the ids the run had reached when
    /// the stage failed, including the id of the failed stage itself.
    #[error("Stage '{stage}' failed after {attempts} attempt(s) in run {run_id}: {source}")]
    StageFailed {
        stage: PipelineStage,
        run_id: String,
        stage_id: Option<String>,
        extract_id: Option<String>,
        transform_id: Option<String>,
        attempts: u32,
        #[source]
        source: StageError,
    },

    /// Run context was advanced out of order
    #[error("Cannot enter state '{target}' from '{current}'")]
    InvalidState {
        current: &'static str,
        target: &'static str,
    },

    /// IO error with path context
    #[error("IO error with {path}: {message}")]
    IoWithPath {
        path: PathBuf,
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;

impl Retryable for SchemaError {
    fn is_retryable(&self) -> bool {
        SchemaError::is_retryable(self)
    }
}

impl ExtractError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            ExtractError::SourceUnavailable { .. } => true,
            ExtractError::MalformedSource { .. } => false,
            ExtractError::StoreWrite(err) => store_is_transient(err),
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            ExtractError::SourceUnavailable { path, .. } => {
                format!(
                    "{self}\n\nHint: Check that {} exists and is readable.",
                    path.display()
                )
            }
            ExtractError::MalformedSource { .. } => {
                format!(
                    "{self}\n\nHint: The source needs a header row and at least ten comma-separated columns."
                )
            }
            ExtractError::StoreWrite(err) => err.user_message(),
        }
    }
}

impl Retryable for ExtractError {
    fn is_retryable(&self) -> bool {
        ExtractError::is_retryable(self)
    }
}

impl From<SourceError> for ExtractError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Unavailable { path, reason } => {
                ExtractError::SourceUnavailable { path, reason }
            }
            SourceError::Malformed { path, line, reason } => {
                ExtractError::MalformedSource { path, line, reason }
            }
        }
    }
}

impl From<StoreError> for ExtractError {
    fn from(err: StoreError) -> Self {
        ExtractError::StoreWrite(err)
    }
}

impl TransformError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            TransformError::Store(err) => store_is_transient(err),
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            TransformError::Store(err) => err.user_message(),
        }
    }
}

impl Retryable for TransformError {
    fn is_retryable(&self) -> bool {
        TransformError::is_retryable(self)
    }
}

impl From<StoreError> for TransformError {
    fn from(err: StoreError) -> Self {
        TransformError::Store(err)
    }
}

impl LoadError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            LoadError::InvalidIdentifier { .. } => false,
            LoadError::OutputDir { .. } => true,
            LoadError::Write(ExportError::Arrow(_)) => false,
            LoadError::Write(_) => true,
            LoadError::Store(err) => store_is_transient(err),
        }
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            LoadError::InvalidIdentifier { .. } => {
                format!("{self}\n\nHint: Identifiers may only contain letters, digits, '-' and '_'.")
            }
            LoadError::OutputDir { path, .. } => {
                format!(
                    "{self}\n\nHint: Check permissions on {}.",
                    path.display()
                )
            }
            LoadError::Store(err) => err.user_message(),
            LoadError::Write(_) => self.to_string(),
        }
    }
}

impl Retryable for LoadError {
    fn is_retryable(&self) -> bool {
        LoadError::is_retryable(self)
    }
}

impl From<StoreError> for LoadError {
    fn from(err: StoreError) -> Self {
        LoadError::Store(err)
    }
}

impl From<ExportError> for LoadError {
    fn from(err: ExportError) -> Self {
        LoadError::Write(err)
    }
}

impl StageError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            StageError::Schema(err) => err.user_message(),
            StageError::Extract(err) => err.user_message(),
            StageError::Transform(err) => err.user_message(),
            StageError::Load(err) => err.user_message(),
        }
    }
}

impl PipelineError {
    /// Create an IO error with path context
    pub fn io_with_path(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Self::IoWithPath {
            path: path.into(),
            message: message.into(),
            source,
        }
    }

    /// Get the stage if this is a stage failure
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            PipelineError::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Get the run id if this is a stage failure
    pub fn run_id(&self) -> Option<&str> {
        match self {
            PipelineError::StageFailed { run_id, .. } => Some(run_id),
            _ => None,
        }
    }

    /// Get the identifier of the stage in flight, if any
    pub fn stage_id(&self) -> Option<&str> {
        match self {
            PipelineError::StageFailed { stage_id, .. } => stage_id.as_deref(),
            _ => None,
        }
    }

    /// Get the extract id known when the stage failed, if any
    pub fn extract_id(&self) -> Option<&str> {
        match self {
            PipelineError::StageFailed { extract_id, .. } => extract_id.as_deref(),
            _ => None,
        }
    }

    /// Get the transform id known when the stage failed, if any
    pub fn transform_id(&self) -> Option<&str> {
        match self {
            PipelineError::StageFailed { transform_id, .. } => transform_id.as_deref(),
            _ => None,
        }
    }

    /// Command line that replays the failed stage with the same identifiers
    pub fn replay_command(&self) -> Option<String> {
        let PipelineError::StageFailed {
            stage,
            run_id,
            stage_id,
            extract_id,
            transform_id,
            ..
        } = self
        else {
            return None;
        };

        let mut cmd = match stage {
            PipelineStage::Init => return Some("salespipe init".to_string()),
            PipelineStage::Extract => format!("salespipe extract <INPUT_FILE> --run-id {run_id}"),
            PipelineStage::Transform => format!(
                "salespipe transform --run-id {run_id} --extract-id {}",
                extract_id.as_deref().unwrap_or("<EXTRACT_ID>")
            ),
            PipelineStage::Load => format!(
                "salespipe load <OUTPUT_DIR> --run-id {run_id} --transform-id {}",
                transform_id.as_deref().unwrap_or("<TRANSFORM_ID>")
            ),
        };
        if let Some(id) = stage_id {
            cmd.push_str(&format!(" --{stage}-id {id}"));
        }
        Some(cmd)
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            PipelineError::Config(msg) => {
                format!(
                    "Configuration error: {msg}\n\nHint: Check your pipeline configuration file and flags."
                )
            }
            PipelineError::InvalidIdentifier { .. } => {
                format!("{self}\n\nHint: Identifiers may only contain letters, digits, '-' and '_'.")
            }
            PipelineError::StageFailed {
                stage,
                run_id,
                stage_id,
                extract_id,
                transform_id,
                attempts,
                source,
            } => {
                let mut msg = format!(
                    "Stage '{stage}' failed after {attempts} attempt(s).\n  run id:       {run_id}\n"
                );
                if let Some(id) = extract_id {
                    msg.push_str(&format!("  extract id:   {id}\n"));
                }
                if let Some(id) = transform_id {
                    msg.push_str(&format!("  transform id: {id}\n"));
                }
                if let (PipelineStage::Load, Some(id)) = (stage, stage_id) {
                    msg.push_str(&format!("  load id:      {id}\n"));
                }
                msg.push('\n');
                msg.push_str(&source.user_message());
                if let Some(cmd) = self.replay_command() {
                    msg.push_str(&format!("\n\nHint: Replay this stage with:\n  {cmd}"));
                }
                msg
            }
            _ => self.to_string(),
        }
    }
}
