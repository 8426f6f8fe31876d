//! Error types for the salespipe CLI

use std::path::PathBuf;

use sales_pipeline_core::pipeline::{ExtractError, LoadError, PipelineError, TransformError};
use sales_pipeline_core::staging::{SchemaError, StoreError};
use thiserror::Error;

/// Errors reported to the user by CLI commands
///
/// Wrapped library errors display their hint-bearing user message.
#[derive(Error, Debug)]
pub enum CliError {
    /// Input file is missing
    #[error("File not found: {}\n\nHint: Check the input path.", .0.display())]
    FileNotFound(PathBuf),

    /// Argument could not be used
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Nothing recorded for the requested identifier
    #[error("{0}")]
    NotFound(String),

    #[error("{}", .0.user_message())]
    Pipeline(#[from] PipelineError),

    #[error("{}", .0.user_message())]
    Schema(#[from] SchemaError),

    #[error("{}", .0.user_message())]
    Store(#[from] StoreError),

    #[error("{}", .0.user_message())]
    Extract(#[from] ExtractError),

    #[error("{}", .0.user_message())]
    Transform(#[from] TransformError),

    #[error("{}", .0.user_message())]
    Load(#[from] LoadError),

    /// JSON output failed
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}
