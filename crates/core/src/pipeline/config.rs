//! Pipeline configuration types

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{PipelineError, PipelineResult};
use super::retry::RetryPolicy;
use crate::staging::{SchemaDefinition, StoreHandle};

/// Default database file
pub const DEFAULT_DATABASE: &str = "pipeline.duckdb";

/// Default number of product types kept in the report
pub const DEFAULT_TOP_N: usize = 10;

/// Main pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Delimited sales file to extract
    pub source: Option<PathBuf>,
    /// Directory receiving the Parquet artifact
    pub output_dir: Option<PathBuf>,
    /// Sales store database path
    pub database: PathBuf,
    /// SQL file with the store schema (built-in schema when absent)
    pub schema_file: Option<PathBuf>,
    /// Number of product types kept in the report
    pub top_n: usize,
    /// Retry settings applied to every stage
    pub retry: RetryConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: None,
            output_dir: None,
            database: PathBuf::from(DEFAULT_DATABASE),
            schema_file: None,
            top_n: DEFAULT_TOP_N,
            retry: RetryConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Create a new pipeline config
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML text
    pub fn from_toml_str(text: &str) -> PipelineResult<Self> {
        toml::from_str(text).map_err(|e| PipelineError::Config(e.to_string()))
    }

    /// Load a config from a TOML file
    pub fn from_file(path: &Path) -> PipelineResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::io_with_path(path, "reading config", e))?;
        Self::from_toml_str(&text).map_err(|e| match e {
            PipelineError::Config(msg) => {
                PipelineError::Config(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Set the database path
    pub fn with_database(mut self, path: impl Into<PathBuf>) -> Self {
        self.database = path.into();
        self
    }

    /// Set the source path
    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    /// Set the output directory
    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set the schema file
    pub fn with_schema_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.schema_file = Some(path.into());
        self
    }

    /// Set the report size
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// Set retry settings
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Set the number of retries after a failed attempt
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.retry.max_retries = max_retries;
        self
    }

    /// Set the delay between attempts, in seconds
    pub fn with_retry_delay_secs(mut self, delay_secs: u64) -> Self {
        self.retry.delay_secs = delay_secs;
        self
    }

    /// Handle to the configured store
    pub fn store(&self) -> StoreHandle {
        StoreHandle::new(&self.database)
    }

    /// Schema definition to apply at init
    pub fn schema_definition(&self) -> SchemaDefinition {
        SchemaDefinition::from_path(self.schema_file.clone())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        match &self.source {
            None => return Err("Source file is required".to_string()),
            Some(source) if !source.is_file() => {
                return Err(format!("Source file not found: {}", source.display()));
            }
            Some(_) => {}
        }

        if self.output_dir.is_none() {
            return Err("Output directory is required".to_string());
        }

        if self.database.as_os_str().is_empty() {
            return Err("Database path is empty".to_string());
        }

        if self.top_n == 0 {
            return Err("top_n must be at least 1".to_string());
        }

        Ok(())
    }
}

/// Retry settings for pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first failed attempt
    pub max_retries: u32,
    /// Fixed delay between attempts, in seconds
    pub delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay_secs: 10,
        }
    }
}

impl RetryConfig {
    /// Build the retry policy described by these settings
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_secs(self.delay_secs))
    }
}

/// Pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    /// Stage 1: Create store tables
    Init,
    /// Stage 2: Append source rows to the sales table
    Extract,
    /// Stage 3: Aggregate the top N product types of one extract
    Transform,
    /// Stage 4: Export one transform to Parquet
    Load,
}

impl PipelineStage {
    /// Get stage name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Extract => "extract",
            Self::Transform => "transform",
            Self::Load => "load",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
