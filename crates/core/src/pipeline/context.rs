//! Per-run state threaded through the orchestrator

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::error::{PipelineError, PipelineResult};

/// Progress of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// Run id assigned, nothing extracted yet
    Init,
    /// Raw records appended
    Extracted,
    /// Report rows appended
    Transformed,
    /// Artifact written
    Loaded,
}

impl RunState {
    /// Get state name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Extracted => "extracted",
            Self::Transformed => "transformed",
            Self::Loaded => "loaded",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Identifiers and state of one pipeline run
///
/// Each transition records the identifier returned by the stage that
/// enabled it, so later stages read their input ids from here.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunContext {
    run_id: String,
    state: RunState,
    extract_id: Option<String>,
    transform_id: Option<String>,
    load_id: Option<String>,
    artifact: Option<PathBuf>,
}

impl RunContext {
    /// Start a run in the `Init` state
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            state: RunState::Init,
            extract_id: None,
            transform_id: None,
            load_id: None,
            artifact: None,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn extract_id(&self) -> Option<&str> {
        self.extract_id.as_deref()
    }

    pub fn transform_id(&self) -> Option<&str> {
        self.transform_id.as_deref()
    }

    pub fn load_id(&self) -> Option<&str> {
        self.load_id.as_deref()
    }

    pub fn artifact(&self) -> Option<&Path> {
        self.artifact.as_deref()
    }

    fn advance(&mut self, from: RunState, to: RunState) -> PipelineResult<()> {
        if self.state != from {
            return Err(PipelineError::InvalidState {
                current: self.state.name(),
                target: to.name(),
            });
        }
        self.state = to;
        Ok(())
    }

    /// Record a completed extract
    pub fn mark_extracted(&mut self, extract_id: impl Into<String>) -> PipelineResult<()> {
        self.advance(RunState::Init, RunState::Extracted)?;
        self.extract_id = Some(extract_id.into());
        Ok(())
    }

    /// Record a completed transform
    pub fn mark_transformed(&mut self, transform_id: impl Into<String>) -> PipelineResult<()> {
        self.advance(RunState::Extracted, RunState::Transformed)?;
        self.transform_id = Some(transform_id.into());
        Ok(())
    }

    /// Record a completed load
    pub fn mark_loaded(
        &mut self,
        load_id: impl Into<String>,
        artifact: impl Into<PathBuf>,
    ) -> PipelineResult<()> {
        self.advance(RunState::Transformed, RunState::Loaded)?;
        self.load_id = Some(load_id.into());
        self.artifact = Some(artifact.into());
        Ok(())
    }
}
