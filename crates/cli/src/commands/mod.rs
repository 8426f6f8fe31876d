//! CLI command handlers

pub mod lineage;
pub mod pipeline;
pub mod stage;

use std::path::PathBuf;

use sales_pipeline_core::pipeline::PipelineConfig;

use crate::error::CliError;

/// Config sources shared by every command
///
/// Values given on the command line (or through `SALES_PIPELINE_*`
/// environment variables) override the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Pipeline config file (TOML)
    pub config_file: Option<PathBuf>,
    /// Sales store database file
    pub database: Option<PathBuf>,
    /// SQL file with the store schema
    pub schema_file: Option<PathBuf>,
}

impl ConfigArgs {
    /// Build the effective pipeline config
    pub fn resolve(&self) -> Result<PipelineConfig, CliError> {
        let mut config = match &self.config_file {
            Some(path) => {
                if !path.is_file() {
                    return Err(CliError::FileNotFound(path.clone()));
                }
                PipelineConfig::from_file(path)?
            }
            None => PipelineConfig::default(),
        };

        if let Some(ref database) = self.database {
            config = config.with_database(database);
        }
        if let Some(ref schema_file) = self.schema_file {
            config = config.with_schema_file(schema_file);
        }
        Ok(config)
    }
}
