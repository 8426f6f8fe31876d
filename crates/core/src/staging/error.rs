//! Error types for store and schema operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the sales store
#[derive(Error, Debug)]
pub enum StoreError {
    /// Could not open the database file
    #[error("Cannot open store at {path}: {reason}")]
    Unavailable { path: String, reason: String },

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Store not initialized
    #[error("Store not initialized. Run 'init' first.")]
    NotInitialized,

    /// Report rows for one transform point at more than one extract
    #[error("Transform {transform_id} has report rows from {sources} different extracts")]
    AmbiguousLineage { transform_id: String, sources: usize },

    /// Stored value could not be decoded
    #[error("Invalid stored value in {column}: {value}")]
    InvalidValue { column: String, value: String },
}

/// Errors raised while reading a delimited source file
#[derive(Error, Debug)]
pub enum SourceError {
    /// File missing or unreadable
    #[error("Source not readable: {path} - {reason}")]
    Unavailable { path: PathBuf, reason: String },

    /// File structure does not match the expected layout
    #[error("Malformed source {path} at line {line}: {reason}")]
    Malformed {
        path: PathBuf,
        line: u64,
        reason: String,
    },
}

/// Errors that can occur while creating the store schema
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Schema definition file could not be read
    #[error("Cannot read schema file {path}: {source}")]
    DefinitionUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Schema text was rejected by the store
    #[error("Malformed schema definition: {0}")]
    Malformed(String),

    /// Schema applied, but a required table is still missing
    #[error("Schema definition does not create required table '{0}'")]
    MissingTable(String),

    /// The store itself could not be reached
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl StoreError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            StoreError::NotInitialized => {
                "Sales store not initialized.\n\nHint: Run 'salespipe init' first.".to_string()
            }
            StoreError::Unavailable { path, reason } => {
                format!(
                    "Cannot open store at {path}: {reason}\n\n\
                    Hint: Check the database path and that no other process holds a write lock."
                )
            }
            StoreError::AmbiguousLineage { transform_id, .. } => {
                format!(
                    "{self}\n\n\
                    Hint: Transform id {transform_id} was reused; inspect the top10 table directly."
                )
            }
            _ => self.to_string(),
        }
    }
}

impl SchemaError {
    /// Whether another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, SchemaError::StoreUnavailable(_))
    }

    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            SchemaError::DefinitionUnreadable { path, source } => {
                format!(
                    "Cannot read schema file {}: {source}\n\n\
                    Hint: Check the --schema-file path or omit it to use the built-in schema.",
                    path.display()
                )
            }
            SchemaError::Malformed(msg) => {
                format!("Malformed schema definition: {msg}\n\nHint: Check the schema SQL syntax.")
            }
            SchemaError::MissingTable(table) => {
                format!(
                    "Schema definition does not create table '{table}'.\n\n\
                    Hint: The schema must define the 'sales' and 'top10' tables."
                )
            }
            SchemaError::StoreUnavailable(_) => self.to_string(),
        }
    }
}

impl From<duckdb::Error> for StoreError {
    fn from(err: duckdb::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<StoreError> for SchemaError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable { .. } => SchemaError::StoreUnavailable(err.to_string()),
            other => SchemaError::Malformed(other.to_string()),
        }
    }
}
