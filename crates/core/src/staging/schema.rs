//! Database schema definitions for the sales store

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::error::SchemaError;

/// Table holding raw sales records
pub const SALES_TABLE: &str = "sales";

/// Table holding top-N report rows
pub const REPORT_TABLE: &str = "top10";

/// Tables every schema definition must create
pub const REQUIRED_TABLES: [&str; 2] = [SALES_TABLE, REPORT_TABLE];

/// Built-in schema for the sales store
pub struct SalesSchema;

impl SalesSchema {
    /// Get the DDL for creating all tables (DuckDB syntax)
    pub fn create_tables_duckdb() -> &'static str {
        r#"
-- Raw sales records, append-only, stamped with run and extract ids
CREATE TABLE IF NOT EXISTS sales (
    order_id VARCHAR,
    order_date DATE,
    ship_date DATE,
    product_type VARCHAR,
    country VARCHAR,
    region VARCHAR,
    sales_channel VARCHAR,
    order_priority VARCHAR,
    units_sold DOUBLE,
    unit_price DOUBLE,
    pipeline_id VARCHAR NOT NULL,
    extract_id VARCHAR NOT NULL,
    ts TIMESTAMP NOT NULL
);

-- Top-N revenue per product type, append-only, with lineage to the extract
CREATE TABLE IF NOT EXISTS top10 (
    product_type VARCHAR,
    total_revenue DOUBLE,
    pipeline_id VARCHAR NOT NULL,
    transform_id VARCHAR NOT NULL,
    source_extract_id VARCHAR NOT NULL,
    ts TIMESTAMP NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sales_extract ON sales(extract_id);
CREATE INDEX IF NOT EXISTS idx_top10_transform ON top10(transform_id);
"#
    }

    /// Check whether a table exists
    pub fn table_exists_query() -> &'static str {
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?"
    }
}

/// Where the schema DDL comes from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaDefinition {
    /// DDL compiled into the crate
    #[default]
    BuiltIn,
    /// DDL read from a SQL file
    File(PathBuf),
}

impl SchemaDefinition {
    /// Build a definition from an optional schema file path
    pub fn from_path(path: Option<PathBuf>) -> Self {
        match path {
            Some(path) => SchemaDefinition::File(path),
            None => SchemaDefinition::BuiltIn,
        }
    }

    /// Load the DDL text
    pub fn load(&self) -> Result<String, SchemaError> {
        match self {
            SchemaDefinition::BuiltIn => Ok(SalesSchema::create_tables_duckdb().to_string()),
            SchemaDefinition::File(path) => {
                let sql = std::fs::read_to_string(path).map_err(|source| {
                    SchemaError::DefinitionUnreadable {
                        path: path.clone(),
                        source,
                    }
                })?;
                if sql.trim().is_empty() {
                    return Err(SchemaError::Malformed(format!(
                        "schema file {} is empty",
                        path.display()
                    )));
                }
                Ok(sql)
            }
        }
    }

    /// Short description for logs
    pub fn describe(&self) -> String {
        match self {
            SchemaDefinition::BuiltIn => "built-in".to_string(),
            SchemaDefinition::File(path) => path.display().to_string(),
        }
    }
}
