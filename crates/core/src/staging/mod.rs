//! Sales store: schema, source reading and persisted rows
//!
//! Raw records and report rows live in an embedded DuckDB file. Both tables
//! are append-only and every row carries the identifiers of the run and
//! stage that wrote it.
//!
//! # Example
//!
//! ```rust,ignore
//! use sales_pipeline_core::staging::{SchemaDefinition, StoreHandle};
//!
//! let store = StoreHandle::new("pipeline.duckdb");
//! let db = store.open()?;
//! db.apply_schema(&SchemaDefinition::BuiltIn.load()?)?;
//! println!("{} raw records", db.raw_record_count(None)?);
//! ```

mod db;
mod error;
mod records;
mod schema;
mod source;

pub use db::{SalesDb, StoreHandle};
pub use error::{SchemaError, SourceError, StoreError};
pub use records::{RawRecord, ReportRow, TransformLineage};
pub use schema::{REPORT_TABLE, REQUIRED_TABLES, SALES_TABLE, SalesSchema, SchemaDefinition};
pub use source::{SOURCE_COLUMNS, SourceBatch, parse_date, read_sales_csv};
