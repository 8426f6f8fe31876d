//! Sales Pipeline Core - batch pipeline from sales files to top-N Parquet reports
//!
//! Provides:
//! - Identifier generation and validation for runs and stages
//! - The DuckDB-backed sales store (schema, raw records, report rows)
//! - Parquet export of report rows
//! - Extract, transform and load stages with retry and lineage

pub mod export;
pub mod ids;
pub mod pipeline;
pub mod staging;

pub use export::{ExportError, ExportResult, read_report_parquet, write_report_parquet};
pub use ids::{new_id, validate_identifier};
pub use pipeline::{
    ExtractError, LoadError, PipelineConfig, PipelineError, PipelineExecutor, PipelineReport,
    PipelineResult, PipelineStage, RetryConfig, RetryPolicy, RunContext, RunState, StageIds,
    TransformError, extract, init_schema, load, run_pipeline, transform,
};
pub use staging::{
    RawRecord, ReportRow, SalesDb, SchemaDefinition, SchemaError, StoreError, StoreHandle,
    TransformLineage,
};
