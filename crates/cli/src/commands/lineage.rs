//! CLI command for tracing a transform back to its run and extract

use sales_pipeline_core::staging::{ReportRow, TransformLineage};
use serde::Serialize;

use super::ConfigArgs;
use crate::error::CliError;

/// Arguments for the `lineage` command
#[derive(Debug, Clone, Default)]
pub struct LineageArgs {
    pub config: ConfigArgs,
    pub transform_id: String,
    /// Print as JSON on stdout
    pub json: bool,
}

/// Lineage of a transform together with its report rows
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineageView {
    pub lineage: TransformLineage,
    pub rows: Vec<ReportRow>,
}

/// Look up a transform's lineage and report rows
pub fn lineage_view(args: &LineageArgs) -> Result<LineageView, CliError> {
    let config = args.config.resolve()?;
    let db = config.store().open()?;

    let lineage = db.transform_lineage(&args.transform_id)?.ok_or_else(|| {
        CliError::NotFound(format!(
            "No report rows for transform {}\n\nHint: Check the id printed by 'salespipe transform' or 'salespipe run'.",
            args.transform_id
        ))
    })?;
    let rows = db.report_rows(&args.transform_id)?;

    Ok(LineageView { lineage, rows })
}

/// Handle the `lineage` command
pub fn handle_lineage(args: &LineageArgs) -> Result<(), CliError> {
    let view = lineage_view(args)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    let lineage = &view.lineage;
    println!("Transform {}", lineage.transform_id);
    println!("  run id:            {}", lineage.pipeline_id);
    println!("  source extract id: {}", lineage.source_extract_id);
    println!("  raw records:       {}", lineage.raw_records);
    println!("  report rows:       {}", lineage.report_rows);
    println!();
    for (rank, row) in view.rows.iter().enumerate() {
        println!(
            "{:>3}. {:<24} {:>16.2}",
            rank + 1,
            row.product_type,
            row.total_revenue
        );
    }
    Ok(())
}
