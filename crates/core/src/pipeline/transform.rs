//! Transform stage: top-N revenue per product type for one extract

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use super::error::TransformError;
use crate::ids::resolve_id;
use crate::staging::StoreHandle;

/// Outcome of one transform
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformSummary {
    pub transform_id: String,
    pub source_extract_id: String,
    /// Report rows appended
    pub rows: usize,
}

/// Aggregate the raw records of one extract into report rows
///
/// Returns the transform id stamped on every report row.
pub fn transform(
    run_id: &str,
    extract_id: &str,
    store: &StoreHandle,
    transform_id: Option<&str>,
    top_n: usize,
) -> Result<String, TransformError> {
    transform_records(run_id, extract_id, store, transform_id, top_n)
        .map(|summary| summary.transform_id)
}

/// Aggregate one extract and report what was written
pub fn transform_records(
    run_id: &str,
    extract_id: &str,
    store: &StoreHandle,
    transform_id: Option<&str>,
    top_n: usize,
) -> Result<TransformSummary, TransformError> {
    let transform_id = resolve_id(transform_id);
    info!(
        stage = "transform",
        run_id,
        extract_id,
        transform_id = %transform_id,
        top_n,
        "Starting transform"
    );

    let computed_at = Utc::now();
    let mut db = store.open()?;
    let rows = db.append_top_n(run_id, &transform_id, extract_id, top_n, &computed_at)?;

    info!(
        stage = "transform",
        run_id,
        transform_id = %transform_id,
        rows,
        "Transform completed"
    );

    Ok(TransformSummary {
        transform_id,
        source_extract_id: extract_id.to_string(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{extract, init_schema};
    use crate::staging::SchemaDefinition;
    use tempfile::TempDir;

    const HEADER: &str = "Order ID,Order Date,Ship Date,Item Type,Country,Region,Sales Channel,Order Priority,Units Sold,Unit Price";

    fn extracted(rows: &[&str]) -> (TempDir, StoreHandle, String) {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("sales.csv");
        let mut content = format!("{HEADER}\n");
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        std::fs::write(&source, content).unwrap();

        let store = StoreHandle::new(temp.path().join("pipeline.duckdb"));
        init_schema(&store, &SchemaDefinition::BuiltIn).unwrap();
        let extract_id = extract(&source, "run-1", &store, None).unwrap();
        (temp, store, extract_id)
    }

    #[test]
    fn test_transform_ranks_by_revenue() {
        let (_temp, store, extract_id) = extracted(&[
            "O1,2023-01-01,2023-01-02,Cereal,Chad,Africa,Online,H,10,100",
            "O2,2023-01-01,2023-01-02,Fruits,Chad,Africa,Online,H,1,50",
            "O3,2023-01-01,2023-01-02,Cereal,Chad,Africa,Online,H,2,100",
            "O4,2023-01-01,2023-01-02,Snacks,Chad,Africa,Online,H,3,100",
        ]);

        let summary = transform_records("run-1", &extract_id, &store, None, 10).unwrap();
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.source_extract_id, extract_id);

        let rows = store.open().unwrap().report_rows(&summary.transform_id).unwrap();
        let ranked: Vec<(&str, f64)> = rows
            .iter()
            .map(|r| (r.product_type.as_str(), r.total_revenue))
            .collect();
        assert_eq!(
            ranked,
            vec![("Cereal", 1200.0), ("Snacks", 300.0), ("Fruits", 50.0)]
        );
        assert!(rows.iter().all(|r| r.source_extract_id == extract_id));
        assert!(rows.iter().all(|r| r.pipeline_id == "run-1"));
    }

    #[test]
    fn test_transform_limits_to_top_n() {
        let (_temp, store, extract_id) = extracted(&[
            "O1,2023-01-01,2023-01-02,A,Chad,Africa,Online,H,1,10",
            "O2,2023-01-01,2023-01-02,B,Chad,Africa,Online,H,1,20",
            "O3,2023-01-01,2023-01-02,C,Chad,Africa,Online,H,1,30",
        ]);

        let transform_id = transform("run-1", &extract_id, &store, Some("t-top2"), 2).unwrap();
        assert_eq!(transform_id, "t-top2");

        let rows = store.open().unwrap().report_rows("t-top2").unwrap();
        let names: Vec<&str> = rows.iter().map(|r| r.product_type.as_str()).collect();
        assert_eq!(names, vec!["C", "B"]);
    }

    #[test]
    fn test_transform_unknown_extract_yields_no_rows() {
        let (_temp, store, _extract_id) = extracted(&[
            "O1,2023-01-01,2023-01-02,Cereal,Chad,Africa,Online,H,10,100",
        ]);

        let summary = transform_records("run-1", "no-such-extract", &store, None, 10).unwrap();
        assert_eq!(summary.rows, 0);
        assert!(
            store
                .open()
                .unwrap()
                .report_rows(&summary.transform_id)
                .unwrap()
                .is_empty()
        );
    }
}
