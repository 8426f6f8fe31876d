//! Integration tests for the full sales pipeline
//!
//! Tests the complete workflow: source file → sales table → top10 table → Parquet

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Duration as ChronoDuration, NaiveDate};
use tempfile::TempDir;

use sales_pipeline_core::export::read_report_parquet;
use sales_pipeline_core::pipeline::{
    ExtractError, PipelineConfig, PipelineError, PipelineExecutor, PipelineStage, RetryPolicy,
    StageError, StageIds, extract, init_schema, load, run_pipeline, transform,
};
use sales_pipeline_core::staging::{SchemaDefinition, StoreHandle};

const HEADER: &str = "Order ID,Order Date,Ship Date,Item Type,Country,Region,Sales Channel,Order Priority,Units Sold,Unit Price,pipeline_id,extract_id,ts";

/// Helper to write the 20-row, 5-category sales file
fn create_sales_file(dir: &Path) -> PathBuf {
    let path = dir.join("sales.csv");
    let mut file = File::create(&path).expect("Failed to create sales file");
    writeln!(file, "{HEADER}").expect("Failed to write header");

    let base = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    for i in 0..20i64 {
        writeln!(
            file,
            "O{},{},{},Type_{},{},Region_{},{},{},{},{},test-pipeline,test-extract,{} {:02}:00:00",
            i + 1,
            base + ChronoDuration::days(i),
            base + ChronoDuration::days(i + 2),
            i % 5,
            if i % 2 == 0 { "USA" } else { "Canada" },
            i % 3,
            if i % 2 == 0 { "Online" } else { "Offline" },
            if i % 4 == 0 { "H" } else { "M" },
            10 + i,
            100 + (i % 5) * 10,
            base,
            i,
        )
        .expect("Failed to write row");
    }
    path
}

/// Per-category revenue of the 20-row file, highest first
fn expected_revenue() -> Vec<(String, f64)> {
    let mut sums = vec![0.0f64; 5];
    for i in 0..20i64 {
        sums[(i % 5) as usize] += ((10 + i) * (100 + (i % 5) * 10)) as f64;
    }
    let mut expected: Vec<(String, f64)> = sums
        .into_iter()
        .enumerate()
        .map(|(k, revenue)| (format!("Type_{k}"), revenue))
        .collect();
    expected.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    expected
}

fn quick_config(temp: &TempDir, source: &Path) -> PipelineConfig {
    PipelineConfig::new()
        .with_source(source)
        .with_database(temp.path().join("test.duckdb"))
        .with_output_dir(temp.path().join("out"))
        .with_max_retries(1)
        .with_retry_delay_secs(0)
}

#[test]
fn test_end_to_end_top10() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let source = create_sales_file(temp.path());

    let artifact = run_pipeline(quick_config(&temp, &source), StageIds::new())
        .expect("Pipeline failed");

    let out_files: Vec<_> = std::fs::read_dir(temp.path().join("out"))
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "parquet"))
        .collect();
    assert_eq!(out_files, vec![artifact.clone()], "Expected one parquet file");

    let rows = read_report_parquet(&artifact).expect("Failed to read artifact");
    let actual: Vec<(String, f64)> = rows
        .iter()
        .map(|r| (r.product_type.clone(), r.total_revenue))
        .collect();

    assert_eq!(actual, expected_revenue());
    assert_eq!(
        actual,
        vec![
            ("Type_4".to_string(), 12040.0),
            ("Type_3".to_string(), 10660.0),
            ("Type_2".to_string(), 9360.0),
            ("Type_1".to_string(), 8140.0),
            ("Type_0".to_string(), 7000.0),
        ]
    );
}

#[test]
fn test_report_lineage_closure() {
    let temp = TempDir::new().unwrap();
    let source = create_sales_file(temp.path());
    let executor = PipelineExecutor::new(quick_config(&temp, &source)).unwrap();

    let report = executor.run(StageIds::new()).unwrap();
    let rows = read_report_parquet(&report.artifact).unwrap();

    assert!(rows.iter().all(|r| r.pipeline_id == report.run_id));
    assert!(rows.iter().all(|r| r.transform_id == report.transform_id));
    assert!(rows.iter().all(|r| r.source_extract_id == report.extract_id));
    assert_eq!(
        report.artifact.file_name().unwrap().to_string_lossy(),
        format!("top10_{}_{}.parquet", report.run_id, report.transform_id)
    );

    let db = StoreHandle::new(temp.path().join("test.duckdb")).open().unwrap();
    let lineage = db
        .transform_lineage(&report.transform_id)
        .unwrap()
        .expect("lineage missing");
    assert_eq!(lineage.pipeline_id, report.run_id);
    assert_eq!(lineage.source_extract_id, report.extract_id);
    assert_eq!(lineage.raw_records, 20);
    assert_eq!(lineage.report_rows, 5);
}

#[test]
fn test_second_run_only_reads_its_own_extract() {
    let temp = TempDir::new().unwrap();
    let source = create_sales_file(temp.path());
    let executor = PipelineExecutor::new(quick_config(&temp, &source)).unwrap();

    let first = executor.run(StageIds::new()).unwrap();
    let second = executor.run(StageIds::new()).unwrap();

    assert_ne!(first.run_id, second.run_id);
    assert_ne!(first.extract_id, second.extract_id);
    assert_ne!(first.artifact, second.artifact);

    // The store now holds both extracts, but each report only sums its own
    let db = StoreHandle::new(temp.path().join("test.duckdb")).open().unwrap();
    assert_eq!(db.raw_record_count(None).unwrap(), 40);

    let rows = read_report_parquet(&second.artifact).unwrap();
    let revenues: Vec<f64> = rows.iter().map(|r| r.total_revenue).collect();
    let expected: Vec<f64> = expected_revenue().into_iter().map(|(_, r)| r).collect();
    assert_eq!(revenues, expected);
}

#[test]
fn test_stage_by_stage_matches_orchestrator() {
    let temp = TempDir::new().unwrap();
    let source = create_sales_file(temp.path());
    let store = StoreHandle::new(temp.path().join("manual.duckdb"));
    let out = temp.path().join("manual-out");

    init_schema(&store, &SchemaDefinition::BuiltIn).unwrap();
    let extract_id = extract(&source, "run-manual", &store, None).unwrap();
    let transform_id = transform("run-manual", &extract_id, &store, None, 10).unwrap();
    let artifact = load(&store, &out, "run-manual", &transform_id, None).unwrap();

    let categories: BTreeSet<String> = read_report_parquet(&artifact)
        .unwrap()
        .into_iter()
        .map(|r| r.product_type)
        .collect();
    let expected: BTreeSet<String> = (0..5).map(|k| format!("Type_{k}")).collect();
    assert_eq!(categories, expected);
}

#[test]
fn test_load_twice_overwrites() {
    let temp = TempDir::new().unwrap();
    let source = create_sales_file(temp.path());
    let store = StoreHandle::new(temp.path().join("test.duckdb"));
    let out = temp.path().join("out");

    init_schema(&store, &SchemaDefinition::BuiltIn).unwrap();
    let extract_id = extract(&source, "run-1", &store, None).unwrap();
    let transform_id = transform("run-1", &extract_id, &store, None, 10).unwrap();

    let first = load(&store, &out, "run-1", &transform_id, None).unwrap();
    let first_rows = read_report_parquet(&first).unwrap();
    let second = load(&store, &out, "run-1", &transform_id, None).unwrap();
    let second_rows = read_report_parquet(&second).unwrap();

    assert_eq!(first, second);
    assert_eq!(std::fs::read_dir(&out).unwrap().count(), 1);
    assert_eq!(second_rows.len(), 5);
    assert_eq!(first_rows, second_rows);
}

#[test]
fn test_empty_source_produces_empty_report() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("empty.csv");
    std::fs::write(&source, format!("{HEADER}\n")).unwrap();

    let executor = PipelineExecutor::new(quick_config(&temp, &source)).unwrap();
    let report = executor.run(StageIds::new()).unwrap();

    assert_eq!(report.rows_ingested, 0);
    assert_eq!(report.report_rows, 0);
    assert!(read_report_parquet(&report.artifact).unwrap().is_empty());
}

#[test]
fn test_malformed_date_row_is_admitted() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("dates.csv");
    std::fs::write(
        &source,
        format!(
            "{HEADER}\n\
             O1,garbage,2023-01-03,Cereal,Chad,Africa,Online,H,10,100,x,y,z\n\
             O2,2023-01-02,2023-01-04,Cereal,Chad,Africa,Online,H,1,100,x,y,z\n"
        ),
    )
    .unwrap();

    let executor = PipelineExecutor::new(quick_config(&temp, &source)).unwrap();
    let report = executor.run(StageIds::new()).unwrap();
    assert_eq!(report.rows_ingested, 2);

    let db = StoreHandle::new(temp.path().join("test.duckdb")).open().unwrap();
    let records = db.raw_records(&report.extract_id).unwrap();
    assert_eq!(records[0].order_date, None);
    assert_eq!(records[1].order_date, NaiveDate::from_ymd_opt(2023, 1, 2));

    let rows = read_report_parquet(&report.artifact).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].total_revenue, 1100.0);
}

#[test]
fn test_schema_init_is_idempotent_across_runs() {
    let temp = TempDir::new().unwrap();
    let store = StoreHandle::new(temp.path().join("test.duckdb"));

    for _ in 0..3 {
        init_schema(&store, &SchemaDefinition::BuiltIn).unwrap();
    }
    let db = store.open().unwrap();
    assert_eq!(db.table_names().unwrap(), vec!["sales", "top10"]);
    assert_eq!(db.raw_record_count(None).unwrap(), 0);
}

#[test]
fn test_missing_source_fails_after_retries() {
    let temp = TempDir::new().unwrap();
    let source = create_sales_file(temp.path());
    let executor = PipelineExecutor::new(quick_config(&temp, &source))
        .unwrap()
        .with_retry_policy(RetryPolicy::new(2, Duration::ZERO));

    // Source vanishes after config validation
    std::fs::remove_file(&source).unwrap();

    let err = executor
        .run(
            StageIds::new()
                .with_run_id("run-missing")
                .with_extract_id("extract-missing"),
        )
        .unwrap_err();

    match err {
        PipelineError::StageFailed {
            stage,
            ref run_id,
            ref stage_id,
            ref transform_id,
            attempts,
            ref source,
            ..
        } => {
            assert_eq!(stage, PipelineStage::Extract);
            assert_eq!(run_id, "run-missing");
            assert_eq!(stage_id.as_deref(), Some("extract-missing"));
            assert_eq!(transform_id, &None);
            assert_eq!(attempts, 3);
            assert!(matches!(
                source,
                StageError::Extract(ExtractError::SourceUnavailable { .. })
            ));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_malformed_source_is_not_retried() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("narrow.csv");
    std::fs::write(&source, "Order ID,Item Type\nO1,Cereal\n").unwrap();

    let executor = PipelineExecutor::new(quick_config(&temp, &source))
        .unwrap()
        .with_retry_policy(RetryPolicy::new(5, Duration::ZERO));

    let err = executor.run(StageIds::new()).unwrap_err();
    assert_eq!(err.stage(), Some(PipelineStage::Extract));
    assert!(matches!(err, PipelineError::StageFailed { attempts: 1, .. }));
}

#[test]
fn test_unsafe_run_id_rejected_before_any_write() {
    let temp = TempDir::new().unwrap();
    let source = create_sales_file(temp.path());
    let executor = PipelineExecutor::new(quick_config(&temp, &source)).unwrap();

    let err = executor
        .run(StageIds::new().with_run_id("../../outside"))
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidIdentifier { .. }));
    assert!(!temp.path().join("test.duckdb").exists());
}

#[test]
fn test_reused_transform_id_is_replayed_not_deduplicated() {
    let temp = TempDir::new().unwrap();
    let source = create_sales_file(temp.path());
    let store = StoreHandle::new(temp.path().join("test.duckdb"));

    init_schema(&store, &SchemaDefinition::BuiltIn).unwrap();
    let extract_id = extract(&source, "run-1", &store, None).unwrap();
    transform("run-1", &extract_id, &store, Some("t-replay"), 10).unwrap();
    transform("run-1", &extract_id, &store, Some("t-replay"), 10).unwrap();

    let db = store.open().unwrap();
    assert_eq!(db.report_row_count(Some("t-replay")).unwrap(), 10);
    // Same extract both times, so the lineage is still unambiguous
    let lineage = db.transform_lineage("t-replay").unwrap().unwrap();
    assert_eq!(lineage.source_extract_id, extract_id);
}

#[test]
fn test_failed_load_reports_upstream_ids() {
    let temp = TempDir::new().unwrap();
    let source = create_sales_file(temp.path());
    // A regular file where the output directory should be created
    let blocker = temp.path().join("blocker");
    std::fs::write(&blocker, "not a directory").unwrap();

    let config = quick_config(&temp, &source).with_output_dir(blocker.join("out"));
    let executor = PipelineExecutor::new(config)
        .unwrap()
        .with_retry_policy(RetryPolicy::none());

    let err = executor
        .run(
            StageIds::new()
                .with_run_id("run-load")
                .with_transform_id("t-upstream")
                .with_load_id("load-1"),
        )
        .unwrap_err();

    assert_eq!(err.stage(), Some(PipelineStage::Load));
    assert_eq!(err.transform_id(), Some("t-upstream"));
    let extract_id = err.extract_id().expect("extract id missing").to_string();

    let msg = err.user_message();
    assert!(msg.contains("t-upstream"), "{msg}");
    assert!(msg.contains(&extract_id), "{msg}");
    assert!(
        msg.contains("salespipe load <OUTPUT_DIR> --run-id run-load --transform-id t-upstream --load-id load-1"),
        "{msg}"
    );

    // The named transform is in the store, so the load can be replayed
    let store = StoreHandle::new(temp.path().join("test.duckdb"));
    let artifact = load(&store, &temp.path().join("retry-out"), "run-load", "t-upstream", None)
        .unwrap();
    assert_eq!(read_report_parquet(&artifact).unwrap().len(), 5);
}

#[test]
fn test_fractional_units_count_toward_revenue() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("fractional.csv");
    std::fs::write(
        &source,
        format!(
            "{HEADER}\n\
             O1,2023-01-01,2023-01-03,Cereal,Chad,Africa,Online,H,2.5,100,x,y,z\n\
             O2,2023-01-02,2023-01-04,Cereal,Chad,Africa,Online,H,1,100,x,y,z\n"
        ),
    )
    .unwrap();

    let executor = PipelineExecutor::new(quick_config(&temp, &source)).unwrap();
    let report = executor.run(StageIds::new()).unwrap();

    let db = StoreHandle::new(temp.path().join("test.duckdb")).open().unwrap();
    let records = db.raw_records(&report.extract_id).unwrap();
    assert_eq!(records[0].units_sold, Some(2.5));

    let rows = read_report_parquet(&report.artifact).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].total_revenue, 350.0);
}

#[test]
fn test_default_report_keeps_top_ten_of_twelve_categories() {
    let temp = TempDir::new().unwrap();
    let source = temp.path().join("wide.csv");
    let mut file = File::create(&source).unwrap();
    writeln!(file, "{HEADER}").unwrap();
    for k in 0..12 {
        writeln!(
            file,
            "O{k},2023-01-01,2023-01-02,Cat{k:02},Chad,Africa,Online,H,1,{},x,y,z",
            100 * (k + 1)
        )
        .unwrap();
    }
    drop(file);

    let config = quick_config(&temp, &source);
    assert_eq!(config.top_n, 10);
    let report = PipelineExecutor::new(config)
        .unwrap()
        .run(StageIds::new())
        .unwrap();

    let categories: Vec<String> = read_report_parquet(&report.artifact)
        .unwrap()
        .into_iter()
        .map(|r| r.product_type)
        .collect();
    let expected: Vec<String> = (2..12).rev().map(|k| format!("Cat{k:02}")).collect();
    assert_eq!(report.report_rows, 10);
    assert_eq!(categories, expected);
}
