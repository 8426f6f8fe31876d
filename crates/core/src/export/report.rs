//! Parquet writer for top-N report rows

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, StringArray, TimestampMicrosecondArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::DateTime;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use super::ExportError;
use crate::staging::ReportRow;

/// Column names of the exported report, in file order
pub const REPORT_COLUMNS: [&str; 6] = [
    "product_type",
    "total_revenue",
    "pipeline_id",
    "transform_id",
    "source_extract_id",
    "ts",
];

/// Arrow schema of the exported report
pub fn report_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(REPORT_COLUMNS[0], DataType::Utf8, false),
        Field::new(REPORT_COLUMNS[1], DataType::Float64, false),
        Field::new(REPORT_COLUMNS[2], DataType::Utf8, false),
        Field::new(REPORT_COLUMNS[3], DataType::Utf8, false),
        Field::new(REPORT_COLUMNS[4], DataType::Utf8, false),
        Field::new(
            REPORT_COLUMNS[5],
            DataType::Timestamp(TimeUnit::Microsecond, Some("UTC".into())),
            false,
        ),
    ]))
}

/// Convert report rows into a single record batch
pub fn report_batch(rows: &[ReportRow]) -> Result<RecordBatch, ExportError> {
    let product_types: Vec<&str> = rows.iter().map(|r| r.product_type.as_str()).collect();
    let revenues: Vec<f64> = rows.iter().map(|r| r.total_revenue).collect();
    let pipeline_ids: Vec<&str> = rows.iter().map(|r| r.pipeline_id.as_str()).collect();
    let transform_ids: Vec<&str> = rows.iter().map(|r| r.transform_id.as_str()).collect();
    let extract_ids: Vec<&str> = rows.iter().map(|r| r.source_extract_id.as_str()).collect();
    let timestamps: Vec<i64> = rows.iter().map(|r| r.computed_at.timestamp_micros()).collect();

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(product_types)),
        Arc::new(Float64Array::from(revenues)),
        Arc::new(StringArray::from(pipeline_ids)),
        Arc::new(StringArray::from(transform_ids)),
        Arc::new(StringArray::from(extract_ids)),
        Arc::new(TimestampMicrosecondArray::from(timestamps).with_timezone("UTC")),
    ];

    RecordBatch::try_new(report_schema(), columns).map_err(|e| ExportError::Arrow(e.to_string()))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write report rows to a Parquet file, replacing any existing file
///
/// The data is written to a sibling temporary file first and renamed into
/// place, so readers never observe a partially written artifact.
pub fn write_report_parquet(rows: &[ReportRow], path: &Path) -> Result<u64, ExportError> {
    let batch = report_batch(rows)?;
    let tmp = temp_path(path);

    let file = File::create(&tmp).map_err(|source| ExportError::Io {
        path: tmp.clone(),
        source,
    })?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let written = (|| {
        let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
        writer.write(&batch)?;
        writer.close()?;
        Ok::<(), parquet::errors::ParquetError>(())
    })();

    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp);
        return Err(ExportError::Parquet(e.to_string()));
    }

    std::fs::rename(&tmp, path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let size = std::fs::metadata(path)
        .map(|m| m.len())
        .map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(size)
}

fn column<'a, T: Array + 'static>(
    batch: &'a RecordBatch,
    index: usize,
) -> Result<&'a T, ExportError> {
    batch
        .column(index)
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| {
            ExportError::Arrow(format!(
                "column '{}' has unexpected type {}",
                REPORT_COLUMNS[index],
                batch.column(index).data_type()
            ))
        })
}

/// Read report rows back from an exported Parquet file
pub fn read_report_parquet(path: &Path) -> Result<Vec<ReportRow>, ExportError> {
    let file = File::open(path).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .and_then(|builder| builder.build())
        .map_err(|e| ExportError::Parquet(e.to_string()))?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|e| ExportError::Arrow(e.to_string()))?;
        if batch.num_columns() != REPORT_COLUMNS.len() {
            return Err(ExportError::Arrow(format!(
                "expected {} columns, found {}",
                REPORT_COLUMNS.len(),
                batch.num_columns()
            )));
        }

        let product_types = column::<StringArray>(&batch, 0)?;
        let revenues = column::<Float64Array>(&batch, 1)?;
        let pipeline_ids = column::<StringArray>(&batch, 2)?;
        let transform_ids = column::<StringArray>(&batch, 3)?;
        let extract_ids = column::<StringArray>(&batch, 4)?;
        let timestamps = column::<TimestampMicrosecondArray>(&batch, 5)?;

        for i in 0..batch.num_rows() {
            let micros = timestamps.value(i);
            let computed_at = DateTime::from_timestamp_micros(micros).ok_or_else(|| {
                ExportError::Arrow(format!("timestamp {micros} is out of range"))
            })?;
            rows.push(ReportRow {
                product_type: product_types.value(i).to_string(),
                total_revenue: revenues.value(i),
                pipeline_id: pipeline_ids.value(i).to_string(),
                transform_id: transform_ids.value(i).to_string(),
                source_extract_id: extract_ids.value(i).to_string(),
                computed_at,
            });
        }
    }
    Ok(rows)
}
