//! Row types persisted in the sales store

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::StoreError;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// A normalized sales row read from the source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    pub order_id: String,
    /// Absent when the source value could not be parsed
    pub order_date: Option<NaiveDate>,
    /// Absent when the source value could not be parsed
    pub ship_date: Option<NaiveDate>,
    pub product_type: String,
    pub country: String,
    pub region: String,
    pub sales_channel: String,
    pub order_priority: String,
    pub units_sold: Option<f64>,
    pub unit_price: Option<f64>,
}

impl RawRecord {
    /// Revenue contributed by this row, if both factors are known
    pub fn revenue(&self) -> Option<f64> {
        Some(self.units_sold? * self.unit_price?)
    }
}

/// One aggregated row of the top-N report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRow {
    pub product_type: String,
    pub total_revenue: f64,
    pub pipeline_id: String,
    pub transform_id: String,
    pub source_extract_id: String,
    pub computed_at: DateTime<Utc>,
}

/// Lineage of a transform back to its run and extract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformLineage {
    pub transform_id: String,
    pub pipeline_id: String,
    pub source_extract_id: String,
    /// Raw rows stamped with the source extract id
    pub raw_records: i64,
    /// Report rows stamped with the transform id
    pub report_rows: i64,
}

/// Format a timestamp the way the store parses it
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.naive_utc().format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp read back from the store as text
pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| StoreError::InvalidValue {
            column: "ts".to_string(),
            value: value.to_string(),
        })
}

/// Format a date for a bound DATE parameter
pub(crate) fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
