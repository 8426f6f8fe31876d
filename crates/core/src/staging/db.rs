//! Sales store backed by an embedded DuckDB database

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{SchemaError, StoreError};
use super::records::{
    RawRecord, ReportRow, TransformLineage, format_date, format_timestamp, parse_timestamp,
};
use super::schema::{REQUIRED_TABLES, SalesSchema};

/// Location of the sales store
///
/// Cheap to clone and pass to each stage. A connection is only opened by
/// [`StoreHandle::open`], and closed when the returned [`SalesDb`] drops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreHandle {
    path: PathBuf,
}

impl StoreHandle {
    /// Create a handle for a database file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a connection scoped to the caller
    pub fn open(&self) -> Result<SalesDb, StoreError> {
        SalesDb::open(&self.path)
    }
}

/// Open connection to the sales store
pub struct SalesDb {
    conn: duckdb::Connection,
    path: Option<String>,
}

impl SalesDb {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let unavailable = |reason: String| StoreError::Unavailable {
            path: path.display().to_string(),
            reason,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| unavailable(e.to_string()))?;
            }
        }

        let conn = duckdb::Connection::open(path).map_err(|e| unavailable(e.to_string()))?;
        debug!(path = %path.display(), "Opened sales store");
        Ok(Self {
            conn,
            path: Some(path.display().to_string()),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn memory() -> Result<Self, StoreError> {
        let conn = duckdb::Connection::open_in_memory()?;
        Ok(Self { conn, path: None })
    }

    /// Get the database path (if not in-memory)
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Apply schema DDL and check that the required tables exist
    pub fn apply_schema(&self, ddl: &str) -> Result<(), SchemaError> {
        self.conn
            .execute_batch(ddl)
            .map_err(|e| SchemaError::Malformed(e.to_string()))?;

        for table in REQUIRED_TABLES {
            if !self.table_exists(table)? {
                return Err(SchemaError::MissingTable(table.to_string()));
            }
        }
        Ok(())
    }

    /// Check if a table exists
    pub fn table_exists(&self, table: &str) -> Result<bool, StoreError> {
        let count: i64 =
            self.conn
                .query_row(SalesSchema::table_exists_query(), [table], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// Check if all required tables exist
    pub fn is_initialized(&self) -> Result<bool, StoreError> {
        for table in REQUIRED_TABLES {
            if !self.table_exists(table)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// List user tables, sorted by name
    pub fn table_names(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT table_name FROM information_schema.tables
             WHERE table_schema = 'main' ORDER BY table_name",
        )?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut names = Vec::new();
        for row in rows {
            names.push(row?);
        }
        Ok(names)
    }

    fn ensure_initialized(&self) -> Result<(), StoreError> {
        if self.is_initialized()? {
            Ok(())
        } else {
            Err(StoreError::NotInitialized)
        }
    }

    /// Append raw records in one transaction
    ///
    /// Every row is stamped with the run id, the extract id and the same
    /// capture timestamp. Nothing is written if any insert fails.
    pub fn append_raw_records(
        &mut self,
        records: &[RawRecord],
        pipeline_id: &str,
        extract_id: &str,
        captured_at: &DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        self.ensure_initialized()?;
        let ts = format_timestamp(captured_at);

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO sales
                 (order_id, order_date, ship_date, product_type, country, region,
                  sales_channel, order_priority, units_sold, unit_price,
                  pipeline_id, extract_id, ts)
                 VALUES (?, CAST(? AS DATE), CAST(? AS DATE), ?, ?, ?, ?, ?, ?, ?, ?, ?,
                         CAST(? AS TIMESTAMP))",
            )?;

            for record in records {
                stmt.execute(duckdb::params![
                    record.order_id,
                    record.order_date.as_ref().map(format_date),
                    record.ship_date.as_ref().map(format_date),
                    record.product_type,
                    record.country,
                    record.region,
                    record.sales_channel,
                    record.order_priority,
                    record.units_sold,
                    record.unit_price,
                    pipeline_id,
                    extract_id,
                    ts,
                ])?;
            }
        }
        tx.commit()?;

        Ok(records.len())
    }

    /// Aggregate revenue per product type for one extract and append the top N
    ///
    /// Ranking is by total revenue descending, then product type ascending.
    /// Returns the number of report rows written, which is zero when the
    /// extract has no raw records.
    pub fn append_top_n(
        &mut self,
        pipeline_id: &str,
        transform_id: &str,
        source_extract_id: &str,
        top_n: usize,
        computed_at: &DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        self.ensure_initialized()?;
        let ts = format_timestamp(computed_at);

        // top_n is an integer, so it is safe to place in the statement text
        let sql = format!(
            "INSERT INTO top10
             (product_type, total_revenue, pipeline_id, transform_id, source_extract_id, ts)
             SELECT
                 product_type,
                 COALESCE(SUM(units_sold * unit_price), 0) AS total_revenue,
                 $1,
                 $2,
                 $3,
                 CAST($4 AS TIMESTAMP)
             FROM sales
             WHERE extract_id = $3
             GROUP BY product_type
             ORDER BY total_revenue DESC, product_type ASC
             LIMIT {top_n}"
        );

        let tx = self.conn.transaction()?;
        let written = tx.execute(
            &sql,
            duckdb::params![pipeline_id, transform_id, source_extract_id, ts],
        )?;
        tx.commit()?;

        Ok(written)
    }

    /// Get all report rows for a transform, highest revenue first
    pub fn report_rows(&self, transform_id: &str) -> Result<Vec<ReportRow>, StoreError> {
        self.ensure_initialized()?;
        let mut stmt = self.conn.prepare(
            "SELECT product_type, total_revenue, pipeline_id, transform_id,
                    source_extract_id, CAST(ts AS VARCHAR)
             FROM top10
             WHERE transform_id = ?
             ORDER BY total_revenue DESC, product_type ASC",
        )?;

        let rows = stmt.query_map([transform_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut report = Vec::new();
        for row in rows {
            let (product_type, total_revenue, pipeline_id, transform_id, source_extract_id, ts) =
                row?;
            report.push(ReportRow {
                product_type,
                total_revenue,
                pipeline_id,
                transform_id,
                source_extract_id,
                computed_at: parse_timestamp(&ts)?,
            });
        }
        Ok(report)
    }

    /// Get raw records stamped with an extract id, in insertion order
    pub fn raw_records(&self, extract_id: &str) -> Result<Vec<RawRecord>, StoreError> {
        self.ensure_initialized()?;
        let mut stmt = self.conn.prepare(
            "SELECT order_id, CAST(order_date AS VARCHAR), CAST(ship_date AS VARCHAR),
                    product_type, country, region, sales_channel, order_priority,
                    units_sold, unit_price
             FROM sales
             WHERE extract_id = ?
             ORDER BY rowid",
        )?;

        let rows = stmt.query_map([extract_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, Option<String>>(2)?,
                RawRecord {
                    order_id: String::new(),
                    order_date: None,
                    ship_date: None,
                    product_type: row.get(3)?,
                    country: row.get(4)?,
                    region: row.get(5)?,
                    sales_channel: row.get(6)?,
                    order_priority: row.get(7)?,
                    units_sold: row.get(8)?,
                    unit_price: row.get(9)?,
                },
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (order_id, order_date, ship_date, record) = row?;
            records.push(RawRecord {
                order_id,
                order_date: parse_stored_date("order_date", order_date)?,
                ship_date: parse_stored_date("ship_date", ship_date)?,
                ..record
            });
        }
        Ok(records)
    }

    /// Count raw records, optionally for a single extract
    pub fn raw_record_count(&self, extract_id: Option<&str>) -> Result<i64, StoreError> {
        self.ensure_initialized()?;
        let count: i64 = if let Some(extract_id) = extract_id {
            self.conn.query_row(
                "SELECT COUNT(*) FROM sales WHERE extract_id = ?",
                [extract_id],
                |row| row.get(0),
            )?
        } else {
            self.conn
                .query_row("SELECT COUNT(*) FROM sales", [], |row| row.get(0))?
        };
        Ok(count)
    }

    /// Count report rows, optionally for a single transform
    pub fn report_row_count(&self, transform_id: Option<&str>) -> Result<i64, StoreError> {
        self.ensure_initialized()?;
        let count: i64 = if let Some(transform_id) = transform_id {
            self.conn.query_row(
                "SELECT COUNT(*) FROM top10 WHERE transform_id = ?",
                [transform_id],
                |row| row.get(0),
            )?
        } else {
            self.conn
                .query_row("SELECT COUNT(*) FROM top10", [], |row| row.get(0))?
        };
        Ok(count)
    }

    /// Trace a transform back to its run and source extract
    ///
    /// Returns `None` when no report rows carry the transform id.
    pub fn transform_lineage(
        &self,
        transform_id: &str,
    ) -> Result<Option<TransformLineage>, StoreError> {
        self.ensure_initialized()?;
        let mut stmt = self.conn.prepare(
            "SELECT pipeline_id, source_extract_id, COUNT(*)
             FROM top10
             WHERE transform_id = ?
             GROUP BY pipeline_id, source_extract_id
             ORDER BY pipeline_id, source_extract_id",
        )?;
        let rows = stmt.query_map([transform_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut groups = Vec::new();
        for row in rows {
            groups.push(row?);
        }

        match groups.len() {
            0 => Ok(None),
            1 => {
                let (pipeline_id, source_extract_id, report_rows) = groups.remove(0);
                let raw_records = self.raw_record_count(Some(&source_extract_id))?;
                Ok(Some(TransformLineage {
                    transform_id: transform_id.to_string(),
                    pipeline_id,
                    source_extract_id,
                    raw_records,
                    report_rows,
                }))
            }
            n => Err(StoreError::AmbiguousLineage {
                transform_id: transform_id.to_string(),
                sources: n,
            }),
        }
    }
}

fn parse_stored_date(column: &str, value: Option<String>) -> Result<Option<NaiveDate>, StoreError> {
    value
        .map(|v| {
            NaiveDate::parse_from_str(&v, "%Y-%m-%d").map_err(|_| StoreError::InvalidValue {
                column: column.to_string(),
                value: v,
            })
        })
        .transpose()
}
