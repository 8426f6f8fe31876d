//! Reading sales records from delimited source files

use std::fs::File;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use super::error::SourceError;
use super::records::RawRecord;

/// Expected source columns, in positional order
pub const SOURCE_COLUMNS: [&str; 10] = [
    "Order ID",
    "Order Date",
    "Ship Date",
    "Item Type",
    "Country",
    "Region",
    "Sales Channel",
    "Order Priority",
    "Units Sold",
    "Unit Price",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d.%m.%Y"];

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%m/%d/%Y %H:%M:%S"];

/// Records read from one source file
#[derive(Debug, Clone, Default)]
pub struct SourceBatch {
    /// Parsed rows in file order
    pub records: Vec<RawRecord>,
    /// Date cells that could not be parsed and were stored as null
    pub unparsed_dates: usize,
    /// Numeric cells that could not be parsed and were stored as null
    pub unparsed_numbers: usize,
}

/// Parse a date leniently, returning `None` when no known format matches
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Some(datetime.date());
        }
    }
    None
}

/// Units and prices are both read as doubles; fractional unit counts are kept
fn parse_number(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
}

fn source_error(path: &Path, err: csv::Error) -> SourceError {
    let line = err.position().map(|p| p.line()).unwrap_or(0);
    match err.kind() {
        csv::ErrorKind::Io(io_err) => SourceError::Unavailable {
            path: path.to_path_buf(),
            reason: io_err.to_string(),
        },
        _ => SourceError::Malformed {
            path: path.to_path_buf(),
            line,
            reason: err.to_string(),
        },
    }
}

/// Read a comma-delimited sales file with a header row
///
/// Columns are taken by position; trailing columns beyond the ten expected
/// ones are ignored. Unparseable dates and numbers become `None` and the row
/// is kept.
pub fn read_sales_csv(path: &Path) -> Result<SourceBatch, SourceError> {
    let file = File::open(path).map_err(|e| SourceError::Unavailable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b',')
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| source_error(path, e))?
        .clone();

    if headers.len() < SOURCE_COLUMNS.len() {
        return Err(SourceError::Malformed {
            path: path.to_path_buf(),
            line: 1,
            reason: format!(
                "expected at least {} columns, found {}",
                SOURCE_COLUMNS.len(),
                headers.len()
            ),
        });
    }

    for (index, expected) in SOURCE_COLUMNS.iter().enumerate() {
        let found = headers.get(index).unwrap_or_default();
        if !found.eq_ignore_ascii_case(expected) {
            debug!(
                column = index,
                expected = *expected,
                found = found,
                "Source header differs from expected name, using position"
            );
        }
    }

    let mut batch = SourceBatch::default();

    for result in reader.records() {
        let row = result.map_err(|e| source_error(path, e))?;
        let field = |index: usize| row.get(index).unwrap_or_default();

        let order_date = parse_date(field(1));
        let ship_date = parse_date(field(2));
        let units_sold = parse_number(field(8));
        let unit_price = parse_number(field(9));

        batch.unparsed_dates += usize::from(order_date.is_none() && !field(1).is_empty())
            + usize::from(ship_date.is_none() && !field(2).is_empty());
        batch.unparsed_numbers += usize::from(units_sold.is_none())
            + usize::from(unit_price.is_none());

        batch.records.push(RawRecord {
            order_id: field(0).to_string(),
            order_date,
            ship_date,
            product_type: field(3).to_string(),
            country: field(4).to_string(),
            region: field(5).to_string(),
            sales_channel: field(6).to_string(),
            order_priority: field(7).to_string(),
            units_sold,
            unit_price,
        });
    }

    if batch.unparsed_dates > 0 || batch.unparsed_numbers > 0 {
        warn!(
            source = %path.display(),
            unparsed_dates = batch.unparsed_dates,
            unparsed_numbers = batch.unparsed_numbers,
            "Some source values could not be parsed and were stored as null"
        );
    }

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADER: &str = "Order ID,Order Date,Ship Date,Item Type,Country,Region,Sales Channel,Order Priority,Units Sold,Unit Price";

    fn write_source(dir: &TempDir, rows: &[&str]) -> std::path::PathBuf {
        let path = dir.path().join("sales.csv");
        let mut content = String::from(HEADER);
        content.push('\n');
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2014, 10, 18);
        assert_eq!(parse_date("2014-10-18"), expected);
        assert_eq!(parse_date("10/18/2014"), expected);
        assert_eq!(parse_date("2014-10-18 00:00:00"), expected);
        assert_eq!(parse_date("2014-10-18T13:45:00"), expected);
        assert_eq!(parse_date(" 2014-10-18 "), expected);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("2014-13-45"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_number("42"), Some(42.0));
        assert_eq!(parse_number(" 2.5 "), Some(2.5));
        assert_eq!(parse_number("many"), None);
        assert_eq!(parse_number("9.99"), Some(9.99));
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn test_read_sales_csv() {
        let dir = TempDir::new().unwrap();
        let path = write_source(
            &dir,
            &[
                "O1,2023-01-01,2023-01-03,Cereal,Chad,Africa,Online,H,10,100",
                "O2,01/02/2023,01/04/2023,Fruits,Peru,Americas,Offline,M,11,110.5",
            ],
        );

        let batch = read_sales_csv(&path).unwrap();
        assert_eq!(batch.records.len(), 2);
        assert_eq!(batch.unparsed_dates, 0);

        let first = &batch.records[0];
        assert_eq!(first.order_id, "O1");
        assert_eq!(first.order_date, NaiveDate::from_ymd_opt(2023, 1, 1));
        assert_eq!(first.product_type, "Cereal");
        assert_eq!(first.units_sold, Some(10.0));
        assert_eq!(first.unit_price, Some(100.0));

        let second = &batch.records[1];
        assert_eq!(second.ship_date, NaiveDate::from_ymd_opt(2023, 1, 4));
        assert_eq!(second.unit_price, Some(110.5));
    }

    #[test]
    fn test_malformed_date_is_kept_as_null() {
        let dir = TempDir::new().unwrap();
        let path = write_source(
            &dir,
            &["O1,someday,2023-01-03,Cereal,Chad,Africa,Online,H,10,100"],
        );

        let batch = read_sales_csv(&path).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].order_date, None);
        assert_eq!(
            batch.records[0].ship_date,
            NaiveDate::from_ymd_opt(2023, 1, 3)
        );
        assert_eq!(batch.unparsed_dates, 1);
    }

    #[test]
    fn test_extra_columns_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("extra.csv");
        std::fs::write(
            &path,
            format!("{HEADER},pipeline_id\nO1,2023-01-01,2023-01-02,Cereal,Chad,Africa,Online,H,3,4,ignored\n"),
        )
        .unwrap();

        let batch = read_sales_csv(&path).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].revenue(), Some(12.0));
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let err = read_sales_csv(Path::new("/nonexistent/sales.csv")).unwrap_err();
        assert!(matches!(err, SourceError::Unavailable { .. }));
    }

    #[test]
    fn test_too_few_columns_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("narrow.csv");
        std::fs::write(&path, "Order ID,Item Type\nO1,Cereal\n").unwrap();

        let err = read_sales_csv(&path).unwrap_err();
        assert!(matches!(err, SourceError::Malformed { line: 1, .. }));
    }

    #[test]
    fn test_ragged_row_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = write_source(
            &dir,
            &[
                "O1,2023-01-01,2023-01-03,Cereal,Chad,Africa,Online,H,10,100",
                "O2,2023-01-02",
            ],
        );

        let err = read_sales_csv(&path).unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
    }

    #[test]
    fn test_header_only_yields_no_records() {
        let dir = TempDir::new().unwrap();
        let path = write_source(&dir, &[]);

        let batch = read_sales_csv(&path).unwrap();
        assert!(batch.records.is_empty());
    }
}
