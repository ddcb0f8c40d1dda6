//! Tabular record plumbing shared by the CSV and SQLite backends
//!
//! Every persisted table is a named record type implementing [`TableRow`].
//! The column list is declared once and drives header writing, SQL schema
//! creation and header validation on read.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Storage class of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Real,
    Integer,
}

impl ColumnKind {
    pub fn sql_type(&self) -> &'static str {
        match self {
            ColumnKind::Text => "TEXT",
            ColumnKind::Real => "REAL",
            ColumnKind::Integer => "INTEGER",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    pub const fn text(name: &'static str) -> Self {
        Self { name, kind: ColumnKind::Text }
    }

    pub const fn real(name: &'static str) -> Self {
        Self { name, kind: ColumnKind::Real }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self { name, kind: ColumnKind::Integer }
    }
}

/// A single cell, backend-neutral. `Null` is a missing value and is never 0.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl CellValue {
    pub fn opt_real(value: Option<f64>) -> Self {
        value.map(CellValue::Real).unwrap_or(CellValue::Null)
    }

    /// CSV rendering: empty for null, shortest round-trip form for floats
    pub fn to_csv_field(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Integer(v) => v.to_string(),
            CellValue::Real(v) => v.to_string(),
            CellValue::Text(s) => s.clone(),
        }
    }
}

/// A record type persisted as one row of a named table
pub trait TableRow {
    /// Table name (CSV file stem / SQL table)
    const TABLE: &'static str;

    /// Columns in output order
    const COLUMNS: &'static [Column];

    /// Cell values in the same order as [`TableRow::COLUMNS`]
    fn values(&self) -> Vec<CellValue>;
}

/// Fractional seconds are written only when non-zero (`.999` for candle close times)
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f+00:00";
const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a UTC instant written either as `YYYY-MM-DD HH:MM:SS+00:00`
/// (with optional fractional seconds) or as RFC 3339.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(ts.with_timezone(&Utc));
    }
    // Naive timestamps are taken as UTC
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Serde adapter for required UTC timestamps
pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid UTC timestamp: {}", raw)))
}

/// Serde adapter for nullable UTC timestamps (empty cell = null)
pub fn deserialize_opt_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid UTC timestamp: {}", s))),
    }
}

/// Serde adapter for calendar dates; tolerates a trailing time component
pub fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let head = raw.trim().get(..10).unwrap_or(raw.trim());
    NaiveDate::parse_from_str(head, DATE_FORMAT)
        .map_err(|_| serde::de::Error::custom(format!("invalid date: {}", raw)))
}

/// Round to `decimals` places through the decimal formatter, so exact ties
/// go to the even digit (15.625 -> 15.62). Non-finite values pass through.
pub fn round_to(value: f64, decimals: usize) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{:.*}", decimals, value).parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 13, 0, 0).unwrap();

        assert_eq!(parse_timestamp("2024-03-01 13:00:00+00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T13:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01 13:00:00"), Some(expected));
        assert_eq!(parse_timestamp("not a time"), None);

        assert_eq!(format_timestamp(&expected), "2024-03-01 13:00:00+00:00");

        let close = expected + chrono::Duration::milliseconds(3_599_999);
        assert_eq!(format_timestamp(&close), "2024-03-01 13:59:59.999+00:00");
        assert_eq!(parse_timestamp(&format_timestamp(&close)), Some(close));
    }

    #[test]
    fn test_null_cell_is_empty_not_zero() {
        assert_eq!(CellValue::opt_real(None).to_csv_field(), "");
        assert_eq!(CellValue::opt_real(Some(0.0)).to_csv_field(), "0");
        assert_eq!(CellValue::Real(-0.5).to_csv_field(), "-0.5");
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(75.0, 2), 75.0);
        assert_eq!(round_to(2.0 / 3.0 * 100.0, 2), 66.67);
        assert_eq!(round_to(3.14159, 3), 3.142);
        assert!(round_to(f64::NAN, 2).is_nan());

        // Exact binary ties go to the even digit
        assert_eq!(round_to(15.625, 2), 15.62);
        assert_eq!(round_to(0.125, 2), 0.12);
        assert_eq!(round_to(2.0625, 3), 2.062);
        assert_eq!(round_to(-1.4375, 3), -1.438);
    }
}
