//! CSV table reader with header validation
//!
//! Column presence is checked against [`TableRow::COLUMNS`] before any row
//! is decoded, so a missing column fails up front instead of mid-file.

use super::table::TableRow;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug)]
pub enum ReaderError {
    Io(std::io::Error),
    Csv(csv::Error),
    MissingColumn { table: &'static str, column: &'static str },
}

impl From<std::io::Error> for ReaderError {
    fn from(err: std::io::Error) -> Self {
        ReaderError::Io(err)
    }
}

impl From<csv::Error> for ReaderError {
    fn from(err: csv::Error) -> Self {
        ReaderError::Csv(err)
    }
}

impl std::fmt::Display for ReaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReaderError::Io(e) => write!(f, "IO error: {}", e),
            ReaderError::Csv(e) => write!(f, "CSV error: {}", e),
            ReaderError::MissingColumn { table, column } => {
                write!(f, "Table {} is missing column: {}", table, column)
            }
        }
    }
}

impl std::error::Error for ReaderError {}

/// Read a whole table from a CSV file
pub fn read_table<T>(path: impl AsRef<Path>) -> Result<Vec<T>, ReaderError>
where
    T: TableRow + DeserializeOwned,
{
    let path = path.as_ref();
    let file = File::open(path)?;
    let rows = read_table_from(file)?;
    log::info!("📥 Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Read a whole table from any reader
pub fn read_table_from<T, R>(input: R) -> Result<Vec<T>, ReaderError>
where
    T: TableRow + DeserializeOwned,
    R: Read,
{
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(input);

    let headers = reader.headers()?.clone();
    for column in T::COLUMNS {
        if !headers.iter().any(|h| h == column.name) {
            return Err(ReaderError::MissingColumn {
                table: T::TABLE,
                column: column.name,
            });
        }
    }

    let mut rows = Vec::new();
    for result in reader.deserialize() {
        rows.push(result?);
    }
    Ok(rows)
}
