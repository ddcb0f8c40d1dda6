//! Unified writer interface for output tables
//!
//! Routes writes to either the CSV or the SQLite backend based on configuration.

use super::csv_writer::CsvTableWriter;
use super::sqlite_writer::SqliteTableWriter;
use super::table::TableRow;
use super::writer_backend::{TableWriterBackend, TableWriterError};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    Csv,
    Sqlite,
}

impl BackendType {
    /// `--backend csv|sqlite`, defaulting to CSV
    pub fn from_args(args: &[String]) -> BackendType {
        if let Some(idx) = args.iter().position(|x| x == "--backend") {
            match args.get(idx + 1).map(|s| s.as_str()) {
                Some("sqlite") => return BackendType::Sqlite,
                Some("csv") => return BackendType::Csv,
                Some(other) => log::warn!("Unknown backend '{}', defaulting to csv", other),
                None => {}
            }
        }
        BackendType::Csv
    }
}

pub enum TableWriter {
    Csv(CsvTableWriter),
    Sqlite(SqliteTableWriter),
}

impl TableWriter {
    /// `target` is the output directory for CSV or the database file for SQLite
    pub fn new(backend: BackendType, target: PathBuf) -> Result<Self, TableWriterError> {
        match backend {
            BackendType::Csv => Ok(TableWriter::Csv(CsvTableWriter::new(target)?)),
            BackendType::Sqlite => Ok(TableWriter::Sqlite(SqliteTableWriter::new(target)?)),
        }
    }

    pub fn write_table<T: TableRow>(&mut self, rows: &[T]) -> Result<(), TableWriterError> {
        match self {
            TableWriter::Csv(w) => w.write_table(rows),
            TableWriter::Sqlite(w) => w.write_table(rows),
        }
    }

    pub fn backend_type(&self) -> &'static str {
        match self {
            TableWriter::Csv(w) => w.backend_type(),
            TableWriter::Sqlite(w) => w.backend_type(),
        }
    }
}
