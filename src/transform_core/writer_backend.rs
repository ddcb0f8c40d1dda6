//! Writer backend trait for output tables
//!
//! Every run overwrites each table in full; there is no append path.

use super::table::TableRow;

#[derive(Debug)]
pub enum TableWriterError {
    Io(std::io::Error),
    Csv(csv::Error),
    Database(String),
}

impl From<std::io::Error> for TableWriterError {
    fn from(err: std::io::Error) -> Self {
        TableWriterError::Io(err)
    }
}

impl From<csv::Error> for TableWriterError {
    fn from(err: csv::Error) -> Self {
        TableWriterError::Csv(err)
    }
}

impl From<rusqlite::Error> for TableWriterError {
    fn from(err: rusqlite::Error) -> Self {
        TableWriterError::Database(err.to_string())
    }
}

impl std::fmt::Display for TableWriterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableWriterError::Io(e) => write!(f, "IO error: {}", e),
            TableWriterError::Csv(e) => write!(f, "CSV error: {}", e),
            TableWriterError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for TableWriterError {}

/// Backend trait for persisting whole tables
pub trait TableWriterBackend {
    /// Replace the table named `T::TABLE` with `rows`. Empty tables keep their schema.
    fn write_table<T: TableRow>(&mut self, rows: &[T]) -> Result<(), TableWriterError>;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}
