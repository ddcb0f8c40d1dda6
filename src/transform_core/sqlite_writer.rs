//! SQLite writer for output tables
//!
//! Each table is dropped and recreated inside one transaction, so readers
//! never observe a half-written table.

use super::table::{CellValue, TableRow};
use super::writer_backend::{TableWriterBackend, TableWriterError};
use rusqlite::types::{ToSqlOutput, Value};
use rusqlite::{params_from_iter, Connection, ToSql};
use std::path::Path;

impl ToSql for CellValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            CellValue::Null => ToSqlOutput::Owned(Value::Null),
            CellValue::Integer(v) => ToSqlOutput::Owned(Value::Integer(*v)),
            CellValue::Real(v) => ToSqlOutput::Owned(Value::Real(*v)),
            CellValue::Text(s) => ToSqlOutput::Owned(Value::Text(s.clone())),
        })
    }
}

pub struct SqliteTableWriter {
    conn: Connection,
}

impl SqliteTableWriter {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, TableWriterError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path.as_ref())?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        log::info!("✅ SQLite table writer initialized: {}", db_path.as_ref().display());

        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn create_table_sql<T: TableRow>() -> String {
    let columns: Vec<String> = T::COLUMNS
        .iter()
        .map(|c| format!("\"{}\" {}", c.name, c.kind.sql_type()))
        .collect();
    format!("CREATE TABLE \"{}\" ({})", T::TABLE, columns.join(", "))
}

fn insert_sql<T: TableRow>() -> String {
    let names: Vec<String> = T::COLUMNS.iter().map(|c| format!("\"{}\"", c.name)).collect();
    let placeholders: Vec<String> = (1..=T::COLUMNS.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO \"{}\" ({}) VALUES ({})",
        T::TABLE,
        names.join(", "),
        placeholders.join(", ")
    )
}

impl TableWriterBackend for SqliteTableWriter {
    fn write_table<T: TableRow>(&mut self, rows: &[T]) -> Result<(), TableWriterError> {
        let tx = self.conn.transaction()?;

        tx.execute(&format!("DROP TABLE IF EXISTS \"{}\"", T::TABLE), [])?;
        tx.execute(&create_table_sql::<T>(), [])?;

        {
            let mut stmt = tx.prepare(&insert_sql::<T>())?;
            for row in rows {
                stmt.execute(params_from_iter(row.values()))?;
            }
        }

        tx.commit()?;

        log::info!("✅ Wrote {} rows to SQLite table {}", rows.len(), T::TABLE);
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "SQLite"
    }
}
