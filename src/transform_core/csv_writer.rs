//! CSV writer: one `<table>.csv` file per table under an output directory

use super::table::TableRow;
use super::writer_backend::{TableWriterBackend, TableWriterError};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct CsvTableWriter {
    output_dir: PathBuf,
}

impl CsvTableWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, TableWriterError> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;
        log::info!("📝 Writing CSV tables to: {}", output_dir.display());
        Ok(Self { output_dir })
    }

    pub fn table_path(&self, table: &str) -> PathBuf {
        self.output_dir.join(format!("{}.csv", table))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

/// Write a table to any sink; the header row is always written
pub fn write_table_to<T: TableRow, W: Write>(output: W, rows: &[T]) -> Result<(), TableWriterError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(output);

    writer.write_record(T::COLUMNS.iter().map(|c| c.name))?;
    for row in rows {
        writer.write_record(row.values().iter().map(|v| v.to_csv_field()))?;
    }
    writer.flush()?;
    Ok(())
}

impl TableWriterBackend for CsvTableWriter {
    fn write_table<T: TableRow>(&mut self, rows: &[T]) -> Result<(), TableWriterError> {
        let path = self.table_path(T::TABLE);
        let file = File::create(&path)?;
        write_table_to(file, rows)?;
        log::info!("✅ Saved {} ({} rows)", path.display(), rows.len());
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "CSV"
    }
}
