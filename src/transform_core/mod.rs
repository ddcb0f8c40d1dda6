//! Transform Core - Daily KPIs, Data Quality and Anomaly Detection
//!
//! Turns the hourly kline fact table into the reporting tables.
//!
//! # Architecture
//!
//! ```text
//! fact_klines_1h.csv → read_table::<FactRow>
//!     ↓
//!     ├─ SymbolDimBuilder   → dim_symbol
//!     ├─ DataQualityAuditor → data_quality
//!     └─ DailyAggregator    → agg_daily (return_1d, vol_7d, drawdown, max_dd_30d)
//!            ↓
//!        AnomalyDetector (ZScoreScorer) → anomaly_events
//!     ↓
//! TableWriter → CSV or SQLite backend
//! ```

pub mod csv_reader;
pub mod csv_writer;
pub mod daily;
pub mod detector;
pub mod dim_symbol;
pub mod fact;
pub mod pipeline;
pub mod quality;
pub mod scorer;
pub mod sqlite_writer;
pub mod table;
pub mod window;
pub mod writer;
pub mod writer_backend;

pub use csv_reader::{read_table, ReaderError};
pub use csv_writer::CsvTableWriter;
pub use daily::{DailyAggregator, DailyRow};
pub use detector::{AnomalyDetector, AnomalyEvent, AnomalyType};
pub use dim_symbol::{SymbolDimBuilder, SymbolDimRow};
pub use fact::{Candle, FactError, FactRow, FactTableBuilder};
pub use pipeline::{run_transform, TransformOutput};
pub use quality::{DataQualityAuditor, DataQualityRow};
pub use scorer::ZScoreScorer;
pub use sqlite_writer::SqliteTableWriter;
pub use table::{TableRow, Column, ColumnKind, CellValue};
pub use window::{RollingWindow, WindowSpec};
pub use writer::{BackendType, TableWriter};
pub use writer_backend::{TableWriterBackend, TableWriterError};
