//! Transform Binary - Fact table to reporting tables
//!
//! Reads `fact_klines_1h.csv` and rebuilds `dim_symbol`, `agg_daily`,
//! `data_quality` and `anomaly_events` from scratch on every run.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin transform_kpi                      # CSV output
//! cargo run --release --bin transform_kpi -- --backend sqlite  # SQLite output
//! ```
//!
//! ## Environment Variables
//!
//! - FACT_TABLE_PATH - Input fact table (default: data_processed/fact_klines_1h.csv)
//! - OUTPUT_DIR - CSV output directory (default: data_processed)
//! - KLINEFLOW_DB_PATH - SQLite database path (default: data_processed/klineflow.db) - used when --backend sqlite
//! - QUOTE_SUFFIX / FALLBACK_QUOTE_LEN - Symbol decomposition (default: USDC / 4)
//! - VOL_WINDOW / VOL_MIN_PERIODS - Volatility window (default: 7 / 3)
//! - DD_WINDOW / DD_MIN_PERIODS - Max drawdown window (default: 30 / 5)
//! - ZSCORE_THRESHOLD - Anomaly threshold (default: 3.0)
//! - AUDIT_SYMBOLS - Symbols always reported by the data-quality audit (optional)
//! - RUST_LOG - Logging level (optional, default: info)

use klineflow::config::TransformConfig;
use klineflow::transform_core::{read_table, run_transform, BackendType, FactRow, TableWriter};
use std::env;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    dotenv::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    let backend = BackendType::from_args(&args);
    let config = TransformConfig::from_env()?;

    let target = match backend {
        BackendType::Csv => config.output_dir.clone(),
        BackendType::Sqlite => config.db_path.clone(),
    };

    log::info!("🚀 Starting KPI transform");
    log::info!("   Fact table: {}", config.fact_path.display());
    log::info!("   Output: {}", target.display());
    log::info!(
        "   Windows: vol {}/{} | max_dd {}/{}",
        config.vol_window.length,
        config.vol_window.min_periods,
        config.dd_window.length,
        config.dd_window.min_periods
    );
    log::info!("   Z-score threshold: {}", config.zscore_threshold);

    let fact: Vec<FactRow> = read_table(&config.fact_path)?;

    let output = run_transform(&fact, &config);

    let mut writer = TableWriter::new(backend, target)?;
    log::info!("📊 Backend: {}", writer.backend_type());
    output.write_all(&mut writer)?;

    output.log_summary();
    log::info!("🏁 Transform complete");

    Ok(())
}
