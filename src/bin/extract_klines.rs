//! Extract Binary - Hourly SPOT candles to the fact table
//!
//! Pulls `DAYS_BACK` days of klines for every configured symbol and writes
//! `fact_klines_1h.csv` to the output directory.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin extract_klines
//! ```
//!
//! ## Environment Variables
//!
//! - BINANCE_SPOT_BASE_URL - REST base URL (default: https://api.binance.com)
//! - SYMBOLS - Comma-separated symbols (default: 8 USDC pairs)
//! - INTERVAL - Kline interval (default: 1h)
//! - DAYS_BACK - History depth in days (default: 180)
//! - KLINES_LIMIT - Rows per request, max 1000 (default: 1000)
//! - OUTPUT_DIR - Output directory (default: data_processed)
//! - HTTP_TIMEOUT_SECS - Request timeout (default: 30)
//! - MAX_RETRIES - Retries for transient failures (default: 3)
//! - RUST_LOG - Logging level (optional, default: info)

use klineflow::config::ExtractConfig;
use klineflow::ingest_core::{fetch_klines_paginated, BinanceKlinesClient};
use klineflow::transform_core::{CsvTableWriter, FactRow, FactTableBuilder, TableWriterBackend};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    dotenv::dotenv().ok();

    let config = ExtractConfig::from_env()?;
    let (start_ms, end_ms) = config.time_range_ms();

    log::info!("🚀 Starting kline extraction");
    log::info!("   Base URL: {}", config.base_url);
    log::info!("   Symbols: {}", config.symbols.join(","));
    log::info!("   Interval: {} | limit: {}", config.interval, config.klines_limit);
    log::info!("   Range: {} days ({} → {})", config.days_back, start_ms, end_ms);

    let client = BinanceKlinesClient::new(
        config.base_url.clone(),
        Duration::from_secs(config.http_timeout_secs),
        config.max_retries,
    )?;
    let builder = FactTableBuilder::new(config.interval.clone());

    let mut fact: Vec<FactRow> = Vec::new();
    for symbol in &config.symbols {
        log::info!("📥 Fetching {} interval={}", symbol, config.interval);

        let candles = fetch_klines_paginated(
            &client,
            symbol,
            &config.interval,
            start_ms,
            end_ms,
            config.klines_limit,
        )
        .await
        .map_err(|e| {
            log::error!("❌ {}: {}", symbol, e);
            e
        })?;

        let rows = builder.build(symbol, &candles)?;
        log::info!("✅ {}: {} rows", symbol, rows.len());
        fact.extend(rows);
    }

    let mut writer = CsvTableWriter::new(config.output_dir.clone())?;
    writer.write_table(&fact)?;

    log::info!("🏁 Extraction complete: {} rows across {} symbols", fact.len(), config.symbols.len());

    Ok(())
}
