//! Ingest Core - Hourly candle extraction from the exchange REST API
//!
//! ```text
//! ExtractConfig → BinanceKlinesClient (retry + backoff)
//!     ↓ fetch_klines_paginated (per symbol, sequential)
//! Vec<Candle> → FactTableBuilder → fact_klines_1h.csv
//! ```

pub mod backoff;
pub mod client;
pub mod paginator;

pub use backoff::ExponentialBackoff;
pub use client::{BinanceKlinesClient, FetchError, KlinePageSource, PageRequest};
pub use paginator::fetch_klines_paginated;
