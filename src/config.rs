//! Configuration from environment variables
//!
//! Both binaries load an optional `.env` file first (`dotenv`), then read
//! the variables below. Parsing goes through a lookup function so tests can
//! supply values without touching the process environment.

use crate::transform_core::window::WindowSpec;
use chrono::{Duration, Utc};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_SYMBOLS: [&str; 8] = [
    "BTCUSDC", "ETHUSDC", "BNBUSDC", "SOLUSDC", "XRPUSDC", "ADAUSDC", "DOGEUSDC", "AVAXUSDC",
];

/// Exchange hard cap on klines per request
pub const MAX_KLINES_LIMIT: usize = 1000;

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(format!("{}={}", key, raw))),
    }
}

fn string_or<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn validate_window(name: &str, spec: WindowSpec) -> Result<(), ConfigError> {
    if spec.length == 0 {
        return Err(ConfigError::InvalidValue(format!("{} window must be > 0", name)));
    }
    if spec.min_periods == 0 || spec.min_periods > spec.length {
        return Err(ConfigError::InvalidValue(format!(
            "{} min periods must be within 1..={}, got {}",
            name, spec.length, spec.min_periods
        )));
    }
    Ok(())
}

/// Configuration for the transform binary
#[derive(Debug, Clone)]
pub struct TransformConfig {
    /// Input hourly fact table (CSV)
    pub fact_path: PathBuf,

    /// Directory for CSV outputs
    pub output_dir: PathBuf,

    /// Database file for the SQLite backend
    pub db_path: PathBuf,

    /// Known quote currency stripped from symbols
    pub quote_suffix: String,

    /// Quote length assumed when the known suffix is absent
    pub fallback_quote_len: usize,

    pub vol_window: WindowSpec,
    pub dd_window: WindowSpec,

    /// Z-score threshold for anomaly events
    pub zscore_threshold: f64,

    /// Symbols always reported by the data-quality audit, even with no rows
    pub symbols: Vec<String>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            fact_path: PathBuf::from("data_processed/fact_klines_1h.csv"),
            output_dir: PathBuf::from("data_processed"),
            db_path: PathBuf::from("data_processed/klineflow.db"),
            quote_suffix: "USDC".to_string(),
            fallback_quote_len: 4,
            vol_window: WindowSpec::new(7, 3),
            dd_window: WindowSpec::new(30, 5),
            zscore_threshold: 3.0,
            symbols: Vec::new(),
        }
    }
}

impl TransformConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `FACT_TABLE_PATH` (default: data_processed/fact_klines_1h.csv)
    /// - `OUTPUT_DIR` (default: data_processed)
    /// - `KLINEFLOW_DB_PATH` (default: data_processed/klineflow.db)
    /// - `QUOTE_SUFFIX` (default: USDC)
    /// - `FALLBACK_QUOTE_LEN` (default: 4)
    /// - `VOL_WINDOW` / `VOL_MIN_PERIODS` (default: 7 / 3)
    /// - `DD_WINDOW` / `DD_MIN_PERIODS` (default: 30 / 5)
    /// - `ZSCORE_THRESHOLD` (default: 3.0)
    /// - `AUDIT_SYMBOLS` (comma-separated, default: none)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            fact_path: string_or(&lookup, "FACT_TABLE_PATH", &defaults.fact_path.to_string_lossy()).into(),
            output_dir: string_or(&lookup, "OUTPUT_DIR", &defaults.output_dir.to_string_lossy()).into(),
            db_path: string_or(&lookup, "KLINEFLOW_DB_PATH", &defaults.db_path.to_string_lossy()).into(),
            quote_suffix: string_or(&lookup, "QUOTE_SUFFIX", &defaults.quote_suffix),
            fallback_quote_len: parse_or(&lookup, "FALLBACK_QUOTE_LEN", defaults.fallback_quote_len)?,
            vol_window: WindowSpec::new(
                parse_or(&lookup, "VOL_WINDOW", defaults.vol_window.length)?,
                parse_or(&lookup, "VOL_MIN_PERIODS", defaults.vol_window.min_periods)?,
            ),
            dd_window: WindowSpec::new(
                parse_or(&lookup, "DD_WINDOW", defaults.dd_window.length)?,
                parse_or(&lookup, "DD_MIN_PERIODS", defaults.dd_window.min_periods)?,
            ),
            zscore_threshold: parse_or(&lookup, "ZSCORE_THRESHOLD", defaults.zscore_threshold)?,
            symbols: lookup("AUDIT_SYMBOLS").map(|s| split_symbols(&s)).unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_window("VOL", self.vol_window)?;
        validate_window("DD", self.dd_window)?;

        if !self.zscore_threshold.is_finite() || self.zscore_threshold <= 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "ZSCORE_THRESHOLD must be a positive number, got {}",
                self.zscore_threshold
            )));
        }
        if self.fallback_quote_len == 0 {
            return Err(ConfigError::InvalidValue("FALLBACK_QUOTE_LEN must be > 0".to_string()));
        }
        Ok(())
    }
}

fn split_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Configuration for the extract binary
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub base_url: String,
    pub symbols: Vec<String>,
    pub interval: String,
    pub days_back: i64,
    pub klines_limit: usize,
    pub output_dir: PathBuf,
    pub http_timeout_secs: u64,
    pub max_retries: u32,
}

impl ExtractConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `BINANCE_SPOT_BASE_URL` (default: https://api.binance.com)
    /// - `SYMBOLS` (comma-separated, default: 8 USDC pairs)
    /// - `INTERVAL` (default: 1h)
    /// - `DAYS_BACK` (default: 180)
    /// - `KLINES_LIMIT` (default: 1000, max 1000)
    /// - `OUTPUT_DIR` (default: data_processed)
    /// - `HTTP_TIMEOUT_SECS` (default: 30)
    /// - `MAX_RETRIES` (default: 3)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = string_or(&lookup, "BINANCE_SPOT_BASE_URL", "https://api.binance.com");
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "BINANCE_SPOT_BASE_URL must start with http:// or https://".to_string(),
            ));
        }

        let symbols = lookup("SYMBOLS")
            .map(|s| split_symbols(&s))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect());

        let klines_limit: usize = parse_or(&lookup, "KLINES_LIMIT", MAX_KLINES_LIMIT)?;
        if klines_limit == 0 || klines_limit > MAX_KLINES_LIMIT {
            return Err(ConfigError::InvalidValue(format!(
                "KLINES_LIMIT must be within 1..={}, got {}",
                MAX_KLINES_LIMIT, klines_limit
            )));
        }

        let days_back: i64 = parse_or(&lookup, "DAYS_BACK", 180)?;
        if days_back <= 0 {
            return Err(ConfigError::InvalidValue(format!("DAYS_BACK must be > 0, got {}", days_back)));
        }

        let http_timeout_secs: u64 = parse_or(&lookup, "HTTP_TIMEOUT_SECS", 30)?;
        if http_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("HTTP_TIMEOUT_SECS must be > 0".to_string()));
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            symbols,
            interval: string_or(&lookup, "INTERVAL", "1h"),
            days_back,
            klines_limit,
            output_dir: string_or(&lookup, "OUTPUT_DIR", "data_processed").into(),
            http_timeout_secs,
            max_retries: parse_or(&lookup, "MAX_RETRIES", 3)?,
        })
    }

    /// `(start_ms, end_ms)` with end = now (UTC) and start = end - days_back
    pub fn time_range_ms(&self) -> (i64, i64) {
        let end = Utc::now();
        let start = end - Duration::days(self.days_back);
        (start.timestamp_millis(), end.timestamp_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_transform_config() {
        let config = TransformConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.fact_path, PathBuf::from("data_processed/fact_klines_1h.csv"));
        assert_eq!(config.quote_suffix, "USDC");
        assert_eq!(config.vol_window, WindowSpec::new(7, 3));
        assert_eq!(config.dd_window, WindowSpec::new(30, 5));
        assert_eq!(config.zscore_threshold, 3.0);
        assert!(config.symbols.is_empty());
    }

    #[test]
    fn test_custom_transform_config() {
        let config = TransformConfig::from_lookup(lookup(&[
            ("QUOTE_SUFFIX", "USDT"),
            ("VOL_WINDOW", "14"),
            ("VOL_MIN_PERIODS", "5"),
            ("ZSCORE_THRESHOLD", "2.5"),
            ("AUDIT_SYMBOLS", "btcusdt, ethusdt,"),
        ]))
        .unwrap();

        assert_eq!(config.quote_suffix, "USDT");
        assert_eq!(config.vol_window, WindowSpec::new(14, 5));
        assert_eq!(config.zscore_threshold, 2.5);
        assert_eq!(config.symbols, vec!["BTCUSDT", "ETHUSDT"]);
    }

    #[test]
    fn test_invalid_windows_rejected() {
        assert!(TransformConfig::from_lookup(lookup(&[("VOL_MIN_PERIODS", "8")])).is_err());
        assert!(TransformConfig::from_lookup(lookup(&[("DD_WINDOW", "0")])).is_err());
        assert!(TransformConfig::from_lookup(lookup(&[("ZSCORE_THRESHOLD", "-1")])).is_err());
        assert!(TransformConfig::from_lookup(lookup(&[("ZSCORE_THRESHOLD", "abc")])).is_err());
    }

    #[test]
    fn test_default_extract_config() {
        let config = ExtractConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.base_url, "https://api.binance.com");
        assert_eq!(config.symbols.len(), 8);
        assert_eq!(config.symbols[0], "BTCUSDC");
        assert_eq!(config.interval, "1h");
        assert_eq!(config.days_back, 180);
        assert_eq!(config.klines_limit, 1000);
    }

    #[test]
    fn test_extract_config_validation() {
        assert!(ExtractConfig::from_lookup(lookup(&[("KLINES_LIMIT", "5000")])).is_err());
        assert!(ExtractConfig::from_lookup(lookup(&[("BINANCE_SPOT_BASE_URL", "ftp://x")])).is_err());
        assert!(ExtractConfig::from_lookup(lookup(&[("DAYS_BACK", "0")])).is_err());
        assert!(ExtractConfig::from_lookup(lookup(&[("HTTP_TIMEOUT_SECS", "0")])).is_err());
        assert_eq!(
            ExtractConfig::from_lookup(lookup(&[("HTTP_TIMEOUT_SECS", "5")])).unwrap().http_timeout_secs,
            5
        );
    }

    #[test]
    fn test_time_range_spans_days_back() {
        let config = ExtractConfig::from_lookup(lookup(&[("DAYS_BACK", "2")])).unwrap();
        let (start, end) = config.time_range_ms();
        assert_eq!(end - start, 2 * 24 * 60 * 60 * 1000);
    }
}
