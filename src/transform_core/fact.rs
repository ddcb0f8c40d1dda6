//! Candle normalization into the hourly fact table

use super::table::{format_timestamp, CellValue, Column, TableRow};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

pub const MARKET_SPOT: &str = "SPOT";

/// Raw hourly candle as delivered by the exchange.
///
/// Prices and volumes stay in their decimal string form until the fact
/// table builder coerces them.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub open_time_ms: i64,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume_base: String,
    pub close_time_ms: i64,
    pub quote_asset_volume: String,
    pub trades_count: i64,
}

impl Candle {
    /// Parse one kline array (`[open_time, "open", "high", "low", "close",
    /// "volume", close_time, "quote_volume", trades, ...]`).
    ///
    /// Trailing fields (taker volumes, ignore) are dropped.
    pub fn from_kline_values(values: &[Value]) -> Result<Self, FactError> {
        if values.len() < 9 {
            return Err(FactError::MalformedKline(format!(
                "expected at least 9 fields, got {}",
                values.len()
            )));
        }

        Ok(Self {
            open_time_ms: integer_field(&values[0], "open_time_ms")?,
            open: decimal_field(&values[1], "open")?,
            high: decimal_field(&values[2], "high")?,
            low: decimal_field(&values[3], "low")?,
            close: decimal_field(&values[4], "close")?,
            volume_base: decimal_field(&values[5], "volume_base")?,
            close_time_ms: integer_field(&values[6], "close_time_ms")?,
            quote_asset_volume: decimal_field(&values[7], "quote_asset_volume")?,
            trades_count: integer_field(&values[8], "trades_count")?,
        })
    }
}

fn integer_field(value: &Value, field: &str) -> Result<i64, FactError> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| FactError::MalformedKline(format!("{} is not an integer: {}", field, value)))
}

fn decimal_field(value: &Value, field: &str) -> Result<String, FactError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(FactError::MalformedKline(format!(
            "{} is not a decimal: {}",
            field, value
        ))),
    }
}

/// One row per (symbol, hour)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FactRow {
    #[serde(deserialize_with = "super::table::deserialize_timestamp")]
    pub open_time_utc: DateTime<Utc>,
    #[serde(deserialize_with = "super::table::deserialize_timestamp")]
    pub close_time_utc: DateTime<Utc>,
    pub symbol: String,
    pub market: String,
    pub interval: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume_base: f64,
    pub quote_asset_volume: f64,
    pub trades_count: i64,
}

impl TableRow for FactRow {
    const TABLE: &'static str = "fact_klines_1h";

    const COLUMNS: &'static [Column] = &[
        Column::text("open_time_utc"),
        Column::text("close_time_utc"),
        Column::text("symbol"),
        Column::text("market"),
        Column::text("interval"),
        Column::real("open"),
        Column::real("high"),
        Column::real("low"),
        Column::real("close"),
        Column::real("volume_base"),
        Column::real("quote_asset_volume"),
        Column::integer("trades_count"),
    ];

    fn values(&self) -> Vec<CellValue> {
        vec![
            CellValue::Text(format_timestamp(&self.open_time_utc)),
            CellValue::Text(format_timestamp(&self.close_time_utc)),
            CellValue::Text(self.symbol.clone()),
            CellValue::Text(self.market.clone()),
            CellValue::Text(self.interval.clone()),
            CellValue::Real(self.open),
            CellValue::Real(self.high),
            CellValue::Real(self.low),
            CellValue::Real(self.close),
            CellValue::Real(self.volume_base),
            CellValue::Real(self.quote_asset_volume),
            CellValue::Integer(self.trades_count),
        ]
    }
}

#[derive(Debug)]
pub enum FactError {
    MalformedKline(String),
    InvalidNumber {
        symbol: String,
        field: &'static str,
        value: String,
    },
    InvalidTimestamp {
        symbol: String,
        field: &'static str,
        value: i64,
    },
}

impl std::fmt::Display for FactError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FactError::MalformedKline(msg) => write!(f, "Malformed kline: {}", msg),
            FactError::InvalidNumber { symbol, field, value } => {
                write!(f, "Invalid number for {} {}: {:?}", symbol, field, value)
            }
            FactError::InvalidTimestamp { symbol, field, value } => {
                write!(f, "Invalid timestamp for {} {}: {}", symbol, field, value)
            }
        }
    }
}

impl std::error::Error for FactError {}

/// Builds fact rows for one symbol batch
pub struct FactTableBuilder {
    market: String,
    interval: String,
}

impl FactTableBuilder {
    pub fn new(interval: impl Into<String>) -> Self {
        Self {
            market: MARKET_SPOT.to_string(),
            interval: interval.into(),
        }
    }

    /// Normalize a symbol's candles. Any coercion failure fails the whole batch.
    pub fn build(&self, symbol: &str, candles: &[Candle]) -> Result<Vec<FactRow>, FactError> {
        candles
            .iter()
            .map(|candle| self.build_row(symbol, candle))
            .collect()
    }

    fn build_row(&self, symbol: &str, candle: &Candle) -> Result<FactRow, FactError> {
        Ok(FactRow {
            open_time_utc: to_utc(symbol, "open_time_ms", candle.open_time_ms)?,
            close_time_utc: to_utc(symbol, "close_time_ms", candle.close_time_ms)?,
            symbol: symbol.to_string(),
            market: self.market.clone(),
            interval: self.interval.clone(),
            open: to_f64(symbol, "open", &candle.open)?,
            high: to_f64(symbol, "high", &candle.high)?,
            low: to_f64(symbol, "low", &candle.low)?,
            close: to_f64(symbol, "close", &candle.close)?,
            volume_base: to_f64(symbol, "volume_base", &candle.volume_base)?,
            quote_asset_volume: to_f64(symbol, "quote_asset_volume", &candle.quote_asset_volume)?,
            trades_count: candle.trades_count,
        })
    }
}

fn to_f64(symbol: &str, field: &'static str, raw: &str) -> Result<f64, FactError> {
    raw.trim().parse::<f64>().map_err(|_| FactError::InvalidNumber {
        symbol: symbol.to_string(),
        field,
        value: raw.to_string(),
    })
}

fn to_utc(symbol: &str, field: &'static str, ms: i64) -> Result<DateTime<Utc>, FactError> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| FactError::InvalidTimestamp {
        symbol: symbol.to_string(),
        field,
        value: ms,
    })
}
