//! Exchange klines endpoint client
//!
//! Endpoint: `{base}/api/v3/klines?symbol=..&interval=..&startTime=..&endTime=..&limit=..`
//! Returns: array of kline arrays, oldest first

use super::backoff::{ExponentialBackoff, MaxRetriesExceeded};
use crate::transform_core::fact::{Candle, FactError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

const RETRY_INITIAL_DELAY_MS: u64 = 500;
const RETRY_MAX_DELAY_MS: u64 = 10_000;

#[derive(Debug)]
pub enum FetchError {
    Http(reqwest::Error),
    Status { status: u16, body: String },
    MalformedKline(FactError),
    MaxRetriesExceeded { symbol: String, last_error: String },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Http(err)
    }
}

impl From<FactError> for FetchError {
    fn from(err: FactError) -> Self {
        FetchError::MalformedKline(err)
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Http(e) => write!(f, "HTTP error: {}", e),
            FetchError::Status { status, body } => write!(f, "Klines API error {}: {}", status, body),
            FetchError::MalformedKline(e) => write!(f, "{}", e),
            FetchError::MaxRetriesExceeded { symbol, last_error } => {
                write!(f, "{} for {}: {}", MaxRetriesExceeded, symbol, last_error)
            }
        }
    }
}

impl std::error::Error for FetchError {}

impl FetchError {
    /// Connect/timeout failures, rate limiting and server errors are worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http(e) => e.is_connect() || e.is_timeout(),
            FetchError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS.as_u16() || (500..600).contains(status)
            }
            _ => false,
        }
    }
}

/// One page request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest<'a> {
    pub symbol: &'a str,
    pub interval: &'a str,
    pub start_ms: i64,
    pub end_ms: i64,
    pub limit: usize,
}

/// Source of kline pages
#[async_trait]
pub trait KlinePageSource: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest<'_>) -> Result<Vec<Candle>, FetchError>;
}

pub struct BinanceKlinesClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl BinanceKlinesClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration, max_retries: u32) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            max_retries,
        })
    }

    pub fn klines_url(&self) -> String {
        format!("{}/api/v3/klines", self.base_url)
    }

    async fn fetch_once(&self, request: &PageRequest<'_>) -> Result<Vec<Candle>, FetchError> {
        let response = self
            .client
            .get(self.klines_url())
            .query(&[
                ("symbol", request.symbol.to_string()),
                ("interval", request.interval.to_string()),
                ("startTime", request.start_ms.to_string()),
                ("endTime", request.end_ms.to_string()),
                ("limit", request.limit.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let rows: Vec<Vec<Value>> = response.json().await?;
        parse_kline_rows(&rows)
    }
}

#[async_trait]
impl KlinePageSource for BinanceKlinesClient {
    async fn fetch_page(&self, request: &PageRequest<'_>) -> Result<Vec<Candle>, FetchError> {
        let mut backoff = ExponentialBackoff::new(RETRY_INITIAL_DELAY_MS, RETRY_MAX_DELAY_MS, self.max_retries);

        loop {
            match self.fetch_once(request).await {
                Ok(candles) => return Ok(candles),
                Err(e) if e.is_transient() => {
                    log::warn!("⚠️  {} page from {} failed: {}", request.symbol, request.start_ms, e);
                    if backoff.sleep().await.is_err() {
                        return Err(FetchError::MaxRetriesExceeded {
                            symbol: request.symbol.to_string(),
                            last_error: e.to_string(),
                        });
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Decode a klines response body; one malformed row fails the page
pub fn parse_kline_rows(rows: &[Vec<Value>]) -> Result<Vec<Candle>, FetchError> {
    rows.iter()
        .map(|row| Candle::from_kline_values(row).map_err(FetchError::from))
        .collect()
}
