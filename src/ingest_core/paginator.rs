use super::client::{FetchError, KlinePageSource, PageRequest};
use crate::transform_core::fact::Candle;

/// Fetch every candle in `[start_ms, end_ms]` for one symbol.
///
/// The exchange caps each response at `limit` rows, so pages are requested
/// until one comes back empty or short, or the next start reaches `end_ms`.
/// The next page starts 1 ms after the last open time so no candle repeats.
pub async fn fetch_klines_paginated<S>(
    source: &S,
    symbol: &str,
    interval: &str,
    start_ms: i64,
    end_ms: i64,
    limit: usize,
) -> Result<Vec<Candle>, FetchError>
where
    S: KlinePageSource + ?Sized,
{
    let mut all_candles = Vec::new();
    let mut current_start = start_ms;
    let mut pages = 0usize;

    loop {
        let request = PageRequest {
            symbol,
            interval,
            start_ms: current_start,
            end_ms,
            limit,
        };
        let page = source.fetch_page(&request).await?;
        pages += 1;

        let Some(last_open_time_ms) = page.last().map(|c| c.open_time_ms) else {
            break;
        };
        let page_len = page.len();
        all_candles.extend(page);

        log::debug!(
            "   {} page {}: {} candles (total {})",
            symbol,
            pages,
            page_len,
            all_candles.len()
        );

        if page_len < limit {
            break;
        }

        current_start = last_open_time_ms + 1;
        if current_start >= end_ms {
            break;
        }
    }

    Ok(all_candles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const HOUR_MS: i64 = 3_600_000;

    fn candle(open_time_ms: i64) -> Candle {
        Candle {
            open_time_ms,
            open: "1.0".to_string(),
            high: "1.0".to_string(),
            low: "1.0".to_string(),
            close: "1.0".to_string(),
            volume_base: "1.0".to_string(),
            close_time_ms: open_time_ms + HOUR_MS - 1,
            quote_asset_volume: "1.0".to_string(),
            trades_count: 1,
        }
    }

    /// Serves hourly candles from an in-memory series and records every request start
    struct MockSource {
        open_times: Vec<i64>,
        starts: Mutex<Vec<i64>>,
        fail: bool,
    }

    impl MockSource {
        fn hourly(count: i64) -> Self {
            Self {
                open_times: (0..count).map(|i| i * HOUR_MS).collect(),
                starts: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn requested_starts(&self) -> Vec<i64> {
            self.starts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl KlinePageSource for MockSource {
        async fn fetch_page(&self, request: &PageRequest<'_>) -> Result<Vec<Candle>, FetchError> {
            self.starts.lock().unwrap().push(request.start_ms);
            if self.fail {
                return Err(FetchError::Status {
                    status: 400,
                    body: "Invalid symbol.".to_string(),
                });
            }
            Ok(self
                .open_times
                .iter()
                .filter(|t| **t >= request.start_ms && **t <= request.end_ms)
                .take(request.limit)
                .map(|t| candle(*t))
                .collect())
        }
    }

    #[tokio::test]
    async fn test_paginates_without_duplicates() {
        let source = MockSource::hourly(25);
        let candles = fetch_klines_paginated(&source, "BTCUSDC", "1h", 0, 100 * HOUR_MS, 10)
            .await
            .unwrap();

        assert_eq!(candles.len(), 25);
        let open_times: Vec<i64> = candles.iter().map(|c| c.open_time_ms).collect();
        assert_eq!(open_times, (0..25).map(|i| i * HOUR_MS).collect::<Vec<_>>());

        // Two full pages, then a short one
        assert_eq!(source.requested_starts(), vec![0, 9 * HOUR_MS + 1, 19 * HOUR_MS + 1]);
    }

    #[tokio::test]
    async fn test_stops_on_empty_page() {
        let source = MockSource::hourly(20);
        let candles = fetch_klines_paginated(&source, "BTCUSDC", "1h", 0, 100 * HOUR_MS, 10)
            .await
            .unwrap();

        assert_eq!(candles.len(), 20);
        assert_eq!(source.requested_starts().len(), 3);
    }

    #[tokio::test]
    async fn test_stops_when_next_start_reaches_end() {
        let source = MockSource::hourly(50);
        let end_ms = 9 * HOUR_MS;
        let candles = fetch_klines_paginated(&source, "BTCUSDC", "1h", 0, end_ms, 10)
            .await
            .unwrap();

        assert_eq!(candles.len(), 10);
        assert_eq!(source.requested_starts().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_range() {
        let source = MockSource::hourly(0);
        let candles = fetch_klines_paginated(&source, "BTCUSDC", "1h", 0, HOUR_MS, 1000)
            .await
            .unwrap();
        assert!(candles.is_empty());
    }

    #[tokio::test]
    async fn test_page_error_aborts_symbol() {
        let mut source = MockSource::hourly(5);
        source.fail = true;

        let result = fetch_klines_paginated(&source, "NOPEUSDC", "1h", 0, HOUR_MS, 1000).await;
        assert!(matches!(result, Err(FetchError::Status { status: 400, .. })));
    }
}
