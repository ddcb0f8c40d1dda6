//! Daily aggregation and rolling KPIs
//!
//! Hourly facts are reduced to one row per (symbol, UTC date), then each
//! symbol's series is scanned in date order to derive returns, rolling
//! volatility and drawdown. Rolling state never crosses symbol boundaries.

use super::fact::FactRow;
use super::table::{format_date, CellValue, Column, TableRow};
use super::window::{RollingWindow, WindowSpec};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DailyRow {
    #[serde(deserialize_with = "super::table::deserialize_date")]
    pub date: NaiveDate,
    pub symbol: String,
    pub market: String,
    pub interval: String,
    pub close: f64,
    pub return_1d: Option<f64>,
    pub vol_7d: Option<f64>,
    pub drawdown: f64,
    pub max_dd_30d: Option<f64>,
    pub volume_base: f64,
    pub value_traded: f64,
    pub trades_count: i64,
}

impl TableRow for DailyRow {
    const TABLE: &'static str = "agg_daily";

    const COLUMNS: &'static [Column] = &[
        Column::text("date"),
        Column::text("symbol"),
        Column::text("market"),
        Column::text("interval"),
        Column::real("close"),
        Column::real("return_1d"),
        Column::real("vol_7d"),
        Column::real("drawdown"),
        Column::real("max_dd_30d"),
        Column::real("volume_base"),
        Column::real("value_traded"),
        Column::integer("trades_count"),
    ];

    fn values(&self) -> Vec<CellValue> {
        vec![
            CellValue::Text(format_date(&self.date)),
            CellValue::Text(self.symbol.clone()),
            CellValue::Text(self.market.clone()),
            CellValue::Text(self.interval.clone()),
            CellValue::Real(self.close),
            CellValue::opt_real(self.return_1d),
            CellValue::opt_real(self.vol_7d),
            CellValue::Real(self.drawdown),
            CellValue::opt_real(self.max_dd_30d),
            CellValue::Real(self.volume_base),
            CellValue::Real(self.value_traded),
            CellValue::Integer(self.trades_count),
        ]
    }
}

type DayKey = (String, String, String, NaiveDate);

/// Per-day reduction state
#[derive(Debug)]
struct DayBucket {
    last_open_time: chrono::DateTime<chrono::Utc>,
    close: f64,
    volume_base: f64,
    value_traded: f64,
    trades_count: i64,
}

pub struct DailyAggregator {
    vol_window: WindowSpec,
    dd_window: WindowSpec,
}

impl DailyAggregator {
    pub fn new(vol_window: WindowSpec, dd_window: WindowSpec) -> Self {
        Self { vol_window, dd_window }
    }

    pub fn with_defaults() -> Self {
        Self::new(WindowSpec::new(7, 3), WindowSpec::new(30, 5))
    }

    /// Build the daily table ordered by (symbol, date). Empty input gives an empty table.
    pub fn aggregate(&self, fact: &[FactRow]) -> Vec<DailyRow> {
        let mut buckets: BTreeMap<DayKey, DayBucket> = BTreeMap::new();

        for row in fact {
            let key = (
                row.symbol.clone(),
                row.market.clone(),
                row.interval.clone(),
                row.open_time_utc.date_naive(),
            );
            let traded = row.close * row.volume_base;

            match buckets.get_mut(&key) {
                Some(bucket) => {
                    // Later-or-equal open time wins the close, so input order does not matter
                    if row.open_time_utc >= bucket.last_open_time {
                        bucket.last_open_time = row.open_time_utc;
                        bucket.close = row.close;
                    }
                    bucket.volume_base += row.volume_base;
                    bucket.value_traded += traded;
                    bucket.trades_count += row.trades_count;
                }
                None => {
                    buckets.insert(
                        key,
                        DayBucket {
                            last_open_time: row.open_time_utc,
                            close: row.close,
                            volume_base: row.volume_base,
                            value_traded: traded,
                            trades_count: row.trades_count,
                        },
                    );
                }
            }
        }

        // Group by symbol, keeping the daily rows of each symbol in date order
        let mut per_symbol: BTreeMap<String, Vec<(DayKey, DayBucket)>> = BTreeMap::new();
        for (key, bucket) in buckets {
            per_symbol.entry(key.0.clone()).or_default().push((key, bucket));
        }

        let mut daily = Vec::new();
        for (symbol, mut days) in per_symbol {
            days.sort_by(|(a, _), (b, _)| a.3.cmp(&b.3).then_with(|| a.cmp(b)));
            log::debug!("📅 {}: {} daily rows", symbol, days.len());
            self.scan_symbol(days, &mut daily);
        }

        daily
    }

    /// Sequential KPI scan over one symbol's date-ordered days
    fn scan_symbol(&self, days: Vec<(DayKey, DayBucket)>, out: &mut Vec<DailyRow>) {
        let mut returns = RollingWindow::new(self.vol_window);
        let mut drawdowns = RollingWindow::new(self.dd_window);
        let mut prev_close: Option<f64> = None;
        let mut running_max = f64::NEG_INFINITY;

        for ((symbol, market, interval, date), bucket) in days {
            let close = bucket.close;

            let return_1d = prev_close.map(|prev| close / prev - 1.0);
            if let Some(r) = return_1d {
                if !r.is_finite() {
                    log::warn!("⚠️  Non-finite return_1d for {} on {} (prior close 0?)", symbol, date);
                }
            }
            returns.push(return_1d);
            let vol_7d = returns.std();

            running_max = running_max.max(close);
            let drawdown = close / running_max - 1.0;
            drawdowns.push(Some(drawdown));
            let max_dd_30d = drawdowns.min();

            out.push(DailyRow {
                date,
                symbol,
                market,
                interval,
                close,
                return_1d,
                vol_7d,
                drawdown,
                max_dd_30d,
                volume_base: bucket.volume_base,
                value_traded: bucket.value_traded,
                trades_count: bucket.trades_count,
            });

            prev_close = Some(close);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn fact(symbol: &str, open_time: DateTime<Utc>, close: f64, volume: f64) -> FactRow {
        FactRow {
            open_time_utc: open_time,
            close_time_utc: open_time + Duration::milliseconds(3_599_999),
            symbol: symbol.to_string(),
            market: "SPOT".to_string(),
            interval: "1h".to_string(),
            open: close,
            high: close,
            low: close,
            close,
            volume_base: volume,
            quote_asset_volume: close * volume,
            trades_count: 10,
        }
    }

    fn daily_closes(symbol: &str, closes: &[f64]) -> Vec<FactRow> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 23, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| fact(symbol, start + Duration::days(i as i64), c, 1.0))
            .collect()
    }

    #[test]
    fn test_daily_reduction() {
        let day = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let rows = vec![
            fact("BTCUSDC", day + Duration::hours(2), 102.0, 2.0),
            fact("BTCUSDC", day, 100.0, 1.0),
            fact("BTCUSDC", day + Duration::hours(1), 101.0, 3.0),
        ];

        let daily = DailyAggregator::with_defaults().aggregate(&rows);
        assert_eq!(daily.len(), 1);
        let d = &daily[0];
        assert_eq!(d.close, 102.0, "close comes from the last hour, not the last row");
        assert_eq!(d.volume_base, 6.0);
        assert_eq!(d.value_traded, 100.0 + 303.0 + 204.0);
        assert_eq!(d.trades_count, 30);
        assert_eq!(d.return_1d, None);
    }

    #[test]
    fn test_drawdown_scenario() {
        let rows = daily_closes("BTCUSDC", &[100.0, 100.0, 50.0, 100.0, 100.0, 100.0, 100.0, 100.0]);
        let daily = DailyAggregator::with_defaults().aggregate(&rows);

        assert_eq!(daily.len(), 8);
        assert_eq!(daily[2].return_1d, Some(-0.5));
        assert_eq!(daily[2].drawdown, -0.5);
        assert_eq!(daily[3].return_1d, Some(1.0));
        assert_eq!(daily[3].drawdown, 0.0);

        // max_dd_30d needs 5 observations
        assert!(daily[..4].iter().all(|d| d.max_dd_30d.is_none()));
        assert_eq!(daily[4].max_dd_30d, Some(-0.5));
        assert_eq!(daily[7].max_dd_30d, Some(-0.5));
    }

    #[test]
    fn test_vol_7d_min_periods() {
        let rows = daily_closes("ETHUSDC", &[10.0, 11.0, 12.1, 10.89, 10.89]);
        let daily = DailyAggregator::with_defaults().aggregate(&rows);

        // row 0 has no return, rows 1-2 hold only two returns
        assert!(daily[..3].iter().all(|d| d.vol_7d.is_none()));
        let vol = daily[3].vol_7d.unwrap();
        let rs = [0.1, 0.1, -0.1];
        let mean = rs.iter().sum::<f64>() / 3.0;
        let expected = (rs.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / 2.0).sqrt();
        assert!((vol - expected).abs() < 1e-9, "{} vs {}", vol, expected);
        assert!(daily[4].vol_7d.is_some());
    }

    #[test]
    fn test_symbols_do_not_share_state() {
        let mut rows = daily_closes("AAAUSDC", &[100.0, 200.0]);
        rows.extend(daily_closes("BBBUSDC", &[50.0, 25.0]));

        let daily = DailyAggregator::with_defaults().aggregate(&rows);
        assert_eq!(daily.len(), 4);
        assert_eq!(daily[0].symbol, "AAAUSDC");
        assert_eq!(daily[2].symbol, "BBBUSDC");
        assert_eq!(daily[2].return_1d, None, "first row of a symbol has no return");
        assert_eq!(daily[2].drawdown, 0.0, "running max resets per symbol");
        assert_eq!(daily[3].drawdown, -0.5);
    }

    fn brute_force_vol(daily: &[DailyRow], i: usize) -> Option<f64> {
        let rs: Vec<f64> = daily[i.saturating_sub(6)..=i].iter().filter_map(|d| d.return_1d).collect();
        if rs.len() < 3 {
            return None;
        }
        let mean = rs.iter().sum::<f64>() / rs.len() as f64;
        let var = rs.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (rs.len() - 1) as f64;
        Some(var.sqrt())
    }

    #[test]
    fn test_ordering_and_invariants() {
        // 40 days so both windows roll past their full length; day 2 crashes
        let closes: Vec<f64> = (0..40)
            .map(|i| if i == 2 { 0.2 } else { 1.0 + ((i * 37) % 17) as f64 / 100.0 })
            .collect();
        let mut rows = daily_closes("XRPUSDC", &closes);
        rows.reverse();
        let daily = DailyAggregator::with_defaults().aggregate(&rows);
        assert_eq!(daily.len(), 40);

        for pair in daily.windows(2) {
            assert!(pair[0].date < pair[1].date);
        }
        for (i, d) in daily.iter().enumerate() {
            assert!(d.drawdown <= 0.0);
            assert_eq!(d.return_1d.is_none(), i == 0);

            match (d.vol_7d, brute_force_vol(&daily, i)) {
                (Some(got), Some(expected)) => assert!((got - expected).abs() < 1e-12, "row {}", i),
                (got, expected) => assert_eq!(got, expected, "row {}", i),
            }

            let lo = i.saturating_sub(29);
            let expected_mdd = daily[lo..=i].iter().map(|x| x.drawdown).fold(f64::INFINITY, f64::min);
            if i >= 4 {
                assert_eq!(d.max_dd_30d, Some(expected_mdd), "row {}", i);
                assert!(expected_mdd <= d.drawdown);
            } else {
                assert_eq!(d.max_dd_30d, None);
            }
        }

        // The day-2 crash leaves the 30-row window after row 31
        let crash = daily[2].drawdown;
        assert_eq!(daily[31].max_dd_30d, Some(crash));
        assert!(daily[32].max_dd_30d.unwrap() > crash);
        assert!(daily[39].max_dd_30d.unwrap() > crash);
    }

    #[test]
    fn test_zero_close_surfaces_non_finite_return() {
        let rows = daily_closes("ZERUSDC", &[0.0, 5.0]);
        let daily = DailyAggregator::with_defaults().aggregate(&rows);
        assert!(daily[1].return_1d.unwrap().is_infinite());
    }

    #[test]
    fn test_nan_drawdown_skipped_by_rolling_min() {
        // 0/0 drawdown while the running max is still 0
        let rows = daily_closes("NANUSDC", &[0.0, 0.0, 1.0, 0.5, 0.5, 0.5, 0.5]);
        let daily = DailyAggregator::with_defaults().aggregate(&rows);

        assert!(daily[0].drawdown.is_nan());
        assert!(daily[1].drawdown.is_nan());
        assert_eq!(daily[5].max_dd_30d, None, "only four non-NaN drawdowns");
        assert_eq!(daily[6].max_dd_30d, Some(-0.5));
    }

    #[test]
    fn test_empty_fact_table() {
        assert!(DailyAggregator::with_defaults().aggregate(&[]).is_empty());
    }
}
