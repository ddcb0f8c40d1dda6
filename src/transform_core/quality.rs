//! Hourly completeness audit of the fact table
//!
//! Duplicates are counted, never removed: a well-formed fact table holds at
//! most one row per (symbol, open_time).

use super::fact::FactRow;
use super::table::{format_timestamp, round_to, CellValue, Column, TableRow};
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DataQualityRow {
    pub symbol: String,
    #[serde(deserialize_with = "super::table::deserialize_opt_timestamp")]
    pub start_utc: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "super::table::deserialize_opt_timestamp")]
    pub end_utc: Option<DateTime<Utc>>,
    pub expected_hours: i64,
    pub present_unique_hours: i64,
    pub missing_hours: i64,
    pub duplicate_rows: i64,
    pub completeness_pct: f64,
}

impl TableRow for DataQualityRow {
    const TABLE: &'static str = "data_quality";

    const COLUMNS: &'static [Column] = &[
        Column::text("symbol"),
        Column::text("start_utc"),
        Column::text("end_utc"),
        Column::integer("expected_hours"),
        Column::integer("present_unique_hours"),
        Column::integer("missing_hours"),
        Column::integer("duplicate_rows"),
        Column::real("completeness_pct"),
    ];

    fn values(&self) -> Vec<CellValue> {
        let ts = |t: &Option<DateTime<Utc>>| {
            t.as_ref()
                .map(|t| CellValue::Text(format_timestamp(t)))
                .unwrap_or(CellValue::Null)
        };
        vec![
            CellValue::Text(self.symbol.clone()),
            ts(&self.start_utc),
            ts(&self.end_utc),
            CellValue::Integer(self.expected_hours),
            CellValue::Integer(self.present_unique_hours),
            CellValue::Integer(self.missing_hours),
            CellValue::Integer(self.duplicate_rows),
            CellValue::Real(self.completeness_pct),
        ]
    }
}

pub struct DataQualityAuditor;

impl DataQualityAuditor {
    pub fn new() -> Self {
        Self
    }

    /// One row per observed symbol, sorted by symbol
    pub fn audit(&self, fact: &[FactRow]) -> Vec<DataQualityRow> {
        group_by_symbol(fact)
            .into_iter()
            .map(|(symbol, rows)| self.audit_symbol(symbol, &rows))
            .collect()
    }

    /// One row per symbol of `universe` plus any other observed symbol.
    ///
    /// Symbols with no fact rows report zero expected hours.
    pub fn audit_with_universe(&self, fact: &[FactRow], universe: &[String]) -> Vec<DataQualityRow> {
        let mut groups = group_by_symbol(fact);
        for symbol in universe {
            groups.entry(symbol.as_str()).or_default();
        }
        groups
            .into_iter()
            .map(|(symbol, rows)| self.audit_symbol(symbol, &rows))
            .collect()
    }

    pub fn audit_symbol(&self, symbol: &str, rows: &[&FactRow]) -> DataQualityRow {
        let bounds = rows
            .iter()
            .map(|r| r.open_time_utc)
            .fold(None, |acc: Option<(DateTime<Utc>, DateTime<Utc>)>, t| match acc {
                None => Some((t, t)),
                Some((lo, hi)) => Some((lo.min(t), hi.max(t))),
            })
            .map(|(lo, hi)| (floor_hour(lo), floor_hour(hi)));

        let expected_hours = match bounds {
            Some((start, end)) => (end - start).num_hours() + 1,
            None => 0,
        };

        let present_unique_hours = rows
            .iter()
            .map(|r| r.open_time_utc)
            .collect::<HashSet<_>>()
            .len() as i64;
        let duplicate_rows = rows.len() as i64 - present_unique_hours;
        let missing_hours = expected_hours - present_unique_hours;

        let completeness_pct = if expected_hours > 0 {
            round_to(present_unique_hours as f64 / expected_hours as f64 * 100.0, 2)
        } else {
            0.0
        };

        if duplicate_rows > 0 {
            log::warn!("⚠️  {}: {} duplicate hourly rows", symbol, duplicate_rows);
        }
        if missing_hours > 0 {
            log::debug!("{}: {} missing hours of {}", symbol, missing_hours, expected_hours);
        }

        DataQualityRow {
            symbol: symbol.to_string(),
            start_utc: bounds.map(|(start, _)| start),
            end_utc: bounds.map(|(_, end)| end),
            expected_hours,
            present_unique_hours,
            missing_hours,
            duplicate_rows,
            completeness_pct,
        }
    }
}

impl Default for DataQualityAuditor {
    fn default() -> Self {
        Self::new()
    }
}

fn group_by_symbol(fact: &[FactRow]) -> BTreeMap<&str, Vec<&FactRow>> {
    let mut groups: BTreeMap<&str, Vec<&FactRow>> = BTreeMap::new();
    for row in fact {
        groups.entry(row.symbol.as_str()).or_default().push(row);
    }
    groups
}

fn floor_hour(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.duration_trunc(TimeDelta::hours(1)).unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn fact_at(symbol: &str, open_time: DateTime<Utc>) -> FactRow {
        FactRow {
            open_time_utc: open_time,
            close_time_utc: open_time + Duration::milliseconds(3_599_999),
            symbol: symbol.to_string(),
            market: "SPOT".to_string(),
            interval: "1h".to_string(),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume_base: 1.0,
            quote_asset_volume: 1.0,
            trades_count: 1,
        }
    }

    fn hour(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn test_missing_hour_scenario() {
        let rows = vec![fact_at("BTCUSDC", hour(10)), fact_at("BTCUSDC", hour(12)), fact_at("BTCUSDC", hour(13))];
        let report = DataQualityAuditor::new().audit(&rows);

        assert_eq!(report.len(), 1);
        let q = &report[0];
        assert_eq!(q.start_utc, Some(hour(10)));
        assert_eq!(q.end_utc, Some(hour(13)));
        assert_eq!(q.expected_hours, 4);
        assert_eq!(q.present_unique_hours, 3);
        assert_eq!(q.missing_hours, 1);
        assert_eq!(q.duplicate_rows, 0);
        assert_eq!(q.completeness_pct, 75.0);
    }

    #[test]
    fn test_duplicates_counted_not_deduped() {
        let rows = vec![
            fact_at("ETHUSDC", hour(1)),
            fact_at("ETHUSDC", hour(1)),
            fact_at("ETHUSDC", hour(2)),
        ];
        let q = &DataQualityAuditor::new().audit(&rows)[0];

        assert_eq!(q.present_unique_hours, 2);
        assert_eq!(q.duplicate_rows, 1);
        assert_eq!(q.present_unique_hours + q.duplicate_rows, rows.len() as i64);
        assert_eq!(q.completeness_pct, 100.0);
    }

    #[test]
    fn test_bounds_are_hour_floored() {
        let rows = vec![
            fact_at("SOLUSDC", hour(3) + Duration::minutes(30)),
            fact_at("SOLUSDC", hour(5) + Duration::minutes(59)),
        ];
        let q = &DataQualityAuditor::new().audit(&rows)[0];
        assert_eq!(q.start_utc, Some(hour(3)));
        assert_eq!(q.end_utc, Some(hour(5)));
        assert_eq!(q.expected_hours, 3);
    }

    #[test]
    fn test_completeness_tie_rounds_to_even() {
        // 5 of 32 hours is exactly 15.625%
        let rows: Vec<FactRow> = [0, 1, 2, 3, 31]
            .iter()
            .map(|&h| fact_at("BNBUSDC", hour(0) + Duration::hours(h)))
            .collect();
        let q = &DataQualityAuditor::new().audit(&rows)[0];

        assert_eq!(q.expected_hours, 32);
        assert_eq!(q.present_unique_hours, 5);
        assert_eq!(q.completeness_pct, 15.62);
    }

    #[test]
    fn test_single_row_is_complete() {
        let rows = vec![fact_at("ADAUSDC", hour(0))];
        let q = &DataQualityAuditor::new().audit(&rows)[0];
        assert_eq!(q.expected_hours, 1);
        assert_eq!(q.completeness_pct, 100.0);
    }

    #[test]
    fn test_universe_reports_empty_symbols() {
        let rows = vec![fact_at("BTCUSDC", hour(0))];
        let universe = vec!["DOGEUSDC".to_string(), "BTCUSDC".to_string()];
        let report = DataQualityAuditor::new().audit_with_universe(&rows, &universe);

        assert_eq!(report.len(), 2);
        assert_eq!(report[0].symbol, "BTCUSDC");
        let empty = &report[1];
        assert_eq!(empty.symbol, "DOGEUSDC");
        assert_eq!(empty.start_utc, None);
        assert_eq!(empty.expected_hours, 0);
        assert_eq!(empty.missing_hours, 0);
        assert_eq!(empty.completeness_pct, 0.0);
    }

    #[test]
    fn test_empty_fact_table() {
        assert!(DataQualityAuditor::new().audit(&[]).is_empty());
    }

    #[test]
    fn test_sorted_by_symbol() {
        let rows = vec![fact_at("XRPUSDC", hour(0)), fact_at("ADAUSDC", hour(0)), fact_at("BNBUSDC", hour(0))];
        let symbols: Vec<_> = DataQualityAuditor::new()
            .audit(&rows)
            .into_iter()
            .map(|q| q.symbol)
            .collect();
        assert_eq!(symbols, vec!["ADAUSDC", "BNBUSDC", "XRPUSDC"]);
    }
}
