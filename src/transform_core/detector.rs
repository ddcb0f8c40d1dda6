//! Anomaly detection over the daily table with a configurable z-score threshold

use super::daily::DailyRow;
use super::scorer::ZScoreScorer;
use super::table::{format_date, round_to, CellValue, Column, TableRow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AnomalyType {
    #[serde(rename = "RETURN_SPIKE")]
    ReturnSpike,
    #[serde(rename = "VOLUME_SPIKE")]
    VolumeSpike,
}

impl AnomalyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyType::ReturnSpike => "RETURN_SPIKE",
            AnomalyType::VolumeSpike => "VOLUME_SPIKE",
        }
    }

    /// Name of the daily column the anomaly is measured on
    pub fn metric(&self) -> &'static str {
        match self {
            AnomalyType::ReturnSpike => "return_1d",
            AnomalyType::VolumeSpike => "value_traded",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnomalyEvent {
    #[serde(deserialize_with = "super::table::deserialize_date")]
    pub date: NaiveDate,
    pub symbol: String,
    pub anomaly_type: AnomalyType,
    pub score: f64,
    pub metric: String,
    pub metric_value: Option<f64>,
}

impl TableRow for AnomalyEvent {
    const TABLE: &'static str = "anomaly_events";

    const COLUMNS: &'static [Column] = &[
        Column::text("date"),
        Column::text("symbol"),
        Column::text("anomaly_type"),
        Column::real("score"),
        Column::text("metric"),
        Column::real("metric_value"),
    ];

    fn values(&self) -> Vec<CellValue> {
        vec![
            CellValue::Text(format_date(&self.date)),
            CellValue::Text(self.symbol.clone()),
            CellValue::Text(self.anomaly_type.as_str().to_string()),
            CellValue::Real(self.score),
            CellValue::Text(self.metric.clone()),
            CellValue::opt_real(self.metric_value),
        ]
    }
}

pub struct AnomalyDetector {
    threshold: f64,
    scorer: ZScoreScorer,
}

impl AnomalyDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            scorer: ZScoreScorer::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(3.0)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Detect events across all symbols, sorted by (date, symbol, anomaly_type)
    ///
    /// # Rules
    /// - **RETURN_SPIKE**: `|z(return_1d)| >= threshold` (crashes and spikes)
    /// - **VOLUME_SPIKE**: `z(value_traded) >= threshold` (high side only)
    ///
    /// Statistics are per symbol over its full daily series. Null returns
    /// count as 0 for scoring only.
    pub fn detect(&self, daily: &[DailyRow]) -> Vec<AnomalyEvent> {
        let mut per_symbol: BTreeMap<&str, Vec<&DailyRow>> = BTreeMap::new();
        for row in daily {
            per_symbol.entry(row.symbol.as_str()).or_default().push(row);
        }

        let mut events = Vec::new();
        for (symbol, rows) in per_symbol {
            let found = self.detect_symbol(&rows);
            if !found.is_empty() {
                log::debug!("🎯 {}: {} anomalies", symbol, found.len());
            }
            events.extend(found);
        }

        events.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then_with(|| a.symbol.cmp(&b.symbol))
                .then_with(|| a.anomaly_type.cmp(&b.anomaly_type))
        });
        events
    }

    fn detect_symbol(&self, rows: &[&DailyRow]) -> Vec<AnomalyEvent> {
        let returns: Vec<f64> = rows.iter().map(|r| r.return_1d.unwrap_or(0.0)).collect();
        let traded: Vec<f64> = rows.iter().map(|r| r.value_traded).collect();

        let z_return = self.scorer.compute_zscores(&returns);
        let z_traded = self.scorer.compute_zscores(&traded);

        let mut events = Vec::new();
        for ((row, zr), zt) in rows.iter().zip(z_return).zip(z_traded) {
            if zr.abs() >= self.threshold {
                events.push(event(row, AnomalyType::ReturnSpike, zr.abs(), row.return_1d));
            }
            if zt >= self.threshold {
                events.push(event(row, AnomalyType::VolumeSpike, zt, Some(row.value_traded)));
            }
        }
        events
    }
}

fn event(row: &DailyRow, anomaly_type: AnomalyType, score: f64, metric_value: Option<f64>) -> AnomalyEvent {
    AnomalyEvent {
        date: row.date,
        symbol: row.symbol.clone(),
        anomaly_type,
        score: round_to(score, 3),
        metric: anomaly_type.metric().to_string(),
        metric_value,
    }
}
