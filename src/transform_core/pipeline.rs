//! One-shot transform run: fact table in, four derived tables out
//!
//! Every stage reads an immutable input table and returns a new one; the
//! run recomputes everything from scratch.

use super::daily::{DailyAggregator, DailyRow};
use super::detector::{AnomalyDetector, AnomalyEvent, AnomalyType};
use super::dim_symbol::{SymbolDimBuilder, SymbolDimRow};
use super::fact::FactRow;
use super::quality::{DataQualityAuditor, DataQualityRow};
use super::writer::TableWriter;
use super::writer_backend::TableWriterError;
use crate::config::TransformConfig;

#[derive(Debug, Clone, Default)]
pub struct TransformOutput {
    pub dim_symbol: Vec<SymbolDimRow>,
    pub agg_daily: Vec<DailyRow>,
    pub data_quality: Vec<DataQualityRow>,
    pub anomaly_events: Vec<AnomalyEvent>,
}

impl TransformOutput {
    /// Persist all four tables; anomaly events are written even when empty
    pub fn write_all(&self, writer: &mut TableWriter) -> Result<(), TableWriterError> {
        writer.write_table(&self.dim_symbol)?;
        writer.write_table(&self.agg_daily)?;
        writer.write_table(&self.data_quality)?;
        writer.write_table(&self.anomaly_events)?;
        Ok(())
    }

    pub fn anomaly_count(&self, anomaly_type: AnomalyType) -> usize {
        self.anomaly_events
            .iter()
            .filter(|e| e.anomaly_type == anomaly_type)
            .count()
    }

    pub fn log_summary(&self) {
        log::info!("📊 Transform summary:");
        log::info!("   dim_symbol: {} rows", self.dim_symbol.len());
        log::info!("   agg_daily: {} rows", self.agg_daily.len());
        log::info!("   data_quality: {} rows", self.data_quality.len());
        log::info!(
            "   anomaly_events: {} ({} RETURN_SPIKE, {} VOLUME_SPIKE)",
            self.anomaly_events.len(),
            self.anomaly_count(AnomalyType::ReturnSpike),
            self.anomaly_count(AnomalyType::VolumeSpike)
        );

        for q in self.data_quality.iter().filter(|q| q.completeness_pct < 100.0) {
            log::warn!(
                "⚠️  {} completeness {:.2}% ({} missing, {} duplicates)",
                q.symbol,
                q.completeness_pct,
                q.missing_hours,
                q.duplicate_rows
            );
        }
    }
}

pub fn run_transform(fact: &[FactRow], config: &TransformConfig) -> TransformOutput {
    log::info!("⏱️  Transforming {} fact rows...", fact.len());

    let dim_symbol = SymbolDimBuilder::new(config.quote_suffix.clone(), config.fallback_quote_len).build(fact);
    let agg_daily = DailyAggregator::new(config.vol_window, config.dd_window).aggregate(fact);
    let data_quality = DataQualityAuditor::new().audit_with_universe(fact, &config.symbols);
    let anomaly_events = AnomalyDetector::new(config.zscore_threshold).detect(&agg_daily);

    TransformOutput {
        dim_symbol,
        agg_daily,
        data_quality,
        anomaly_events,
    }
}
