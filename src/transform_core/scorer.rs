//! Whole-series z-scores

pub struct ZScoreScorer;

impl ZScoreScorer {
    pub fn new() -> Self {
        Self
    }

    /// Population z-score of every value against the whole series.
    ///
    /// A constant series, or one whose mean/std is not finite, scores 0
    /// everywhere instead of dividing by zero.
    pub fn compute_zscores(&self, values: &[f64]) -> Vec<f64> {
        if values.is_empty() {
            return Vec::new();
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();

        // Summation error of a constant series stays within n ulps of the mean
        let noise_floor = mean.abs() * f64::EPSILON * n;
        if !mean.is_finite() || !std.is_finite() || std <= noise_floor {
            return vec![0.0; values.len()];
        }

        values.iter().map(|v| (v - mean) / std).collect()
    }
}

impl Default for ZScoreScorer {
    fn default() -> Self {
        Self::new()
    }
}
