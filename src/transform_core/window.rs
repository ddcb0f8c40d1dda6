//! Row-count rolling windows for daily KPIs
//!
//! Windows count observations, not calendar days: a gap in a daily series
//! makes the window span more calendar time than its nominal length.

use std::collections::VecDeque;

/// Window sizing: length in rows and minimum non-null values required
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSpec {
    pub length: usize,
    pub min_periods: usize,
}

impl WindowSpec {
    pub const fn new(length: usize, min_periods: usize) -> Self {
        Self { length, min_periods }
    }
}

/// Bounded buffer holding the trailing `length` observations.
///
/// Null and NaN observations occupy a slot but do not count towards
/// `min_periods`. Infinities are kept.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    spec: WindowSpec,
    values: VecDeque<Option<f64>>,
}

impl RollingWindow {
    pub fn new(spec: WindowSpec) -> Self {
        Self {
            spec,
            values: VecDeque::with_capacity(spec.length),
        }
    }

    pub fn push(&mut self, value: Option<f64>) {
        if self.values.len() == self.spec.length {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn present(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().filter_map(|v| *v).filter(|v| !v.is_nan())
    }

    fn ready(&self) -> Option<usize> {
        let count = self.present().count();
        (count >= self.spec.min_periods.max(1)).then_some(count)
    }

    /// Sample standard deviation (n - 1) of the present values
    pub fn std(&self) -> Option<f64> {
        let n = self.ready()?;
        if n < 2 {
            return None;
        }
        let mean = self.present().sum::<f64>() / n as f64;
        let sum_sq = self.present().map(|v| (v - mean).powi(2)).sum::<f64>();
        Some((sum_sq / (n - 1) as f64).sqrt())
    }

    /// Minimum of the present values
    pub fn min(&self) -> Option<f64> {
        self.ready()?;
        Some(self.present().fold(f64::INFINITY, f64::min))
    }
}
