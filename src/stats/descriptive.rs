//! Descriptive statistics over the non-missing values of a metric

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{metrics_present, DayMetrics};
use crate::types::Metric;

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance (n - 1 denominator), `None` below two values
pub fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some(ss / (values.len() - 1) as f64)
}

/// Sample standard deviation, `None` below two values
pub fn sample_std(values: &[f64]) -> Option<f64> {
    sample_variance(values).map(f64::sqrt)
}

/// Summary of one metric across a window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricStats {
    /// Number of non-missing values
    pub count: usize,
    pub mean: f64,
    pub variance: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl MetricStats {
    /// Summarize a set of values; `None` when there are none.
    ///
    /// A single value has zero variance.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mean = mean(values)?;
        let variance = sample_variance(values).unwrap_or(0.0);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            count: values.len(),
            mean,
            variance,
            std: variance.sqrt(),
            min,
            max,
        })
    }
}

/// Base statistics for the mandatory metrics and every extra metric with data.
///
/// Mandatory metrics without data are zero-filled so the output shape stays
/// stable.
pub fn calculate_base_stats(days: &[DayMetrics]) -> BTreeMap<Metric, MetricStats> {
    metrics_present(days)
        .into_iter()
        .filter_map(|metric| {
            let values = super::values_for(days, metric);
            match MetricStats::from_values(&values) {
                Some(stats) => Some((metric, stats)),
                None if metric.is_mandatory() => Some((metric, MetricStats::default())),
                None => None,
            }
        })
        .collect()
}
