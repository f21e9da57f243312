//! Recency-weighted trend classification
//!
//! Fits a weighted least-squares line of metric value against calendar day.
//! The i-th of n values (in date order) carries weight `0.95^(n-1-i)`, so the
//! most recent day has weight 1. Weights apply to the unsquared residuals,
//! which puts `w²` into the normal equations.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{metrics_present, DayMetrics};
use crate::types::Metric;

/// Slope (units per day) beyond which a metric counts as trending
pub const TREND_SLOPE_THRESHOLD: f64 = 0.15;

/// Per-day decay applied going back in time
pub const RECENCY_DECAY: f64 = 0.95;

/// Minimum non-missing values for a fit
pub const MIN_TREND_POINTS: usize = 3;

/// Fitted slopes are rounded to this many units per day before classifying
const SLOPE_ROUNDING: f64 = 1e12;

/// Coarse direction of a metric across the window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendClass {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

impl TrendClass {
    /// Classify a slope; the threshold itself is stable
    pub fn from_slope(slope: f64, threshold: f64) -> Self {
        if slope > threshold {
            TrendClass::Increasing
        } else if slope < -threshold {
            TrendClass::Decreasing
        } else {
            TrendClass::Stable
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendClass::Increasing => "increasing",
            TrendClass::Decreasing => "decreasing",
            TrendClass::Stable => "stable",
            TrendClass::InsufficientData => "insufficient_data",
        }
    }
}

/// Trend classification and fitted slope
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    pub trend: TrendClass,
    pub slope: f64,
}

impl TrendResult {
    pub fn insufficient() -> Self {
        Self {
            trend: TrendClass::InsufficientData,
            slope: 0.0,
        }
    }
}

/// Slope of a weighted least-squares line; `None` if x has no spread
pub fn weighted_slope(xs: &[f64], ys: &[f64], weights: &[f64]) -> Option<f64> {
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return None;
    }

    let mean_x = xs.iter().zip(weights).map(|(x, w)| w * x).sum::<f64>() / total;
    let mean_y = ys.iter().zip(weights).map(|(y, w)| w * y).sum::<f64>() / total;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for ((x, y), w) in xs.iter().zip(ys).zip(weights) {
        let dx = x - mean_x;
        sxy += w * dx * (y - mean_y);
        sxx += w * dx * dx;
    }

    if sxx.abs() < f64::EPSILON {
        return None;
    }
    Some(sxy / sxx)
}

/// Classify the trend of dated values (missing values already removed)
pub fn identify_trend(points: &[(NaiveDate, f64)]) -> TrendResult {
    if points.len() < MIN_TREND_POINTS {
        return TrendResult::insufficient();
    }

    let mut sorted = points.to_vec();
    sorted.sort_by_key(|(date, _)| *date);

    let n = sorted.len();
    let xs: Vec<f64> = sorted
        .iter()
        .map(|(date, _)| date.num_days_from_ce() as f64)
        .collect();
    let ys: Vec<f64> = sorted.iter().map(|(_, v)| *v).collect();
    let weights: Vec<f64> = (0..n)
        .map(|i| RECENCY_DECAY.powi((n - i - 1) as i32).powi(2))
        .collect();

    let slope = weighted_slope(&xs, &ys, &weights)
        .map(|s| (s * SLOPE_ROUNDING).round() / SLOPE_ROUNDING)
        .unwrap_or(0.0);

    TrendResult {
        trend: TrendClass::from_slope(slope, TREND_SLOPE_THRESHOLD),
        slope,
    }
}

/// Trends for the mandatory metrics and every extra metric with data.
///
/// Metrics with too few values stay in the output as `insufficient_data`.
pub fn calculate_trends(days: &[DayMetrics]) -> BTreeMap<Metric, TrendResult> {
    metrics_present(days)
        .into_iter()
        .map(|metric| {
            let points: Vec<(NaiveDate, f64)> = days
                .iter()
                .filter_map(|d| Some((d.date, d.get(metric)?)))
                .collect();
            (metric, identify_trend(&points))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::test_support::day;
    use chrono::Duration;

    fn dated(values: &[f64]) -> Vec<(NaiveDate, f64)> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (start + Duration::days(i as i64), *v))
            .collect()
    }

    #[test]
    fn test_threshold_slope_is_stable() {
        assert_eq!(TrendClass::from_slope(0.15, TREND_SLOPE_THRESHOLD), TrendClass::Stable);
        assert_eq!(TrendClass::from_slope(-0.15, TREND_SLOPE_THRESHOLD), TrendClass::Stable);
        assert_eq!(
            TrendClass::from_slope(0.1500001, TREND_SLOPE_THRESHOLD),
            TrendClass::Increasing
        );
        assert_eq!(
            TrendClass::from_slope(-0.1500001, TREND_SLOPE_THRESHOLD),
            TrendClass::Decreasing
        );
    }

    #[test]
    fn test_fitted_threshold_step_is_stable() {
        for base in [0.0, 1.0, 10.0] {
            let result = identify_trend(&dated(&[base, base + 0.15, base + 0.30]));
            assert_eq!(result.trend, TrendClass::Stable, "base {base}");
            assert_eq!(result.slope, 0.15);

            let falling = identify_trend(&dated(&[base + 0.30, base + 0.15, base]));
            assert_eq!(falling.trend, TrendClass::Stable, "base {base}");
        }
    }

    #[test]
    fn test_three_points_below_threshold_are_stable() {
        // Exactly representable slope of 0.125 per day
        let result = identify_trend(&dated(&[1.0, 1.125, 1.25]));
        assert_eq!(result.trend, TrendClass::Stable);
        assert!((result.slope - 0.125).abs() < 1e-9);
    }

    #[test]
    fn test_linear_series_recovers_slope_regardless_of_weights() {
        let values: Vec<f64> = (0..14).map(|i| 100.0 + 25.0 * i as f64).collect();
        let result = identify_trend(&dated(&values));
        assert_eq!(result.trend, TrendClass::Increasing);
        assert!((result.slope - 25.0).abs() < 1e-6);

        let falling: Vec<f64> = values.iter().rev().copied().collect();
        assert_eq!(identify_trend(&dated(&falling)).trend, TrendClass::Decreasing);
    }

    #[test]
    fn test_recent_days_dominate_fit() {
        // Flat for ten days, then climbing: the fit should see the climb
        let mut values = vec![7.0; 10];
        values.extend([8.0, 9.0, 10.0, 11.0]);
        let weighted = identify_trend(&dated(&values)).slope;

        let xs: Vec<f64> = (0..14).map(|i| i as f64).collect();
        let unweighted = weighted_slope(&xs, &values, &[1.0; 14]).unwrap();
        assert!(weighted > unweighted);
    }

    #[test]
    fn test_fewer_than_three_points_is_insufficient() {
        let result = identify_trend(&dated(&[5.0, 6.0]));
        assert_eq!(result, TrendResult::insufficient());
        assert_eq!(result.trend.as_str(), "insufficient_data");
    }

    #[test]
    fn test_unsorted_input_is_sorted_by_date() {
        let mut points = dated(&[1.0, 2.0, 3.0, 4.0]);
        points.reverse();
        let result = identify_trend(&points);
        assert!((result.slope - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_calculate_trends_keeps_insufficient_mandatory_metrics() {
        let days = vec![
            day(15, Some(4000.0), None, &[]),
            day(16, Some(5000.0), Some(7.0), &[]),
            day(17, Some(6000.0), None, &[]),
        ];
        let trends = calculate_trends(&days);
        assert_eq!(trends[&Metric::Steps].trend, TrendClass::Increasing);
        assert_eq!(trends[&Metric::SleepHours].trend, TrendClass::InsufficientData);
        assert!(!trends.contains_key(&Metric::Calories));
    }
}
