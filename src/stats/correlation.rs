//! Pairwise Pearson correlations between window metrics

use std::collections::BTreeMap;

use super::DayMetrics;
use crate::types::Metric;

/// Minimum number of days with both values present
pub const MIN_CORRELATION_ROWS: usize = 3;

/// Metric pairs reported in the statistics bundle
pub const CORRELATION_PAIRS: [(Metric, Metric); 6] = [
    (Metric::Steps, Metric::SleepHours),
    (Metric::Steps, Metric::RestingHr),
    (Metric::ActiveMinutes, Metric::SleepHours),
    (Metric::ActiveMinutes, Metric::RestingHr),
    (Metric::Calories, Metric::Steps),
    (Metric::SleepHours, Metric::SleepEfficiency),
];

/// Output key for a metric pair, e.g. `steps_sleep_hours`
pub fn pair_key(a: Metric, b: Metric) -> String {
    format!("{}_{}", a.as_str(), b.as_str())
}

/// Pearson correlation coefficient.
///
/// `None` when the slices differ in length, are empty, or either side has
/// zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.is_empty() {
        return None;
    }

    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let denominator = (sxx * syy).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }
    Some((sxy / denominator).clamp(-1.0, 1.0))
}

/// Correlation between two metrics over the days where both are present
pub fn calculate_correlation(days: &[DayMetrics], a: Metric, b: Metric) -> Option<f64> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = days
        .iter()
        .filter_map(|d| Some((d.get(a)?, d.get(b)?)))
        .unzip();

    if xs.len() < MIN_CORRELATION_ROWS {
        return None;
    }
    pearson(&xs, &ys)
}

/// Correlations for every configured pair that can be computed
pub fn calculate_correlations(days: &[DayMetrics]) -> BTreeMap<String, f64> {
    CORRELATION_PAIRS
        .iter()
        .filter_map(|&(a, b)| Some((pair_key(a, b), calculate_correlation(days, a, b)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::test_support::day;

    #[test]
    fn test_pearson_perfect_and_inverse() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert!((pearson(&xs, &[2.0, 4.0, 6.0, 8.0]).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&xs, &[8.0, 6.0, 4.0, 2.0]).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pearson_undefined_for_constant_series() {
        assert_eq!(pearson(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]), None);
        assert_eq!(pearson(&[1.0], &[1.0, 2.0]), None);
    }

    #[test]
    fn test_two_overlapping_rows_yield_no_entry() {
        let days = vec![
            day(15, Some(4000.0), Some(6.0), &[]),
            day(16, Some(6000.0), Some(7.5), &[]),
            day(17, Some(8000.0), None, &[]),
            day(18, None, Some(8.0), &[]),
        ];
        assert_eq!(calculate_correlation(&days, Metric::Steps, Metric::SleepHours), None);
        assert!(calculate_correlations(&days).is_empty());
    }

    #[test]
    fn test_three_overlapping_rows_yield_entry() {
        let days = vec![
            day(15, Some(4000.0), Some(6.0), &[(Metric::RestingHr, 70.0)]),
            day(16, Some(6000.0), Some(7.0), &[(Metric::RestingHr, 65.0)]),
            day(17, Some(8000.0), Some(8.0), &[(Metric::RestingHr, 60.0)]),
        ];
        let correlations = calculate_correlations(&days);

        assert!((correlations["steps_sleep_hours"] - 1.0).abs() < 1e-12);
        assert!((correlations["steps_resting_hr"] + 1.0).abs() < 1e-12);
        // Calories never recorded
        assert!(!correlations.contains_key("calories_steps"));
        assert_eq!(correlations.len(), 2);
    }
}
