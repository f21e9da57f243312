//! Weekday versus weekend averages

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::descriptive::mean;
use super::{metrics_present, DayMetrics};
use crate::types::Metric;

/// Weekday and weekend means for one metric.
///
/// A side without values contributes 0, matching the zero-filled shape of the
/// rest of the statistics output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeekdayPattern {
    pub weekday_avg: f64,
    pub weekend_avg: f64,
    /// `weekend_avg - weekday_avg`
    pub weekend_diff: f64,
}

pub fn calculate_weekday_pattern(days: &[DayMetrics], metric: Metric) -> WeekdayPattern {
    let (weekend, weekday): (Vec<&DayMetrics>, Vec<&DayMetrics>) =
        days.iter().partition(|d| d.is_weekend());

    let side_mean = |side: &[&DayMetrics]| {
        let values: Vec<f64> = side.iter().filter_map(|d| d.get(metric)).collect();
        mean(&values).unwrap_or(0.0)
    };

    let weekday_avg = side_mean(&weekday);
    let weekend_avg = side_mean(&weekend);

    WeekdayPattern {
        weekday_avg,
        weekend_avg,
        weekend_diff: weekend_avg - weekday_avg,
    }
}

pub fn calculate_weekday_patterns(days: &[DayMetrics]) -> BTreeMap<Metric, WeekdayPattern> {
    metrics_present(days)
        .into_iter()
        .map(|metric| (metric, calculate_weekday_pattern(days, metric)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::test_support::day;

    #[test]
    fn test_weekend_sleep_rebound() {
        // 2024-01-15 is a Monday; 20 and 21 are the weekend
        let days: Vec<DayMetrics> = (15..=21)
            .map(|d| {
                let sleep = if d >= 20 { 8.0 } else { 6.0 };
                day(d, Some(7000.0), Some(sleep), &[])
            })
            .collect();

        let patterns = calculate_weekday_patterns(&days);
        let sleep = patterns[&Metric::SleepHours];
        assert_eq!(sleep.weekday_avg, 6.0);
        assert_eq!(sleep.weekend_avg, 8.0);
        assert_eq!(sleep.weekend_diff, 2.0);

        assert_eq!(patterns[&Metric::Steps].weekend_diff, 0.0);
    }

    #[test]
    fn test_missing_weekend_side_is_zero() {
        let days = vec![
            day(15, Some(4000.0), Some(6.0), &[]),
            day(16, Some(6000.0), Some(7.0), &[]),
        ];
        let steps = calculate_weekday_pattern(&days, Metric::Steps);
        assert_eq!(steps.weekday_avg, 5000.0);
        assert_eq!(steps.weekend_avg, 0.0);
        assert_eq!(steps.weekend_diff, -5000.0);
    }
}
