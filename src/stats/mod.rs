//! Window statistics
//!
//! Computes descriptive statistics, pairwise correlations, recency-weighted
//! trends and weekday/weekend patterns for a selected window. Every function
//! here is a pure function of the day records it is given; only the
//! `computed_at` timestamp differs between two runs on the same input.
//!
//! Pipeline: persona JSON → day metrics → (base stats | correlations | trends
//! | weekday patterns) → statistics JSON

pub mod correlation;
pub mod descriptive;
pub mod trend;
pub mod weekday;

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::PersonaError;
use crate::insights::Insight;
use crate::types::{DailyRecord, Metric};

pub use correlation::{calculate_correlation, calculate_correlations, pearson};
pub use descriptive::{calculate_base_stats, MetricStats};
pub use trend::{calculate_trends, identify_trend, TrendClass, TrendResult};
pub use weekday::{calculate_weekday_patterns, WeekdayPattern};

/// One day of a selected window, keyed by metric
#[derive(Debug, Clone, PartialEq)]
pub struct DayMetrics {
    pub date: NaiveDate,
    pub values: BTreeMap<Metric, f64>,
}

impl DayMetrics {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            values: BTreeMap::new(),
        }
    }

    /// Set a metric if the value is present
    pub fn with(mut self, metric: Metric, value: Option<f64>) -> Self {
        if let Some(v) = value {
            self.values.insert(metric, v);
        }
        self
    }

    pub fn get(&self, metric: Metric) -> Option<f64> {
        self.values.get(&metric).copied()
    }

    pub fn is_weekend(&self) -> bool {
        matches!(self.date.weekday(), Weekday::Sat | Weekday::Sun)
    }
}

impl From<&DailyRecord> for DayMetrics {
    fn from(record: &DailyRecord) -> Self {
        Metric::ALL
            .iter()
            .fold(DayMetrics::new(record.date), |day, &metric| {
                day.with(metric, record.metric(metric))
            })
    }
}

/// Mandatory metrics plus every other metric with at least one value
pub fn metrics_present(days: &[DayMetrics]) -> Vec<Metric> {
    Metric::ALL
        .into_iter()
        .filter(|m| m.is_mandatory() || days.iter().any(|d| d.get(*m).is_some()))
        .collect()
}

/// Non-missing values of one metric, in input order
pub(crate) fn values_for(days: &[DayMetrics], metric: Metric) -> Vec<f64> {
    days.iter().filter_map(|d| d.get(metric)).collect()
}

/// First and last date covered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Identification and provenance of a statistics bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsMetadata {
    pub persona: String,
    pub id: String,
    pub start_date: String,
    pub computed_at: DateTime<Utc>,
    pub days_count: usize,
    pub date_range: Option<DateRange>,
}

/// All statistics computed for one selected window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsBundle {
    pub metadata: StatisticsMetadata,
    pub base_stats: BTreeMap<Metric, MetricStats>,
    pub correlations: BTreeMap<String, f64>,
    pub trends: BTreeMap<Metric, TrendResult>,
    pub weekday_patterns: BTreeMap<Metric, WeekdayPattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<Vec<Insight>>,
}

impl StatisticsBundle {
    /// Attach parsed insights to the bundle
    pub fn with_insights(mut self, insights: Vec<Insight>) -> Self {
        self.insights = Some(insights);
        self
    }

    pub fn to_json(&self) -> Result<String, PersonaError> {
        serde_json::to_string_pretty(self).map_err(PersonaError::JsonError)
    }

    pub fn from_json(json: &str) -> Result<Self, PersonaError> {
        serde_json::from_str(json).map_err(PersonaError::JsonError)
    }
}

/// Compute every statistic for a window's days
pub fn compute_statistics(
    persona: &str,
    participant_id: &str,
    start_date: &str,
    days: &[DayMetrics],
) -> StatisticsBundle {
    let date_range = days
        .iter()
        .map(|d| d.date)
        .min()
        .zip(days.iter().map(|d| d.date).max())
        .map(|(start, end)| DateRange { start, end });

    StatisticsBundle {
        metadata: StatisticsMetadata {
            persona: persona.to_string(),
            id: participant_id.to_string(),
            start_date: start_date.to_string(),
            computed_at: Utc::now(),
            days_count: days.len(),
            date_range,
        },
        base_stats: calculate_base_stats(days),
        correlations: calculate_correlations(days),
        trends: calculate_trends(days),
        weekday_patterns: calculate_weekday_patterns(days),
        insights: None,
    }
}
