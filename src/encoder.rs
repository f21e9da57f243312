//! Persona document encoder
//!
//! Encodes a selected window into the persona JSON document consumed by the
//! statistics and prompt stages, and decodes such documents back into day
//! metrics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PersonaError;
use crate::stats::{compute_statistics, DayMetrics, StatisticsBundle};
use crate::types::{Metric, Persona, PreparedDay, Window};

/// Human-readable day label, e.g. `Monday, 2024-01-15`
const DAY_LABEL_FORMAT: &str = "%A, %Y-%m-%d";

/// One day of a persona document; missing values serialize as `null`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaDay {
    pub date: String,
    #[serde(default)]
    pub steps: Option<f64>,
    #[serde(default)]
    pub sleep_hours: Option<f64>,
    #[serde(default)]
    pub resting_hr: Option<f64>,
    #[serde(default)]
    pub calories: Option<f64>,
    /// Sum of light, moderate and vigorous activity minutes
    #[serde(default)]
    pub active_minutes: Option<f64>,
    #[serde(default)]
    pub sedentary_minutes: Option<f64>,
    #[serde(default)]
    pub sleep_efficiency: Option<f64>,
}

impl PersonaDay {
    /// Calendar date behind the day label
    pub fn parse_date(&self) -> Result<NaiveDate, PersonaError> {
        parse_day_label(&self.date)
    }

    pub fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Steps => self.steps,
            Metric::SleepHours => self.sleep_hours,
            Metric::RestingHr => self.resting_hr,
            Metric::Calories => self.calories,
            Metric::ActiveMinutes => self.active_minutes,
            Metric::SedentaryMinutes => self.sedentary_minutes,
            Metric::SleepEfficiency => self.sleep_efficiency,
        }
    }
}

/// A selected persona window as written to `persona_<label>.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaDocument {
    #[serde(default = "unknown")]
    pub persona: String,
    #[serde(default = "unknown")]
    pub id: String,
    #[serde(default = "unknown")]
    pub start_date: String,
    #[serde(default)]
    pub days: Vec<PersonaDay>,
}

fn unknown() -> String {
    "Unknown".to_string()
}

impl PersonaDocument {
    pub fn from_json(json: &str) -> Result<Self, PersonaError> {
        serde_json::from_str(json).map_err(PersonaError::JsonError)
    }

    pub fn to_json(&self) -> Result<String, PersonaError> {
        serde_json::to_string_pretty(self).map_err(PersonaError::JsonError)
    }

    /// Decode the days into metric maps for the statistics engine
    pub fn day_metrics(&self) -> Result<Vec<DayMetrics>, PersonaError> {
        self.days
            .iter()
            .map(|day| {
                let date = day.parse_date()?;
                Ok(Metric::ALL
                    .iter()
                    .fold(DayMetrics::new(date), |acc, &metric| {
                        acc.with(metric, day.metric(metric))
                    }))
            })
            .collect()
    }

    /// Compute the statistics bundle for this document
    pub fn compute_statistics(&self) -> Result<StatisticsBundle, PersonaError> {
        let days = self.day_metrics()?;
        Ok(compute_statistics(
            &self.persona,
            &self.id,
            &self.start_date,
            &days,
        ))
    }
}

/// Parse `Monday, 2024-01-15`, `2024-01-15` or `2024-01-15T00:00:00`
pub fn parse_day_label(label: &str) -> Result<NaiveDate, PersonaError> {
    let iso = label.rsplit(", ").next().unwrap_or(label).trim();
    let date_part = iso.get(..10).unwrap_or(iso);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|e| PersonaError::DateParseError(format!("{label}: {e}")))
}

/// Encoder from validated windows to persona documents
pub struct PersonaEncoder;

impl PersonaEncoder {
    /// Encode a window selected for `persona`
    pub fn encode(window: &Window, persona: Persona) -> PersonaDocument {
        PersonaDocument {
            persona: persona.as_str().to_string(),
            id: window.participant_id.clone(),
            start_date: window.start_date.format("%Y-%m-%d").to_string(),
            days: window.days.iter().map(encode_day).collect(),
        }
    }

    pub fn encode_to_json(window: &Window, persona: Persona) -> Result<String, PersonaError> {
        Self::encode(window, persona).to_json()
    }
}

fn encode_day(day: &PreparedDay) -> PersonaDay {
    let record = &day.record;
    PersonaDay {
        date: record.date.format(DAY_LABEL_FORMAT).to_string(),
        steps: record.steps,
        sleep_hours: record.sleep_hours(),
        resting_hr: record.resting_hr,
        calories: record.calories,
        active_minutes: record.active_minutes(),
        sedentary_minutes: record.sedentary_minutes,
        sleep_efficiency: record.sleep_efficiency,
    }
}
