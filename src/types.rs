//! Core types for persona window extraction
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: daily records, prepared windows, scored candidates, and the metric
//! vocabulary used by the statistics engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PersonaError;

/// Persona archetype label
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Persona {
    /// Sleep-deprived, with a weekend recovery pattern
    A,
    /// Active, with a moderately irregular routine
    B,
}

impl Persona {
    /// Every archetype, in scoring order
    pub const ALL: [Persona; 2] = [Persona::A, Persona::B];

    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::A => "A",
            Persona::B => "B",
        }
    }

    /// Lowercase label used in output file names (`persona_a.json`)
    pub fn file_stem(&self) -> String {
        self.as_str().to_lowercase()
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Persona {
    type Err = PersonaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Persona::A),
            "B" => Ok(Persona::B),
            other => Err(PersonaError::ParseError(format!(
                "Unknown persona label: {other}"
            ))),
        }
    }
}

/// Metrics understood by the statistics engine.
///
/// Ordering follows declaration order, which keeps JSON maps stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Steps,
    SleepHours,
    RestingHr,
    Calories,
    ActiveMinutes,
    SedentaryMinutes,
    SleepEfficiency,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Steps,
        Metric::SleepHours,
        Metric::RestingHr,
        Metric::Calories,
        Metric::ActiveMinutes,
        Metric::SedentaryMinutes,
        Metric::SleepEfficiency,
    ];

    /// Metrics that always appear in statistics output, even without data
    pub const MANDATORY: [Metric; 2] = [Metric::Steps, Metric::SleepHours];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Steps => "steps",
            Metric::SleepHours => "sleep_hours",
            Metric::RestingHr => "resting_hr",
            Metric::Calories => "calories",
            Metric::ActiveMinutes => "active_minutes",
            Metric::SedentaryMinutes => "sedentary_minutes",
            Metric::SleepEfficiency => "sleep_efficiency",
        }
    }

    pub fn is_mandatory(&self) -> bool {
        Self::MANDATORY.contains(self)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One participant's measurements for one calendar date.
///
/// Every numeric field is optional; cells that could not be read as numbers
/// arrive here as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub participant_id: String,
    pub date: NaiveDate,
    /// Step count
    pub steps: Option<f64>,
    /// Total sleep duration (minutes)
    pub sleep_minutes: Option<f64>,
    /// Resting heart rate (bpm)
    pub resting_hr: Option<f64>,
    pub calories: Option<f64>,
    pub lightly_active_minutes: Option<f64>,
    pub moderately_active_minutes: Option<f64>,
    pub very_active_minutes: Option<f64>,
    pub sedentary_minutes: Option<f64>,
    pub sleep_efficiency: Option<f64>,
}

impl DailyRecord {
    /// Create a record with only the mandatory fields set
    pub fn new(
        participant_id: impl Into<String>,
        date: NaiveDate,
        steps: Option<f64>,
        sleep_minutes: Option<f64>,
    ) -> Self {
        Self {
            participant_id: participant_id.into(),
            date,
            steps,
            sleep_minutes,
            resting_hr: None,
            calories: None,
            lightly_active_minutes: None,
            moderately_active_minutes: None,
            very_active_minutes: None,
            sedentary_minutes: None,
            sleep_efficiency: None,
        }
    }

    /// Mutable access to every numeric field, for cleaning passes
    pub fn numeric_fields_mut(&mut self) -> [&mut Option<f64>; 9] {
        [
            &mut self.steps,
            &mut self.sleep_minutes,
            &mut self.resting_hr,
            &mut self.calories,
            &mut self.lightly_active_minutes,
            &mut self.moderately_active_minutes,
            &mut self.very_active_minutes,
            &mut self.sedentary_minutes,
            &mut self.sleep_efficiency,
        ]
    }

    pub fn sleep_hours(&self) -> Option<f64> {
        self.sleep_minutes.map(|m| m / 60.0)
    }

    /// Sum of the activity-level minutes that are present, `None` if none are
    pub fn active_minutes(&self) -> Option<f64> {
        let levels = [
            self.lightly_active_minutes,
            self.moderately_active_minutes,
            self.very_active_minutes,
        ];
        if levels.iter().all(Option::is_none) {
            return None;
        }
        Some(levels.iter().flatten().sum())
    }

    /// Value of a statistics metric for this day
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Steps => self.steps,
            Metric::SleepHours => self.sleep_hours(),
            Metric::RestingHr => self.resting_hr,
            Metric::Calories => self.calories,
            Metric::ActiveMinutes => self.active_minutes(),
            Metric::SedentaryMinutes => self.sedentary_minutes,
            Metric::SleepEfficiency => self.sleep_efficiency,
        }
    }
}

/// A cleaned daily record with calendar features attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedDay {
    pub record: DailyRecord,
    /// Monday = 0 .. Sunday = 6
    pub day_of_week: u8,
    pub is_weekend: bool,
}

/// A validated, contiguous run of daily records for one participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub participant_id: String,
    pub start_date: NaiveDate,
    pub days: Vec<PreparedDay>,
}

impl Window {
    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn end_date(&self) -> NaiveDate {
        self.days
            .last()
            .map(|d| d.record.date)
            .unwrap_or(self.start_date)
    }

    /// Present step counts, in date order
    pub fn steps(&self) -> Vec<f64> {
        self.days.iter().filter_map(|d| d.record.steps).collect()
    }

    /// Present sleep durations in minutes, in date order
    pub fn sleep_minutes(&self) -> Vec<f64> {
        self.days.iter().filter_map(|d| d.record.sleep_minutes).collect()
    }

    /// Present resting heart rates, in date order
    pub fn resting_hr(&self) -> Vec<f64> {
        self.days.iter().filter_map(|d| d.record.resting_hr).collect()
    }

    /// Present sleep durations in minutes, split into (weekday, weekend)
    pub fn sleep_minutes_by_weekend(&self) -> (Vec<f64>, Vec<f64>) {
        let mut weekday = Vec::new();
        let mut weekend = Vec::new();
        for day in &self.days {
            if let Some(sleep) = day.record.sleep_minutes {
                if day.is_weekend {
                    weekend.push(sleep);
                } else {
                    weekday.push(sleep);
                }
            }
        }
        (weekday, weekend)
    }
}

/// A scored (participant, window start, persona) triple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "id")]
    pub participant_id: String,
    pub start_date: NaiveDate,
    pub persona: Persona,
    pub fit_score: f64,
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Candidate(id={}, start={}, persona={}, score={:.4})",
            self.participant_id, self.start_date, self.persona, self.fit_score
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_persona_label_round_trips_through_str() {
        for persona in Persona::ALL {
            let parsed: Persona = persona.as_str().parse().unwrap();
            assert_eq!(parsed, persona);
        }
        assert_eq!("b".parse::<Persona>().unwrap(), Persona::B);
        assert!("Z".parse::<Persona>().is_err());
        assert_eq!(Persona::A.file_stem(), "a");
    }

    #[test]
    fn test_active_minutes_sums_present_levels() {
        let mut record = DailyRecord::new("p1", date(2024, 1, 15), Some(5000.0), Some(360.0));
        assert_eq!(record.active_minutes(), None);

        record.lightly_active_minutes = Some(120.0);
        record.very_active_minutes = Some(15.0);
        assert_eq!(record.active_minutes(), Some(135.0));
    }

    #[test]
    fn test_metric_lookup_converts_sleep_to_hours() {
        let record = DailyRecord::new("p1", date(2024, 1, 15), Some(5000.0), Some(390.0));
        assert_eq!(record.metric(Metric::SleepHours), Some(6.5));
        assert_eq!(record.metric(Metric::Steps), Some(5000.0));
        assert_eq!(record.metric(Metric::RestingHr), None);
    }

    #[test]
    fn test_metric_serializes_snake_case() {
        let json = serde_json::to_string(&Metric::SleepHours).unwrap();
        assert_eq!(json, "\"sleep_hours\"");
        assert!(Metric::Steps.is_mandatory());
        assert!(!Metric::Calories.is_mandatory());
    }

    #[test]
    fn test_candidate_serializes_with_id_key() {
        let candidate = Candidate {
            participant_id: "p7".to_string(),
            start_date: date(2024, 3, 4),
            persona: Persona::B,
            fit_score: 0.5,
        };
        let value = serde_json::to_value(&candidate).unwrap();
        assert_eq!(value["id"], "p7");
        assert_eq!(value["start_date"], "2024-03-04");
        assert_eq!(value["persona"], "B");
        assert_eq!(
            candidate.to_string(),
            "Candidate(id=p7, start=2024-03-04, persona=B, score=0.5000)"
        );
    }
}
