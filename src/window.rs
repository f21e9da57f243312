//! Window validation
//!
//! Turns a raw slice of one participant's daily records into a prepared
//! [`Window`], or explains why the slice cannot be used. The checks run in a
//! fixed order and stop at the first failure: contiguity, numeric cleaning,
//! coverage, then calendar features.

use chrono::{Datelike, Duration};

use crate::error::{ContiguityFault, PersonaError, WindowRejection};
use crate::types::{DailyRecord, PreparedDay, Window};

/// Default window length in days
pub const DEFAULT_WINDOW_DAYS: usize = 14;

/// Default minimum number of days with usable steps and sleep
pub const DEFAULT_MIN_PRESENT_DAYS: usize = 12;

/// Day-of-week index from which a day counts as weekend (Saturday)
const FIRST_WEEKEND_DAY: u8 = 5;

/// Window shape and data quality requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    pub window_days: usize,
    pub min_present_days: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            min_present_days: DEFAULT_MIN_PRESENT_DAYS,
        }
    }
}

impl WindowConfig {
    pub fn new(window_days: usize, min_present_days: usize) -> Self {
        Self {
            window_days,
            min_present_days,
        }
    }

    pub fn validate(&self) -> Result<(), PersonaError> {
        if self.window_days == 0 {
            return Err(PersonaError::InvalidConfig(
                "window_days must be at least 1".to_string(),
            ));
        }
        if self.min_present_days > self.window_days {
            return Err(PersonaError::InvalidConfig(format!(
                "min_present_days ({}) cannot exceed window_days ({})",
                self.min_present_days, self.window_days
            )));
        }
        Ok(())
    }
}

/// Validate and prepare a slice of records sorted by date.
///
/// The slice must belong to a single participant.
pub fn prepare_window(
    records: &[DailyRecord],
    config: &WindowConfig,
) -> Result<Window, WindowRejection> {
    check_contiguity(records, config.window_days)?;

    let cleaned = clean_numeric_fields(records);

    check_coverage(&cleaned, config.min_present_days)?;

    let days = add_calendar_features(cleaned);
    let first = &days[0].record;

    Ok(Window {
        participant_id: first.participant_id.clone(),
        start_date: first.date,
        days,
    })
}

/// Require exactly `window_days` rows, each one day after the previous
pub fn check_contiguity(records: &[DailyRecord], window_days: usize) -> Result<(), WindowRejection> {
    if records.len() != window_days || records.is_empty() {
        return Err(WindowRejection::NonContiguous(ContiguityFault::WrongLength {
            actual: records.len(),
            expected: window_days,
        }));
    }

    for pair in records.windows(2) {
        let (previous, next) = (pair[0].date, pair[1].date);
        if next - previous != Duration::days(1) {
            return Err(WindowRejection::NonContiguous(ContiguityFault::Gap {
                previous,
                next,
            }));
        }
    }

    Ok(())
}

/// Map negative and non-finite values in every numeric field to missing
pub fn clean_numeric_fields(records: &[DailyRecord]) -> Vec<DailyRecord> {
    records
        .iter()
        .cloned()
        .map(|mut record| {
            for field in record.numeric_fields_mut() {
                if matches!(*field, Some(v) if !v.is_finite() || v < 0.0) {
                    *field = None;
                }
            }
            record
        })
        .collect()
}

/// Require enough positive step days and enough sleep days.
///
/// Steps are checked first.
pub fn check_coverage(records: &[DailyRecord], min_present_days: usize) -> Result<(), WindowRejection> {
    let total = records.len();

    let steps_ok = records
        .iter()
        .filter(|r| matches!(r.steps, Some(s) if s > 0.0))
        .count();
    if steps_ok < min_present_days {
        return Err(WindowRejection::InsufficientCoverage {
            metric: "step",
            present: steps_ok,
            total,
            required: min_present_days,
        });
    }

    let sleep_ok = records.iter().filter(|r| r.sleep_minutes.is_some()).count();
    if sleep_ok < min_present_days {
        return Err(WindowRejection::InsufficientCoverage {
            metric: "sleep",
            present: sleep_ok,
            total,
            required: min_present_days,
        });
    }

    Ok(())
}

/// Attach day-of-week (Monday = 0) and weekend flags
pub fn add_calendar_features(records: Vec<DailyRecord>) -> Vec<PreparedDay> {
    records
        .into_iter()
        .map(|record| {
            let day_of_week = record.date.weekday().num_days_from_monday() as u8;
            PreparedDay {
                record,
                day_of_week,
                is_weekend: day_of_week >= FIRST_WEEKEND_DAY,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn start() -> NaiveDate {
        // A Monday
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn make_records(n: usize) -> Vec<DailyRecord> {
        (0..n)
            .map(|i| {
                DailyRecord::new(
                    "p1",
                    start() + Duration::days(i as i64),
                    Some(6000.0 + i as f64 * 10.0),
                    Some(400.0),
                )
            })
            .collect()
    }

    #[test]
    fn test_valid_window_is_prepared() {
        let records = make_records(14);
        let window = prepare_window(&records, &WindowConfig::default()).unwrap();

        assert_eq!(window.len(), 14);
        assert_eq!(window.participant_id, "p1");
        assert_eq!(window.start_date, start());
        assert_eq!(window.end_date(), start() + Duration::days(13));
        assert_eq!(window.days[0].day_of_week, 0);
        assert!(!window.days[0].is_weekend);
        assert_eq!(window.days[5].day_of_week, 5);
        assert!(window.days[5].is_weekend);
        assert!(window.days[6].is_weekend);
        assert!(!window.days[7].is_weekend);
    }

    #[test]
    fn test_wrong_length_is_non_contiguous() {
        let records = make_records(13);
        let err = prepare_window(&records, &WindowConfig::default()).unwrap_err();
        assert_eq!(
            err,
            WindowRejection::NonContiguous(ContiguityFault::WrongLength {
                actual: 13,
                expected: 14
            })
        );
    }

    #[test]
    fn test_one_day_gap_rejected_regardless_of_coverage() {
        let mut records = make_records(14);
        for record in records.iter_mut().skip(7) {
            record.date += Duration::days(1);
        }
        // Full coverage, still rejected
        let config = WindowConfig::new(14, 0);
        let err = prepare_window(&records, &config).unwrap_err();
        match err {
            WindowRejection::NonContiguous(ContiguityFault::Gap { previous, next }) => {
                assert_eq!(previous, start() + Duration::days(6));
                assert_eq!(next, start() + Duration::days(8));
            }
            other => panic!("expected gap, got {other:?}"),
        }
    }

    #[test]
    fn test_eleven_step_days_is_insufficient() {
        let mut records = make_records(14);
        records[0].steps = None;
        records[4].steps = Some(0.0);
        records[9].steps = Some(-20.0);

        let err = prepare_window(&records, &WindowConfig::default()).unwrap_err();
        assert_eq!(
            err,
            WindowRejection::InsufficientCoverage {
                metric: "step",
                present: 11,
                total: 14,
                required: 12
            }
        );
        assert!(err.to_string().contains("11/14"));
    }

    #[test]
    fn test_insufficient_sleep_reported_after_steps() {
        let mut records = make_records(14);
        for record in records.iter_mut().take(3) {
            record.sleep_minutes = Some(f64::NAN);
        }
        let err = prepare_window(&records, &WindowConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            WindowRejection::InsufficientCoverage { metric: "sleep", present: 11, .. }
        ));
    }

    #[test]
    fn test_cleaning_maps_negative_optional_fields_to_missing() {
        let mut records = make_records(2);
        records[0].resting_hr = Some(-1.0);
        records[0].calories = Some(f64::INFINITY);
        records[1].sleep_efficiency = Some(91.0);

        let cleaned = clean_numeric_fields(&records);
        assert_eq!(cleaned[0].resting_hr, None);
        assert_eq!(cleaned[0].calories, None);
        assert_eq!(cleaned[1].sleep_efficiency, Some(91.0));
        // Input left untouched
        assert_eq!(records[0].resting_hr, Some(-1.0));
    }

    #[test]
    fn test_config_validation() {
        assert!(WindowConfig::default().validate().is_ok());
        assert!(WindowConfig::new(0, 0).validate().is_err());
        assert!(WindowConfig::new(7, 8).validate().is_err());
    }
}
