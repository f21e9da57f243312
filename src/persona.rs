//! Persona fitness scoring
//!
//! Each archetype scores a validated window as a fixed-weight sum of a few
//! proximity components. Persona A uses clamped linear tolerances (a deficit
//! pattern with a hard cutoff); Persona B uses Gaussian tolerances around
//! typical ranges. Component weights sum to 1 for every archetype, so scores
//! land in `[0, 1]`.

use serde::Serialize;

use crate::stats::descriptive::{mean, sample_std};
use crate::types::{Persona, Window};

/// Persona A targets
const A_TARGET_STEPS: f64 = 5000.0;
const A_TARGET_SLEEP_HOURS: f64 = 5.75;
const A_SLEEP_TOLERANCE_HOURS: f64 = 2.0;
/// Weekend-minus-weekday sleep (minutes) that earns a full rebound score
const A_FULL_REBOUND_MINUTES: f64 = 120.0;

/// Persona B targets as (mu, sigma)
const B_STEPS: (f64, f64) = (11000.0, 3000.0);
const B_STEP_CV: (f64, f64) = (0.45, 0.15);
const B_SLEEP_CV: (f64, f64) = (0.35, 0.15);
const B_RESTING_HR: (f64, f64) = (72.0, 6.0);

/// One weighted component of a persona score
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitComponent {
    pub name: &'static str,
    pub weight: f64,
    /// Component value in [0, 1]
    pub value: f64,
}

/// Score breakdown for one persona on one window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonaFit {
    pub persona: Persona,
    pub score: f64,
    pub components: Vec<FitComponent>,
}

impl PersonaFit {
    fn from_components(persona: Persona, components: Vec<FitComponent>) -> Self {
        let weights: f64 = components.iter().map(|c| c.weight).sum();
        debug_assert!(
            (weights - 1.0).abs() < 1e-9,
            "persona {persona} weights sum to {weights}"
        );

        // Clamp only absorbs rounding in the weighted sum
        let score: f64 = components.iter().map(|c| c.weight * c.value).sum();
        Self {
            persona,
            score: score.clamp(0.0, 1.0),
            components,
        }
    }

    pub fn component(&self, name: &str) -> Option<f64> {
        self.components
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.value)
    }
}

impl Persona {
    /// Score a validated window against this archetype
    pub fn score(&self, window: &Window) -> f64 {
        self.fit(window).score
    }

    /// Score a validated window and keep the component breakdown
    pub fn fit(&self, window: &Window) -> PersonaFit {
        match self {
            Persona::A => fit_persona_a(window),
            Persona::B => fit_persona_b(window),
        }
    }
}

/// Clamp to [0, 1]; NaN maps to 0
pub fn clamp01(x: f64) -> f64 {
    if x.is_nan() {
        return 0.0;
    }
    x.clamp(0.0, 1.0)
}

/// Unnormalized Gaussian bump, 1 at `mu`
pub fn gaussian(x: f64, mu: f64, sigma: f64) -> f64 {
    (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Standard deviation over mean, with the mean floored at `min_mean`
fn coefficient_of_variation(values: &[f64], min_mean: f64) -> Option<f64> {
    let m = mean(values)?;
    let std = sample_std(values)?;
    Some(std / m.max(min_mean))
}

/// Persona A: sleep-deprived with weekend recovery.
///
/// ```text
/// score = 0.35 * activity_fit + 0.35 * sleep_fit
///       + 0.20 * weekend_fit  + 0.10 * variability_fit
/// ```
fn fit_persona_a(window: &Window) -> PersonaFit {
    let steps = window.steps();
    let sleep = window.sleep_minutes();

    let activity_fit = mean(&steps)
        .map(|m| clamp01(1.0 - (m - A_TARGET_STEPS).abs() / A_TARGET_STEPS))
        .unwrap_or(0.0);

    let sleep_fit = mean(&sleep)
        .map(|m| {
            let hours = m / 60.0;
            clamp01(1.0 - (hours - A_TARGET_SLEEP_HOURS).abs() / A_SLEEP_TOLERANCE_HOURS)
        })
        .unwrap_or(0.0);

    let (weekday_sleep, weekend_sleep) = window.sleep_minutes_by_weekend();
    let weekend_fit = match (mean(&weekday_sleep), mean(&weekend_sleep)) {
        (Some(wd), Some(we)) => clamp01((we - wd) / A_FULL_REBOUND_MINUTES),
        _ => 0.0,
    };

    let variability_fit = coefficient_of_variation(&steps, 1.0)
        .map(clamp01)
        .unwrap_or(0.0);

    PersonaFit::from_components(
        Persona::A,
        vec![
            FitComponent { name: "activity", weight: 0.35, value: activity_fit },
            FitComponent { name: "sleep", weight: 0.35, value: sleep_fit },
            FitComponent { name: "weekend_rebound", weight: 0.20, value: weekend_fit },
            FitComponent { name: "step_variability", weight: 0.10, value: variability_fit },
        ],
    )
}

/// Persona B: active with an irregular routine.
///
/// ```text
/// score = 0.40 * activity_fit + 0.25 * step_irregularity_fit
///       + 0.20 * sleep_irregularity_fit + 0.15 * rhr_fit
/// ```
fn fit_persona_b(window: &Window) -> PersonaFit {
    let steps = window.steps();
    let sleep_hours: Vec<f64> = window.sleep_minutes().iter().map(|m| m / 60.0).collect();
    let rhr = window.resting_hr();

    let activity_fit = mean(&steps)
        .map(|m| gaussian(m, B_STEPS.0, B_STEPS.1))
        .unwrap_or(0.0);

    let step_irregularity_fit = coefficient_of_variation(&steps, 1.0)
        .map(|cv| gaussian(cv, B_STEP_CV.0, B_STEP_CV.1))
        .unwrap_or(0.0);

    let sleep_irregularity_fit = coefficient_of_variation(&sleep_hours, 1e-6)
        .map(|cv| gaussian(cv, B_SLEEP_CV.0, B_SLEEP_CV.1))
        .unwrap_or(0.0);

    let rhr_fit = mean(&rhr)
        .map(|m| gaussian(m, B_RESTING_HR.0, B_RESTING_HR.1))
        .unwrap_or(0.0);

    PersonaFit::from_components(
        Persona::B,
        vec![
            FitComponent { name: "activity", weight: 0.40, value: activity_fit },
            FitComponent { name: "step_irregularity", weight: 0.25, value: step_irregularity_fit },
            FitComponent { name: "sleep_irregularity", weight: 0.20, value: sleep_irregularity_fit },
            FitComponent { name: "resting_hr", weight: 0.15, value: rhr_fit },
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DailyRecord;
    use crate::window::{prepare_window, WindowConfig};
    use chrono::{Duration, NaiveDate};

    fn make_window(steps: &[f64], sleep: &[f64], rhr: Option<&[f64]>) -> Window {
        // 2024-01-15 is a Monday
        let start = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let records: Vec<DailyRecord> = steps
            .iter()
            .zip(sleep)
            .enumerate()
            .map(|(i, (s, sl))| {
                let mut record =
                    DailyRecord::new("p1", start + Duration::days(i as i64), Some(*s), Some(*sl));
                record.resting_hr = rhr.map(|r| r[i]);
                record
            })
            .collect();
        prepare_window(&records, &WindowConfig::default()).unwrap()
    }

    fn weekend_sleep_pattern(weekday: f64, weekend: f64) -> Vec<f64> {
        (0..14)
            .map(|i| if i % 7 >= 5 { weekend } else { weekday })
            .collect()
    }

    #[test]
    fn test_clamp01_and_gaussian() {
        assert_eq!(clamp01(-0.5), 0.0);
        assert_eq!(clamp01(1.5), 1.0);
        assert_eq!(clamp01(0.25), 0.25);
        assert_eq!(clamp01(f64::NAN), 0.0);

        assert_eq!(gaussian(72.0, 72.0, 6.0), 1.0);
        // One sigma away is exp(-0.5)
        assert!((gaussian(78.0, 72.0, 6.0) - (-0.5f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_persona_a_weekend_recovery_scenario() {
        let steps = vec![5000.0; 14];
        let sleep = weekend_sleep_pattern(345.0, 405.0);
        let window = make_window(&steps, &sleep, None);

        let fit = Persona::A.fit(&window);

        assert_eq!(fit.component("activity"), Some(1.0));
        // No step variance at all
        assert_eq!(fit.component("step_variability"), Some(0.0));

        // Four weekend days out of fourteen
        let mean_hours = (10.0 * 345.0 + 4.0 * 405.0) / 14.0 / 60.0;
        let expected_sleep = 1.0 - (mean_hours - 5.75f64).abs() / 2.0;
        assert!((fit.component("sleep").unwrap() - expected_sleep).abs() < 1e-12);

        let weekend = fit.component("weekend_rebound").unwrap();
        assert!(weekend > 0.0);
        assert!((weekend - 0.5).abs() < 1e-12);

        let expected = 0.35 * 1.0 + 0.35 * expected_sleep + 0.20 * 0.5;
        assert!((fit.score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_persona_a_no_rebound_when_weekend_sleeps_less() {
        let steps = vec![5000.0; 14];
        let sleep = weekend_sleep_pattern(400.0, 300.0);
        let window = make_window(&steps, &sleep, None);

        assert_eq!(Persona::A.fit(&window).component("weekend_rebound"), Some(0.0));
    }

    #[test]
    fn test_persona_b_prefers_active_irregular_windows() {
        let active_steps: Vec<f64> = (0..14)
            .map(|i| if i % 2 == 0 { 16000.0 } else { 6000.0 })
            .collect();
        let irregular_sleep: Vec<f64> = (0..14)
            .map(|i| if i % 3 == 0 { 600.0 } else { 300.0 })
            .collect();
        let rhr = vec![72.0; 14];
        let active = make_window(&active_steps, &irregular_sleep, Some(&rhr));

        let flat = make_window(&[3000.0; 14], &[420.0; 14], Some(&[55.0; 14]));

        let active_fit = Persona::B.fit(&active);
        assert_eq!(active_fit.component("activity"), Some(1.0));
        assert_eq!(active_fit.component("resting_hr"), Some(1.0));
        assert!(active_fit.score > Persona::B.score(&flat));
    }

    #[test]
    fn test_persona_b_missing_resting_hr_scores_zero_component() {
        let window = make_window(&[11000.0; 14], &[420.0; 14], None);
        let fit = Persona::B.fit(&window);
        assert_eq!(fit.component("resting_hr"), Some(0.0));
        assert!(fit.score.is_finite());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "weights sum to")]
    fn test_unbalanced_weights_are_rejected() {
        let components = vec![
            FitComponent {
                name: "activity",
                weight: 0.8,
                value: 1.0,
            },
            FitComponent {
                name: "sleep",
                weight: 0.8,
                value: 1.0,
            },
        ];
        PersonaFit::from_components(Persona::A, components);
    }

    #[test]
    fn test_scores_stay_in_unit_interval() {
        let step_patterns: Vec<Vec<f64>> = vec![
            vec![1.0; 14],
            vec![50000.0; 14],
            (0..14).map(|i| (i as f64 + 1.0) * 1500.0).collect(),
            (0..14).map(|i| if i == 0 { 90000.0 } else { 10.0 }).collect(),
        ];
        let sleep_patterns: Vec<Vec<f64>> = vec![
            vec![0.0; 14],
            vec![900.0; 14],
            weekend_sleep_pattern(200.0, 700.0),
        ];

        for steps in &step_patterns {
            for sleep in &sleep_patterns {
                let window = make_window(steps, sleep, Some(&[60.0; 14]));
                for persona in Persona::ALL {
                    let fit = persona.fit(&window);
                    let weights: f64 = fit.components.iter().map(|c| c.weight).sum();
                    assert!((weights - 1.0).abs() < 1e-12);
                    assert!(
                        (0.0..=1.0).contains(&fit.score),
                        "{persona} score {} out of range",
                        fit.score
                    );
                }
            }
        }
    }
}
