//! Prompt construction
//!
//! Fills the observer prompt template and the insight prompt from a persona
//! document and its statistics, and formats the console statistics summary.
//! Nothing here calls a model; the filled text is handed to whatever the caller
//! uses.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use chrono::Datelike;

use crate::encoder::{PersonaDay, PersonaDocument};
use crate::error::PersonaError;
use crate::stats::{MetricStats, StatisticsBundle, TrendResult, WeekdayPattern};
use crate::types::Metric;

/// Built-in observer template used when no custom template is supplied
pub const DEFAULT_OBSERVER_TEMPLATE: &str = "\
You are an attentive health observer. Study two weeks of wearable data for one
person and describe the patterns you see. Rely on the precomputed figures below
instead of recomputing them, and do not give medical diagnoses.

User profile:
- Age: {USER_AGE}
- Gender: {USER_GENDER}

Raw health data (one line per day):
{RAW_HEALTH_DATA}

Variability:
{PRECOMPUTED_VARIANCE}

Trends:
{PRECOMPUTED_TRENDS}

Correlations:
{PRECOMPUTED_CORRELATIONS}

Respond with a JSON array of exactly 5 objects, each with the keys
\"insight\", \"explanation\" and \"confidence_score\" (0-10).
";

const SUMMARY_RULE_WIDTH: usize = 60;

/// Language of the insight prompt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    En,
    De,
}

impl FromStr for Language {
    type Err = PersonaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Language::En),
            "de" => Ok(Language::De),
            other => Err(PersonaError::ParseError(format!(
                "Unsupported language: {other} (expected en or de)"
            ))),
        }
    }
}

/// Observer prompt filler
#[derive(Debug, Clone)]
pub struct ObserverPromptBuilder {
    template: String,
}

impl Default for ObserverPromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ObserverPromptBuilder {
    /// Builder using the built-in template
    pub fn new() -> Self {
        Self::with_template(DEFAULT_OBSERVER_TEMPLATE)
    }

    pub fn with_template(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Builder using a template read from disk
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PersonaError> {
        Ok(Self::with_template(fs::read_to_string(path.as_ref())?))
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Substitute every placeholder; unknown placeholders are left as is
    pub fn build(
        &self,
        document: &PersonaDocument,
        statistics: &StatisticsBundle,
        user_age: &str,
        user_gender: &str,
    ) -> String {
        self.template
            .replace("{USER_AGE}", user_age)
            .replace("{USER_GENDER}", user_gender)
            .replace("{RAW_HEALTH_DATA}", &format_raw_health_data(document))
            .replace("{PRECOMPUTED_VARIANCE}", &format_variance_data(statistics))
            .replace("{PRECOMPUTED_TRENDS}", &format_trends_data(statistics))
            .replace("{PRECOMPUTED_CORRELATIONS}", &format_correlations_data(statistics))
    }
}

fn steps_text(day: &PersonaDay) -> String {
    day.steps
        .map(|s| format!("{s:.0} steps"))
        .unwrap_or_else(|| "N/A".to_string())
}

fn sleep_text(day: &PersonaDay) -> String {
    day.sleep_hours
        .map(|h| format!("{h:.1}h sleep"))
        .unwrap_or_else(|| "N/A".to_string())
}

/// One line per day: `  Monday, 2024-01-15: 5000 steps, 6.0h sleep`
pub fn format_raw_health_data(document: &PersonaDocument) -> String {
    if document.days.is_empty() {
        return "No data available".to_string();
    }
    document
        .days
        .iter()
        .map(|day| format!("  {}: {}, {}", day.date, steps_text(day), sleep_text(day)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn base(statistics: &StatisticsBundle, metric: Metric) -> MetricStats {
    statistics
        .base_stats
        .get(&metric)
        .cloned()
        .unwrap_or_default()
}

fn trend(statistics: &StatisticsBundle, metric: Metric) -> Option<TrendResult> {
    statistics.trends.get(&metric).copied()
}

fn pattern(statistics: &StatisticsBundle, metric: Metric) -> WeekdayPattern {
    statistics
        .weekday_patterns
        .get(&metric)
        .copied()
        .unwrap_or_default()
}

fn trend_text(result: Option<TrendResult>) -> (String, f64) {
    match result {
        Some(t) => (t.trend.as_str().to_string(), t.slope),
        None => ("unknown".to_string(), 0.0),
    }
}

/// Spread of steps, sleep and every extra metric
pub fn format_variance_data(statistics: &StatisticsBundle) -> String {
    let steps = base(statistics, Metric::Steps);
    let sleep = base(statistics, Metric::SleepHours);

    let mut lines = vec![
        format!(
            "Steps: std={:.0}, range=[{:.0}, {:.0}]",
            steps.std, steps.min, steps.max
        ),
        format!(
            "Sleep: std={:.2}h, range=[{:.2}h, {:.2}h]",
            sleep.std, sleep.min, sleep.max
        ),
    ];
    lines.extend(
        statistics
            .base_stats
            .iter()
            .filter(|(metric, _)| !metric.is_mandatory())
            .map(|(metric, s)| {
                format!(
                    "{metric}: std={:.2}, range=[{:.2}, {:.2}]",
                    s.std, s.min, s.max
                )
            }),
    );
    lines.join("\n")
}

/// Trend classes and weekday/weekend means
pub fn format_trends_data(statistics: &StatisticsBundle) -> String {
    let (steps_trend, steps_slope) = trend_text(trend(statistics, Metric::Steps));
    let (sleep_trend, sleep_slope) = trend_text(trend(statistics, Metric::SleepHours));
    let steps = pattern(statistics, Metric::Steps);
    let sleep = pattern(statistics, Metric::SleepHours);

    [
        format!("Steps trend: {steps_trend} (slope: {steps_slope:.4})"),
        format!("Sleep trend: {sleep_trend} (slope: {sleep_slope:.4})"),
        "Weekday vs Weekend:".to_string(),
        format!(
            "  Steps: weekday avg={:.0}, weekend avg={:.0}",
            steps.weekday_avg, steps.weekend_avg
        ),
        format!(
            "  Sleep: weekday avg={:.2}h, weekend avg={:.2}h",
            sleep.weekday_avg, sleep.weekend_avg
        ),
    ]
    .join("\n")
}

/// Steps/sleep correlation first, then any other computed pair
pub fn format_correlations_data(statistics: &StatisticsBundle) -> String {
    let primary = "steps_sleep_hours";
    let mut lines = vec![match statistics.correlations.get(primary) {
        Some(r) => format!("Steps vs Sleep: {r:.3}"),
        None => "Steps vs Sleep: insufficient data".to_string(),
    }];
    lines.extend(
        statistics
            .correlations
            .iter()
            .filter(|(key, _)| key.as_str() != primary)
            .map(|(key, r)| format!("{key}: {r:.3}")),
    );
    lines.join("\n")
}

/// Insight prompt in the requested language
pub fn build_insight_prompt(
    document: &PersonaDocument,
    statistics: &StatisticsBundle,
    language: Language,
) -> String {
    let raw_data = document
        .days
        .iter()
        .map(|day| {
            let label = match day.parse_date() {
                Ok(date) => date.format("%Y-%m-%d (%A)").to_string(),
                Err(_) => day.date.clone(),
            };
            format!("  {label}: {}, {}", steps_text(day), sleep_text(day))
        })
        .collect::<Vec<_>>()
        .join("\n");

    let steps = base(statistics, Metric::Steps);
    let sleep = base(statistics, Metric::SleepHours);
    let correlation = statistics
        .correlations
        .get("steps_sleep_hours")
        .map(|r| format!("{r:.3}"))
        .unwrap_or_else(|| "N/A".to_string());
    let (steps_trend, _) = trend_text(trend(statistics, Metric::Steps));
    let (sleep_trend, _) = trend_text(trend(statistics, Metric::SleepHours));
    let steps_pattern = pattern(statistics, Metric::Steps);
    let sleep_pattern = pattern(statistics, Metric::SleepHours);
    let persona = &document.persona;

    match language {
        Language::En => format!(
            "User Health Profile:
- Persona: {persona}

Raw Data (day by day):
{raw_data}

Statistics:
- Average steps: {:.0} (std: {:.0})
- Average sleep: {:.2}h (std: {:.2}h)
- Steps/Sleep correlation: {correlation}
- Steps trend: {steps_trend}
- Sleep trend: {sleep_trend}

Weekday Patterns:
- Steps weekday: {:.0}, weekend: {:.0}
- Sleep weekday: {:.2}h, weekend: {:.2}h

Instructions:
Generate 5 personalized health insights based on the data. Each insight should:
- Identify specific patterns in daily data
- Recognize weekday/weekend differences
- Be concise and actionable
- Include a confidence score (0-10)

Output format (JSON array):
[
    {{\"insight\": \"...\", \"explanation\": \"...\", \"confidence_score\": 0-10}},
    ...
]",
            steps.mean,
            steps.std,
            sleep.mean,
            sleep.std,
            steps_pattern.weekday_avg,
            steps_pattern.weekend_avg,
            sleep_pattern.weekday_avg,
            sleep_pattern.weekend_avg,
        ),
        Language::De => format!(
            "Gesundheitsprofil des Nutzers:
- Persona: {persona}

Rohdaten (Tag für Tag):
{raw_data}

Statistiken:
- Durchschnittliche Schritte: {:.0} (Std: {:.0})
- Durchschnittlicher Schlaf: {:.2}h (Std: {:.2}h)
- Korrelation Schritte/Schlaf: {correlation}
- Schritt-Trend: {steps_trend}
- Schlaf-Trend: {sleep_trend}

Wochentagsmuster:
- Schritte Wochentag: {:.0}, Wochenende: {:.0}
- Schlaf Wochentag: {:.2}h, Wochenende: {:.2}h

Anweisungen:
Erstelle 5 personalisierte Gesundheits-Insights basierend auf den Daten. Die Insights sollen:
- Spezifische Muster in den täglichen Daten erkennen
- Zusammenhänge zwischen Wochentagen identifizieren
- Kurz und prägnant formuliert sein
- Einen Vertrauenswert (0-10) enthalten

Ausgabeformat (JSON-Array):
[
    {{\"insight\": \"...\", \"explanation\": \"...\", \"confidence_score\": 0-10}},
    ...
]",
            steps.mean,
            steps.std,
            sleep.mean,
            sleep.std,
            steps_pattern.weekday_avg,
            steps_pattern.weekend_avg,
            sleep_pattern.weekday_avg,
            sleep_pattern.weekend_avg,
        ),
    }
}

/// Human-readable statistics block for console output
pub fn format_statistics_summary(statistics: &StatisticsBundle) -> String {
    let rule = "=".repeat(SUMMARY_RULE_WIDTH);
    let steps = base(statistics, Metric::Steps);
    let sleep = base(statistics, Metric::SleepHours);

    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Statistics for Persona {}", statistics.metadata.persona);
    let _ = writeln!(out, "{rule}");

    let _ = writeln!(out, "\nBase Statistics:");
    let _ = writeln!(
        out,
        "  Steps:  avg={:.0}, std={:.0}, range=[{:.0}, {:.0}]",
        steps.mean, steps.std, steps.min, steps.max
    );
    let _ = writeln!(
        out,
        "  Sleep:  avg={:.2}h, std={:.2}h, range=[{:.2}, {:.2}]",
        sleep.mean, sleep.std, sleep.min, sleep.max
    );

    if let Some(r) = statistics.correlations.get("steps_sleep_hours") {
        let _ = writeln!(out, "\nCorrelation (steps vs sleep): {r:.3}");
    }

    let _ = writeln!(out, "\nTrends:");
    for (label, metric) in [("Steps", Metric::Steps), ("Sleep", Metric::SleepHours)] {
        if let Some(t) = trend(statistics, metric) {
            let _ = writeln!(out, "  {label}: {} (slope={:.4})", t.trend.as_str(), t.slope);
        }
    }

    let steps_pattern = pattern(statistics, Metric::Steps);
    let sleep_pattern = pattern(statistics, Metric::SleepHours);
    let _ = writeln!(out, "\nWeekday Patterns:");
    let _ = writeln!(
        out,
        "  Steps:  weekday={:.0}, weekend={:.0}, diff={:+.0}",
        steps_pattern.weekday_avg, steps_pattern.weekend_avg, steps_pattern.weekend_diff
    );
    let _ = writeln!(
        out,
        "  Sleep:  weekday={:.2}h, weekend={:.2}h, diff={:+.2}h",
        sleep_pattern.weekday_avg, sleep_pattern.weekend_avg, sleep_pattern.weekend_diff
    );
    out.push_str(&rule);
    out
}
