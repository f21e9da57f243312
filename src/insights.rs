//! Insight response parsing
//!
//! Insight generation is best-effort: the language model is an arbitrary
//! caller-supplied function, and a response that cannot be read degrades to an
//! empty list instead of an error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::encoder::PersonaDocument;
use crate::prompt::{build_insight_prompt, Language};
use crate::stats::StatisticsBundle;

/// Confidence assumed when the response omits one
pub const DEFAULT_CONFIDENCE: f64 = 5.0;

/// One generated health insight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub insight: String,
    pub explanation: String,
    /// 0 to 10
    pub confidence_score: f64,
}

impl Insight {
    /// Read one array element; `None` unless it is an object with an `insight` key
    fn from_value(item: &Value) -> Option<Self> {
        let object = item.as_object()?;
        let insight = object.get("insight")?;

        Some(Self {
            insight: text(insight),
            explanation: object.get("explanation").map(text).unwrap_or_default(),
            confidence_score: object
                .get("confidence_score")
                .and_then(Value::as_f64)
                .unwrap_or(DEFAULT_CONFIDENCE),
        })
    }
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Remove a leading ```` ```json ```` or ```` ``` ```` fence and a trailing ```` ``` ````
pub fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse a model response into insights.
///
/// Invalid JSON or a non-array payload yields an empty list. Array elements
/// that are not objects with an `insight` key are skipped.
pub fn parse_insights_response(response: &str) -> Vec<Insight> {
    let body = strip_code_fences(response);

    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(err) => {
            warn!(error = %err, "failed to parse insight response as JSON");
            return Vec::new();
        }
    };

    match value {
        Value::Array(items) => items.iter().filter_map(Insight::from_value).collect(),
        other => {
            warn!(kind = json_kind(&other), "insight response is not a JSON array");
            Vec::new()
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Build the insight prompt, hand it to `llm`, and parse the reply
pub fn generate_insights<F>(
    document: &PersonaDocument,
    statistics: &StatisticsBundle,
    llm: F,
    language: Language,
) -> Vec<Insight>
where
    F: FnOnce(&str) -> String,
{
    let prompt = build_insight_prompt(document, statistics, language);
    let response = llm(&prompt);
    parse_insights_response(&response)
}
