//! Error types for persona window extraction

use chrono::NaiveDate;
use thiserror::Error;

/// What broke contiguity in a window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContiguityFault {
    #[error("window has {actual} rows, expected {expected}")]
    WrongLength { actual: usize, expected: usize },

    #[error("gap in date sequence between {previous} and {next}")]
    Gap { previous: NaiveDate, next: NaiveDate },
}

/// Reasons a candidate window is discarded before scoring.
///
/// These are expected during extraction: the extractor counts them and moves
/// on to the next start offset.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WindowRejection {
    #[error("Non-contiguous window: {0}")]
    NonContiguous(ContiguityFault),

    #[error("Insufficient {metric} data: {present}/{total} days (need >={required})")]
    InsufficientCoverage {
        metric: &'static str,
        present: usize,
        total: usize,
        required: usize,
    },
}

/// Errors that can occur while extracting, selecting or summarizing personas
#[derive(Debug, Error)]
pub enum PersonaError {
    #[error("Invalid window: {0}")]
    InvalidWindow(#[from] WindowRejection),

    #[error("No viable candidates found for persona {persona} (threshold={threshold})")]
    NoViableCandidates { persona: String, threshold: f64 },

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Plot error: {0}")]
    PlotError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
