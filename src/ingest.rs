//! CSV ingestion
//!
//! Reads a header-led CSV of daily wearable records into [`DailyRecord`]s.
//! Column names are configurable through [`ColumnMapping`]; numeric cells that
//! cannot be read become missing values rather than errors.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::encoder::parse_day_label;
use crate::error::PersonaError;
use crate::types::DailyRecord;

pub const DEFAULT_ID_COLUMN: &str = "id";
pub const DEFAULT_DATE_COLUMN: &str = "date";
pub const DEFAULT_STEPS_COLUMN: &str = "steps";
pub const DEFAULT_SLEEP_COLUMN: &str = "minutesAsleep";
pub const DEFAULT_RESTING_HR_COLUMN: &str = "resting_hr";

/// Input column names for each record field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMapping {
    pub id: String,
    pub date: String,
    pub steps: String,
    /// Sleep duration in minutes
    pub sleep: String,
    pub resting_hr: String,
    pub calories: String,
    pub lightly_active_minutes: String,
    pub moderately_active_minutes: String,
    pub very_active_minutes: String,
    pub sedentary_minutes: String,
    pub sleep_efficiency: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            id: DEFAULT_ID_COLUMN.to_string(),
            date: DEFAULT_DATE_COLUMN.to_string(),
            steps: DEFAULT_STEPS_COLUMN.to_string(),
            sleep: DEFAULT_SLEEP_COLUMN.to_string(),
            resting_hr: DEFAULT_RESTING_HR_COLUMN.to_string(),
            calories: "calories".to_string(),
            lightly_active_minutes: "lightly_active_minutes".to_string(),
            moderately_active_minutes: "moderately_active_minutes".to_string(),
            very_active_minutes: "very_active_minutes".to_string(),
            sedentary_minutes: "sedentary_minutes".to_string(),
            sleep_efficiency: "sleep_efficiency".to_string(),
        }
    }
}

/// Header positions resolved against a mapping
struct ColumnIndex {
    id: usize,
    date: usize,
    steps: usize,
    sleep: usize,
    optional: [Option<usize>; 7],
}

impl ColumnIndex {
    fn resolve(header: &[String], mapping: &ColumnMapping) -> Result<Self, PersonaError> {
        let positions: HashMap<&str, usize> = header
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();

        let required = |name: &str| {
            positions
                .get(name)
                .copied()
                .ok_or_else(|| PersonaError::MissingColumn(name.to_string()))
        };
        let optional = |name: &str| positions.get(name).copied();

        Ok(Self {
            id: required(&mapping.id)?,
            date: required(&mapping.date)?,
            steps: required(&mapping.steps)?,
            sleep: required(&mapping.sleep)?,
            optional: [
                optional(&mapping.resting_hr),
                optional(&mapping.calories),
                optional(&mapping.lightly_active_minutes),
                optional(&mapping.moderately_active_minutes),
                optional(&mapping.very_active_minutes),
                optional(&mapping.sedentary_minutes),
                optional(&mapping.sleep_efficiency),
            ],
        })
    }
}

/// Read and parse a CSV file
pub fn load_csv(path: impl AsRef<Path>, mapping: &ColumnMapping) -> Result<Vec<DailyRecord>, PersonaError> {
    let raw = fs::read_to_string(path.as_ref())?;
    parse_csv(&raw, mapping)
}

/// Parse CSV text whose first non-empty line is the header
pub fn parse_csv(raw: &str, mapping: &ColumnMapping) -> Result<Vec<DailyRecord>, PersonaError> {
    let mut lines = raw
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header_line) = lines
        .next()
        .ok_or_else(|| PersonaError::ParseError("CSV input is empty".to_string()))?;
    let header = split_csv_line(header_line.trim_start_matches('\u{feff}'));
    let columns = ColumnIndex::resolve(&header, mapping)?;

    let mut records = Vec::new();
    for (line_idx, line) in lines {
        let line_no = line_idx + 1;
        let cells = split_csv_line(line);
        let cell = |i: usize| cells.get(i).map(|c| c.trim()).unwrap_or("");

        let participant_id = cell(columns.id);
        if participant_id.is_empty() {
            return Err(PersonaError::ParseError(format!(
                "line {line_no}: missing participant id"
            )));
        }

        let date_cell = cell(columns.date);
        let date = parse_day_label(date_cell).map_err(|_| {
            PersonaError::DateParseError(format!("line {line_no}: invalid date '{date_cell}'"))
        })?;

        let number = |i: Option<usize>| i.and_then(|i| parse_number(cell(i)));
        let [resting_hr, calories, lightly, moderately, very, sedentary, efficiency] =
            columns.optional.map(number);

        records.push(DailyRecord {
            participant_id: participant_id.to_string(),
            date,
            steps: number(Some(columns.steps)),
            sleep_minutes: number(Some(columns.sleep)),
            resting_hr,
            calories,
            lightly_active_minutes: lightly,
            moderately_active_minutes: moderately,
            very_active_minutes: very,
            sedentary_minutes: sedentary,
            sleep_efficiency: efficiency,
        });
    }

    debug!(rows = records.len(), "parsed CSV records");
    Ok(records)
}

/// Numeric cell, `None` when empty or not a number
fn parse_number(cell: &str) -> Option<f64> {
    if cell.is_empty() {
        return None;
    }
    cell.parse::<f64>().ok()
}

/// Split one CSV line, honoring double quotes and `""` escapes
pub fn split_csv_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim_end_matches('\r').chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => cells.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    cells.push(current);

    cells.into_iter().map(|c| c.trim().to_string()).collect()
}
