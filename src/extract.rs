//! Candidate extraction
//!
//! Slides a fixed-length window across every participant's history, validates
//! each slice, and scores the survivors against every configured persona.
//!
//! Overlapping windows from the same participant are independent candidates;
//! no deduplication is performed.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{PersonaError, WindowRejection};
use crate::types::{Candidate, DailyRecord, Persona, Window};
use crate::window::{prepare_window, WindowConfig};

/// Candidates plus counts describing how they were found.
///
/// `windows_scanned == windows_valid + rejected_non_contiguous +
/// rejected_insufficient_coverage` always holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractionReport {
    pub candidates: Vec<Candidate>,
    pub participants_seen: usize,
    /// Participants with fewer rows than one window
    pub participants_skipped: usize,
    pub windows_scanned: usize,
    pub windows_valid: usize,
    pub rejected_non_contiguous: usize,
    pub rejected_insufficient_coverage: usize,
}

impl ExtractionReport {
    fn record_rejection(&mut self, rejection: &WindowRejection) {
        match rejection {
            WindowRejection::NonContiguous(_) => self.rejected_non_contiguous += 1,
            WindowRejection::InsufficientCoverage { .. } => {
                self.rejected_insufficient_coverage += 1
            }
        }
    }

    /// Candidates for one persona, in discovery order
    pub fn candidates_for(&self, persona: Persona) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter().filter(move |c| c.persona == persona)
    }
}

/// Sliding-window extractor over a multi-participant dataset
#[derive(Debug, Clone)]
pub struct CandidateExtractor {
    config: WindowConfig,
    personas: Vec<Persona>,
}

impl CandidateExtractor {
    /// Extractor scoring every known persona
    pub fn new(config: WindowConfig) -> Self {
        Self {
            config,
            personas: Persona::ALL.to_vec(),
        }
    }

    /// Restrict scoring to the given personas
    pub fn with_personas(mut self, personas: &[Persona]) -> Self {
        self.personas = personas.to_vec();
        self
    }

    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Scan every participant and collect scored candidates
    pub fn extract(&self, records: &[DailyRecord]) -> ExtractionReport {
        let mut report = ExtractionReport::default();
        let window_days = self.config.window_days;
        if window_days == 0 {
            warn!("window length is zero; no candidates extracted");
            return report;
        }

        for (participant_id, rows) in group_by_participant(records) {
            report.participants_seen += 1;

            if rows.len() < window_days {
                debug!(
                    participant = %participant_id,
                    rows = rows.len(),
                    window_days,
                    "skipping participant with too few rows"
                );
                report.participants_skipped += 1;
                continue;
            }

            for slice in rows.windows(window_days) {
                report.windows_scanned += 1;

                let window = match prepare_window(slice, &self.config) {
                    Ok(window) => window,
                    Err(rejection) => {
                        debug!(
                            participant = %participant_id,
                            start = %slice[0].date,
                            reason = %rejection,
                            "window rejected"
                        );
                        report.record_rejection(&rejection);
                        continue;
                    }
                };

                report.windows_valid += 1;
                report
                    .candidates
                    .extend(self.personas.iter().map(|&persona| Candidate {
                        participant_id: window.participant_id.clone(),
                        start_date: window.start_date,
                        persona,
                        fit_score: persona.score(&window),
                    }));
            }
        }

        info!(
            participants = report.participants_seen,
            skipped = report.participants_skipped,
            scanned = report.windows_scanned,
            valid = report.windows_valid,
            candidates = report.candidates.len(),
            "candidate extraction finished"
        );
        report
    }
}

/// Extract candidates for `personas` with the given window settings
pub fn extract_candidates(
    records: &[DailyRecord],
    config: &WindowConfig,
    personas: &[Persona],
) -> ExtractionReport {
    CandidateExtractor::new(*config)
        .with_personas(personas)
        .extract(records)
}

/// Rows grouped by participant id (ascending), each group sorted by date
pub fn group_by_participant(records: &[DailyRecord]) -> BTreeMap<String, Vec<DailyRecord>> {
    let mut groups: BTreeMap<String, Vec<DailyRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.participant_id.clone())
            .or_default()
            .push(record.clone());
    }
    for rows in groups.values_mut() {
        rows.sort_by_key(|r| r.date);
    }
    groups
}

/// Re-extract and validate one participant's window starting at `start_date`
pub fn extract_window_data(
    records: &[DailyRecord],
    participant_id: &str,
    start_date: NaiveDate,
    config: &WindowConfig,
) -> Result<Window, PersonaError> {
    let end = start_date + Duration::days(config.window_days as i64);
    let mut rows: Vec<DailyRecord> = records
        .iter()
        .filter(|r| r.participant_id == participant_id && r.date >= start_date && r.date < end)
        .cloned()
        .collect();
    rows.sort_by_key(|r| r.date);

    Ok(prepare_window(&rows, config)?)
}
