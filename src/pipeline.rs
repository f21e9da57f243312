//! End-to-end persona extraction pipeline
//!
//! Pipeline stages:
//! 1. Ingestion - CSV rows to daily records
//! 2. CandidateExtractor - validate and score every window
//! 3. Top-K ranking - best candidates per persona
//! 4. Selection - draw one candidate per persona with its own generator
//! 5. Re-extraction - rebuild the selected window from the records
//! 6. PersonaEncoder - window to persona document

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::encoder::{PersonaDocument, PersonaEncoder};
use crate::error::PersonaError;
use crate::extract::{extract_window_data, CandidateExtractor, ExtractionReport};
use crate::ingest::{load_csv, ColumnMapping};
use crate::select::{select_random_from_viable, select_top_candidates, selection_rng, SelectionConfig};
use crate::types::{Candidate, DailyRecord, Persona, Window};
use crate::window::WindowConfig;

/// Everything a pipeline run needs to know
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub window: WindowConfig,
    pub selection: SelectionConfig,
    pub columns: ColumnMapping,
    pub personas: Vec<Persona>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            selection: SelectionConfig::default(),
            columns: ColumnMapping::default(),
            personas: Persona::ALL.to_vec(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), PersonaError> {
        self.window.validate()?;
        self.selection.validate()?;
        if self.personas.is_empty() {
            return Err(PersonaError::InvalidConfig(
                "at least one persona must be requested".to_string(),
            ));
        }
        Ok(())
    }
}

/// The window chosen for one persona
#[derive(Debug, Clone, PartialEq)]
pub struct PersonaSelection {
    pub persona: Persona,
    pub selected: Candidate,
    /// Top-K pool the selection was drawn from, best first
    pub pool: Vec<Candidate>,
    pub window: Window,
    pub document: PersonaDocument,
}

/// Result of one pipeline run
#[derive(Debug, Default)]
pub struct PipelineOutput {
    pub report: ExtractionReport,
    pub selections: BTreeMap<Persona, PersonaSelection>,
    /// Personas whose selection failed; the others are unaffected
    pub failures: BTreeMap<Persona, PersonaError>,
}

/// Batch processor from daily records to one persona document per archetype
#[derive(Debug, Clone)]
pub struct PersonaPipeline {
    config: PipelineConfig,
}

impl PersonaPipeline {
    /// Create a pipeline, rejecting inconsistent settings
    pub fn new(config: PipelineConfig) -> Result<Self, PersonaError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load a CSV with the configured column mapping and run on it
    pub fn run_csv(&self, path: impl AsRef<Path>) -> Result<PipelineOutput, PersonaError> {
        let records = load_csv(path, &self.config.columns)?;
        Ok(self.run(&records))
    }

    /// Extract, rank and select one window per configured persona
    pub fn run(&self, records: &[DailyRecord]) -> PipelineOutput {
        let report = CandidateExtractor::new(self.config.window)
            .with_personas(&self.config.personas)
            .extract(records);
        let mut top = select_top_candidates(&report.candidates, self.config.selection.top_k);

        let mut output = PipelineOutput::default();
        for &persona in &self.config.personas {
            let pool = top.remove(&persona).unwrap_or_default();
            match self.select_for(persona, pool, records) {
                Ok(selection) => {
                    info!(
                        persona = %persona,
                        participant = %selection.selected.participant_id,
                        start = %selection.selected.start_date,
                        score = selection.selected.fit_score,
                        "persona window selected"
                    );
                    output.selections.insert(persona, selection);
                }
                Err(err) => {
                    warn!(persona = %persona, error = %err, "persona selection failed");
                    output.failures.insert(persona, err);
                }
            }
        }

        output.report = report;
        output
    }

    fn select_for(
        &self,
        persona: Persona,
        pool: Vec<Candidate>,
        records: &[DailyRecord],
    ) -> Result<PersonaSelection, PersonaError> {
        let selection = &self.config.selection;
        // Fresh generator per persona so one persona's draw never shifts another's
        let mut rng = selection_rng(selection.seed);

        let selected = select_random_from_viable(&pool, selection.threshold, &mut rng)
            .map_err(|_| PersonaError::NoViableCandidates {
                persona: persona.to_string(),
                threshold: selection.threshold,
            })?
            .clone();

        let window = extract_window_data(
            records,
            &selected.participant_id,
            selected.start_date,
            &self.config.window,
        )?;
        let document = PersonaEncoder::encode(&window, persona);

        Ok(PersonaSelection {
            persona,
            selected,
            pool,
            window,
            document,
        })
    }
}

/// Run the pipeline over in-memory records with the given settings
pub fn extract_personas(
    records: &[DailyRecord],
    config: PipelineConfig,
) -> Result<PipelineOutput, PersonaError> {
    Ok(PersonaPipeline::new(config)?.run(records))
}

/// `<dir>/persona_<label>.json`
pub fn persona_output_path(dir: &Path, label: &str) -> PathBuf {
    dir.join(format!("persona_{}.json", label.to_lowercase()))
}

/// `<dir>/precomputed_<label>.json`
pub fn statistics_output_path(dir: &Path, label: &str) -> PathBuf {
    dir.join(format!("precomputed_{}.json", label.to_lowercase()))
}

/// `<dir>/prompt_<label>.txt`
pub fn prompt_output_path(dir: &Path, label: &str) -> PathBuf {
    dir.join(format!("prompt_{}.txt", label.to_lowercase()))
}
