//! Persona Windows - candidate window extraction for wearable health data
//!
//! Finds the fixed-length windows of daily wearable records that best match a
//! set of persona archetypes, then describes a selected window statistically:
//! ingestion → window validation → persona scoring → candidate extraction →
//! top-K selection → persona document → statistics → prompts.
//!
//! ## Modules
//!
//! - **Extraction**: validate, score and select candidate windows
//! - **Statistics**: descriptive stats, correlations, trends and weekday patterns
//! - **Prompting**: observer and insight prompts, insight response parsing

pub mod encoder;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod insights;
pub mod persona;
pub mod pipeline;
pub mod plot;
pub mod prompt;
pub mod select;
pub mod stats;
pub mod types;
pub mod window;

pub use encoder::{PersonaDay, PersonaDocument, PersonaEncoder};
pub use error::{ContiguityFault, PersonaError, WindowRejection};
pub use extract::{extract_candidates, extract_window_data, CandidateExtractor, ExtractionReport};
pub use ingest::{load_csv, parse_csv, ColumnMapping};
pub use insights::{generate_insights, parse_insights_response, Insight};
pub use persona::{FitComponent, PersonaFit};
pub use pipeline::{extract_personas, PersonaPipeline, PersonaSelection, PipelineConfig, PipelineOutput};
pub use prompt::{build_insight_prompt, format_statistics_summary, Language, ObserverPromptBuilder};
pub use select::{select_random_from_viable, select_top_candidates, selection_rng, SelectionConfig};
pub use stats::{compute_statistics, DayMetrics, StatisticsBundle};
pub use types::{Candidate, DailyRecord, Metric, Persona, PreparedDay, Window};
pub use window::{prepare_window, WindowConfig};

/// Crate version, reported by the CLI
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
