//! Personas CLI - command-line interface for persona window extraction
//!
//! Commands:
//! - extract: Select one window per persona from a daily CSV
//! - stats: Compute window statistics for persona documents
//! - prompt: Compute statistics and fill the observer prompt
//! - insights: Parse a model response into insights

use clap::{Parser, Subcommand};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use persona_windows::ingest::{
    DEFAULT_DATE_COLUMN, DEFAULT_ID_COLUMN, DEFAULT_RESTING_HR_COLUMN, DEFAULT_SLEEP_COLUMN,
    DEFAULT_STEPS_COLUMN,
};
use persona_windows::pipeline::{persona_output_path, prompt_output_path, statistics_output_path};
use persona_windows::plot::{plot_comparison, window_sparklines};
use persona_windows::select::{format_candidate_summary, DEFAULT_THRESHOLD, DEFAULT_TOP_K};
use persona_windows::window::{DEFAULT_MIN_PRESENT_DAYS, DEFAULT_WINDOW_DAYS};
use persona_windows::{
    format_statistics_summary, load_csv, parse_insights_response, ColumnMapping,
    ObserverPromptBuilder, PersonaDocument, PersonaError, PersonaPipeline, PipelineConfig,
    SelectionConfig, StatisticsBundle, WindowConfig, VERSION,
};

/// Personas - find wearable data windows that match persona archetypes
#[derive(Parser)]
#[command(name = "personas")]
#[command(author = "Synheart AI Inc")]
#[command(version = VERSION)]
#[command(about = "Extract and describe persona windows from daily wearable data", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select one window per persona from a daily CSV
    Extract {
        /// Daily records CSV
        csv_path: PathBuf,

        /// Selection pool size: 1 picks the best, more picks randomly from the top k
        #[arg(long, default_value_t = DEFAULT_TOP_K)]
        top_k: usize,

        /// Random seed for reproducible selection
        #[arg(long)]
        seed: Option<u64>,

        /// Minimum fit score for a candidate to be selectable
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f64,

        /// Window size in days
        #[arg(long, default_value_t = DEFAULT_WINDOW_DAYS)]
        window_days: usize,

        /// Minimum days with valid steps and sleep
        #[arg(long, default_value_t = DEFAULT_MIN_PRESENT_DAYS)]
        min_days: usize,

        /// Output directory
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Print sparklines and write a comparison chart
        #[arg(long)]
        plot: bool,

        /// Participant id column
        #[arg(long, default_value = DEFAULT_ID_COLUMN)]
        id_col: String,

        /// Date column
        #[arg(long, default_value = DEFAULT_DATE_COLUMN)]
        date_col: String,

        /// Step count column
        #[arg(long, default_value = DEFAULT_STEPS_COLUMN)]
        steps_col: String,

        /// Sleep minutes column
        #[arg(long, default_value = DEFAULT_SLEEP_COLUMN)]
        sleep_col: String,

        /// Resting heart rate column
        #[arg(long, default_value = DEFAULT_RESTING_HR_COLUMN)]
        rhr_col: String,
    },

    /// Compute window statistics for persona documents
    Stats {
        /// Persona JSON file(s)
        #[arg(required = true)]
        input_files: Vec<PathBuf>,

        /// Output file (single input only)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output directory for precomputed_<persona>.json
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Suppress console output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Compute statistics and fill the observer prompt
    Prompt {
        /// Persona JSON file(s)
        #[arg(required = true)]
        input_files: Vec<PathBuf>,

        /// User's age (e.g. "28" or "late 20s")
        #[arg(long)]
        age: String,

        /// User's gender
        #[arg(long)]
        gender: String,

        /// Custom observer template
        #[arg(long)]
        template: Option<PathBuf>,

        /// Output directory
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Suppress console output
        #[arg(short, long)]
        quiet: bool,
    },

    /// Parse a model response into insights
    Insights {
        /// File holding the raw model response
        #[arg(long)]
        response: PathBuf,

        /// Statistics file to attach the insights to
        #[arg(long)]
        stats: Option<PathBuf>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), PersonasCliError> {
    match cli.command {
        Commands::Extract {
            csv_path,
            top_k,
            seed,
            threshold,
            window_days,
            min_days,
            output_dir,
            plot,
            id_col,
            date_col,
            steps_col,
            sleep_col,
            rhr_col,
        } => {
            let config = PipelineConfig {
                window: WindowConfig::new(window_days, min_days),
                selection: SelectionConfig {
                    top_k,
                    seed,
                    threshold,
                },
                columns: ColumnMapping {
                    id: id_col,
                    date: date_col,
                    steps: steps_col,
                    sleep: sleep_col,
                    resting_hr: rhr_col,
                    ..ColumnMapping::default()
                },
                ..PipelineConfig::default()
            };
            cmd_extract(&csv_path, config, &output_dir, plot)
        }

        Commands::Stats {
            input_files,
            output,
            output_dir,
            quiet,
        } => cmd_stats(&input_files, output.as_deref(), &output_dir, quiet),

        Commands::Prompt {
            input_files,
            age,
            gender,
            template,
            output_dir,
            quiet,
        } => cmd_prompt(
            &input_files,
            &age,
            &gender,
            template.as_deref(),
            &output_dir,
            quiet,
        ),

        Commands::Insights {
            response,
            stats,
            output,
        } => cmd_insights(&response, stats.as_deref(), output.as_deref()),
    }
}

fn cmd_extract(
    csv_path: &Path,
    config: PipelineConfig,
    output_dir: &Path,
    plot: bool,
) -> Result<(), PersonasCliError> {
    let pipeline = PersonaPipeline::new(config)?;
    let config = pipeline.config();
    let rule = "=".repeat(80);

    println!("{rule}");
    println!("Persona Extraction Pipeline");
    println!("{rule}");
    println!("Input file: {}", csv_path.display());
    println!("Output directory: {}", output_dir.display());
    println!("Window size: {} days", config.window.window_days);
    println!("Minimum data coverage: {} days", config.window.min_present_days);
    println!("Selection pool size (top-k): {}", config.selection.top_k);
    match config.selection.seed {
        Some(seed) => println!("Random seed: {seed}"),
        None => println!("Random seed: None (random)"),
    }

    let records = load_csv(csv_path, &config.columns)?;
    let output = pipeline.run(&records);
    let report = &output.report;
    println!(
        "\nLoaded {} rows from {} participants",
        records.len(),
        report.participants_seen
    );
    println!(
        "Scanned {} windows: {} valid, {} non-contiguous, {} insufficient coverage",
        report.windows_scanned,
        report.windows_valid,
        report.rejected_non_contiguous,
        report.rejected_insufficient_coverage
    );

    for (persona, selection) in &output.selections {
        println!(
            "\n{}",
            format_candidate_summary(&selection.pool, *persona, config.selection.top_k)
        );
    }

    fs::create_dir_all(output_dir)?;
    for (persona, selection) in &output.selections {
        let candidate = &selection.selected;
        println!("\nPersona {persona} Selected:");
        println!("  ID:         {}", candidate.participant_id);
        println!("  Start Date: {}", candidate.start_date);
        println!("  Fit Score:  {:.4}", candidate.fit_score);
        if config.selection.top_k > 1 {
            println!(
                "  (Randomly selected from top {} candidates)",
                config.selection.top_k
            );
        }

        let path = persona_output_path(output_dir, persona.as_str());
        fs::write(&path, selection.document.to_json()?)?;
        println!("  Saved to:   {}", path.display());

        if plot {
            println!("{}", window_sparklines(*persona, &selection.window));
        }
    }

    if plot && !output.selections.is_empty() {
        let panels: Vec<_> = output
            .selections
            .iter()
            .map(|(persona, selection)| (*persona, &selection.window))
            .collect();
        plot_comparison(&panels, &output_dir.join("comparison.png"))?;
    }

    match output.failures.into_iter().next() {
        Some((_, err)) => Err(err.into()),
        None => Ok(()),
    }
}

fn load_document(path: &Path) -> Result<PersonaDocument, PersonasCliError> {
    if !path.exists() {
        return Err(PersonasCliError::FileNotFound(path.to_path_buf()));
    }
    Ok(PersonaDocument::from_json(&fs::read_to_string(path)?)?)
}

fn document_label(document: &PersonaDocument) -> &str {
    if document.persona.is_empty() {
        "x"
    } else {
        &document.persona
    }
}

fn cmd_stats(
    input_files: &[PathBuf],
    output: Option<&Path>,
    output_dir: &Path,
    quiet: bool,
) -> Result<(), PersonasCliError> {
    if output.is_some() && input_files.len() > 1 {
        return Err(PersonasCliError::InvalidArgs(
            "--output can only be used with a single input file".to_string(),
        ));
    }

    for input in input_files {
        let document = load_document(input)?;
        let statistics = document.compute_statistics()?;
        if !quiet {
            println!("{}", format_statistics_summary(&statistics));
        }

        let path = match output {
            Some(path) => path.to_path_buf(),
            None => {
                fs::create_dir_all(output_dir)?;
                statistics_output_path(output_dir, document_label(&document))
            }
        };
        fs::write(&path, statistics.to_json()?)?;
        if !quiet {
            println!("Saved statistics to: {}", path.display());
        }
    }
    Ok(())
}

fn cmd_prompt(
    input_files: &[PathBuf],
    age: &str,
    gender: &str,
    template: Option<&Path>,
    output_dir: &Path,
    quiet: bool,
) -> Result<(), PersonasCliError> {
    let builder = match template {
        Some(path) => ObserverPromptBuilder::from_file(path)?,
        None => ObserverPromptBuilder::new(),
    };
    fs::create_dir_all(output_dir)?;

    for input in input_files {
        if !quiet {
            println!("\nProcessing {}...", input.display());
        }
        let document = load_document(input)?;
        let statistics = document.compute_statistics()?;
        if !quiet {
            println!("{}", format_statistics_summary(&statistics));
        }

        let prompt = builder.build(&document, &statistics, age, gender);
        let label = document_label(&document);
        let stats_path = statistics_output_path(output_dir, label);
        let prompt_path = prompt_output_path(output_dir, label);

        fs::write(&stats_path, statistics.to_json()?)?;
        fs::write(&prompt_path, prompt)?;
        if !quiet {
            println!("Saved statistics to: {}", stats_path.display());
            println!("Saved prompt to: {}", prompt_path.display());
        }
    }

    if !quiet {
        println!("\nNext steps:");
        println!("  1. Use the generated prompt with your preferred LLM");
        println!("  2. The LLM should return a JSON array of 5 insights");
        println!("  3. Each insight has: insight, explanation, confidence_score (0-10)");
    }
    Ok(())
}

fn cmd_insights(
    response: &Path,
    stats: Option<&Path>,
    output: Option<&Path>,
) -> Result<(), PersonasCliError> {
    let raw = fs::read_to_string(response)?;
    let insights = parse_insights_response(&raw);

    let json = match stats {
        Some(path) => StatisticsBundle::from_json(&fs::read_to_string(path)?)?
            .with_insights(insights)
            .to_json()?,
        None => serde_json::to_string_pretty(&insights)?,
    };

    match output {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum PersonasCliError {
    Io(io::Error),
    Persona(PersonaError),
    Json(serde_json::Error),
    FileNotFound(PathBuf),
    InvalidArgs(String),
}

impl From<io::Error> for PersonasCliError {
    fn from(e: io::Error) -> Self {
        PersonasCliError::Io(e)
    }
}

impl From<PersonaError> for PersonasCliError {
    fn from(e: PersonaError) -> Self {
        PersonasCliError::Persona(e)
    }
}

impl From<serde_json::Error> for PersonasCliError {
    fn from(e: serde_json::Error) -> Self {
        PersonasCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(code: &str, message: impl Into<String>, hint: &str) -> Self {
        CliError {
            code: code.to_string(),
            message: message.into(),
            hint: Some(hint.to_string()),
        }
    }
}

impl From<PersonasCliError> for CliError {
    fn from(e: PersonasCliError) -> Self {
        match e {
            PersonasCliError::Io(e) => {
                CliError::new("IO_ERROR", e.to_string(), "Check file paths and permissions")
            }
            PersonasCliError::Json(e) => CliError::new("JSON_ERROR", e.to_string(), "Check JSON syntax"),
            PersonasCliError::FileNotFound(path) => CliError::new(
                "FILE_NOT_FOUND",
                format!("File not found: {}", path.display()),
                "Check the input path",
            ),
            PersonasCliError::InvalidArgs(msg) => {
                CliError::new("INVALID_ARGS", msg, "Run with --help for usage")
            }
            PersonasCliError::Persona(e) => persona_error(e),
        }
    }
}

fn persona_error(e: PersonaError) -> CliError {
    let message = e.to_string();
    match e {
        PersonaError::NoViableCandidates { .. } => {
            CliError::new("NO_VIABLE_CANDIDATES", message, "Try increasing --top-k")
        }
        PersonaError::MissingColumn(_) => CliError::new(
            "MISSING_COLUMN",
            message,
            "Map columns with --id-col, --date-col, --steps-col and --sleep-col",
        ),
        PersonaError::DateParseError(_) => {
            CliError::new("DATE_PARSE_ERROR", message, "Dates must be YYYY-MM-DD")
        }
        PersonaError::InvalidConfig(_) => CliError::new(
            "INVALID_CONFIG",
            message,
            "Check --window-days, --min-days, --top-k and --threshold",
        ),
        PersonaError::InvalidWindow(_) => {
            CliError::new("INVALID_WINDOW", message, "Check the selected participant's data")
        }
        PersonaError::JsonError(_) => CliError::new("JSON_ERROR", message, "Check JSON syntax"),
        PersonaError::Io(_) => {
            CliError::new("IO_ERROR", message, "Check file paths and permissions")
        }
        PersonaError::PlotError(_) => {
            CliError::new("PLOT_ERROR", message, "Check the output directory is writable")
        }
        PersonaError::ParseError(_) => CliError::new("PARSE_ERROR", message, "Check input format"),
    }
}
