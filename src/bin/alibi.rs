//! Alibi CLI - Command-line interface for the No Alibi analysis engine
//!
//! Commands:
//! - replay: Run a recorded session event stream through the engine
//! - report: Render the case file (or aggregate) for a saved session log
//! - validate: Validate session event schema
//! - rules: Print the pattern rule table

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Utc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use no_alibi::rules::PATTERN_RULES;
use no_alibi::schema::{SessionEvent, SessionEventAdapter, SESSION_SCHEMA_VERSION};
use no_alibi::session::SessionAggregator;
use no_alibi::types::QuestionLogEntry;
use no_alibi::{CaseFileRenderer, EngineConfig, PhraseBank, ENGINE_VERSION};

/// Alibi - baseline-relative facial pattern analysis
#[derive(Parser)]
#[command(name = "alibi")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Detect sustained facial patterns in recorded question sessions", long_about = None)]
struct Cli {
    /// Log engine activity to stderr (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded session and write the session log
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path for the session log (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Also write the case file to this path
        #[arg(long)]
        case_file: Option<PathBuf>,

        /// Phrase bank used for per-question commentary
        #[arg(long)]
        phrase_bank: Option<PathBuf>,

        /// Engine configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Frame rate override
        #[arg(long)]
        fps: Option<f64>,
    },

    /// Render a saved session log
    Report {
        /// Session log path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Print the session aggregate as JSON instead of the case file
        #[arg(long)]
        json: bool,
    },

    /// Validate session event schema
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the pattern rule table
    Rules {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one event per line)
    Ndjson,
    /// JSON array of events
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

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

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("no_alibi=debug,alibi=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), AlibiCliError> {
    match cli.command {
        Commands::Replay {
            input,
            output,
            input_format,
            case_file,
            phrase_bank,
            config,
            fps,
        } => cmd_replay(
            &input,
            &output,
            input_format,
            case_file.as_deref(),
            phrase_bank.as_deref(),
            config.as_deref(),
            fps,
        ),

        Commands::Report { input, json } => cmd_report(&input, json),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Rules { json } => cmd_rules(json),
    }
}

fn cmd_replay(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    case_file: Option<&Path>,
    phrase_bank: Option<&Path>,
    config: Option<&Path>,
    fps: Option<f64>,
) -> Result<(), AlibiCliError> {
    let events = read_events(input, &input_format)?;
    if events.is_empty() {
        return Err(AlibiCliError::NoEvents);
    }

    let mut engine_config = match config {
        Some(path) => EngineConfig::from_json(&fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    if let Some(fps) = fps {
        engine_config.fps = fps;
    }

    let phrases = match phrase_bank {
        Some(path) => Some(PhraseBank::from_json(&fs::read_to_string(path)?)?),
        None => None,
    };

    let report = SessionEventAdapter::replay(&events, engine_config, phrases)?;
    info!(
        session_id = report.session_id.as_str(),
        questions = report.log.len(),
        "replay complete"
    );

    write_output(output, &serde_json::to_string_pretty(&report.log)?)?;

    if let Some(path) = case_file {
        fs::write(path, CaseFileRenderer::render_report(&report))?;
    }

    Ok(())
}

fn cmd_report(input: &Path, json: bool) -> Result<(), AlibiCliError> {
    let log: Vec<QuestionLogEntry> = serde_json::from_str(&read_input(input)?)?;
    let aggregate = SessionAggregator::aggregate(&log);

    if json {
        println!("{}", serde_json::to_string_pretty(&aggregate)?);
    } else {
        println!("{}", CaseFileRenderer::render(&aggregate, Utc::now()));
    }

    Ok(())
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), AlibiCliError> {
    let events = read_events(input, &input_format)?;
    let results = SessionEventAdapter::validate_events(&events);

    let report = ValidationReport {
        schema_version: SESSION_SCHEMA_VERSION.to_string(),
        total_events: events.len(),
        valid_events: events.len() - results.len(),
        invalid_events: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                kind: r.kind.to_string(),
                error: r.result.as_ref().map(|e| e.to_string()).unwrap_or_default(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report ({})", report.schema_version);
        println!("=================");
        println!("Total events:   {}", report.total_events);
        println!("Valid events:   {}", report.valid_events);
        println!("Invalid events: {}", report.invalid_events);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - {} event (index {}): {}", err.kind, err.index, err.error);
            }
        }
    }

    if report.invalid_events > 0 {
        Err(AlibiCliError::ValidationFailed(report.invalid_events))
    } else {
        Ok(())
    }
}

fn cmd_rules(json: bool) -> Result<(), AlibiCliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(PATTERN_RULES)?);
        return Ok(());
    }

    println!("{:<24} {:<8} REQUIRES", "PATTERN", "CONF");
    for rule in PATTERN_RULES {
        let requires: Vec<String> = rule
            .requires
            .iter()
            .map(|(signal, direction)| format!("{}:{}", signal.as_str(), direction.as_str()))
            .collect();
        println!(
            "{:<24} {:<8} {}",
            rule.name,
            rule.confidence().as_str(),
            requires.join(" + ")
        );
    }

    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, AlibiCliError> {
    if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            warn!("reading from an interactive terminal; end input with Ctrl-D");
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn read_events(input: &Path, input_format: &InputFormat) -> Result<Vec<SessionEvent>, AlibiCliError> {
    let data = read_input(input)?;
    let events = match input_format {
        InputFormat::Ndjson => SessionEventAdapter::parse_ndjson(&data)?,
        InputFormat::Json => SessionEventAdapter::parse_array(&data)?,
    };
    Ok(events)
}

fn write_output(output: &Path, data: &str) -> Result<(), AlibiCliError> {
    if output.to_string_lossy() == "-" {
        println!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

// Error types

#[derive(Debug)]
enum AlibiCliError {
    Io(io::Error),
    Analysis(no_alibi::AnalysisError),
    Json(serde_json::Error),
    NoEvents,
    ValidationFailed(usize),
}

impl From<io::Error> for AlibiCliError {
    fn from(e: io::Error) -> Self {
        AlibiCliError::Io(e)
    }
}

impl From<no_alibi::AnalysisError> for AlibiCliError {
    fn from(e: no_alibi::AnalysisError) -> Self {
        AlibiCliError::Analysis(e)
    }
}

impl From<serde_json::Error> for AlibiCliError {
    fn from(e: serde_json::Error) -> Self {
        AlibiCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<AlibiCliError> for CliError {
    fn from(e: AlibiCliError) -> Self {
        use no_alibi::AnalysisError;

        match e {
            AlibiCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            AlibiCliError::Analysis(e) => {
                let (code, hint) = match &e {
                    AnalysisError::InvalidConfig(_) => {
                        ("CONFIG_ERROR", "Check the engine configuration values")
                    }
                    AnalysisError::PhaseError(_) => (
                        "PHASE_ERROR",
                        "Events must follow calibration → questions → session end",
                    ),
                    AnalysisError::EmptyCalibration => (
                        "EMPTY_CALIBRATION",
                        "Record at least one face frame between calibration start and end",
                    ),
                    _ => (
                        "PARSE_ERROR",
                        "Ensure input matches alibi.session_event.v1 schema",
                    ),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            AlibiCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            AlibiCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            AlibiCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} events failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    schema_version: String,
    total_events: usize,
    valid_events: usize,
    invalid_events: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    kind: String,
    error: String,
}
