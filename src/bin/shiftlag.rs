//! ShiftLag CLI - Command-line interface for the ShiftLag engine
//!
//! Commands:
//! - score: Compute a ShiftLag result from sleep_logs and shifts exports
//! - validate: Report which rows of an export the engine can read
//! - config: Print the effective engine configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Utc;
use serde::de::DeserializeOwned;
use shiftlag::schema::{parse_timestamp, AdapterReport, SkippedRow};
use shiftlag::{
    ComputeError, MemoryStore, RowAdapter, ShiftLagConfig, ShiftLagEngine, ShiftRow, SleepLogRow,
    UserId, ENGINE_VERSION,
};
use tracing_subscriber::EnvFilter;

/// ShiftLag - circadian strain scoring for shift workers
#[derive(Parser)]
#[command(name = "shiftlag")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Score body-clock misalignment from sleep logs and shift rotas", long_about = None)]
struct Cli {
    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a ShiftLag result
    Score {
        /// sleep_logs export (use - for stdin)
        #[arg(long)]
        sleep: PathBuf,

        /// shifts export (use - for stdin)
        #[arg(long)]
        shifts: PathBuf,

        /// User to score (UUID)
        #[arg(short, long)]
        user: String,

        /// Reference time (RFC 3339); defaults to now
        #[arg(long)]
        now: Option<String>,

        /// Engine configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Validate sleep_logs and/or shifts exports
    Validate {
        /// sleep_logs export
        #[arg(long)]
        sleep: Option<PathBuf>,

        /// shifts export
        #[arg(long)]
        shifts: Option<PathBuf>,

        /// Input format
        #[arg(long, default_value = "json")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the engine configuration (defaults, or a validated file)
    Config {
        /// Configuration file to validate and print
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// JSON array of rows
    Json,
    /// Newline-delimited JSON (one row per line)
    Ndjson,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Single-line JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(cli.command) {
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

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("shiftlag={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(command: Commands) -> Result<(), ShiftLagCliError> {
    match command {
        Commands::Score {
            sleep,
            shifts,
            user,
            now,
            config,
            input_format,
            output_format,
        } => cmd_score(
            &sleep,
            &shifts,
            &user,
            now.as_deref(),
            config.as_deref(),
            &input_format,
            &output_format,
        ),

        Commands::Validate {
            sleep,
            shifts,
            input_format,
            json,
        } => cmd_validate(sleep.as_deref(), shifts.as_deref(), &input_format, json),

        Commands::Config { config } => cmd_config(config.as_deref()),
    }
}

fn cmd_score(
    sleep_path: &Path,
    shifts_path: &Path,
    user: &str,
    now: Option<&str>,
    config_path: Option<&Path>,
    input_format: &InputFormat,
    output_format: &OutputFormat,
) -> Result<(), ShiftLagCliError> {
    let user_id = UserId::parse_str(user.trim())
        .map_err(|e| ShiftLagCliError::InvalidArgument(format!("--user: {e}")))?;
    let now = match now {
        Some(raw) => parse_timestamp(raw)?,
        None => Utc::now(),
    };
    let config = load_config(config_path)?;

    let adapter = RowAdapter::new(user_id, config.offset());
    let sleep_rows: Vec<SleepLogRow> = read_rows(sleep_path, input_format)?;
    let shift_rows: Vec<ShiftRow> = read_rows(shifts_path, input_format)?;

    let sleep = adapter.sleep_sessions(&sleep_rows);
    let shifts = adapter.shifts(&shift_rows);
    tracing::info!(
        sleep_rows = sleep.report.accepted,
        shift_rows = shifts.report.accepted,
        skipped = sleep.report.skipped_count() + shifts.report.skipped_count(),
        "rows loaded"
    );

    let engine = ShiftLagEngine::with_config(MemoryStore::new(sleep.records, shifts.records), config)?;
    let result = engine.try_calculate_at(user_id, now)?;

    let output = match output_format {
        OutputFormat::Json => serde_json::to_string(&result)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&result)?,
    };
    println!("{output}");

    Ok(())
}

fn cmd_validate(
    sleep_path: Option<&Path>,
    shifts_path: Option<&Path>,
    input_format: &InputFormat,
    json: bool,
) -> Result<(), ShiftLagCliError> {
    if sleep_path.is_none() && shifts_path.is_none() {
        return Err(ShiftLagCliError::NoInput);
    }

    let adapter = RowAdapter::new(UserId::nil(), ShiftLagConfig::default().offset());
    let mut reports = Vec::new();

    if let Some(path) = sleep_path {
        let rows: Vec<SleepLogRow> = read_rows(path, input_format)?;
        reports.push(TableReport::new("sleep_logs", path, adapter.sleep_sessions(&rows).report));
    }
    if let Some(path) = shifts_path {
        let rows: Vec<ShiftRow> = read_rows(path, input_format)?;
        reports.push(TableReport::new("shifts", path, adapter.shifts(&rows).report));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        println!("Validation Report");
        println!("=================");
        for report in &reports {
            println!("\n{} ({})", report.table, report.path);
            println!("  Total rows:    {}", report.report.total_rows);
            println!("  Accepted rows: {}", report.report.accepted);
            println!("  Skipped rows:  {}", report.report.skipped_count());
            for SkippedRow { index, reason } in &report.report.skipped {
                println!("    - row {index}: {reason}");
            }
            if !report.report.ignored_fields.is_empty() {
                println!("  Ignored fields: {}", report.report.ignored_fields.len());
                for SkippedRow { index, reason } in &report.report.ignored_fields {
                    println!("    - row {index}: {reason}");
                }
            }
        }
    }

    let skipped: usize = reports.iter().map(|r| r.report.skipped_count()).sum();
    if skipped > 0 {
        Err(ShiftLagCliError::ValidationFailed(skipped))
    } else {
        Ok(())
    }
}

fn cmd_config(config_path: Option<&Path>) -> Result<(), ShiftLagCliError> {
    let config = load_config(config_path)?;
    println!("{}", config.to_json()?);
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ShiftLagConfig, ShiftLagCliError> {
    match path {
        Some(path) => Ok(ShiftLagConfig::from_json(&read_input(path)?)?),
        None => Ok(ShiftLagConfig::default()),
    }
}

fn read_rows<T: DeserializeOwned>(
    path: &Path,
    format: &InputFormat,
) -> Result<Vec<T>, ShiftLagCliError> {
    let data = read_input(path)?;
    let rows = match format {
        InputFormat::Json => RowAdapter::parse_array(&data)?,
        InputFormat::Ndjson => RowAdapter::parse_ndjson(&data)?,
    };
    Ok(rows)
}

fn read_input(path: &Path) -> Result<String, ShiftLagCliError> {
    if path.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

// Error handling

#[derive(Debug)]
enum ShiftLagCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    InvalidArgument(String),
    NoInput,
    ValidationFailed(usize),
}

impl From<io::Error> for ShiftLagCliError {
    fn from(e: io::Error) -> Self {
        ShiftLagCliError::Io(e)
    }
}

impl From<ComputeError> for ShiftLagCliError {
    fn from(e: ComputeError) -> Self {
        ShiftLagCliError::Compute(e)
    }
}

impl From<serde_json::Error> for ShiftLagCliError {
    fn from(e: serde_json::Error) -> Self {
        ShiftLagCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ShiftLagCliError> for CliError {
    fn from(e: ShiftLagCliError) -> Self {
        match e {
            ShiftLagCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ShiftLagCliError::Compute(ComputeError::InvalidConfig(msg)) => CliError {
                code: "INVALID_CONFIG".to_string(),
                message: msg,
                hint: Some("Run 'shiftlag config' to see a valid configuration".to_string()),
            },
            ShiftLagCliError::Compute(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure input rows follow the sleep_logs/shifts export format".to_string()),
            },
            ShiftLagCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            ShiftLagCliError::InvalidArgument(msg) => CliError {
                code: "INVALID_ARGUMENT".to_string(),
                message: msg,
                hint: Some("Run 'shiftlag --help' for usage".to_string()),
            },
            ShiftLagCliError::NoInput => CliError {
                code: "NO_INPUT".to_string(),
                message: "No input files given".to_string(),
                hint: Some("Pass --sleep and/or --shifts".to_string()),
            },
            ShiftLagCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} rows could not be read", count),
                hint: Some("Fix the reported rows and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct TableReport {
    table: &'static str,
    path: String,
    #[serde(flatten)]
    report: AdapterReport,
}

impl TableReport {
    fn new(table: &'static str, path: &Path, report: AdapterReport) -> Self {
        Self {
            table,
            path: path.display().to_string(),
            report,
        }
    }
}
