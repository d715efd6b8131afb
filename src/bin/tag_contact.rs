//! Tag Contact CLI - Command-line interface for tag contact analysis
//!
//! Commands:
//! - analyze: Run the full pipeline over a position table and ranging tables
//! - verify: Check that every expected tag id is present in a position table
//! - config: Print the effective analysis configuration

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tag_contact::table::{load_position_table, write_contact_records};
use tag_contact::types::{AnalysisReport, VerificationReport};
use tag_contact::verification::verify_identifiers;
use tag_contact::{
    AnalysisConfig, AnalysisError, ContactAnalyzer, CyclePattern, ReportEncoder, VERSION,
};

/// Tag Contact - contact estimation from tag positioning and ranging data
#[derive(Parser)]
#[command(name = "tag-contact")]
#[command(version = VERSION)]
#[command(about = "Estimate contact moments between two tags", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full analysis pipeline
    Analyze {
        /// Position table (TagID, Time [s], x [m], y[m])
        #[arg(short, long)]
        positions: PathBuf,

        /// Ranging table of one tag (Time [s], Distance [m], ContactID), repeatable
        #[arg(short, long, required = true)]
        ranging: Vec<PathBuf>,

        #[command(flatten)]
        settings: Settings,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Directory to write contact records into, one table per ranging file
        #[arg(long)]
        records_out: Option<PathBuf>,
    },

    /// Check tag id presence in a position table
    Verify {
        /// Position table
        #[arg(short, long)]
        positions: PathBuf,

        #[command(flatten)]
        settings: Settings,

        /// Output report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as JSON
    Config {
        #[command(flatten)]
        settings: Settings,
    },
}

/// Configuration file and overrides
#[derive(Args)]
struct Settings {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Expected tag ids, in logging cycle order when --cycle-order is given
    #[arg(long, value_delimiter = ',')]
    tags: Option<Vec<String>>,

    /// Keep the --tags order instead of sorting alphabetically
    #[arg(long)]
    cycle_order: bool,

    /// Contact distance (meters)
    #[arg(long)]
    threshold: Option<f64>,

    /// Reference distance for the cross-validation percentage (meters)
    #[arg(long)]
    nominal_threshold: Option<f64>,

    /// Ranging sample rate (Hz)
    #[arg(long)]
    sample_rate: Option<f64>,

    /// Moving average window (samples)
    #[arg(long)]
    window: Option<usize>,
}

impl Settings {
    fn resolve(&self) -> Result<AnalysisConfig, AnalysisError> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_path(path)?,
            None => AnalysisConfig::default(),
        };

        if let Some(tags) = &self.tags {
            config.cycle = if self.cycle_order {
                CyclePattern::new(tags.iter().cloned())
            } else {
                CyclePattern::alphabetical(tags.iter().cloned())
            };
        }
        if let Some(threshold) = self.threshold {
            config.contact_threshold_m = threshold;
        }
        if let Some(threshold) = self.nominal_threshold {
            config.nominal_threshold_m = threshold;
        }
        if let Some(rate) = self.sample_rate {
            config.sample_rate_hz = rate;
        }
        if let Some(window) = self.window {
            config.window_size = window;
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human readable summary
    Text,
    /// Compact JSON report
    Json,
    /// Pretty-printed JSON report
    JsonPretty,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), ContactCliError> {
    match cli.command {
        Commands::Analyze {
            positions,
            ranging,
            settings,
            format,
            output,
            records_out,
        } => cmd_analyze(
            &positions,
            &ranging,
            &settings,
            format,
            &output,
            records_out.as_deref(),
        ),

        Commands::Verify {
            positions,
            settings,
            json,
        } => cmd_verify(&positions, &settings, json),

        Commands::Config { settings } => {
            let config = settings.resolve()?;
            println!("{}", config.to_json()?);
            Ok(())
        }
    }
}

fn cmd_analyze(
    positions: &Path,
    ranging: &[PathBuf],
    settings: &Settings,
    format: OutputFormat,
    output: &Path,
    records_out: Option<&Path>,
) -> Result<(), ContactCliError> {
    let config = settings.resolve()?;
    let analyzer = ContactAnalyzer::new(config.clone())?;

    let analysis = analyzer.analyze_files(positions, ranging)?;

    if let Some(dir) = records_out {
        fs::create_dir_all(dir)?;
        for (contact, source) in analysis.contacts.iter().zip(ranging) {
            let stem = source
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "ranging".to_string());
            let path = dir.join(format!("{stem}_contacts.csv"));
            write_contact_records(&path, &contact.records)?;
            info!(path = %path.display(), records = contact.records.len(), "Wrote contact records");
        }
    }

    let encoder = ReportEncoder::new();
    let output_data = match format {
        OutputFormat::Text => format_text(&encoder.encode(&config, &analysis), ranging),
        OutputFormat::Json => encoder.encode_to_json(&config, &analysis)? + "\n",
        OutputFormat::JsonPretty => encoder.encode_to_json_pretty(&config, &analysis)? + "\n",
    };

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

fn cmd_verify(positions: &Path, settings: &Settings, json: bool) -> Result<(), ContactCliError> {
    let config = settings.resolve()?;
    let series = load_position_table(positions)?;
    let report = verify_identifiers(config.cycle.identifiers(), &series);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_verification(&report);
    }

    if report.complete {
        Ok(())
    } else {
        Err(ContactCliError::MissingTags(report.missing.len()))
    }
}

fn print_verification(report: &VerificationReport) {
    println!("Verification Report");
    println!("===================");
    println!("Present tag ids: {}", join(report.present.iter()));
    if report.complete {
        println!("No missing tag ids");
    } else {
        println!("Missing tag ids: {}", join(report.missing.iter()));
    }
}

fn format_text(report: &AnalysisReport, ranging: &[PathBuf]) -> String {
    let mut out = String::new();
    out.push_str("Contact Analysis Report\n");
    out.push_str("=======================\n");
    out.push_str(&format!(
        "Producer: {} {}\n",
        report.producer.name, report.producer.version
    ));
    out.push_str(&format!(
        "Contact distance: {} m, sample rate: {} Hz, filter window: {}\n\n",
        report.config.contact_threshold_m, report.config.sample_rate_hz, report.config.window_size
    ));

    if report.verification.complete {
        out.push_str("No missing tag ids\n");
    } else {
        out.push_str(&format!(
            "Missing tag ids: {}\n",
            join(report.verification.missing.iter())
        ));
    }
    if let Some(reconciliation) = &report.reconciliation {
        for repair in &reconciliation.repairs {
            out.push_str(&format!(
                "  Repaired {}: {} records relabeled from cycle offset {}\n",
                repair.entity_id, repair.relabeled, repair.offset
            ));
        }
    }
    out.push('\n');

    for (summary, source) in report.cross_validation.iter().zip(ranging) {
        if let Some(reason) = &summary.skipped {
            out.push_str(&format!(
                "[{}] Cross-validation skipped: {}\n",
                source.display(),
                reason
            ));
            continue;
        }
        match (summary.mean_difference, summary.mean_difference_pct) {
            (Some(mean), Some(pct)) => out.push_str(&format!(
                "[{}] Average distance difference between (filtered) position data and ranging \
                 data is {:.3} m, which is {:.1}% of the defined {} m contact distance.\n",
                source.display(),
                mean,
                pct,
                summary.nominal_threshold_m
            )),
            _ => out.push_str(&format!(
                "[{}] No samples to cross-validate.\n",
                source.display()
            )),
        }
    }
    out.push('\n');

    for (contact, source) in report.contacts.iter().zip(ranging) {
        let stats = &contact.statistics;
        out.push_str(&format!(
            "[{}] tag {}: for {} s out of {} s, tags were within contact distance of each other\n",
            source.display(),
            contact.self_id.as_deref().unwrap_or("-"),
            stats.contact_duration_s,
            stats.observation_duration_s
        ));
        match stats.mean_interval_duration_s {
            Some(mean) => out.push_str(&format!(
                "  In total {} contact moment(s) occurred, with an average duration of {:.2} s\n",
                stats.interval_count, mean
            )),
            None => out.push_str("  No contact moments occurred, average duration undefined\n"),
        }
    }

    out
}

fn join<'a>(ids: impl Iterator<Item = &'a String>) -> String {
    let ids: Vec<&str> = ids.map(String::as_str).collect();
    if ids.is_empty() {
        "-".to_string()
    } else {
        ids.join(", ")
    }
}

// Error types

#[derive(Debug)]
enum ContactCliError {
    Io(io::Error),
    Analysis(AnalysisError),
    Json(serde_json::Error),
    MissingTags(usize),
}

impl From<io::Error> for ContactCliError {
    fn from(e: io::Error) -> Self {
        ContactCliError::Io(e)
    }
}

impl From<AnalysisError> for ContactCliError {
    fn from(e: AnalysisError) -> Self {
        ContactCliError::Analysis(e)
    }
}

impl From<serde_json::Error> for ContactCliError {
    fn from(e: serde_json::Error) -> Self {
        ContactCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<ContactCliError> for CliError {
    fn from(e: ContactCliError) -> Self {
        match e {
            ContactCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            ContactCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            ContactCliError::MissingTags(count) => CliError {
                code: "MISSING_TAG_IDS".to_string(),
                message: format!("{} tag id(s) missing in position data", count),
                hint: Some(
                    "'tag-contact analyze' repairs missing ids from the logging cycle".to_string(),
                ),
            },
            ContactCliError::Analysis(e) => {
                let (code, hint) = match &e {
                    AnalysisError::FileNotFound { .. } => {
                        ("FILE_NOT_FOUND", Some("Error: missing file locations. Check file paths"))
                    }
                    AnalysisError::Schema(_) => (
                        "SCHEMA_ERROR",
                        Some("Ensure the tables use the expected column names"),
                    ),
                    AnalysisError::MissingIdentifier { .. } => ("MISSING_TAG_IDS", None),
                    AnalysisError::UnknownIdentifier(_) => (
                        "UNKNOWN_TAG_ID",
                        Some("Check --tags against the ContactID column"),
                    ),
                    AnalysisError::LengthMismatch { .. } => (
                        "LENGTH_MISMATCH",
                        Some("Position and ranging tables must cover the same time steps"),
                    ),
                    AnalysisError::InvalidConfig(_) => ("INVALID_CONFIG", None),
                    AnalysisError::Io(_) => ("IO_ERROR", Some("Check file paths and permissions")),
                    AnalysisError::Json(_) => {
                        ("JSON_ERROR", Some("Check configuration JSON syntax"))
                    }
                    AnalysisError::EmptyIntervalSet => ("NO_CONTACTS", None),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: hint.map(str::to_string),
                }
            }
        }
    }
}
