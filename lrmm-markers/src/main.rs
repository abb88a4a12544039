//! lrmm-markers - Read-only inspection of a recording's markers
//!
//! Lists, shows and checks the sidecar markers document of a recording
//! directory without regenerating anything.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lrmm_common::config::{ConfigResolver, LoggingConfig};
use lrmm_markers::inspect;
use lrmm_markers::RecordingLayout;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for lrmm-markers
#[derive(Parser, Debug)]
#[command(name = "lrmm-markers")]
#[command(about = "Inspect the markers document of a recording")]
#[command(version)]
struct Args {
    /// Configuration file (takes precedence over LRMM_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all markers
    List {
        /// Recording directory
        recording: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show one marker
    Show {
        /// Recording directory
        recording: PathBuf,

        /// Marker label
        label: String,
    },
    /// Verify that every referenced image exists
    Check {
        /// Recording directory
        recording: PathBuf,
    },
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let loaded = ConfigResolver::new().load(args.config.as_deref());
    init_tracing(&loaded.config.logging)?;

    info!(
        "Starting lrmm-markers v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    loaded.log_summary();

    let config = loaded.config;
    match args.command {
        Command::List { recording, json } => {
            let layout = RecordingLayout::new(recording, &config.layout);
            let records = inspect::load_records(&layout)
                .with_context(|| format!("Failed to read markers of {}", layout.recording_dir().display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for record in &records {
                    println!("{}", inspect::summary_line(record));
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Show { recording, label } => {
            let layout = RecordingLayout::new(recording, &config.layout);
            let records = inspect::load_records(&layout)
                .with_context(|| format!("Failed to read markers of {}", layout.recording_dir().display()))?;

            match records.iter().find(|r| r.label == label) {
                Some(record) => {
                    println!("{}", inspect::detail(record));
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    eprintln!("No marker labelled {}", label);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Check { recording } => {
            let layout = RecordingLayout::new(recording, &config.layout);
            let report = inspect::check(&layout)
                .with_context(|| format!("Markers document of {} is unusable", layout.recording_dir().display()))?;

            for missing in &report.missing {
                println!("{}: missing {}", missing.label, missing.path.display());
            }
            println!(
                "{} markers, {} missing files",
                report.records,
                report.missing.len()
            );

            Ok(if report.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

/// `RUST_LOG` wins over the configured level
fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .with_context(|| format!("Invalid log level '{}'", config.level))?;
    let registry = tracing_subscriber::registry().with(filter);

    match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            registry
                .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
                .init();
        }
        None => {
            registry.with(fmt::layer().with_writer(std::io::stderr)).init();
        }
    }

    Ok(())
}
