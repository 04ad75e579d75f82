//! Wikivault main entry point
//!
//! This is the command-line interface for the wikivault category-tree
//! backup tool.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use wikivault::config::load_config_with_hash;
use wikivault::pipeline::run_pipeline;

/// Default configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Wikivault: wiki category-tree inventory and backup
///
/// Wikivault crawls a wiki category tree from a configured root, records
/// which category each page belongs to, downloads a bulk export of the
/// discovered pages, compresses it, and mails a run report.
#[derive(Parser, Debug)]
#[command(name = "wikivault")]
#[command(version)]
#[command(about = "Wiki category-tree inventory and backup", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration; a missing or invalid config aborts
    // before any crawl work is submitted
    let config_path = cli
        .config
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    tracing::info!("Loading configuration from: {}", config_path.display());
    let (config, config_hash) = match load_config_with_hash(&config_path) {
        Ok((config, hash)) => (config, hash),
        Err(error) => {
            tracing::error!("Failed to load configuration: {}", error);
            return ExitCode::from(1);
        }
    };
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    // Run the pipeline; mail delivery failures do not fail the run, an
    // unrecoverable stage failure does
    match run_pipeline(config).await {
        Ok(summary) => {
            tracing::info!(
                "Run completed: {} node(s) visited, {} page(s) recorded, backup {} byte(s), archive {} byte(s), {} mail failure(s)",
                summary.visited_count,
                summary.recorded_count,
                summary.backup_bytes,
                summary.archive_bytes,
                summary.mail_failures
            );
            ExitCode::SUCCESS
        }
        Err(error) => {
            tracing::error!("Run failed: {}", error);
            ExitCode::from(2)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("wikivault=info,warn"),
            1 => EnvFilter::new("wikivault=debug,info"),
            2 => EnvFilter::new("wikivault=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
