//! Douban Top 250 monitor CLI
//!
//! Local execution entry point.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use top250_monitor::{
    error::Result,
    models::{Config, Snapshot},
    pipeline::{self, Monitor},
    storage::{LocalStorage, SnapshotStorage},
    utils::logging::{self, LogLevel},
};

/// top250-monitor - Douban Top 250 change monitor
#[derive(Parser, Debug)]
#[command(
    name = "top250-monitor",
    version,
    about = "Watches the Douban movie Top 250 and reports ranking changes"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "monitor.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll forever: fetch, compare, report and persist on every interval
    Run,

    /// Run a single cycle and print the report
    Once,

    /// Compare two stored snapshot files and print the report
    Diff {
        /// Older snapshot
        previous: PathBuf,
        /// Newer snapshot
        current: PathBuf,
    },

    /// Validate the configuration file
    Validate,

    /// Print the effective configuration
    Config,

    /// Show current snapshot info
    Info,
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config);

    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::from_str(&config.logging.level)
    };
    logging::init_with_level(&config.logging, level)?;

    log::info!("Loaded configuration from {}", cli.config.display());
    let config = Arc::new(config);

    match cli.command {
        Command::Run => {
            config.validate()?;
            let monitor = Monitor::from_config(Arc::clone(&config)).await?;
            log::info!(
                "Polling every {}s, {} items per snapshot",
                config.schedule.poll_interval_secs,
                config.source.target_count
            );
            monitor.run(None).await;
        }

        Command::Once => {
            config.validate()?;
            let monitor = Monitor::from_config(Arc::clone(&config)).await?;
            let outcome = monitor.run_cycle().await?;
            if outcome.diff.has_changes {
                println!("{}", outcome.report);
            } else {
                log::info!("No changes ({} items)", outcome.item_count);
            }
        }

        Command::Diff { previous, current } => {
            let previous = read_snapshot(&previous)?;
            let current = read_snapshot(&current)?;
            let diff = pipeline::calculate_diff(&previous, &current);
            if diff.has_changes {
                println!("{}", pipeline::render(&diff.events));
            } else {
                log::info!("No changes");
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            if !config.mail.is_configured() || config.mail.recipient.trim().is_empty() {
                log::warn!("Mail is not configured; reports are only written to disk");
            }
            log::info!("✓ Config OK");
        }

        Command::Config => {
            print!("{}", config.to_toml()?);
        }

        Command::Info => {
            let storage = LocalStorage::from_config(&config.paths);
            log::info!("Snapshot file: {}", storage.snapshot_file().display());

            if storage.snapshot_file().exists() {
                let snapshot = storage.load_snapshot().await?;
                log::info!("Items: {}", snapshot.len());
                if let Some(top) = snapshot.items().first() {
                    log::info!("No. 1: {} ({:.1})", top.title, top.score);
                }
            } else {
                log::info!("No snapshot found yet.");
            }
        }
    }

    Ok(())
}

fn read_snapshot(path: &Path) -> Result<Snapshot> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
