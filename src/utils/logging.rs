// src/utils/logging.rs

//! Logging setup with console output and rotating JSON-line files.
//!
//! Library code logs through the `log` facade; the subscriber installed by
//! [`init`] bridges those records into `tracing`. Persistence events are
//! emitted on the [`DB_TARGET`] target with named fields and land in their
//! own file.

use std::fs;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, Layer, filter::filter_fn, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::error::{AppError, Result};
use crate::models::LoggingConfig;

/// Target of the persistence channel.
pub const DB_TARGET: &str = "monitor_db";

/// Log level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warn" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }

    fn as_filter(&self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

/// Install the global subscriber using the configured level.
pub fn init(config: &LoggingConfig) -> Result<()> {
    init_with_level(config, LogLevel::from_str(&config.level))
}

/// Install the global subscriber.
///
/// - console: every target, `RUST_LOG` overrides `level`
/// - `<log_dir>/<file_name>.log.<date>`: JSON lines, everything but [`DB_TARGET`]
/// - `<log_dir>/<db_file_name>.log.<date>`: JSON lines, [`DB_TARGET`] only
pub fn init_with_level(config: &LoggingConfig, level: LogLevel) -> Result<()> {
    fs::create_dir_all(&config.log_dir)?;

    let max = level.as_filter();
    let console_filter = EnvFilter::builder()
        .with_default_directive(max.into())
        .from_env_lossy();

    let main_file =
        tracing_appender::rolling::daily(&config.log_dir, format!("{}.log", config.file_name));
    let db_file =
        tracing_appender::rolling::daily(&config.log_dir, format!("{}.log", config.db_file_name));

    tracing_subscriber::registry()
        .with(fmt::layer().with_filter(console_filter))
        .with(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(main_file)
                .with_filter(filter_fn(move |meta| {
                    meta.target() != DB_TARGET && *meta.level() <= max
                })),
        )
        .with(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(db_file)
                .with_filter(filter_fn(move |meta| {
                    meta.target() == DB_TARGET && *meta.level() <= max
                })),
        )
        .try_init()
        .map_err(|e| AppError::Logging(e.to_string()))
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    log::info!("[SUMMARY] {}", title);
    for (key, value) in items {
        log::info!("    {}: {}", key, value);
    }
}
