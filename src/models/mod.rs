// src/models/mod.rs

//! Domain models for the monitor.
//!
//! Ranked items and snapshots, the change events computed between two
//! snapshots, and the configuration set.

mod change;
mod config;
mod item;

// Re-export all public types
pub use change::{ChangeEvent, DiffReport};
pub use config::{Config, LoggingConfig, MailConfig, PathsConfig, ScheduleConfig, SourceConfig};
pub use item::{Item, Snapshot};
