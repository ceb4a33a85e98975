//! Storage abstractions for snapshot persistence.
//!
//! ## Directory Structure
//!
//! ```text
//! ./
//! ├── top250.json                       # Latest accepted snapshot
//! ├── records/                          # One copy per accepted snapshot
//! │   └── 2026-10-16T08-00-00-top250.json
//! └── logs/
//!     ├── log_2026-10-16T08-00-00.txt   # Change reports
//!     └── error_2026-10-16T08-00-00.txt # Undelivered mail bodies
//! ```

pub mod local;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Local};

use crate::error::Result;
use crate::models::Snapshot;
use crate::utils::timestamp_slug;

// Re-export for convenience
pub use local::LocalStorage;

/// Metadata about a snapshot write.
#[derive(Debug, Clone)]
pub struct WriteMetadata {
    /// Number of items written
    pub item_count: usize,
    /// Where the snapshot now lives
    pub snapshot_location: PathBuf,
    /// Timestamped copy, if archiving is enabled
    pub archive_location: Option<PathBuf>,
    /// Timestamp of the write
    pub timestamp: DateTime<Local>,
}

/// Trait for snapshot storage backends.
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// Load the last accepted snapshot. A missing file is an empty snapshot.
    async fn load_snapshot(&self) -> Result<Snapshot>;

    /// Archive the snapshot (when enabled) and make it the current one.
    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<WriteMetadata>;

    /// Keep a rendered change report.
    async fn write_report(&self, content: &str) -> Result<PathBuf>;
}

/// Write `content` to `<dir>/<prefix>_<timestamp>.txt`, creating `dir`.
pub async fn write_timestamped(dir: &Path, prefix: &str, content: &str) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("{}_{}.txt", prefix, timestamp_slug()));
    tokio::fs::write(&path, content).await?;
    Ok(path)
}
