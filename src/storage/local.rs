//! Local filesystem storage implementation.
//!
//! ## Storage Layout
//!
//! ```text
//! {snapshot_file}                    # Latest accepted snapshot
//! {records_dir}/{timestamp}-{name}   # Per-cycle archive copies
//! {logs_dir}/log_{timestamp}.txt     # Rendered change reports
//! ```
//!
//! Snapshot writes go through a temporary file and a rename, so a crash
//! never leaves a half-written snapshot behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Local;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{PathsConfig, Snapshot};
use crate::storage::{SnapshotStorage, WriteMetadata, write_timestamped};
use crate::utils::logging::DB_TARGET;
use crate::utils::timestamp_slug;

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    snapshot_file: PathBuf,
    records_dir: PathBuf,
    logs_dir: PathBuf,
    archive_records: bool,
}

impl LocalStorage {
    /// Create a LocalStorage with the default layout under `root_dir`.
    pub fn new(root_dir: impl AsRef<Path>) -> Self {
        Self::under(root_dir, &PathsConfig::default())
    }

    /// Create a LocalStorage from configured paths, relative to the working directory.
    pub fn from_config(paths: &PathsConfig) -> Self {
        Self::under("", paths)
    }

    /// Create a LocalStorage from configured paths, relative to `root_dir`.
    pub fn under(root_dir: impl AsRef<Path>, paths: &PathsConfig) -> Self {
        let root = root_dir.as_ref();
        Self {
            snapshot_file: root.join(&paths.snapshot_file),
            records_dir: root.join(&paths.records_dir),
            logs_dir: root.join(&paths.logs_dir),
            archive_records: paths.archive_records,
        }
    }

    pub fn snapshot_file(&self) -> &Path {
        &self.snapshot_file
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    pub fn records_dir(&self) -> &Path {
        &self.records_dir
    }

    /// Create the report and archive directories.
    pub async fn prepare(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.logs_dir).await?;
        if self.archive_records {
            tokio::fs::create_dir_all(&self.records_dir).await?;
        }
        Ok(())
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        self.ensure_dir(path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(path, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        match self.read_bytes(path).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Archive path for a timestamp: `{records_dir}/{stamp}-{snapshot file name}`.
    fn archive_path(&self, stamp: &str) -> PathBuf {
        let name = self
            .snapshot_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "snapshot.json".to_string());
        self.records_dir.join(format!("{stamp}-{name}"))
    }
}

#[async_trait]
impl SnapshotStorage for LocalStorage {
    async fn load_snapshot(&self) -> Result<Snapshot> {
        match self.read_json::<Snapshot>(&self.snapshot_file).await? {
            Some(snapshot) => {
                tracing::debug!(
                    target: DB_TARGET,
                    op = "load_snapshot",
                    path = %self.snapshot_file.display(),
                    items = snapshot.len(),
                    "snapshot loaded"
                );
                Ok(snapshot)
            }
            None => {
                log::warn!("No snapshot found at {}", self.snapshot_file.display());
                Ok(Snapshot::default())
            }
        }
    }

    async fn save_snapshot(&self, snapshot: &Snapshot) -> Result<WriteMetadata> {
        let timestamp = Local::now();

        let archive_location = if self.archive_records {
            let path = self.archive_path(&timestamp_slug());
            self.write_json(&path, snapshot).await?;
            tracing::debug!(
                target: DB_TARGET,
                op = "archive_snapshot",
                path = %path.display(),
                items = snapshot.len(),
                "snapshot archived"
            );
            Some(path)
        } else {
            None
        };

        self.write_json(&self.snapshot_file, snapshot).await?;
        tracing::debug!(
            target: DB_TARGET,
            op = "save_snapshot",
            path = %self.snapshot_file.display(),
            items = snapshot.len(),
            "snapshot written"
        );

        Ok(WriteMetadata {
            item_count: snapshot.len(),
            snapshot_location: self.snapshot_file.clone(),
            archive_location,
            timestamp,
        })
    }

    async fn write_report(&self, content: &str) -> Result<PathBuf> {
        let path = write_timestamped(&self.logs_dir, "log", content).await?;
        tracing::debug!(
            target: DB_TARGET,
            op = "write_report",
            path = %path.display(),
            bytes = content.len(),
            "report written"
        );
        Ok(path)
    }
}
