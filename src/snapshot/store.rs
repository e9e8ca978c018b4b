//! Row-count Snapshot Store
//!
//! Two JSON files back the store: the latest snapshot, overwritten every run,
//! and the log, which keeps every run's snapshot keyed by timestamp. Both are
//! pretty-printed with 4-space indentation.
//!
//! There is no locking. Two runs at once can interleave their writes and
//! leave either file torn.

use crate::config::StorageConfig;
use crate::error::{AppError, AppResult};
use crate::snapshot::{StatisticsLog, TableStats};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File-backed store for row-count snapshots
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    latest_path: PathBuf,
    log_path: PathBuf,
}

impl SnapshotStore {
    pub fn new(latest_path: impl Into<PathBuf>, log_path: impl Into<PathBuf>) -> Self {
        Self {
            latest_path: latest_path.into(),
            log_path: log_path.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.latest_path.clone(), config.log_path.clone())
    }

    pub fn latest_path(&self) -> &Path {
        &self.latest_path
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Load the previous snapshot; empty when the file does not exist yet
    pub fn load_latest(&self) -> AppResult<TableStats> {
        let stats: TableStats = read_json(&self.latest_path)?.unwrap_or_default();
        debug!(
            "Loaded {} previous table counts from {}",
            stats.len(),
            self.latest_path.display()
        );
        Ok(stats)
    }

    /// Replace the latest snapshot with `stats`
    pub fn save_latest(&self, stats: &TableStats) -> AppResult<()> {
        write_json(&self.latest_path, stats)?;
        debug!(
            "Saved {} table counts to {}",
            stats.len(),
            self.latest_path.display()
        );
        Ok(())
    }

    /// Read the whole log; empty when the file does not exist yet
    pub fn load_log(&self) -> AppResult<StatisticsLog> {
        Ok(read_json(&self.log_path)?.unwrap_or_default())
    }

    /// Record `stats` under `timestamp`, replacing any entry with the same key
    pub fn append_log(&self, timestamp: &str, stats: &TableStats) -> AppResult<()> {
        let mut log = self.load_log()?;
        if log.insert(timestamp.to_string(), stats.clone()).is_some() {
            debug!("Overwriting existing log entry at {}", timestamp);
        }
        write_json(&self.log_path, &log)?;

        info!(
            "Logged snapshot at {} ({} entries in {})",
            timestamp,
            log.len(),
            self.log_path.display()
        );
        Ok(())
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> AppResult<Option<T>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(AppError::StorageIo {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| AppError::MalformedStorage {
            path: path.to_path_buf(),
            source,
        })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> AppResult<()> {
    let io_error = |source| AppError::StorageIo {
        path: path.to_path_buf(),
        source,
    };

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value
        .serialize(&mut serializer)
        .map_err(|e| io_error(std::io::Error::other(e)))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    std::fs::write(path, buf).map_err(io_error)
}
