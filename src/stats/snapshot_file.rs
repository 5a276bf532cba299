// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/stats/snapshot_file.rs
// Version: 2.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file persists the stats snapshot of the Luna miner, located in the
// stats subdirectory. Writes go to a temporary file that is renamed over
// `{data_dir}/stats_snapshot.json`, so a crash never leaves a half-written
// snapshot behind. A corrupt snapshot is reported and replaced by defaults.
//
// Tree Location:
// - src/stats/snapshot_file.rs (stats snapshot persistence)
// - Depends on: serde_json, thiserror, tokio, stats::cache

use crate::core::error::EngineError;
use crate::stats::cache::StatsSnapshot;
use log::{debug, warn};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::{
    fs::{self, OpenOptions},
    io::AsyncWriteExt,
};

static LOG_TARGET: &str = "luna::miner::stats::snapshot_file";

pub const SNAPSHOT_FILE_NAME: &str = "stats_snapshot.json";

#[derive(Error, Debug)]
pub enum SnapshotFileError {
    #[error("Failed to serialize stats snapshot")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("Stats snapshot at {path:?} is corrupt: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("IO operation failed on {path:?}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write temporary file for atomic write")]
    AtomicWriteError {
        #[source]
        source: std::io::Error,
    },
}

impl From<SnapshotFileError> for EngineError {
    fn from(err: SnapshotFileError) -> Self {
        match err {
            SnapshotFileError::Corrupt { path, message } => EngineError::CorruptPersistedState { path, message },
            other => EngineError::CorruptPersistedState {
                path: PathBuf::from(SNAPSHOT_FILE_NAME),
                message: other.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotFile {
    directory_path: PathBuf,
    file_path: PathBuf,
}

impl SnapshotFile {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            directory_path: data_dir.to_path_buf(),
            file_path: data_dir.join(SNAPSHOT_FILE_NAME),
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Read the snapshot; `Ok(None)` when none was written yet
    pub async fn load(&self) -> Result<Option<StatsSnapshot>, SnapshotFileError> {
        debug!(target: LOG_TARGET, "Loading stats snapshot from {:?}", self.file_path);

        let contents = match fs::read_to_string(&self.file_path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SnapshotFileError::IoError {
                    path: self.file_path.clone(),
                    source: e,
                });
            }
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| SnapshotFileError::Corrupt {
                path: self.file_path.clone(),
                message: e.to_string(),
            })
    }

    /// Like `load`, but any failure degrades to the default snapshot
    pub async fn load_or_default(&self) -> StatsSnapshot {
        match self.load().await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => StatsSnapshot::default(),
            Err(e) => {
                warn!(target: LOG_TARGET, "⚠️ {}; starting from empty stats", EngineError::from(e));
                StatsSnapshot::default()
            }
        }
    }

    pub async fn save(&self, snapshot: &StatsSnapshot) -> Result<(), SnapshotFileError> {
        fs::create_dir_all(&self.directory_path)
            .await
            .map_err(|e| SnapshotFileError::IoError {
                path: self.directory_path.clone(),
                source: e,
            })?;

        let contents = serde_json::to_vec_pretty(snapshot)?;
        let temp_path = self.file_path.with_extension("tmp");

        {
            let mut temp_file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .await
                .map_err(|e| SnapshotFileError::AtomicWriteError { source: e })?;

            temp_file
                .write_all(&contents)
                .await
                .map_err(|e| SnapshotFileError::AtomicWriteError { source: e })?;

            temp_file
                .flush()
                .await
                .map_err(|e| SnapshotFileError::AtomicWriteError { source: e })?;
        }

        fs::rename(&temp_path, &self.file_path)
            .await
            .map_err(|e| SnapshotFileError::AtomicWriteError { source: e })?;

        debug!(target: LOG_TARGET, "Saved stats snapshot to {:?}", self.file_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_snapshot_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path());
        assert!(file.load().await.unwrap().is_none());
        assert_eq!(file.load_or_default().await.blocks_mined, 0);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path());
        let snapshot = StatsSnapshot {
            blocks_mined: 3,
            total_rewards: 12.5,
            network_height: 88,
            ..Default::default()
        };
        file.save(&snapshot).await.unwrap();

        let loaded = file.load().await.unwrap().unwrap();
        assert_eq!(loaded.blocks_mined, 3);
        assert_eq!(loaded.total_rewards, 12.5);
        assert_eq!(loaded.network_height, 88);
        assert!(!dir.path().join("stats_snapshot.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SNAPSHOT_FILE_NAME), b"{\"blocks_mined\": 4,").unwrap();
        let file = SnapshotFile::new(dir.path());

        assert!(matches!(file.load().await, Err(SnapshotFileError::Corrupt { .. })));
        assert_eq!(file.load_or_default().await, StatsSnapshot::default());
    }
}

// Changelog:
// - v2.0.0 (2025-07-02): Rebuilt from the GPU status file as the stats snapshot file.
//   - Keeps the temp-file + rename atomic write and the thiserror taxonomy.
//   - A corrupt file is logged and replaced by defaults instead of failing startup.
// - v1.0.0 (2025-06-25): Initial GPU status file manager.
