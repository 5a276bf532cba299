// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/engine/spool.rs
// Version: 1.1.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// Local spool for solved blocks the node could not be reached with. Each block
// lands in `{data_dir}/blocks/block_{height}_{unix}_{nonce}.json`; a name that is
// already taken gets a `_{n}` sequence suffix instead of being overwritten.

use crate::core::types::BlockSubmission;
use chrono::Utc;
use log::info;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

static LOG_TARGET: &str = "luna::miner::engine::spool";

pub const SPOOL_DIR_NAME: &str = "blocks";

#[derive(Error, Debug)]
pub enum SpoolError {
    #[error("Failed to serialize block")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("IO operation failed on {path:?}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct BlockSpool {
    directory_path: PathBuf,
}

impl BlockSpool {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            directory_path: data_dir.join(SPOOL_DIR_NAME),
        }
    }

    pub fn directory_path(&self) -> &Path {
        &self.directory_path
    }

    pub async fn store(&self, block: &BlockSubmission) -> Result<PathBuf, SpoolError> {
        fs::create_dir_all(&self.directory_path)
            .await
            .map_err(|e| SpoolError::IoError {
                path: self.directory_path.clone(),
                source: e,
            })?;

        let contents = serde_json::to_vec_pretty(block)?;
        let stem = format!("block_{}_{}_{}", block.index, Utc::now().timestamp(), block.nonce);
        let mut sequence = 0u32;
        let (path, mut file) = loop {
            let name = match sequence {
                0 => format!("{}.json", stem),
                n => format!("{}_{}.json", stem, n),
            };
            let path = self.directory_path.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => break (path, file),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => sequence += 1,
                Err(e) => return Err(SpoolError::IoError { path, source: e }),
            }
        };
        let written = async {
            file.write_all(&contents).await?;
            file.flush().await
        };
        written.await.map_err(|e| SpoolError::IoError {
            path: path.clone(),
            source: e,
        })?;

        info!(target: LOG_TARGET, "💾 Spooled block #{} to {:?}", block.index, path);
        Ok(path)
    }
}


// Changelog:
// - v1.1.0 (2025-07-09): File names carry the nonce and never overwrite an earlier spool.
// - v1.0.0 (2025-07-02): Initial block spool.
