// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/error.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// Engine-wide error taxonomy. Component errors (transport, history, snapshot
// file, config) convert into these categories at the engine boundary.

use crate::core::types::WorkUnitId;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Node unreachable: {message}")]
    NetworkUnreachable { message: String },

    #[error("Network call timed out")]
    Timeout,

    #[error("Node rejected the request: {reason}")]
    ProtocolRejected { reason: String },

    #[error("Candidate for {candidate} is stale (active work: {active:?})")]
    StaleWork {
        candidate: WorkUnitId,
        active: Option<WorkUnitId>,
    },

    #[error("GPU unavailable: {message}")]
    GpuUnavailable { message: String },

    #[error("Block {block_id} already recorded")]
    DuplicateBlockId { block_id: String },

    #[error("Persisted state at {path:?} is corrupt: {message}")]
    CorruptPersistedState { path: PathBuf, message: String },

    #[error("Invalid configuration: {message}")]
    ConfigInvalid { message: String },

    #[error("Engine is shut down")]
    Shutdown,
}

impl EngineError {
    /// Errors the retry policy may try again
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::NetworkUnreachable { .. } | EngineError::Timeout)
    }
}
