// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/searcher.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// The Searcher abstraction shared by the CPU and GPU search paths. A searcher
// evaluates one contiguous nonce range of a work unit and reports the first
// nonce whose digest meets the work unit's target.
//
// Tree Location:
// - src/miner/searcher.rs (Searcher trait, BatchOutcome, SearchError)
// - Depends on: core::types, thiserror

use crate::core::types::{SearcherKind, WorkUnit};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SearchError {
    #[error("GPU search failed: {0}")]
    Gpu(String),

    #[error("Search aborted: {0}")]
    Aborted(String),
}

/// Result of searching one nonce range
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BatchOutcome {
    /// Hashes actually evaluated
    pub hashes: u64,
    /// First winning nonce and its digest
    pub found: Option<(u64, [u8; 32])>,
}

pub trait Searcher: Send + Sync {
    fn kind(&self) -> SearcherKind;

    /// Nonces handed out to this searcher per batch
    fn batch_len(&self) -> u64;

    /// Search `count` nonces starting at `start`
    fn search_batch(&self, work: &WorkUnit, start: u64, count: u64) -> Result<BatchOutcome, SearchError>;
}
