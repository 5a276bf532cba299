// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/mod.rs
// Version: 2.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file is the module declaration for the core functionality of the Luna
// miner, located in the core subdirectory. It declares submodules and re-exports
// key types for use throughout the project.

pub mod config;
pub mod difficulty;
pub mod error;
pub mod hashing;
pub mod types;

// Re-export the most commonly used items
pub use config::{Args, ConfigError, EngineConfig, PerformanceMode};
pub use difficulty::{MAX_DIFFICULTY, U256, difficulty_to_target, hash_meets_target, leading_zero_nibbles};
pub use error::EngineError;
pub use hashing::{PrefixHasher, block_preimage_prefix};
pub use types::{
    BlockSubmission, Candidate, MiningRecord, NetworkStatus, RecordStatus, SearcherKind, SubmissionResult,
    SubmitReply, TransportKind, WorkTemplate, WorkUnit, WorkUnitId,
};

// Changelog:
// - v2.0.0 (2025-07-02): Reworked for the Luna engine.
//   - Replaced sha3x/sha256 modules with hashing (node-compatible SHA-256 preimage).
//   - Added config and error modules.
// - v1.0.1 (2025-06-16): Added simple SHA-256 support.
