// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/lib.rs
// Version: 2.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file serves as the main library entry point for the Luna miner,
// located at the root of the source tree. It exports all public modules
// and types that other crates or binaries can use.
//
// Tree Location:
// - src/lib.rs (root library file)
// - Exports modules: core, engine, history, miner, node, stats, utils

pub mod core;
pub mod engine;
pub mod history;
pub mod miner;
pub mod node;
pub mod stats;
pub mod utils;

// Re-export commonly used types at the crate root for convenience
pub use crate::core::{EngineConfig, EngineError};
pub use crate::engine::{CycleOutcome, Engine, EngineBuilder, SchedulerState, StatusReport};
pub use crate::history::{HistoryFilter, HistoryStore};
pub use crate::miner::HashWorkerPool;
pub use crate::node::SubmissionClient;
pub use crate::stats::{StatsCache, StatsSnapshot};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

// Changelog:
// - v2.0.0 (2025-07-02): Reworked into the Luna mining & sync engine.
//   - Replaced pool, benchmark and help modules with node, engine, stats and history.
//   - Re-exported the Engine control surface.
// - v1.0.2 (2025-06-15): Added help module support.
// - v1.0.0 (2025-06-14): Initial modular breakout from monolithic main.rs.
