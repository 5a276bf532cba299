// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/mod.rs
// Version: 2.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file is the module declaration for the hash worker pool of the Luna
// miner, located in the miner subdirectory.
//
// Tree Location:
// - src/miner/mod.rs (miner module entry point)
// - Submodules: cpu, gpu, pool, searcher, stats, worker

pub mod cpu;
pub mod gpu;
pub mod pool;
pub mod searcher;
pub mod stats;
mod worker;

pub use cpu::CpuSearcher;
pub use pool::{HashWorkerPool, SearchHandle, WorkerBudget};
pub use searcher::{BatchOutcome, SearchError, Searcher};
pub use stats::HashRateMeter;

// Changelog:
// - v2.0.0 (2025-07-02): Reorganized around the Searcher strategy and HashWorkerPool.
// - v1.1.0 (2025-06-24): Added GPU mining module.
// - v1.0.0 (2025-06-14): Extracted from monolithic main.rs.
