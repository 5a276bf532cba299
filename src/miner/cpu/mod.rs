// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/cpu/mod.rs
// Version: 2.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file is the module declaration for the CPU search path of the Luna
// miner, located in the cpu subdirectory of the miner module.
//
// Tree Location:
// - src/miner/cpu/mod.rs (CPU module entry point)
// - Submodules: searcher

pub mod searcher;

pub use searcher::{CPU_BATCH_NONCES, CpuSearcher};

// Changelog:
// - v2.0.0 (2025-07-02): CPU mining reduced to the CpuSearcher strategy.
// - v1.0.0 (2025-06-14): Extracted from monolithic main.rs.
