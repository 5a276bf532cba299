// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/stats/mod.rs
// Version: 2.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file is the module declaration for search-side statistics of the Luna
// miner, located in the stats subdirectory of the miner module.
//
// Tree Location:
// - src/miner/stats/mod.rs (stats module entry point)
// - Submodules: hash_rate

pub mod hash_rate;

pub use hash_rate::HashRateMeter;

// Changelog:
// - v2.0.0 (2025-07-02): Reduced to the shared hash-rate meter.
// - v1.0.0 (2025-06-14): Extracted from monolithic main.rs.
