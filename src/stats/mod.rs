// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/stats/mod.rs
// Version: 2.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file is the module declaration for engine-wide statistics of the Luna
// miner. It declares the stats cache and its snapshot file.
//
// Tree Location:
// - src/stats/mod.rs (stats module entry point)
// - Submodules: cache, snapshot_file

pub mod cache;
pub mod snapshot_file;

pub use cache::{ConnectionStatus, StatsCache, StatsDelta, StatsSnapshot};
pub use snapshot_file::{SnapshotFile, SnapshotFileError};

// Changelog:
// - v2.0.0 (2025-07-02): Added the engine stats cache and snapshot persistence.
