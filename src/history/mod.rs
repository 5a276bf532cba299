// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/history/mod.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// Module declaration for the mining history store.

pub mod store;

pub use store::{AppendOutcome, HistoryError, HistoryFilter, HistoryQuery, HistoryStore, HistoryTotals};

// Changelog:
// - v1.0.0 (2025-07-02): Initial history module.
