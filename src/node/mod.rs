// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/node/mod.rs
// Version: 2.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file is the module declaration for node communication in the Luna
// miner, located in the node subdirectory. It declares submodules and
// re-exports key types for use throughout the project.
//
// Tree Location:
// - src/node/mod.rs (node module entry point)
// - Submodules: backoff, client, messages, plain, rpc (feature "rich-transport"), transport

pub mod backoff;
pub mod client;
pub mod messages;
pub mod plain;
#[cfg(feature = "rich-transport")]
pub mod rpc;
pub mod transport;

pub use backoff::Backoff;
pub use client::{ClientSettings, SubmissionClient};
pub use plain::PlainTransport;
#[cfg(feature = "rich-transport")]
pub use rpc::RichTransport;
pub use transport::{NodeTransport, TransportError};

// Changelog:
// - v2.0.0 (2025-07-02): Replaced the pool module with node transports.
//   - PoolClient became PlainTransport; StratumProtocol became RpcProtocol.
//   - Added the reqwest rich transport and the SubmissionClient chain.
// - v1.0.0 (2025-06-14): Extracted from monolithic main.rs.
