// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/gpu/mod.rs
// Version: 2.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file is the module entry point for the GPU search path of the Luna miner.
// The OpenCL implementation is only compiled with the "gpu" feature; without it
// the probe always reports the GPU as unavailable and mining stays on the CPU.

use crate::core::error::EngineError;
use crate::miner::searcher::Searcher;
use std::sync::Arc;

#[cfg(feature = "gpu")]
pub mod opencl;

#[cfg(feature = "gpu")]
pub mod manager;

#[cfg(feature = "gpu")]
pub use manager::{GpuManager, GpuSearcher};

/// Capability probe for the GPU search path
#[cfg(feature = "gpu")]
pub fn probe(batch_size: u32) -> Result<Arc<dyn Searcher>, EngineError> {
    let searcher = GpuManager::probe(batch_size)?;
    Ok(Arc::new(searcher))
}

#[cfg(not(feature = "gpu"))]
pub fn probe(_batch_size: u32) -> Result<Arc<dyn Searcher>, EngineError> {
    Err(EngineError::GpuUnavailable {
        message: "built without the \"gpu\" feature".to_string(),
    })
}

// Changelog:
// - v2.0.0 (2025-07-02): Exposed a single probe() returning a Searcher.
//   - The disabled-feature placeholder now returns GpuUnavailable.
// - v1.1.0 (2025-06-24): Added GpuMiner support.
// - v1.0.0 (2025-06-24): Initial GPU module structure.
