// Luna Miner - Free and Open Source Software Statement
//
// File: src/miner/gpu/manager.rs
// Version: 4.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// GPU capability probe and the GPU Searcher used by the hash worker pool

use super::opencl::{OpenClDevice, OpenClEngine};
use crate::core::difficulty::hash_meets_target;
use crate::core::error::EngineError;
use crate::core::types::{SearcherKind, WorkUnit};
use crate::miner::searcher::{BatchOutcome, SearchError, Searcher};
use anyhow::{Error, Result};
use log::{debug, info, warn};
use parking_lot::Mutex;

const LOG_TARGET: &str = "luna::miner::gpu::manager";

/// GPU search strategy backed by one OpenCL device
pub struct GpuSearcher {
    engine: Mutex<OpenClEngine>,
    batch_size: u32,
}

impl GpuSearcher {
    pub fn device_name(&self) -> String {
        self.engine.lock().device().name().to_string()
    }
}

impl Searcher for GpuSearcher {
    fn kind(&self) -> SearcherKind {
        SearcherKind::Gpu
    }

    fn batch_len(&self) -> u64 {
        self.batch_size as u64
    }

    fn search_batch(&self, work: &WorkUnit, start: u64, count: u64) -> Result<BatchOutcome, SearchError> {
        let count = count.min(u32::MAX as u64) as u32;
        let found = self
            .engine
            .lock()
            .search(work.preimage_prefix(), start, count, &work.target)
            .map_err(|e| SearchError::Gpu(e.to_string()))?;

        let Some(nonce) = found else {
            return Ok(BatchOutcome {
                hashes: count as u64,
                found: None,
            });
        };

        // Re-check on the host so a kernel fault can never produce a bad block
        let hash = work.hasher().hash_nonce(nonce);
        if !hash_meets_target(&hash, &work.target) {
            return Err(SearchError::Gpu(format!(
                "kernel reported nonce {} that does not meet the target",
                nonce
            )));
        }
        Ok(BatchOutcome {
            hashes: nonce.wrapping_sub(start).saturating_add(1).min(count as u64),
            found: Some((nonce, hash)),
        })
    }
}

pub struct GpuManager;

impl GpuManager {
    /// Detect a suitable device and build its search engine
    pub fn probe(batch_size: u32) -> Result<GpuSearcher, EngineError> {
        Self::try_probe(batch_size).map_err(|e| EngineError::GpuUnavailable { message: e.to_string() })
    }

    fn try_probe(batch_size: u32) -> Result<GpuSearcher> {
        info!(target: LOG_TARGET, "🎮 Probing for OpenCL GPU devices...");

        let devices = OpenClDevice::detect_devices()?;
        let device = devices
            .into_iter()
            .find(|device| {
                let suitable = device.is_suitable_for_mining();
                if !suitable {
                    warn!(target: LOG_TARGET, "⚠️ GPU not suitable for mining: {}", device.info_string());
                }
                suitable
            })
            .ok_or_else(|| Error::msg("No suitable OpenCL GPU device found"))?;

        let mut engine = OpenClEngine::new(device)?;
        engine.initialize()?;
        debug!(target: LOG_TARGET, "GPU batch size: {} nonces", batch_size);

        info!(target: LOG_TARGET, "✅ GPU ready: {}", engine.device().info_string());
        Ok(GpuSearcher {
            engine: Mutex::new(engine),
            batch_size: batch_size.max(1),
        })
    }
}

// Changelog:
// - v4.0.0 (2025-07-02): Replaced the job-loop manager with a one-shot probe.
//   - GpuSearcher plugs into the shared hash worker pool as one worker.
//   - Found nonces are verified on the host before they become candidates.
//   - Multi-device threads and estimated hashrates were dropped.
// - v3.0.3: Fixed share recording.
