// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/pool.rs
// Version: 2.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file implements the hash worker pool of the Luna miner, located in the
// miner module. A search spawns the configured CPU threads plus, when the GPU
// probe succeeded, one GPU worker. All of them race over disjoint nonce ranges
// of one work unit; the first valid hash ends the search.
//
// Tree Location:
// - src/miner/pool.rs (HashWorkerPool, SearchHandle, WorkerBudget)
// - Depends on: async-channel, parking_lot, rand, miner::worker, miner::gpu

use crate::core::config::{EngineConfig, PerformanceMode};
use crate::core::types::{Candidate, WorkUnit, WorkUnitId};
use crate::miner::cpu::CpuSearcher;
use crate::miner::gpu;
use crate::miner::searcher::Searcher;
use crate::miner::stats::HashRateMeter;
use crate::miner::worker::{WorkerContext, spawn_worker};
use async_channel::{Receiver, Sender};
use log::{debug, info, warn};
use parking_lot::Mutex;
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

const LOG_TARGET: &str = "luna::miner::pool";

/// Resources one search may use
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerBudget {
    pub threads: usize,
    pub gpu: bool,
    pub batch_size: u32,
    pub performance_mode: PerformanceMode,
    /// Nonces to try before the search ends empty; 0 is unbounded
    pub nonce_limit: u64,
}

impl WorkerBudget {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            threads: config.threads,
            gpu: config.gpu_enabled,
            batch_size: config.batch_size,
            performance_mode: config.performance_mode,
            nonce_limit: config.search_nonce_limit,
        }
    }
}

/// State shared between the workers of one search and its handle
pub(crate) struct SearchShared {
    work: Arc<WorkUnit>,
    cursor: AtomicU64,
    end: Option<u64>,
    stop: AtomicBool,
    cancelled: AtomicBool,
    claimed: AtomicBool,
    sender: Mutex<Option<Sender<Candidate>>>,
    live_workers: AtomicUsize,
    hashes: AtomicU64,
}

impl SearchShared {
    fn new(work: Arc<WorkUnit>, start: u64, nonce_limit: u64, sender: Sender<Candidate>, workers: usize) -> Self {
        Self {
            work,
            cursor: AtomicU64::new(start),
            end: (nonce_limit > 0).then(|| start.saturating_add(nonce_limit)),
            stop: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            claimed: AtomicBool::new(false),
            sender: Mutex::new(Some(sender)),
            live_workers: AtomicUsize::new(workers),
            hashes: AtomicU64::new(0),
        }
    }

    pub(crate) fn work(&self) -> &WorkUnit {
        &self.work
    }

    /// Hand out the next nonce range, or `None` once stopped or exhausted
    pub(crate) fn next_range(&self, len: u64) -> Option<(u64, u64)> {
        if self.stop.load(Ordering::Acquire) {
            return None;
        }
        let start = self.cursor.fetch_add(len, Ordering::Relaxed);
        match self.end {
            Some(end) if start >= end => None,
            Some(end) => Some((start, len.min(end - start))),
            None => Some((start, len)),
        }
    }

    pub(crate) fn add_hashes(&self, hashes: u64) {
        self.hashes.fetch_add(hashes, Ordering::Relaxed);
    }

    /// First caller wins; returns whether the candidate was delivered
    pub(crate) fn claim(&self, candidate: Candidate) -> bool {
        if self
            .claimed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.stop.store(true, Ordering::Release);

        let mut sender = self.sender.lock();
        if self.cancelled.load(Ordering::Acquire) {
            sender.take();
            return false;
        }
        match sender.take() {
            // Capacity 1 and a single claimant, so this never blocks
            Some(tx) => tx.try_send(candidate).is_ok(),
            None => false,
        }
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.stop.store(true, Ordering::Release);
        self.sender.lock().take();
    }

    pub(crate) fn worker_exited(&self) {
        if self.live_workers.fetch_sub(1, Ordering::AcqRel) == 1 {
            // Last worker out closes the stream
            self.sender.lock().take();
        }
    }
}

/// Lazy stream of candidates for one work unit. Yields at most one candidate.
/// Dropping the handle cancels the search.
pub struct SearchHandle {
    shared: Arc<SearchShared>,
    receiver: Receiver<Candidate>,
}

impl SearchHandle {
    pub fn work_unit(&self) -> WorkUnitId {
        self.shared.work.id
    }

    /// Next candidate; `None` once the search is cancelled or exhausted
    pub async fn next(&mut self) -> Option<Candidate> {
        if self.shared.cancelled.load(Ordering::Acquire) {
            return None;
        }
        let candidate = self.receiver.recv().await.ok()?;
        if self.shared.cancelled.load(Ordering::Acquire) {
            return None;
        }
        Some(candidate)
    }

    pub fn cancel(&self) {
        self.shared.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }

    /// Hashes attempted by this search so far
    pub fn hashes(&self) -> u64 {
        self.shared.hashes.load(Ordering::Relaxed)
    }
}

impl Drop for SearchHandle {
    fn drop(&mut self) {
        self.shared.cancel();
    }
}

enum GpuSlot {
    Unprobed,
    Ready(Arc<dyn Searcher>),
    Unavailable,
}

pub struct HashWorkerPool {
    cpu: Arc<dyn Searcher>,
    gpu: Mutex<GpuSlot>,
    gpu_failed: Arc<AtomicBool>,
    meter: Arc<HashRateMeter>,
    active: Mutex<Option<Arc<SearchShared>>>,
}

impl HashWorkerPool {
    /// Pool whose GPU path is probed lazily at the first GPU-enabled search
    pub fn new(meter: Arc<HashRateMeter>) -> Self {
        Self::with_searchers(meter, Arc::new(CpuSearcher::new()), None)
    }

    /// Pool with explicit searchers; a provided GPU searcher skips the probe
    pub fn with_searchers(meter: Arc<HashRateMeter>, cpu: Arc<dyn Searcher>, gpu: Option<Arc<dyn Searcher>>) -> Self {
        Self {
            cpu,
            gpu: Mutex::new(match gpu {
                Some(searcher) => GpuSlot::Ready(searcher),
                None => GpuSlot::Unprobed,
            }),
            gpu_failed: Arc::new(AtomicBool::new(false)),
            meter,
            active: Mutex::new(None),
        }
    }

    pub fn meter(&self) -> Arc<HashRateMeter> {
        Arc::clone(&self.meter)
    }

    /// True once the GPU path has failed or its probe was negative
    pub fn gpu_unavailable(&self) -> bool {
        self.gpu_failed.load(Ordering::SeqCst) || matches!(*self.gpu.lock(), GpuSlot::Unavailable)
    }

    /// "CPU" or "CPU+GPU", for status reports
    pub fn search_method(&self, gpu_enabled: bool) -> &'static str {
        let gpu_ready = matches!(*self.gpu.lock(), GpuSlot::Ready(_)) && !self.gpu_failed.load(Ordering::SeqCst);
        if gpu_enabled && gpu_ready { "CPU+GPU" } else { "CPU" }
    }

    fn gpu_searcher(&self, budget: &WorkerBudget) -> Option<Arc<dyn Searcher>> {
        if !budget.gpu {
            return None;
        }
        let mut slot = self.gpu.lock();
        if self.gpu_failed.load(Ordering::SeqCst) {
            *slot = GpuSlot::Unavailable;
        }
        if matches!(*slot, GpuSlot::Unprobed) {
            *slot = match gpu::probe(budget.batch_size) {
                Ok(searcher) => {
                    info!(target: LOG_TARGET, "🎮 GPU search path enabled");
                    GpuSlot::Ready(searcher)
                }
                Err(e) => {
                    warn!(target: LOG_TARGET, "⚠️ {}; mining CPU-only for this session", e);
                    GpuSlot::Unavailable
                }
            };
        }
        match &*slot {
            GpuSlot::Ready(searcher) => Some(Arc::clone(searcher)),
            _ => None,
        }
    }

    /// Start searching a work unit. Any search still running is cancelled first.
    pub fn start_search(&self, work: Arc<WorkUnit>, budget: &WorkerBudget) -> SearchHandle {
        let gpu = self.gpu_searcher(budget);
        let threads = budget.threads.max(1);
        let workers = threads + usize::from(gpu.is_some());

        let start = if budget.nonce_limit == 0 {
            rand::thread_rng().r#gen::<u32>() as u64
        } else {
            0
        };
        let (sender, receiver) = async_channel::bounded(1);
        let shared = Arc::new(SearchShared::new(Arc::clone(&work), start, budget.nonce_limit, sender, workers));

        if let Some(previous) = self.active.lock().replace(Arc::clone(&shared)) {
            debug!(target: LOG_TARGET, "Cancelling search for work {}", previous.work.id);
            previous.cancel();
        }

        info!(target: LOG_TARGET,
            "🔨 Searching work {} (difficulty {}) with {} CPU thread(s){}, mode {}",
            work.id,
            work.difficulty,
            threads,
            if gpu.is_some() { " + GPU" } else { "" },
            budget.performance_mode
        );

        let searchers = (0..threads)
            .map(|_| Arc::clone(&self.cpu))
            .chain(gpu);
        for (worker_id, searcher) in searchers.enumerate() {
            let ctx = WorkerContext {
                worker_id,
                searcher,
                shared: Arc::clone(&shared),
                meter: Arc::clone(&self.meter),
                pause: budget.performance_mode.batch_pause(),
                gpu_failed: Arc::clone(&self.gpu_failed),
            };
            if let Err(e) = spawn_worker(ctx) {
                warn!(target: LOG_TARGET, "Failed to spawn search worker {}: {}", worker_id, e);
                shared.worker_exited();
            }
        }

        SearchHandle { shared, receiver }
    }

    /// Stop every worker still searching `work_unit`; returns whether it was active
    pub fn cancel(&self, work_unit: WorkUnitId) -> bool {
        let mut active = self.active.lock();
        match active.as_ref() {
            Some(shared) if shared.work.id == work_unit => {
                shared.cancel();
                *active = None;
                debug!(target: LOG_TARGET, "Cancelled search for work {}", work_unit);
                true
            }
            _ => false,
        }
    }

    pub fn cancel_all(&self) {
        if let Some(shared) = self.active.lock().take() {
            shared.cancel();
        }
    }
}

impl Drop for HashWorkerPool {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{WorkTemplate, WorkUnitId};

    fn shared(limit: u64) -> (SearchShared, Receiver<Candidate>) {
        let work = Arc::new(WorkUnit::new(
            WorkUnitId { height: 1, seq: 1 },
            WorkTemplate {
                height: 1,
                previous_hash: "0".repeat(64),
                difficulty: 1,
                timestamp: 1.0,
                transactions: vec![],
            },
            "m".to_string(),
        ));
        let (tx, rx) = async_channel::bounded(1);
        (SearchShared::new(work, 0, limit, tx, 2), rx)
    }

    fn candidate(nonce: u64) -> Candidate {
        Candidate {
            work_unit: WorkUnitId { height: 1, seq: 1 },
            nonce,
            hash: [0; 32],
            found_at: chrono::Utc::now(),
            found_by: crate::core::types::SearcherKind::Cpu,
        }
    }

    #[test]
    fn test_ranges_are_disjoint_and_clamped() {
        let (shared, _rx) = shared(10);
        assert_eq!(shared.next_range(4), Some((0, 4)));
        assert_eq!(shared.next_range(4), Some((4, 4)));
        assert_eq!(shared.next_range(4), Some((8, 2)));
        assert_eq!(shared.next_range(4), None);
    }

    #[test]
    fn test_only_first_claim_is_delivered() {
        let (shared, rx) = shared(0);
        assert!(shared.claim(candidate(3)));
        assert!(!shared.claim(candidate(4)));
        assert_eq!(rx.try_recv().unwrap().nonce, 3);
        assert!(shared.next_range(4).is_none());
    }

    #[test]
    fn test_claim_after_cancel_is_dropped() {
        let (shared, rx) = shared(0);
        shared.cancel();
        assert!(!shared.claim(candidate(3)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_last_worker_closes_stream() {
        let (shared, rx) = shared(0);
        shared.worker_exited();
        assert!(!rx.is_closed());
        shared.worker_exited();
        assert!(rx.is_closed());
    }
}

// Changelog:
// - v2.0.0 (2025-07-02): Replaced CpuMiner's pool job loop with HashWorkerPool.
//   - One active search at a time; starting a new one cancels the previous.
//   - Candidates travel over a bounded async channel; cancel() guarantees no
//     candidate of the cancelled unit is yielded afterwards.
//   - GPU probe runs once at the first GPU-enabled search and is never repeated.
