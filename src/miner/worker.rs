// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/worker.rs
// Version: 2.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file contains the search worker threads of the Luna miner, located in
// the miner module. Each worker pulls nonce ranges from the shared cursor of
// the active search, runs its Searcher over them, and throttles between
// batches according to the performance mode.
//
// Tree Location:
// - src/miner/worker.rs (search worker thread loop)
// - Depends on: miner::searcher, miner::pool, miner::stats

use crate::core::types::{Candidate, SearcherKind};
use crate::miner::pool::SearchShared;
use crate::miner::searcher::Searcher;
use crate::miner::stats::HashRateMeter;
use chrono::Utc;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

const LOG_TARGET: &str = "luna::miner::worker";

pub(crate) struct WorkerContext {
    pub worker_id: usize,
    pub searcher: Arc<dyn Searcher>,
    pub shared: Arc<SearchShared>,
    pub meter: Arc<HashRateMeter>,
    pub pause: Option<Duration>,
    pub gpu_failed: Arc<AtomicBool>,
}

pub(crate) fn spawn_worker(ctx: WorkerContext) -> std::io::Result<JoinHandle<()>> {
    let name = format!("luna-{}-{}", ctx.searcher.kind().as_str(), ctx.worker_id);
    std::thread::Builder::new().name(name).spawn(move || {
        run_worker(&ctx);
        ctx.shared.worker_exited();
    })
}

fn run_worker(ctx: &WorkerContext) {
    let kind = ctx.searcher.kind();
    let batch_len = ctx.searcher.batch_len().max(1);
    let work = ctx.shared.work();

    debug!(target: LOG_TARGET,
        "Worker {} ({}) searching work {} at difficulty {}",
        ctx.worker_id, kind.as_str(), work.id, work.difficulty
    );

    while let Some((start, count)) = ctx.shared.next_range(batch_len) {
        match ctx.searcher.search_batch(work, start, count) {
            Ok(outcome) => {
                ctx.meter.record(outcome.hashes, kind == SearcherKind::Gpu);
                ctx.shared.add_hashes(outcome.hashes);

                if let Some((nonce, hash)) = outcome.found {
                    let candidate = Candidate {
                        work_unit: work.id,
                        nonce,
                        hash,
                        found_at: Utc::now(),
                        found_by: kind,
                    };
                    if ctx.shared.claim(candidate) {
                        info!(target: LOG_TARGET,
                            "💎 Worker {} ({}) found nonce {} for work {}: {}",
                            ctx.worker_id, kind.as_str(), nonce, work.id, hex::encode(hash)
                        );
                    } else {
                        debug!(target: LOG_TARGET,
                            "Worker {} found nonce {} but work {} was already claimed or cancelled",
                            ctx.worker_id, nonce, work.id
                        );
                    }
                    return;
                }
            }
            Err(e) => {
                if kind == SearcherKind::Gpu {
                    // Logged once per session; the pool stops scheduling the GPU after this
                    if !ctx.gpu_failed.swap(true, Ordering::SeqCst) {
                        warn!(target: LOG_TARGET, "⚠️ {}; continuing CPU-only for this session", e);
                    }
                } else {
                    error!(target: LOG_TARGET, "Worker {} stopped: {}", ctx.worker_id, e);
                }
                return;
            }
        }

        match ctx.pause {
            Some(pause) => std::thread::sleep(pause),
            None => std::thread::yield_now(),
        }
    }
}

// Changelog:
// - v2.0.0 (2025-07-02): Rebuilt from the CPU mining thread loop.
//   - Workers take disjoint nonce ranges from a shared cursor instead of random starts.
//   - The first finder claims the candidate; everything else stops at the next batch.
//   - GPU failures flip the session-wide gpu_failed flag and log once.
//   - Per-batch sleep/yield implements the performance balance.
