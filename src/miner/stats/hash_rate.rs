// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/stats/hash_rate.rs
// Version: 2.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file implements the rolling hash-rate meter of the Luna miner, located
// in the stats subdirectory of the miner module. Workers add attempted hashes;
// the scheduler samples the rate over a sliding window and feeds it to the
// stats cache.
//
// Tree Location:
// - src/miner/stats/hash_rate.rs (HashRateMeter)
// - Depends on: crossbeam, parking_lot

use crossbeam::utils::CachePadded;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub const DEFAULT_WINDOW: Duration = Duration::from_secs(30);

pub struct HashRateMeter {
    total_hashes: CachePadded<AtomicU64>,
    cpu_hashes: CachePadded<AtomicU64>,
    gpu_hashes: CachePadded<AtomicU64>,
    window: Duration,
    history: Mutex<VecDeque<(Instant, u64)>>,
    peak_hashrate: AtomicU64,
}

impl HashRateMeter {
    pub fn new(window: Duration) -> Self {
        let mut history = VecDeque::with_capacity(64);
        history.push_back((Instant::now(), 0));
        Self {
            total_hashes: CachePadded::new(AtomicU64::new(0)),
            cpu_hashes: CachePadded::new(AtomicU64::new(0)),
            gpu_hashes: CachePadded::new(AtomicU64::new(0)),
            window,
            history: Mutex::new(history),
            peak_hashrate: AtomicU64::new(0),
        }
    }

    /// Called by workers after every batch
    pub fn record(&self, hashes: u64, gpu: bool) {
        self.total_hashes.fetch_add(hashes, Ordering::Relaxed);
        if gpu {
            self.gpu_hashes.fetch_add(hashes, Ordering::Relaxed);
        } else {
            self.cpu_hashes.fetch_add(hashes, Ordering::Relaxed);
        }
    }

    pub fn total_hashes(&self) -> u64 {
        self.total_hashes.load(Ordering::Relaxed)
    }

    pub fn cpu_hashes(&self) -> u64 {
        self.cpu_hashes.load(Ordering::Relaxed)
    }

    pub fn gpu_hashes(&self) -> u64 {
        self.gpu_hashes.load(Ordering::Relaxed)
    }

    /// Take a sample and return hashes per second over the window
    pub fn sample(&self) -> f64 {
        self.sample_at(Instant::now())
    }

    fn sample_at(&self, now: Instant) -> f64 {
        let total = self.total_hashes();
        let mut history = self.history.lock();
        history.push_back((now, total));

        // Keep one point older than the window as the rate baseline
        while history.len() > 2 {
            match history.get(1) {
                Some((time, _)) if now.duration_since(*time) >= self.window => {
                    history.pop_front();
                }
                _ => break,
            }
        }

        let rate = match history.front() {
            Some((start, start_total)) => {
                let elapsed = now.duration_since(*start).as_secs_f64();
                if elapsed > 0.0 {
                    total.saturating_sub(*start_total) as f64 / elapsed
                } else {
                    0.0
                }
            }
            None => 0.0,
        };

        if rate as u64 > self.peak_hashrate.load(Ordering::Relaxed) {
            self.peak_hashrate.store(rate as u64, Ordering::Relaxed);
        }
        rate
    }

    pub fn peak_hashrate(&self) -> f64 {
        self.peak_hashrate.load(Ordering::Relaxed) as f64
    }
}

impl Default for HashRateMeter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}


// Changelog:
// - v2.0.0 (2025-07-02): Replaced MinerStats/ThreadStats with HashRateMeter.
//   - Keeps the (Instant, total) hashrate history with a sliding cutoff.
//   - Counters are cache-padded atomics shared by all search workers.
//   - Peak hashrate tracking carried over from ThreadStats.
