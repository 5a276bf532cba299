// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/stats/cache.rs
// Version: 2.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file implements the stats cache of the Luna miner, located in the stats
// subdirectory. The cache is the single owner of the StatsSnapshot; every
// other component submits a StatsDelta. Counters add, rates are smoothed with
// an EWMA and status fields overwrite.
//
// Tree Location:
// - src/stats/cache.rs (stats cache)
// - Depends on: parking_lot, chrono, serde, stats::snapshot_file

use crate::core::types::NetworkStatus;
use crate::stats::snapshot_file::{SnapshotFile, SnapshotFileError};
use chrono::{DateTime, Utc};
use log::debug;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::time::Instant;

static LOG_TARGET: &str = "luna::miner::stats::cache";

/// Smoothing factor of the hash-rate and success-rate EWMAs
pub const EWMA_ALPHA: f64 = 0.2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connected,
    /// Last call failed at the transport level
    Degraded,
}

impl ConnectionStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Degraded => "degraded",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsSnapshot {
    pub network_height: u64,
    pub difficulty: u32,
    /// Hashes per second, smoothed
    pub hash_rate: f64,
    /// Fraction of successful cycles, smoothed
    pub success_rate: f64,
    pub blocks_mined: u64,
    pub total_rewards: f64,
    pub failed_attempts: u64,
    pub mempool_size: u64,
    pub peer_count: u64,
    /// Seconds since the session started
    pub uptime: f64,
    pub connection_status: ConnectionStatus,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Change submitted to the cache
#[derive(Debug, Clone, PartialEq)]
pub enum StatsDelta {
    HashRateSample(f64),
    CycleOutcome { success: bool },
    BlockAccepted { reward: f64 },
    Network(NetworkStatus),
    Connection(ConnectionStatus),
    /// Overwrite the counters with the history store totals
    Totals { blocks_mined: u64, total_rewards: f64 },
}

struct CacheState {
    snapshot: StatsSnapshot,
    hash_rate_seeded: bool,
    success_rate_seeded: bool,
    dirty: bool,
}

pub struct StatsCache {
    state: RwLock<CacheState>,
    started: Instant,
}

fn ewma(current: f64, sample: f64, seeded: &mut bool) -> f64 {
    if !*seeded {
        *seeded = true;
        return sample;
    }
    EWMA_ALPHA * sample + (1.0 - EWMA_ALPHA) * current
}

impl StatsCache {
    pub fn new() -> Self {
        Self::seeded(StatsSnapshot::default())
    }

    /// Start from a persisted snapshot; its rates keep smoothing from where they were
    pub fn seeded(snapshot: StatsSnapshot) -> Self {
        let hash_rate_seeded = snapshot.hash_rate > 0.0;
        let success_rate_seeded = snapshot.last_updated.is_some();
        Self {
            state: RwLock::new(CacheState {
                snapshot,
                hash_rate_seeded,
                success_rate_seeded,
                dirty: false,
            }),
            started: Instant::now(),
        }
    }

    /// Last known snapshot with a fresh uptime
    pub fn read(&self) -> StatsSnapshot {
        let mut snapshot = self.state.read().snapshot.clone();
        snapshot.uptime = self.started.elapsed().as_secs_f64();
        snapshot
    }

    pub fn apply_delta(&self, delta: StatsDelta) {
        let mut state = self.state.write();
        let CacheState {
            snapshot,
            hash_rate_seeded,
            success_rate_seeded,
            dirty,
        } = &mut *state;

        match delta {
            StatsDelta::HashRateSample(rate) => {
                snapshot.hash_rate = ewma(snapshot.hash_rate, rate, hash_rate_seeded);
            }
            StatsDelta::CycleOutcome { success } => {
                let sample = if success { 1.0 } else { 0.0 };
                snapshot.success_rate = ewma(snapshot.success_rate, sample, success_rate_seeded);
                if !success {
                    snapshot.failed_attempts += 1;
                }
            }
            StatsDelta::BlockAccepted { reward } => {
                snapshot.blocks_mined += 1;
                snapshot.total_rewards += reward;
            }
            StatsDelta::Network(status) => {
                snapshot.network_height = status.network_height;
                snapshot.difficulty = status.difficulty;
                snapshot.mempool_size = status.mempool_size;
                snapshot.peer_count = status.peer_count;
            }
            StatsDelta::Connection(status) => {
                snapshot.connection_status = status;
            }
            StatsDelta::Totals {
                blocks_mined,
                total_rewards,
            } => {
                if snapshot.blocks_mined != blocks_mined {
                    debug!(target: LOG_TARGET,
                        "Reconciled blocks_mined {} -> {} from history",
                        snapshot.blocks_mined, blocks_mined
                    );
                }
                snapshot.blocks_mined = blocks_mined;
                snapshot.total_rewards = total_rewards;
            }
        }

        snapshot.last_updated = Some(Utc::now());
        *dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.state.read().dirty
    }

    /// Write the snapshot and clear the dirty flag
    pub async fn persist(&self, file: &SnapshotFile) -> Result<(), SnapshotFileError> {
        let snapshot = {
            let mut state = self.state.write();
            state.dirty = false;
            let mut snapshot = state.snapshot.clone();
            snapshot.uptime = self.started.elapsed().as_secs_f64();
            snapshot
        };
        let result = file.save(&snapshot).await;
        if result.is_err() {
            self.state.write().dirty = true;
        }
        result
    }

    /// Periodic persistence: only writes when something changed since the last save
    pub async fn persist_if_dirty(&self, file: &SnapshotFile) -> Result<bool, SnapshotFileError> {
        if !self.is_dirty() {
            return Ok(false);
        }
        self.persist(file).await.map(|_| true)
    }
}

impl Default for StatsCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_seeds_then_smooths() {
        let cache = StatsCache::new();
        cache.apply_delta(StatsDelta::HashRateSample(1000.0));
        assert_eq!(cache.read().hash_rate, 1000.0);

        cache.apply_delta(StatsDelta::HashRateSample(2000.0));
        assert!((cache.read().hash_rate - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn test_counters_add_and_status_overwrites() {
        let cache = StatsCache::new();
        cache.apply_delta(StatsDelta::BlockAccepted { reward: 10.0 });
        cache.apply_delta(StatsDelta::BlockAccepted { reward: 2.5 });
        cache.apply_delta(StatsDelta::CycleOutcome { success: false });
        cache.apply_delta(StatsDelta::Connection(ConnectionStatus::Connected));
        cache.apply_delta(StatsDelta::Network(NetworkStatus {
            network_height: 7,
            difficulty: 3,
            mempool_size: 2,
            peer_count: 5,
        }));

        let snapshot = cache.read();
        assert_eq!(snapshot.blocks_mined, 2);
        assert_eq!(snapshot.total_rewards, 12.5);
        assert_eq!(snapshot.failed_attempts, 1);
        assert_eq!(snapshot.success_rate, 0.0);
        assert_eq!(snapshot.connection_status, ConnectionStatus::Connected);
        assert_eq!(snapshot.network_height, 7);
        assert_eq!(snapshot.peer_count, 5);
        assert!(snapshot.last_updated.is_some());
    }

    #[test]
    fn test_success_rate_ewma() {
        let cache = StatsCache::new();
        cache.apply_delta(StatsDelta::CycleOutcome { success: true });
        cache.apply_delta(StatsDelta::CycleOutcome { success: false });
        assert!((cache.read().success_rate - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_totals_overwrite_seeded_counters() {
        let cache = StatsCache::seeded(StatsSnapshot {
            blocks_mined: 9,
            total_rewards: 90.0,
            ..Default::default()
        });
        cache.apply_delta(StatsDelta::Totals {
            blocks_mined: 4,
            total_rewards: 40.0,
        });
        let snapshot = cache.read();
        assert_eq!(snapshot.blocks_mined, 4);
        assert_eq!(snapshot.total_rewards, 40.0);
    }

    #[tokio::test]
    async fn test_persist_only_when_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path());
        let cache = StatsCache::new();

        assert!(!cache.persist_if_dirty(&file).await.unwrap());
        cache.apply_delta(StatsDelta::BlockAccepted { reward: 1.0 });
        assert!(cache.persist_if_dirty(&file).await.unwrap());
        assert!(!cache.is_dirty());
        assert_eq!(file.load().await.unwrap().unwrap().blocks_mined, 1);
    }
}

// Changelog:
// - v2.0.0 (2025-07-02): Replaced MinerStats share counters with the delta-driven stats cache.
//   - Single owner behind a parking_lot RwLock; readers never wait on persistence.
//   - Dirty tracking so the periodic timer skips unchanged snapshots.
// - v1.0.3: Miner-wide share and hashrate tracking.
