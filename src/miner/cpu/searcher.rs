// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/miner/cpu/searcher.rs
// Version: 2.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file contains the CPU search path of the Luna miner, located in the cpu
// subdirectory of the miner module. It hashes nonces four at a time against the
// work unit's absorbed preimage prefix.
//
// Tree Location:
// - src/miner/cpu/searcher.rs (CpuSearcher)
// - Depends on: core::hashing, core::difficulty, miner::searcher

use crate::core::difficulty::hash_meets_target;
use crate::core::types::{SearcherKind, WorkUnit};
use crate::miner::searcher::{BatchOutcome, SearchError, Searcher};

/// Nonces per CPU batch; also the cancellation granularity of a CPU worker
pub const CPU_BATCH_NONCES: u64 = 1024;

#[derive(Debug, Clone, Copy, Default)]
pub struct CpuSearcher;

impl CpuSearcher {
    pub fn new() -> Self {
        Self
    }
}

impl Searcher for CpuSearcher {
    fn kind(&self) -> SearcherKind {
        SearcherKind::Cpu
    }

    fn batch_len(&self) -> u64 {
        CPU_BATCH_NONCES
    }

    fn search_batch(&self, work: &WorkUnit, start: u64, count: u64) -> Result<BatchOutcome, SearchError> {
        let hasher = work.hasher();
        let mut outcome = BatchOutcome::default();
        let mut nonce = start;

        while outcome.hashes + 4 <= count {
            for (hash, batch_nonce) in hasher.hash_nonce_batch(nonce) {
                outcome.hashes += 1;
                if hash_meets_target(&hash, &work.target) {
                    outcome.found = Some((batch_nonce, hash));
                    return Ok(outcome);
                }
            }
            nonce = nonce.wrapping_add(4);
        }

        while outcome.hashes < count {
            let hash = hasher.hash_nonce(nonce);
            outcome.hashes += 1;
            if hash_meets_target(&hash, &work.target) {
                outcome.found = Some((nonce, hash));
                return Ok(outcome);
            }
            nonce = nonce.wrapping_add(1);
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::difficulty::leading_zero_nibbles;
    use crate::core::types::{WorkTemplate, WorkUnitId};

    fn work(difficulty: u32) -> WorkUnit {
        WorkUnit::new(
            WorkUnitId { height: 5, seq: 1 },
            WorkTemplate {
                height: 5,
                previous_hash: "00".repeat(32),
                difficulty,
                timestamp: 1700000000.0,
                transactions: vec![],
            },
            "LUN_test".to_string(),
        )
    }

    #[test]
    fn test_zero_difficulty_accepts_first_nonce() {
        let outcome = CpuSearcher.search_batch(&work(0), 10, 100).unwrap();
        assert_eq!(outcome.hashes, 1);
        assert_eq!(outcome.found.map(|(n, _)| n), Some(10));
    }

    #[test]
    fn test_counts_every_hash_in_odd_sized_batch() {
        let outcome = CpuSearcher.search_batch(&work(64), 0, 7).unwrap();
        assert_eq!(outcome.hashes, 7);
        assert!(outcome.found.is_none());
    }

    #[test]
    fn test_found_hash_meets_difficulty() {
        let unit = work(2);
        let outcome = CpuSearcher.search_batch(&unit, 0, 1 << 16).unwrap();
        let (nonce, hash) = outcome.found.expect("difficulty 2 is found within 65536 nonces");
        assert!(leading_zero_nibbles(&hash) >= 2);
        assert_eq!(unit.hasher().hash_nonce(nonce), hash);
    }
}

// Changelog:
// - v2.0.0 (2025-07-02): Replaced the SHA3x/SHA-256 thread loop with a Searcher.
//   - Keeps the 4-wide batch hashing of the previous mining thread.
//   - Thread spawning and throttling moved to src/miner/worker.rs.
