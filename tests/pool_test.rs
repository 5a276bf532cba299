// Luna Miner - Free and Open Source Software Statement
//
// File: tests/pool_test.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// Hash worker pool tests: winning candidates, cancellation, GPU fallback and
// bounded searches.

mod common;

#[cfg(test)]
mod tests {
    use super::common::{FailingSearcher, work_unit};
    use luna_miner::core::config::PerformanceMode;
    use luna_miner::core::difficulty::leading_zero_nibbles;
    use luna_miner::core::hashing::canonical_transactions_json;
    use luna_miner::core::types::SearcherKind;
    use luna_miner::miner::{CpuSearcher, HashRateMeter, HashWorkerPool, Searcher, WorkerBudget};
    use sha2::{Digest, Sha256};
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio::time::timeout;

    const SEARCH_DEADLINE: Duration = Duration::from_secs(60);

    fn budget(threads: usize) -> WorkerBudget {
        WorkerBudget {
            threads,
            gpu: false,
            batch_size: 100_000,
            performance_mode: PerformanceMode::HighPerformance,
            nonce_limit: 0,
        }
    }

    fn cpu_pool() -> HashWorkerPool {
        HashWorkerPool::with_searchers(Arc::new(HashRateMeter::default()), Arc::new(CpuSearcher::new()), None)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_candidate_meets_difficulty() {
        let pool = cpu_pool();
        let work = Arc::new(work_unit(100, 1, 4));
        let mut handle = pool.start_search(Arc::clone(&work), &budget(4));

        let candidate = timeout(SEARCH_DEADLINE, handle.next())
            .await
            .expect("search timed out")
            .expect("search ended without a candidate");

        assert_eq!(candidate.work_unit, work.id);
        assert!(leading_zero_nibbles(&candidate.hash) >= 4);

        // Recompute the node's preimage from scratch
        let preimage = format!(
            "{}{}{}{}{}",
            work.height(),
            work.previous_hash,
            work.timestamp,
            canonical_transactions_json(&work.transactions),
            candidate.nonce
        );
        let digest: [u8; 32] = Sha256::digest(preimage.as_bytes()).into();
        assert_eq!(digest, candidate.hash);
        assert!(candidate.hash_hex().starts_with("0000"));

        // At most one candidate per unit
        assert!(handle.next().await.is_none());
        assert!(handle.hashes() > 0);
        assert!(pool.meter().total_hashes() > 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cancelled_unit_yields_nothing_after_new_search() {
        let pool = cpu_pool();
        // Unreachable target keeps the first search busy
        let old = Arc::new(work_unit(100, 1, 64));
        let mut old_handle = pool.start_search(Arc::clone(&old), &budget(2));

        assert!(pool.cancel(old.id));
        assert!(!pool.cancel(old.id));
        assert!(old_handle.is_cancelled());

        let new = Arc::new(work_unit(101, 2, 1));
        let mut new_handle = pool.start_search(Arc::clone(&new), &budget(2));
        let candidate = timeout(SEARCH_DEADLINE, new_handle.next())
            .await
            .expect("search timed out")
            .expect("no candidate for the new unit");
        assert_eq!(candidate.work_unit, new.id);

        assert!(old_handle.next().await.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_new_search_cancels_running_one() {
        let pool = cpu_pool();
        let first = Arc::new(work_unit(200, 1, 64));
        let mut first_handle = pool.start_search(first, &budget(1));

        let second = Arc::new(work_unit(200, 2, 64));
        let second_handle = pool.start_search(second, &budget(1));

        assert!(first_handle.is_cancelled());
        assert!(first_handle.next().await.is_none());
        assert!(!second_handle.is_cancelled());
        pool.cancel_all();
        assert!(second_handle.is_cancelled());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failing_gpu_falls_back_to_cpu() {
        let gpu = Arc::new(FailingSearcher::new());
        let pool = HashWorkerPool::with_searchers(
            Arc::new(HashRateMeter::default()),
            Arc::new(CpuSearcher::new()),
            Some(Arc::clone(&gpu) as Arc<dyn Searcher>),
        );
        assert_eq!(pool.search_method(true), "CPU+GPU");

        let mut gpu_budget = budget(2);
        gpu_budget.gpu = true;

        // Unreachable target so the GPU worker gets to dispatch
        let busy = pool.start_search(Arc::new(work_unit(300, 1, 64)), &gpu_budget);
        timeout(SEARCH_DEADLINE, async {
            while !pool.gpu_unavailable() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("GPU failure was never reported");
        assert_eq!(pool.search_method(true), "CPU");
        busy.cancel();

        let calls = gpu.calls.load(Ordering::SeqCst);
        assert_eq!(calls, 1);

        let work = Arc::new(work_unit(301, 2, 3));
        let mut handle = pool.start_search(Arc::clone(&work), &gpu_budget);
        let candidate = timeout(SEARCH_DEADLINE, handle.next())
            .await
            .expect("search timed out")
            .expect("CPU workers should still find a candidate");
        assert_eq!(candidate.found_by, SearcherKind::Cpu);
        assert!(leading_zero_nibbles(&candidate.hash) >= 3);

        // Later searches stay CPU-only
        assert_eq!(gpu.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_nonce_limit_ends_search_empty() {
        let pool = cpu_pool();
        let mut limited = budget(4);
        limited.nonce_limit = 4096;
        let mut handle = pool.start_search(Arc::new(work_unit(400, 1, 64)), &limited);

        let result = timeout(SEARCH_DEADLINE, handle.next()).await.expect("search timed out");
        assert!(result.is_none());
        assert!(!handle.is_cancelled());
        assert_eq!(handle.hashes(), 4096);
    }
}

// Changelog:
// - v1.0.0 (2025-07-02): Initial hash worker pool tests.
