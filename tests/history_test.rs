// Luna Miner - Free and Open Source Software Statement
//
// File: tests/history_test.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// Mining history under concurrent writers, and the statistics that are
// reconciled from it.

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use luna_miner::core::types::{MiningRecord, RecordStatus, SearcherKind, TransportKind};
    use luna_miner::history::{AppendOutcome, HistoryFilter, HistoryStore};
    use luna_miner::stats::{SnapshotFile, StatsCache, StatsDelta};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn record(height: u64, status: RecordStatus, reward: f64) -> MiningRecord {
        MiningRecord {
            block_id: format!("{}-{:016x}", height, height * 31),
            height,
            timestamp: Utc::now(),
            reward,
            hash_rate_at_time: 125_000.0,
            transport_used: Some(TransportKind::Rich),
            status,
            nonce: height * 7,
            hash: format!("0000{:060x}", height),
            difficulty: 4,
            mining_time: 1.5,
            found_by: SearcherKind::Cpu,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_keep_one_line_per_block() {
        let dir = tempdir().unwrap();
        let store = Arc::new(HistoryStore::open(dir.path()).await.unwrap());

        // Every height is written by two tasks
        let mut tasks = Vec::new();
        for _ in 0..2 {
            for height in 1..=25u64 {
                let store = Arc::clone(&store);
                tasks.push(tokio::spawn(async move {
                    store.append(record(height, RecordStatus::Accepted, 2.0)).await.unwrap()
                }));
            }
        }
        let mut inserted = 0;
        for task in tasks {
            if task.await.unwrap() == AppendOutcome::Inserted {
                inserted += 1;
            }
        }

        assert_eq!(inserted, 25);
        assert_eq!(store.len(), 25);
        let totals = store.totals();
        assert_eq!(totals.blocks_mined, 25);
        assert_eq!(totals.total_rewards, 50.0);

        let text = tokio::fs::read_to_string(store.file_path()).await.unwrap();
        assert_eq!(text.lines().count(), 25);

        let reopened = HistoryStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.totals(), totals);
    }

    #[tokio::test]
    async fn test_rejections_do_not_count_as_mined() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::open(dir.path()).await.unwrap();
        store.append(record(1, RecordStatus::Accepted, 10.0)).await.unwrap();
        store.append(record(2, RecordStatus::Rejected, 0.0)).await.unwrap();
        store.append(record(3, RecordStatus::Accepted, 4.5)).await.unwrap();

        let totals = store.totals();
        assert_eq!(totals.blocks_mined, 2);
        assert_eq!(totals.total_rewards, 14.5);
        assert_eq!(totals.rejected, 1);

        let rejected: Vec<_> = store
            .query(HistoryFilter {
                status: Some(RecordStatus::Rejected),
                ..Default::default()
            })
            .collect();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].height, 2);

        let newest: Vec<u64> = store.query(HistoryFilter::recent(2)).map(|r| r.height).collect();
        assert_eq!(newest, vec![3, 2]);
    }

    #[tokio::test]
    async fn test_stats_follow_history_after_restart() {
        let dir = tempdir().unwrap();
        {
            let store = HistoryStore::open(dir.path()).await.unwrap();
            store.append(record(7, RecordStatus::Accepted, 3.0)).await.unwrap();
            store.append(record(8, RecordStatus::Accepted, 3.0)).await.unwrap();

            // Snapshot written before the second block landed
            let stats = StatsCache::new();
            stats.apply_delta(StatsDelta::BlockAccepted { reward: 3.0 });
            stats.persist(&SnapshotFile::new(dir.path())).await.unwrap();
        }

        let store = HistoryStore::open(dir.path()).await.unwrap();
        let stats = StatsCache::seeded(SnapshotFile::new(dir.path()).load_or_default().await);
        assert_eq!(stats.read().blocks_mined, 1);

        let totals = store.totals();
        stats.apply_delta(StatsDelta::Totals {
            blocks_mined: totals.blocks_mined,
            total_rewards: totals.total_rewards,
        });
        let snapshot = stats.read();
        assert_eq!(snapshot.blocks_mined, 2);
        assert_eq!(snapshot.total_rewards, 6.0);
    }
}

// Changelog:
// - v1.0.0 (2025-07-02): Initial history tests.
