// Luna Miner - Free and Open Source Software Statement
//
// File: tests/common/mod.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// Shared fixtures for the integration tests: a scriptable in-process node
// transport, a searcher that always fails, and config/work helpers.

#![allow(dead_code)]

use async_trait::async_trait;
use luna_miner::core::config::EngineConfig;
use luna_miner::core::types::{
    BlockSubmission, NetworkStatus, SearcherKind, SubmitReply, TransportKind, WorkTemplate, WorkUnit, WorkUnitId,
};
use luna_miner::miner::{BatchOutcome, SearchError, Searcher};
use luna_miner::node::{NodeTransport, TransportError};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// In-process node. Scripted results are consumed first, then the defaults apply.
pub struct StubTransport {
    kind: TransportKind,
    template: Mutex<WorkTemplate>,
    fetch_script: Mutex<VecDeque<TransportError>>,
    submit_script: Mutex<VecDeque<Result<SubmitReply, TransportError>>>,
    submit_default: Mutex<Result<SubmitReply, TransportError>>,
    status: Mutex<Result<NetworkStatus, TransportError>>,
    fetch_delay: Mutex<Option<Duration>>,
    submit_delay: Mutex<Option<Duration>>,
    pub fetch_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
    pub sync_calls: AtomicUsize,
    pub fetch_times: Mutex<Vec<Instant>>,
    pub submitted: Mutex<Vec<BlockSubmission>>,
}

impl StubTransport {
    pub fn new(kind: TransportKind, template: WorkTemplate) -> Self {
        let status = NetworkStatus {
            network_height: template.height.saturating_sub(1),
            difficulty: template.difficulty,
            mempool_size: template.transactions.len() as u64,
            peer_count: 3,
        };
        Self {
            kind,
            template: Mutex::new(template),
            fetch_script: Mutex::new(VecDeque::new()),
            submit_script: Mutex::new(VecDeque::new()),
            submit_default: Mutex::new(Ok(SubmitReply {
                success: true,
                block_id: None,
                reward: None,
                message: None,
            })),
            status: Mutex::new(Ok(status)),
            fetch_delay: Mutex::new(None),
            submit_delay: Mutex::new(None),
            fetch_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            sync_calls: AtomicUsize::new(0),
            fetch_times: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn rich(template: WorkTemplate) -> Self {
        Self::new(TransportKind::Rich, template)
    }

    pub fn plain(template: WorkTemplate) -> Self {
        Self::new(TransportKind::Plain, template)
    }

    pub fn fail_fetch(&self, times: usize, error: TransportError) {
        let mut script = self.fetch_script.lock();
        for _ in 0..times {
            script.push_back(error.clone());
        }
    }

    pub fn push_submit(&self, result: Result<SubmitReply, TransportError>) {
        self.submit_script.lock().push_back(result);
    }

    pub fn set_submit(&self, result: Result<SubmitReply, TransportError>) {
        *self.submit_default.lock() = result;
    }

    pub fn set_status(&self, result: Result<NetworkStatus, TransportError>) {
        *self.status.lock() = result;
    }

    pub fn set_template(&self, template: WorkTemplate) {
        *self.template.lock() = template;
    }

    pub fn set_fetch_delay(&self, delay: Duration) {
        *self.fetch_delay.lock() = Some(delay);
    }

    pub fn set_submit_delay(&self, delay: Duration) {
        *self.submit_delay.lock() = Some(delay);
    }

    pub fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn submits(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn syncs(&self) -> usize {
        self.sync_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NodeTransport for StubTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    async fn fetch_work(&self) -> Result<WorkTemplate, TransportError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.fetch_times.lock().push(Instant::now());
        let delay = *self.fetch_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.fetch_script.lock().pop_front();
        match scripted {
            Some(error) => Err(error),
            None => Ok(self.template.lock().clone()),
        }
    }

    async fn submit_block(&self, block: &BlockSubmission) -> Result<SubmitReply, TransportError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submitted.lock().push(block.clone());
        let delay = *self.submit_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.submit_script.lock().pop_front();
        let result = scripted.unwrap_or_else(|| self.submit_default.lock().clone());
        match result {
            Ok(reply) if !reply.success => Err(TransportError::Rejected {
                reason: reply.message.unwrap_or_else(|| "block rejected".to_string()),
            }),
            other => other,
        }
    }

    async fn sync_status(&self) -> Result<NetworkStatus, TransportError> {
        self.sync_calls.fetch_add(1, Ordering::SeqCst);
        self.status.lock().clone()
    }
}

/// Searcher standing in for a GPU whose driver fails on every dispatch
pub struct FailingSearcher {
    pub calls: AtomicUsize,
}

impl FailingSearcher {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

impl Searcher for FailingSearcher {
    fn kind(&self) -> SearcherKind {
        SearcherKind::Gpu
    }

    fn batch_len(&self) -> u64 {
        4096
    }

    fn search_batch(&self, _work: &WorkUnit, _start: u64, _count: u64) -> Result<BatchOutcome, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SearchError::Gpu("CL_OUT_OF_RESOURCES".to_string()))
    }
}

pub fn template(height: u64, difficulty: u32) -> WorkTemplate {
    WorkTemplate {
        height,
        previous_hash: format!("{:064x}", height.wrapping_mul(0x9e37_79b9)),
        difficulty,
        timestamp: 1_751_400_000.5,
        transactions: vec![json!({
            "type": "transaction",
            "from": "LUN_alice",
            "to": "LUN_bob",
            "amount": 5.0,
            "fee": 0.25,
            "hash": format!("tx_{}", height)
        })],
    }
}

pub fn work_unit(height: u64, seq: u64, difficulty: u32) -> WorkUnit {
    WorkUnit::new(WorkUnitId { height, seq }, template(height, difficulty), "LUN_test_miner".to_string())
}

/// Small, fast config rooted in `data_dir`
pub fn test_config(data_dir: &Path) -> EngineConfig {
    EngineConfig {
        miner_address: "LUN_test_miner".to_string(),
        difficulty_hint: 0,
        threads: 2,
        interval_seconds: 30,
        node_url: "http://127.0.0.1:9".to_string(),
        network_timeout_secs: 5,
        max_attempts: 1,
        backoff_base_ms: 100,
        data_dir: data_dir.to_path_buf(),
        ..EngineConfig::default()
    }
}

pub fn accepted(block_id: &str, reward: f64) -> SubmitReply {
    SubmitReply {
        success: true,
        block_id: Some(block_id.to_string()),
        reward: Some(reward),
        message: None,
    }
}
