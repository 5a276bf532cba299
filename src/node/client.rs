// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/node/client.rs
// Version: 1.1.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file implements the submission client of the Luna miner, located in the
// node subdirectory. It issues work units, submits candidates and syncs network
// status over an ordered chain of transports:
// - only transport-level failures advance to the next transport
// - transport-level failures are retried with bounded exponential backoff
// - candidates for anything but the active work unit are stale
// - resubmissions are answered from a short-lived seen-set
//
// Tree Location:
// - src/node/client.rs (SubmissionClient)
// - Depends on: tokio, parking_lot, node::transport, node::backoff

use crate::core::config::EngineConfig;
use crate::core::difficulty::MAX_DIFFICULTY;
use crate::core::error::EngineError;
use crate::core::types::{
    BlockSubmission, Candidate, NetworkStatus, SubmissionResult, TransportKind, WorkUnit, WorkUnitId,
    empty_block_reward_tx,
};
use crate::node::backoff::Backoff;
use crate::node::plain::PlainTransport;
use crate::node::transport::{NodeTransport, TransportError};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, timeout};

const LOG_TARGET: &str = "luna::miner::node::client";

/// How long a submitted (height, nonce) is remembered
pub const SEEN_TTL: Duration = Duration::from_secs(600);

/// Upper bound for a single backoff delay
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub miner_address: String,
    pub difficulty_hint: u32,
    pub network_timeout: Duration,
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub cache_size: usize,
}

impl ClientSettings {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            miner_address: config.miner_address.clone(),
            difficulty_hint: config.difficulty_hint,
            network_timeout: config.network_timeout(),
            max_attempts: config.max_attempts.max(1),
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            cache_size: config.cache_size.max(1),
        }
    }
}

/// Bounded, expiring set of submitted (height, nonce) keys
struct SeenSet {
    entries: HashMap<(u64, u64), Instant>,
    order: VecDeque<((u64, u64), Instant)>,
    ttl: Duration,
    capacity: usize,
}

impl SeenSet {
    fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            ttl,
            capacity,
        }
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&(key, at)) = self.order.front() {
            let expired = now.duration_since(at) >= self.ttl;
            if !expired && self.order.len() <= self.capacity {
                break;
            }
            self.order.pop_front();
            // A re-inserted key has a newer timestamp in `entries`
            if self.entries.get(&key) == Some(&at) {
                self.entries.remove(&key);
            }
        }
    }

    fn contains(&mut self, key: (u64, u64), now: Instant) -> bool {
        self.prune(now);
        self.entries.contains_key(&key)
    }

    fn insert(&mut self, key: (u64, u64), now: Instant) {
        self.entries.insert(key, now);
        self.order.push_back((key, now));
        self.prune(now);
    }

    fn remove(&mut self, key: (u64, u64)) {
        self.entries.remove(&key);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Holds a (height, nonce) key in the seen-set while its submission is in flight.
/// Dropped without `keep`, the key is released so the block can be retried.
struct SeenReservation<'a> {
    state: &'a Mutex<ClientState>,
    key: (u64, u64),
    kept: bool,
}

impl SeenReservation<'_> {
    fn keep(mut self) {
        self.kept = true;
    }
}

impl Drop for SeenReservation<'_> {
    fn drop(&mut self) {
        if !self.kept {
            self.state.lock().seen.remove(self.key);
        }
    }
}

struct ClientState {
    active: Option<Arc<WorkUnit>>,
    next_seq: u64,
    last_network_height: Option<u64>,
    seen: SeenSet,
}

enum CallFailure {
    /// Authoritative answer or undecodable reply; not retried
    Fatal(TransportError),
    /// Every attempt failed at the transport level
    Exhausted(TransportError),
}

pub struct SubmissionClient {
    transports: Vec<Arc<dyn NodeTransport>>,
    settings: ClientSettings,
    state: Mutex<ClientState>,
}

impl SubmissionClient {
    /// Build the transport chain for a node: rich client first when compiled in
    /// and constructible, then the plain fallback.
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut transports: Vec<Arc<dyn NodeTransport>> = Vec::new();
        transports.extend(rich_transport(config));

        match PlainTransport::new(&config.node_url) {
            Ok(plain) => transports.push(Arc::new(plain)),
            Err(e) => warn!(target: LOG_TARGET, "⚠️ Plain transport unavailable: {}", e),
        }

        Self::with_transports(transports, ClientSettings::from_config(config))
    }

    pub fn with_transports(transports: Vec<Arc<dyn NodeTransport>>, settings: ClientSettings) -> Self {
        let seen = SeenSet::new(SEEN_TTL, settings.cache_size);
        Self {
            transports,
            settings,
            state: Mutex::new(ClientState {
                active: None,
                next_seq: 1,
                last_network_height: None,
                seen,
            }),
        }
    }

    pub fn transport_kinds(&self) -> Vec<TransportKind> {
        self.transports.iter().map(|t| t.kind()).collect()
    }

    pub fn active_work(&self) -> Option<Arc<WorkUnit>> {
        self.state.lock().active.clone()
    }

    pub fn last_network_height(&self) -> Option<u64> {
        self.state.lock().last_network_height
    }

    /// Record the node's latest height; returns true when it made the active unit stale
    pub fn observe_height(&self, network_height: u64) -> bool {
        let mut state = self.state.lock();
        state.last_network_height = Some(state.last_network_height.map_or(network_height, |h| h.max(network_height)));
        match &state.active {
            Some(work) if network_height >= work.height() => {
                info!(target: LOG_TARGET,
                    "Network reached height {}; work {} is stale",
                    network_height, work.id
                );
                state.active = None;
                true
            }
            _ => false,
        }
    }

    /// Drop the active work unit without waiting for the network
    pub fn retire_work(&self, id: WorkUnitId) {
        let mut state = self.state.lock();
        if state.active.as_ref().is_some_and(|w| w.id == id) {
            state.active = None;
        }
    }

    /// Run one call across the transport chain with retries
    async fn call<T, F, Fut>(&self, op: &'static str, f: F) -> Result<(T, TransportKind), CallFailure>
    where
        F: Fn(Arc<dyn NodeTransport>) -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let mut backoff = Backoff::new(self.settings.backoff_base, MAX_BACKOFF, 2.0);
        let mut last_error = TransportError::Unavailable("no transport configured".to_string());

        for attempt in 1..=self.settings.max_attempts {
            for transport in &self.transports {
                let kind = transport.kind();
                let result = match timeout(self.settings.network_timeout, f(Arc::clone(transport))).await {
                    Ok(result) => result,
                    Err(_) => Err(TransportError::Timeout),
                };
                match result {
                    Ok(value) => {
                        if attempt > 1 {
                            info!(target: LOG_TARGET, "{} succeeded via {} after {} retries", op, kind.as_str(), attempt - 1);
                        }
                        return Ok((value, kind));
                    }
                    Err(e) if e.is_transport_level() => {
                        warn!(target: LOG_TARGET, "{} via {} failed (attempt {}): {}", op, kind.as_str(), attempt, e);
                        last_error = e;
                    }
                    Err(e) => {
                        debug!(target: LOG_TARGET, "{} via {} answered: {}", op, kind.as_str(), e);
                        return Err(CallFailure::Fatal(e));
                    }
                }
            }

            if attempt < self.settings.max_attempts {
                let delay = backoff.sleep().await;
                debug!(target: LOG_TARGET, "{} retry {} after {:?}", op, attempt, delay);
            }
        }

        Err(CallFailure::Exhausted(last_error))
    }

    /// Fetch a block template and issue it as the new active work unit
    pub async fn fetch_work(&self) -> Result<Arc<WorkUnit>, EngineError> {
        let (mut template, kind) = self
            .call("fetch_work", |t| async move { t.fetch_work().await })
            .await
            .map_err(|failure| match failure {
                CallFailure::Fatal(e) | CallFailure::Exhausted(e) => EngineError::from(e),
            })?;

        template.difficulty = template.difficulty.max(self.settings.difficulty_hint).min(MAX_DIFFICULTY);
        if template.transactions.is_empty() {
            template.transactions.push(empty_block_reward_tx(
                &self.settings.miner_address,
                template.height,
                template.timestamp,
            ));
        }

        let mut state = self.state.lock();
        let id = WorkUnitId {
            height: template.height,
            seq: state.next_seq,
        };
        state.next_seq += 1;
        let work = Arc::new(WorkUnit::new(id, template, self.settings.miner_address.clone()));
        state.active = Some(Arc::clone(&work));

        info!(target: LOG_TARGET,
            "📋 New work {} via {}: difficulty {}, {} transaction(s)",
            id,
            kind.as_str(),
            work.difficulty,
            work.transactions.len()
        );
        Ok(work)
    }

    /// Submit a candidate for the active work unit
    pub async fn submit(&self, candidate: &Candidate) -> Result<SubmissionResult, EngineError> {
        let key = candidate.dedup_key();
        let work = {
            let mut state = self.state.lock();
            if state.seen.contains(key, Instant::now()) {
                debug!(target: LOG_TARGET, "Candidate {:?} already submitted", key);
                return Ok(SubmissionResult::DuplicateIgnored);
            }
            let work = match &state.active {
                Some(work) if work.id == candidate.work_unit => Arc::clone(work),
                active => {
                    return Err(EngineError::StaleWork {
                        candidate: candidate.work_unit,
                        active: active.as_ref().map(|w| w.id),
                    });
                }
            };
            state.seen.insert(key, Instant::now());
            work
        };
        let reservation = SeenReservation {
            state: &self.state,
            key,
            kept: false,
        };

        let proposed_reward = work.proposed_reward();
        let block: Arc<BlockSubmission> = Arc::new(work.to_block(candidate, proposed_reward));

        let outcome = self
            .call("submit_block", |t| {
                let block = Arc::clone(&block);
                async move { t.submit_block(&block).await }
            })
            .await;

        let result = match outcome {
            Ok((reply, transport)) => {
                let block_id = reply.block_id.unwrap_or_else(|| candidate.local_block_id());
                SubmissionResult::Accepted {
                    reward: reply.reward.unwrap_or(proposed_reward),
                    block_id,
                    transport,
                }
            }
            Err(CallFailure::Fatal(TransportError::Rejected { reason })) => SubmissionResult::Rejected { reason },
            Err(CallFailure::Fatal(e)) => {
                warn!(target: LOG_TARGET, "Submission of {} got an unusable answer: {}", work.id, e);
                SubmissionResult::TransportFailed { retryable: true }
            }
            Err(CallFailure::Exhausted(e)) => {
                warn!(target: LOG_TARGET,
                    "Submission of {} failed after {} attempt(s): {}",
                    work.id, self.settings.max_attempts, e
                );
                SubmissionResult::TransportFailed { retryable: false }
            }
        };

        if matches!(
            result,
            SubmissionResult::Accepted { .. } | SubmissionResult::Rejected { .. }
        ) {
            reservation.keep();
            let mut state = self.state.lock();
            state.seen.insert(key, Instant::now());
            // An accepted block consumes its work unit
            if matches!(result, SubmissionResult::Accepted { .. }) && state.active.as_ref().is_some_and(|w| w.id == work.id) {
                state.active = None;
            }
        }
        Ok(result)
    }

    /// Query network status and invalidate the active unit if the chain moved on
    pub async fn sync_status(&self) -> Result<NetworkStatus, EngineError> {
        let (status, _) = self
            .call("sync_status", |t| async move { t.sync_status().await })
            .await
            .map_err(|failure| match failure {
                CallFailure::Fatal(e) | CallFailure::Exhausted(e) => EngineError::from(e),
            })?;
        self.observe_height(status.network_height);
        Ok(status)
    }

    /// Number of remembered submissions, for diagnostics
    pub fn seen_len(&self) -> usize {
        self.state.lock().seen.len()
    }
}

#[cfg(feature = "rich-transport")]
fn rich_transport(config: &EngineConfig) -> Option<Arc<dyn NodeTransport>> {
    match crate::node::rpc::RichTransport::new(&config.node_url, config.network_timeout()) {
        Ok(rich) => Some(Arc::new(rich)),
        Err(e) => {
            warn!(target: LOG_TARGET, "⚠️ Rich transport unavailable, using plain fallback only: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "rich-transport"))]
fn rich_transport(_config: &EngineConfig) -> Option<Arc<dyn NodeTransport>> {
    info!(target: LOG_TARGET, "Built without the rich transport; using plain fallback only");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_seen_set_expires_and_caps() {
        let mut seen = SeenSet::new(Duration::from_secs(10), 2);
        let now = Instant::now();
        seen.insert((1, 1), now);
        seen.insert((1, 2), now);
        seen.insert((1, 3), now);
        assert!(!seen.contains((1, 1), now));
        assert!(seen.contains((1, 3), now));
        assert!(!seen.contains((1, 3), now + Duration::from_secs(11)));
        assert_eq!(seen.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reinserted_key_survives_old_entry_eviction() {
        let mut seen = SeenSet::new(Duration::from_secs(10), 8);
        let start = Instant::now();
        seen.insert((2, 7), start);
        seen.insert((2, 7), start + Duration::from_secs(8));
        assert!(seen.contains((2, 7), start + Duration::from_secs(12)));
    }
}

// Changelog:
// - v1.1.0 (2025-07-09): The seen-set key is reserved before the node call.
//   - Concurrent submits of one candidate reach the node once.
//   - Transport failures release the key for a later retry.
// - v1.0.0 (2025-07-02): Initial submission client.
//   - Ordered transport chain with transport-level fallback only.
//   - Bounded exponential retry, per-call timeout, seen-set dedup and stale checks.
//   - Empty templates get the miner reward transaction; difficulty honours the hint.
