// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/engine/scheduler.rs
// Version: 1.1.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file implements the auto-mining scheduler of the Luna miner, located in
// the engine subdirectory. One tokio task owns the mining cycle:
// Idle -> Syncing -> Searching -> Submitting -> Accepted | Rejected | Failed.
// Commands arrive over an mpsc channel and are served in every state; the
// current state is published on a watch channel.
//
// Tree Location:
// - src/engine/scheduler.rs (mining cycle state machine)
// - Depends on: tokio, node::client, miner::pool, stats, history, engine::events

use crate::core::config::EngineConfig;
use crate::core::error::EngineError;
use crate::core::types::{
    Candidate, MiningRecord, NetworkStatus, RecordStatus, SubmissionResult, TransportKind, WorkUnit,
};
use crate::engine::events::EventLog;
use crate::engine::spool::BlockSpool;
use crate::history::{AppendOutcome, HistoryStore};
use crate::miner::{HashWorkerPool, SearchHandle, WorkerBudget};
use crate::node::{Backoff, ClientSettings, NodeTransport, SubmissionClient};
use crate::stats::{ConnectionStatus, SnapshotFile, StatsCache, StatsDelta};
use chrono::Utc;
use log::{debug, warn};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at, sleep_until};

static LOG_TARGET: &str = "luna::miner::engine::scheduler";

/// Longest pause between failed work fetches
const MAX_FETCH_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Syncing,
    Searching,
    Submitting,
    Accepted,
    Rejected,
    Failed,
    Stopped,
}

impl SchedulerState {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SchedulerState::Idle => "idle",
            SchedulerState::Syncing => "syncing",
            SchedulerState::Searching => "searching",
            SchedulerState::Submitting => "submitting",
            SchedulerState::Accepted => "accepted",
            SchedulerState::Rejected => "rejected",
            SchedulerState::Failed => "failed",
            SchedulerState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How one mining cycle ended
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Accepted {
        height: u64,
        block_id: String,
        reward: f64,
        transport: TransportKind,
    },
    Rejected {
        height: u64,
        reason: String,
    },
    Failed {
        reason: String,
    },
    /// Stopped, or superseded by a newer network height
    Cancelled {
        reason: String,
    },
}

pub(crate) enum Command {
    Start {
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    SingleBlock {
        reply: oneshot::Sender<Result<CycleOutcome, EngineError>>,
    },
    Sync {
        reply: oneshot::Sender<Result<NetworkStatus, EngineError>>,
    },
    Reconfigure {
        config: Box<EngineConfig>,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Where the submission client's transports come from
pub(crate) enum ClientSource {
    FromConfig,
    Transports(Vec<Arc<dyn NodeTransport>>),
}

impl ClientSource {
    pub(crate) fn build(&self, config: &EngineConfig) -> SubmissionClient {
        match self {
            ClientSource::FromConfig => SubmissionClient::from_config(config),
            ClientSource::Transports(transports) => {
                SubmissionClient::with_transports(transports.clone(), ClientSettings::from_config(config))
            }
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct SessionCounters {
    pub(crate) attempts: u64,
    pub(crate) solved: u64,
    pub(crate) mining_time_total: f64,
}

impl SessionCounters {
    pub(crate) fn average_mining_time(&self) -> f64 {
        if self.solved == 0 {
            0.0
        } else {
            self.mining_time_total / self.solved as f64
        }
    }
}

/// State the engine handle reads without going through the command channel
pub(crate) struct Shared {
    pub(crate) config: RwLock<EngineConfig>,
    pub(crate) auto_running: AtomicBool,
    pub(crate) session: Mutex<SessionCounters>,
}

impl Shared {
    pub(crate) fn new(config: EngineConfig) -> Self {
        Self {
            config: RwLock::new(config),
            auto_running: AtomicBool::new(false),
            session: Mutex::new(SessionCounters::default()),
        }
    }
}

pub(crate) struct SchedulerParts {
    pub(crate) config: EngineConfig,
    pub(crate) client_source: ClientSource,
    pub(crate) pool: Arc<HashWorkerPool>,
    pub(crate) stats: Arc<StatsCache>,
    pub(crate) history: Arc<HistoryStore>,
    pub(crate) events: Arc<EventLog>,
    pub(crate) shared: Arc<Shared>,
    pub(crate) commands: mpsc::Receiver<Command>,
    pub(crate) state: watch::Sender<SchedulerState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    Stop,
    Shutdown,
}

/// When the next auto-mining cycle may start
enum Pace {
    Interval,
    Immediately,
    After(Duration),
}

enum SearchStep {
    Found(Candidate),
    Exhausted,
    Stale,
    Interrupted,
}

struct Solved {
    work: Arc<WorkUnit>,
    candidate: Candidate,
    mining_time: Duration,
}

struct Ticks {
    sync: Interval,
    persist: Interval,
}

impl Ticks {
    fn new(config: &EngineConfig) -> Self {
        let sync_period = Duration::from_secs(config.sync_interval_secs.max(1));
        let persist_period = Duration::from_secs(config.stats_persist_interval_secs.max(1));
        let mut sync = interval_at(Instant::now() + sync_period, sync_period);
        sync.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut persist = interval_at(Instant::now() + persist_period, persist_period);
        persist.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { sync, persist }
    }
}

pub(crate) struct Scheduler {
    config: EngineConfig,
    pending_config: Option<EngineConfig>,
    client_source: ClientSource,
    client: Arc<SubmissionClient>,
    pool: Arc<HashWorkerPool>,
    stats: Arc<StatsCache>,
    history: Arc<HistoryStore>,
    events: Arc<EventLog>,
    snapshot_file: SnapshotFile,
    spool: BlockSpool,
    shared: Arc<Shared>,
    state: watch::Sender<SchedulerState>,
    commands: mpsc::Receiver<Command>,
    commands_open: bool,
    auto_running: bool,
    next_cycle_at: Option<Instant>,
    fetch_backoff: Backoff,
    interrupt: Option<Interrupt>,
    single_waiters: Vec<oneshot::Sender<Result<CycleOutcome, EngineError>>>,
    stop_waiters: Vec<oneshot::Sender<()>>,
    shutdown_waiter: Option<oneshot::Sender<()>>,
}

impl Scheduler {
    pub(crate) fn new(parts: SchedulerParts) -> Self {
        let client = Arc::new(parts.client_source.build(&parts.config));
        let fetch_backoff = Backoff::new(
            Duration::from_millis(parts.config.backoff_base_ms),
            MAX_FETCH_BACKOFF,
            2.0,
        );
        Self {
            snapshot_file: SnapshotFile::new(&parts.config.data_dir),
            spool: BlockSpool::new(&parts.config.data_dir),
            config: parts.config,
            pending_config: None,
            client_source: parts.client_source,
            client,
            pool: parts.pool,
            stats: parts.stats,
            history: parts.history,
            events: parts.events,
            shared: parts.shared,
            state: parts.state,
            commands: parts.commands,
            commands_open: true,
            auto_running: false,
            next_cycle_at: None,
            fetch_backoff,
            interrupt: None,
            single_waiters: Vec::new(),
            stop_waiters: Vec::new(),
            shutdown_waiter: None,
        }
    }

    pub(crate) async fn run(mut self) {
        let mut ticks = Ticks::new(&self.config);
        self.events.info(format!(
            "🚀 Mining engine ready (node {}, {} CPU thread(s))",
            self.config.node_url, self.config.threads
        ));
        if self.config.auto_mining {
            match self.begin_auto() {
                Ok(()) => self.next_cycle_at = Some(Instant::now()),
                Err(e) => self.events.warning(format!("⚠️ Auto-mining not started: {}", e)),
            }
        }

        loop {
            let wake = self.next_cycle_at;
            let background_sync = self.auto_running;
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else { break };
                    if self.handle_idle_command(command, &mut ticks).await.is_break() {
                        break;
                    }
                }
                _ = sleep_until(wake.unwrap_or_else(Instant::now)), if wake.is_some() => {
                    self.next_cycle_at = None;
                    if self.run_cycle(&mut ticks).await.is_break() {
                        break;
                    }
                }
                _ = ticks.sync.tick(), if background_sync => {
                    self.background_sync().await;
                }
                _ = ticks.persist.tick() => {
                    self.persist(false).await;
                }
            }
        }

        self.finish().await;
    }

    fn set_state(&self, state: SchedulerState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(target: LOG_TARGET, "State {} -> {}", previous, state);
        }
    }

    /// Config the next cycle will run with
    fn effective_config(&self) -> &EngineConfig {
        self.pending_config.as_ref().unwrap_or(&self.config)
    }

    async fn handle_idle_command(&mut self, command: Command, ticks: &mut Ticks) -> ControlFlow<()> {
        match command {
            Command::Start { reply } => {
                let result = self.begin_auto();
                if result.is_ok() && self.next_cycle_at.is_none() {
                    self.next_cycle_at = Some(Instant::now());
                }
                let _ = reply.send(result);
            }
            Command::Stop { reply } => {
                self.halt();
                let _ = reply.send(());
            }
            Command::SingleBlock { reply } => match self.effective_config().validate() {
                Ok(()) => {
                    self.single_waiters.push(reply);
                    self.next_cycle_at = Some(Instant::now());
                }
                Err(e) => {
                    let _ = reply.send(Err(e.into()));
                }
            },
            Command::Sync { reply } => {
                let _ = reply.send(self.sync_now().await);
            }
            Command::Reconfigure { config, reply } => {
                let was_auto = self.effective_config().auto_mining;
                let result = self.accept_config(*config).await;
                if result.is_ok() {
                    self.apply_pending_config(ticks);
                    match (was_auto, self.config.auto_mining) {
                        (false, true) => {
                            if self.begin_auto().is_ok() && self.next_cycle_at.is_none() {
                                self.next_cycle_at = Some(Instant::now());
                            }
                        }
                        (true, false) => self.halt(),
                        _ => {}
                    }
                }
                let _ = reply.send(result);
            }
            Command::Shutdown { reply } => {
                self.shutdown_waiter = Some(reply);
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Commands arriving mid-cycle. Stop and shutdown are recorded as interrupts.
    async fn handle_busy_command(&mut self, command: Command) {
        match command {
            Command::Start { reply } => {
                let _ = reply.send(self.begin_auto());
            }
            Command::Stop { reply } => {
                self.stop_waiters.push(reply);
                self.request_interrupt(Interrupt::Stop);
            }
            Command::SingleBlock { reply } => match self.effective_config().validate() {
                Ok(()) => self.single_waiters.push(reply),
                Err(e) => {
                    let _ = reply.send(Err(e.into()));
                }
            },
            Command::Sync { reply } => {
                let _ = reply.send(self.sync_now().await);
            }
            Command::Reconfigure { config, reply } => {
                let was_auto = self.effective_config().auto_mining;
                let result = self.accept_config(*config).await;
                if result.is_ok() {
                    match (was_auto, self.effective_config().auto_mining) {
                        (false, true) => {
                            let _ = self.begin_auto();
                        }
                        (true, false) => self.request_interrupt(Interrupt::Stop),
                        _ => {}
                    }
                }
                let _ = reply.send(result);
            }
            Command::Shutdown { reply } => {
                self.shutdown_waiter = Some(reply);
                self.request_interrupt(Interrupt::Shutdown);
            }
        }
    }

    fn request_interrupt(&mut self, interrupt: Interrupt) {
        if self.interrupt != Some(Interrupt::Shutdown) {
            self.interrupt = Some(interrupt);
        }
    }

    fn begin_auto(&mut self) -> Result<(), EngineError> {
        self.effective_config().validate()?;
        if !self.auto_running {
            self.auto_running = true;
            self.shared.auto_running.store(true, Ordering::Release);
            self.events.info(format!(
                "⛏️ Auto-mining started (every {}s, {} mode)",
                self.effective_config().interval_seconds,
                self.effective_config().performance_mode
            ));
        }
        Ok(())
    }

    /// Leave auto-mining and settle in Stopped
    fn halt(&mut self) {
        if self.auto_running {
            self.events.info("⏹️ Auto-mining stopped");
        }
        self.auto_running = false;
        self.shared.auto_running.store(false, Ordering::Release);
        self.next_cycle_at = None;
        for waiter in self.single_waiters.drain(..) {
            let _ = waiter.send(Ok(CycleOutcome::Cancelled {
                reason: "mining stopped".to_string(),
            }));
        }
        self.set_state(SchedulerState::Stopped);
    }

    async fn accept_config(&mut self, config: EngineConfig) -> Result<(), EngineError> {
        config.validate()?;
        if let Err(e) = config.save(&config.settings_path()).await {
            warn!(target: LOG_TARGET, "⚠️ Settings accepted but not saved: {}", e);
        }
        self.pending_config = Some(config);
        self.events.info("⚙️ Settings updated");
        Ok(())
    }

    fn apply_pending_config(&mut self, ticks: &mut Ticks) {
        let Some(config) = self.pending_config.take() else {
            return;
        };

        let client_changed = config.node_url != self.config.node_url
            || ClientSettings::from_config(&config) != ClientSettings::from_config(&self.config);
        if client_changed {
            debug!(target: LOG_TARGET, "Rebuilding submission client for {}", config.node_url);
            self.client = Arc::new(self.client_source.build(&config));
        }
        if config.sync_interval_secs != self.config.sync_interval_secs
            || config.stats_persist_interval_secs != self.config.stats_persist_interval_secs
        {
            *ticks = Ticks::new(&config);
        }
        if config.backoff_base_ms != self.config.backoff_base_ms {
            self.fetch_backoff = Backoff::new(Duration::from_millis(config.backoff_base_ms), MAX_FETCH_BACKOFF, 2.0);
        }

        *self.shared.config.write() = config.clone();
        self.config = config;
    }

    async fn sync_now(&mut self) -> Result<NetworkStatus, EngineError> {
        let result = self.client.sync_status().await;
        match &result {
            Ok(status) => {
                self.stats.apply_delta(StatsDelta::Network(status.clone()));
                self.stats.apply_delta(StatsDelta::Connection(ConnectionStatus::Connected));
            }
            Err(e) if e.is_retryable() => {
                self.stats.apply_delta(StatsDelta::Connection(ConnectionStatus::Degraded));
            }
            Err(_) => {}
        }
        result
    }

    async fn background_sync(&mut self) {
        match self.sync_now().await {
            Ok(status) => debug!(target: LOG_TARGET,
                "Background sync: height {}, {} pending transaction(s)",
                status.network_height, status.mempool_size
            ),
            Err(e) => warn!(target: LOG_TARGET, "Background sync failed: {}", e),
        }
        self.sample_hash_rate();
    }

    fn sample_hash_rate(&self) {
        let rate = self.pool.meter().sample();
        self.stats.apply_delta(StatsDelta::HashRateSample(rate));
    }

    async fn persist(&self, force: bool) {
        let saved = if force {
            self.stats.persist(&self.snapshot_file).await.map(|_| true)
        } else {
            self.stats.persist_if_dirty(&self.snapshot_file).await
        };
        if let Err(e) = saved {
            warn!(target: LOG_TARGET, "⚠️ Failed to save stats snapshot: {}", e);
        }
        if let Err(e) = self.events.persist_if_dirty().await {
            warn!(target: LOG_TARGET, "⚠️ Failed to save event log: {}", e);
        }
    }

    /// Poll `future` while still serving commands. An interruptible future is
    /// dropped as soon as stop or shutdown is requested.
    async fn drive<F: Future>(&mut self, future: F, ticks: &mut Ticks, interruptible: bool) -> Option<F::Output> {
        tokio::pin!(future);
        loop {
            tokio::select! {
                output = &mut future => return Some(output),
                command = self.commands.recv(), if self.commands_open => {
                    match command {
                        Some(command) => self.handle_busy_command(command).await,
                        None => {
                            self.commands_open = false;
                            self.request_interrupt(Interrupt::Shutdown);
                        }
                    }
                    if interruptible && self.interrupt.is_some() {
                        return None;
                    }
                }
                _ = ticks.persist.tick() => {
                    self.persist(false).await;
                }
            }
        }
    }

    async fn run_cycle(&mut self, ticks: &mut Ticks) -> ControlFlow<()> {
        self.apply_pending_config(ticks);

        let (outcome, pace) = match self.config.validate() {
            Ok(()) => self.mine_once(ticks).await,
            Err(e) => {
                let error = EngineError::from(e);
                self.events.error(format!("❌ Cannot mine: {}", error));
                self.auto_running = false;
                self.shared.auto_running.store(false, Ordering::Release);
                (
                    Some(CycleOutcome::Failed {
                        reason: error.to_string(),
                    }),
                    Pace::Interval,
                )
            }
        };

        let outcome = outcome.unwrap_or_else(|| CycleOutcome::Cancelled {
            reason: "mining stopped".to_string(),
        });
        self.complete_cycle(outcome, pace).await;

        match self.interrupt.take() {
            Some(Interrupt::Shutdown) => ControlFlow::Break(()),
            Some(Interrupt::Stop) => {
                self.halt();
                for waiter in self.stop_waiters.drain(..) {
                    let _ = waiter.send(());
                }
                ControlFlow::Continue(())
            }
            None => ControlFlow::Continue(()),
        }
    }

    async fn complete_cycle(&mut self, outcome: CycleOutcome, pace: Pace) {
        match &outcome {
            CycleOutcome::Accepted { .. } => self.set_state(SchedulerState::Accepted),
            CycleOutcome::Rejected { .. } => self.set_state(SchedulerState::Rejected),
            CycleOutcome::Failed { .. } => self.set_state(SchedulerState::Failed),
            CycleOutcome::Cancelled { .. } => {}
        }

        for waiter in self.single_waiters.drain(..) {
            let _ = waiter.send(Ok(outcome.clone()));
        }

        if self.auto_running {
            let delay = match pace {
                Pace::Interval => self.config.interval(),
                Pace::Immediately => Duration::ZERO,
                Pace::After(delay) => delay,
            };
            self.next_cycle_at = Some(Instant::now() + delay);
            self.set_state(SchedulerState::Idle);
        } else {
            self.set_state(SchedulerState::Stopped);
        }

        self.persist(false).await;
    }

    /// One pass through Syncing, Searching and Submitting. `None` when interrupted.
    async fn mine_once(&mut self, ticks: &mut Ticks) -> (Option<CycleOutcome>, Pace) {
        self.set_state(SchedulerState::Syncing);
        let client = Arc::clone(&self.client);
        let Some(fetched) = self.drive(client.fetch_work(), ticks, true).await else {
            return (None, Pace::Interval);
        };

        let work = match fetched {
            Ok(work) => {
                self.fetch_backoff.reset();
                self.stats.apply_delta(StatsDelta::Connection(ConnectionStatus::Connected));
                work
            }
            Err(e) => {
                let delay = self.fetch_backoff.next_delay();
                if e.is_retryable() {
                    self.stats.apply_delta(StatsDelta::Connection(ConnectionStatus::Degraded));
                }
                self.stats.apply_delta(StatsDelta::CycleOutcome { success: false });
                self.events.warning(format!(
                    "⚠️ Could not get work from the node: {} (next try in {:.1}s)",
                    e,
                    delay.as_secs_f64()
                ));
                return (Some(CycleOutcome::Failed { reason: e.to_string() }), Pace::After(delay));
            }
        };

        self.set_state(SchedulerState::Searching);
        self.events.info(format!(
            "⛏️ Mining block #{} at difficulty {} ({})",
            work.height(),
            work.difficulty,
            self.pool.search_method(self.config.gpu_enabled)
        ));

        let budget = WorkerBudget::from_config(&self.config);
        let started = Instant::now();
        let mut handle = self.pool.start_search(Arc::clone(&work), &budget);
        self.shared.session.lock().attempts += 1;

        let step = self.search(&mut handle, &work, ticks).await;
        let mining_time = started.elapsed();
        drop(handle);
        self.sample_hash_rate();

        let candidate = match step {
            SearchStep::Found(candidate) => candidate,
            SearchStep::Exhausted => {
                self.client.retire_work(work.id);
                self.stats.apply_delta(StatsDelta::CycleOutcome { success: false });
                self.events.warning(format!(
                    "No solution found for block #{} within {} nonces",
                    work.height(),
                    self.config.search_nonce_limit
                ));
                return (
                    Some(CycleOutcome::Failed {
                        reason: "no solution found".to_string(),
                    }),
                    Pace::Interval,
                );
            }
            SearchStep::Stale => {
                self.events.warning(format!(
                    "🔄 Block #{} was mined elsewhere; moving to the new height",
                    work.height()
                ));
                return (
                    Some(CycleOutcome::Cancelled {
                        reason: format!("block #{} superseded", work.height()),
                    }),
                    Pace::Immediately,
                );
            }
            SearchStep::Interrupted => {
                self.client.retire_work(work.id);
                return (None, Pace::Interval);
            }
        };

        {
            let mut session = self.shared.session.lock();
            session.solved += 1;
            session.mining_time_total += mining_time.as_secs_f64();
        }
        self.events.info(format!(
            "💎 Found nonce {} for block #{} in {:.2}s ({})",
            candidate.nonce,
            work.height(),
            mining_time.as_secs_f64(),
            candidate.found_by.as_str()
        ));

        self.set_state(SchedulerState::Submitting);
        let solved = Solved {
            work,
            candidate,
            mining_time,
        };
        let client = Arc::clone(&self.client);
        let Some(submitted) = self.drive(client.submit(&solved.candidate), ticks, false).await else {
            return (None, Pace::Interval);
        };

        self.interpret_submission(&solved, submitted).await
    }

    async fn search(&mut self, handle: &mut SearchHandle, work: &WorkUnit, ticks: &mut Ticks) -> SearchStep {
        loop {
            tokio::select! {
                candidate = handle.next() => {
                    return match candidate {
                        Some(candidate) => SearchStep::Found(candidate),
                        None if handle.is_cancelled() => SearchStep::Interrupted,
                        None => SearchStep::Exhausted,
                    };
                }
                command = self.commands.recv(), if self.commands_open => {
                    match command {
                        Some(command) => self.handle_busy_command(command).await,
                        None => {
                            self.commands_open = false;
                            self.request_interrupt(Interrupt::Shutdown);
                        }
                    }
                    if self.interrupt.is_some() {
                        self.pool.cancel(work.id);
                        return SearchStep::Interrupted;
                    }
                }
                _ = ticks.sync.tick() => {
                    self.background_sync().await;
                    let still_active = self.client.active_work().is_some_and(|active| active.id == work.id);
                    if !still_active {
                        self.pool.cancel(work.id);
                        return SearchStep::Stale;
                    }
                }
                _ = ticks.persist.tick() => {
                    self.persist(false).await;
                }
            }
        }
    }

    fn record(
        &self,
        solved: &Solved,
        status: RecordStatus,
        block_id: String,
        reward: f64,
        transport: Option<TransportKind>,
    ) -> MiningRecord {
        MiningRecord {
            block_id,
            height: solved.work.height(),
            timestamp: Utc::now(),
            reward,
            hash_rate_at_time: self.stats.read().hash_rate,
            transport_used: transport,
            status,
            nonce: solved.candidate.nonce,
            hash: solved.candidate.hash_hex(),
            difficulty: solved.work.difficulty,
            mining_time: solved.mining_time.as_secs_f64(),
            found_by: solved.candidate.found_by,
        }
    }

    async fn store_record(&self, record: MiningRecord) -> Option<AppendOutcome> {
        let block_id = record.block_id.clone();
        match self.history.append(record).await {
            Ok(AppendOutcome::Duplicate) => {
                debug!(target: LOG_TARGET, "{}", EngineError::DuplicateBlockId { block_id });
                Some(AppendOutcome::Duplicate)
            }
            Ok(outcome) => Some(outcome),
            Err(e) => {
                self.events.error(format!("❌ Failed to record block {}: {}", block_id, e));
                None
            }
        }
    }

    async fn interpret_submission(
        &mut self,
        solved: &Solved,
        submitted: Result<SubmissionResult, EngineError>,
    ) -> (Option<CycleOutcome>, Pace) {
        let height = solved.work.height();
        match submitted {
            Ok(SubmissionResult::Accepted {
                reward,
                block_id,
                transport,
            }) => {
                let record = self.record(solved, RecordStatus::Accepted, block_id.clone(), reward, Some(transport));
                if self.store_record(record).await == Some(AppendOutcome::Inserted) {
                    self.stats.apply_delta(StatsDelta::BlockAccepted { reward });
                }
                self.stats.apply_delta(StatsDelta::CycleOutcome { success: true });
                self.stats.apply_delta(StatsDelta::Connection(ConnectionStatus::Connected));
                self.persist(true).await;
                self.events.success(format!(
                    "✅ Block #{} accepted via {} transport (id {}, reward {:.4})",
                    height,
                    transport.as_str(),
                    block_id,
                    reward
                ));
                (
                    Some(CycleOutcome::Accepted {
                        height,
                        block_id,
                        reward,
                        transport,
                    }),
                    Pace::Interval,
                )
            }
            Ok(SubmissionResult::Rejected { reason }) => {
                let record = self.record(solved, RecordStatus::Rejected, solved.candidate.local_block_id(), 0.0, None);
                self.store_record(record).await;
                self.stats.apply_delta(StatsDelta::CycleOutcome { success: false });
                self.events.warning(format!("❌ Block #{} rejected: {}", height, reason));
                (Some(CycleOutcome::Rejected { height, reason }), Pace::Interval)
            }
            Ok(SubmissionResult::DuplicateIgnored) => {
                self.events.info(format!("Block #{} was already submitted", height));
                (
                    Some(CycleOutcome::Failed {
                        reason: "duplicate submission".to_string(),
                    }),
                    Pace::Interval,
                )
            }
            Ok(SubmissionResult::TransportFailed { retryable }) => {
                self.stats.apply_delta(StatsDelta::CycleOutcome { success: false });
                if !retryable {
                    self.stats.apply_delta(StatsDelta::Connection(ConnectionStatus::Degraded));
                }
                let block = solved.work.to_block(&solved.candidate, solved.work.proposed_reward());
                match self.spool.store(&block).await {
                    Ok(path) => self.events.warning(format!(
                        "⚠️ Could not deliver block #{}; saved to {}",
                        height,
                        path.display()
                    )),
                    Err(e) => self.events.error(format!(
                        "❌ Could not deliver block #{} and could not save it: {}",
                        height, e
                    )),
                }
                self.client.retire_work(solved.work.id);
                (
                    Some(CycleOutcome::Failed {
                        reason: "node unreachable during submission".to_string(),
                    }),
                    Pace::Interval,
                )
            }
            Err(e @ EngineError::StaleWork { .. }) => {
                self.events.warning(format!("🔄 Block #{} went stale before submission", height));
                (Some(CycleOutcome::Cancelled { reason: e.to_string() }), Pace::Immediately)
            }
            Err(e) => {
                self.stats.apply_delta(StatsDelta::CycleOutcome { success: false });
                self.events.error(format!("❌ Submission of block #{} failed: {}", height, e));
                (Some(CycleOutcome::Failed { reason: e.to_string() }), Pace::Interval)
            }
        }
    }

    async fn finish(&mut self) {
        self.pool.cancel_all();
        self.auto_running = false;
        self.shared.auto_running.store(false, Ordering::Release);
        for waiter in self.single_waiters.drain(..) {
            let _ = waiter.send(Err(EngineError::Shutdown));
        }
        self.set_state(SchedulerState::Stopped);
        self.events.info("👋 Mining engine shut down");
        self.persist(true).await;

        for waiter in self.stop_waiters.drain(..) {
            let _ = waiter.send(());
        }
        if let Some(waiter) = self.shutdown_waiter.take() {
            let _ = waiter.send(());
        }
    }
}


// Changelog:
// - v1.1.0 (2025-07-09): The auto_mining setting now drives the loop.
//   - Launch starts auto-mining when it is set.
//   - Reconfigure starts or stops the loop when the flag changes.
// - v1.0.0 (2025-07-02): Initial auto-mining scheduler.
