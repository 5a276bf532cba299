// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/engine/mod.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file is the entry point of the mining engine, located in the engine
// subdirectory. `Engine` is the control surface: it launches the scheduler
// task and exposes its commands, state, statistics, history and event feed.
//
// Tree Location:
// - src/engine/mod.rs (Engine handle and builder)
// - Submodules: events, scheduler, spool

pub mod events;
pub mod scheduler;
pub mod spool;

pub use events::{EngineEvent, EventLevel, EventLog};
pub use scheduler::{CycleOutcome, SchedulerState};
pub use spool::BlockSpool;

use crate::core::config::EngineConfig;
use crate::core::error::EngineError;
use crate::core::types::NetworkStatus;
use crate::history::{HistoryFilter, HistoryQuery, HistoryStore};
use crate::miner::{HashRateMeter, HashWorkerPool, Searcher};
use crate::node::NodeTransport;
use crate::stats::{SnapshotFile, StatsCache, StatsDelta, StatsSnapshot};
use log::info;
use parking_lot::Mutex;
use scheduler::{ClientSource, Command, Scheduler, SchedulerParts, Shared};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

static LOG_TARGET: &str = "luna::miner::engine";

const COMMAND_CAPACITY: usize = 32;

/// Combined view for status displays
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub state: SchedulerState,
    pub stats: StatsSnapshot,
    /// Seconds per solved block this session
    pub average_mining_time: f64,
    pub total_attempts: u64,
    pub difficulty: u32,
    pub auto_mining: bool,
    pub miner_address: String,
    pub node_url: String,
    pub search_method: &'static str,
}

/// Builds an engine; transports and searchers can be swapped for tests or embedders
pub struct EngineBuilder {
    config: EngineConfig,
    transports: Option<Vec<Arc<dyn NodeTransport>>>,
    searchers: Option<(Arc<dyn Searcher>, Option<Arc<dyn Searcher>>)>,
}

impl EngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            transports: None,
            searchers: None,
        }
    }

    /// Use these transports, in order, instead of the ones named by `node_url`
    pub fn transports(mut self, transports: Vec<Arc<dyn NodeTransport>>) -> Self {
        self.transports = Some(transports);
        self
    }

    pub fn searchers(mut self, cpu: Arc<dyn Searcher>, gpu: Option<Arc<dyn Searcher>>) -> Self {
        self.searchers = Some((cpu, gpu));
        self
    }

    /// Restore persisted state and spawn the scheduler task
    pub async fn launch(self) -> Result<Engine, EngineError> {
        let config = self.config;
        let data_dir = config.data_dir.clone();

        let history = Arc::new(HistoryStore::open(&data_dir).await?);
        let stats = Arc::new(StatsCache::seeded(SnapshotFile::new(&data_dir).load_or_default().await));
        let totals = history.totals();
        stats.apply_delta(StatsDelta::Totals {
            blocks_mined: totals.blocks_mined,
            total_rewards: totals.total_rewards,
        });
        let events = Arc::new(EventLog::load(&data_dir).await);

        let meter = Arc::new(HashRateMeter::default());
        let pool = Arc::new(match self.searchers {
            Some((cpu, gpu)) => HashWorkerPool::with_searchers(meter, cpu, gpu),
            None => HashWorkerPool::new(meter),
        });
        let client_source = match self.transports {
            Some(transports) => ClientSource::Transports(transports),
            None => ClientSource::FromConfig,
        };

        let shared = Arc::new(Shared::new(config.clone()));
        let (commands, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (state_tx, state) = watch::channel(SchedulerState::Idle);

        let scheduler = Scheduler::new(SchedulerParts {
            config,
            client_source,
            pool: Arc::clone(&pool),
            stats: Arc::clone(&stats),
            history: Arc::clone(&history),
            events: Arc::clone(&events),
            shared: Arc::clone(&shared),
            commands: command_rx,
            state: state_tx,
        });
        let task = tokio::spawn(scheduler.run());

        info!(target: LOG_TARGET,
            "Engine launched: {} block(s) mined so far, {:.4} total rewards",
            totals.blocks_mined, totals.total_rewards
        );

        Ok(Engine {
            commands,
            state,
            stats,
            history,
            events,
            pool,
            shared,
            task: Mutex::new(Some(task)),
        })
    }
}

pub struct Engine {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<SchedulerState>,
    stats: Arc<StatsCache>,
    history: Arc<HistoryStore>,
    events: Arc<EventLog>,
    pool: Arc<HashWorkerPool>,
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Engine {
    pub async fn launch(config: EngineConfig) -> Result<Self, EngineError> {
        EngineBuilder::new(config).launch().await
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, EngineError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| EngineError::Shutdown)?;
        response.await.map_err(|_| EngineError::Shutdown)
    }

    /// Begin auto-mining; fails with `ConfigInvalid` without touching the network
    pub async fn start(&self) -> Result<(), EngineError> {
        self.request(|reply| Command::Start { reply }).await?
    }

    /// Stop mining. Once this returns no candidate of the stopped search is submitted.
    pub async fn stop(&self) -> Result<(), EngineError> {
        self.request(|reply| Command::Stop { reply }).await
    }

    /// Mine one block and report how the cycle ended
    pub async fn single_block(&self) -> Result<CycleOutcome, EngineError> {
        self.request(|reply| Command::SingleBlock { reply }).await?
    }

    pub async fn sync(&self) -> Result<NetworkStatus, EngineError> {
        self.request(|reply| Command::Sync { reply }).await?
    }

    /// Validate and save new settings; they apply before the next cycle
    pub async fn reconfigure(&self, config: EngineConfig) -> Result<(), EngineError> {
        self.request(|reply| Command::Reconfigure {
            config: Box::new(config),
            reply,
        })
        .await?
    }

    /// Stop the scheduler, persist state and wait for the task to end
    pub async fn shutdown(&self) -> Result<(), EngineError> {
        let acknowledged = self.request(|reply| Command::Shutdown { reply }).await;
        let task = self.task.lock().take();
        if let Some(task) = task {
            let _ = task.await;
        }
        acknowledged
    }

    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<SchedulerState> {
        self.state.clone()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.read()
    }

    pub fn config(&self) -> EngineConfig {
        self.shared.config.read().clone()
    }

    /// Newest records first
    pub fn recent_records(&self, limit: usize) -> HistoryQuery {
        self.history.query(HistoryFilter::recent(limit))
    }

    pub fn history(&self, filter: HistoryFilter) -> HistoryQuery {
        self.history.query(filter)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub fn recent_events(&self, limit: usize) -> Vec<EngineEvent> {
        self.events.recent(limit)
    }

    pub fn status(&self) -> StatusReport {
        let config = self.shared.config.read().clone();
        let (average_mining_time, total_attempts) = {
            let session = self.shared.session.lock();
            (session.average_mining_time(), session.attempts)
        };
        StatusReport {
            state: self.state(),
            stats: self.stats.read(),
            average_mining_time,
            total_attempts,
            difficulty: config.difficulty_hint,
            auto_mining: self.shared.auto_running.load(Ordering::Acquire),
            search_method: self.pool.search_method(config.gpu_enabled),
            miner_address: config.miner_address,
            node_url: config.node_url,
        }
    }
}

// Changelog:
// - v1.0.0 (2025-07-02): Initial engine handle.
