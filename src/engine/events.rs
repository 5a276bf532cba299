// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/engine/events.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file implements the engine event feed of the Luna miner, located in the
// engine subdirectory. Events are published on a broadcast channel for log
// viewers, mirrored into the `log` facade, kept in a bounded ring and saved to
// `{data_dir}/logs.json` so a viewer can reopen earlier history.
//
// Tree Location:
// - src/engine/events.rs (engine event log)
// - Depends on: tokio (broadcast, fs), parking_lot, chrono, serde_json

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::fs;
use tokio::sync::broadcast;

static LOG_TARGET: &str = "luna::miner::engine::events";

pub const EVENTS_FILE_NAME: &str = "logs.json";

/// Entries kept in memory and on disk
pub const MAX_EVENTS: usize = 1000;

const BROADCAST_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl EventLevel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventLevel::Info => "info",
            EventLevel::Success => "success",
            EventLevel::Warning => "warning",
            EventLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineEvent {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    #[serde(rename = "type")]
    pub level: EventLevel,
}

pub struct EventLog {
    file_path: PathBuf,
    ring: Mutex<VecDeque<EngineEvent>>,
    sender: broadcast::Sender<EngineEvent>,
    dirty: AtomicBool,
}

impl EventLog {
    pub fn new(data_dir: &Path) -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            file_path: data_dir.join(EVENTS_FILE_NAME),
            ring: Mutex::new(VecDeque::with_capacity(MAX_EVENTS)),
            sender,
            dirty: AtomicBool::new(false),
        }
    }

    /// Reopen the saved feed; an unreadable file starts an empty one
    pub async fn load(data_dir: &Path) -> Self {
        let log = Self::new(data_dir);
        match fs::read_to_string(&log.file_path).await {
            Ok(contents) => match serde_json::from_str::<Vec<EngineEvent>>(&contents) {
                Ok(events) => {
                    let mut ring = log.ring.lock();
                    let skip = events.len().saturating_sub(MAX_EVENTS);
                    ring.extend(events.into_iter().skip(skip));
                    debug!(target: LOG_TARGET, "Restored {} events from {:?}", ring.len(), log.file_path);
                }
                Err(e) => {
                    warn!(target: LOG_TARGET, "⚠️ Ignoring unreadable event log {:?}: {}", log.file_path, e);
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(target: LOG_TARGET, "⚠️ Cannot read event log {:?}: {}", log.file_path, e);
            }
        }
        log
    }

    pub fn emit(&self, level: EventLevel, message: impl Into<String>) {
        let event = EngineEvent {
            timestamp: Utc::now(),
            message: message.into(),
            level,
        };

        match level {
            EventLevel::Info | EventLevel::Success => info!(target: LOG_TARGET, "{}", event.message),
            EventLevel::Warning => warn!(target: LOG_TARGET, "{}", event.message),
            EventLevel::Error => error!(target: LOG_TARGET, "{}", event.message),
        }

        {
            let mut ring = self.ring.lock();
            if ring.len() == MAX_EVENTS {
                ring.pop_front();
            }
            ring.push_back(event.clone());
        }
        self.dirty.store(true, Ordering::Release);

        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(EventLevel::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.emit(EventLevel::Success, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.emit(EventLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(EventLevel::Error, message);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    /// The newest `limit` events, oldest first
    pub fn recent(&self, limit: usize) -> Vec<EngineEvent> {
        let ring = self.ring.lock();
        let skip = ring.len().saturating_sub(limit);
        ring.iter().skip(skip).cloned().collect()
    }

    pub async fn persist_if_dirty(&self) -> std::io::Result<bool> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(false);
        }
        let events: Vec<EngineEvent> = self.ring.lock().iter().cloned().collect();
        let result: std::io::Result<()> = async {
            let contents = serde_json::to_vec_pretty(&events)?;
            if let Some(parent) = self.file_path.parent() {
                fs::create_dir_all(parent).await?;
            }
            let temp_path = self.file_path.with_extension("tmp");
            fs::write(&temp_path, contents).await?;
            fs::rename(&temp_path, &self.file_path).await
        }
        .await;

        if result.is_err() {
            self.dirty.store(true, Ordering::Release);
        }
        result.map(|_| true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_is_bounded() {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::new(dir.path());
        for i in 0..(MAX_EVENTS + 5) {
            log.info(format!("event {}", i));
        }
        let recent = log.recent(usize::MAX);
        assert_eq!(recent.len(), MAX_EVENTS);
        assert_eq!(recent[0].message, "event 5");
        assert_eq!(log.recent(1)[0].message, format!("event {}", MAX_EVENTS + 4));
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::new(dir.path());
        let mut rx = log.subscribe();
        log.success("Block #3 accepted");
        let event = rx.recv().await.unwrap();
        assert_eq!(event.level, EventLevel::Success);
        assert_eq!(event.message, "Block #3 accepted");
    }

    #[tokio::test]
    async fn test_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let log = EventLog::new(dir.path());
        log.warning("node slow");
        assert!(log.persist_if_dirty().await.unwrap());
        assert!(!log.persist_if_dirty().await.unwrap());

        let raw = std::fs::read_to_string(dir.path().join(EVENTS_FILE_NAME)).unwrap();
        assert!(raw.contains("\"type\": \"warning\""));

        let reloaded = EventLog::load(dir.path()).await;
        assert_eq!(reloaded.recent(10).len(), 1);
        assert_eq!(reloaded.recent(10)[0].message, "node slow");
    }
}

// Changelog:
// - v1.0.0 (2025-07-02): Initial engine event feed with logs.json persistence.
