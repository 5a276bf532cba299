// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/history/store.rs
// Version: 1.1.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file implements the mining history store of the Luna miner, located in
// the history subdirectory. Records are appended as JSON lines to
// `{data_dir}/mining_history.jsonl`. A single writer owns the file; readers
// work on an immutable snapshot of the records and never block appends.
//
// Tree Location:
// - src/history/store.rs (append-only mining history)
// - Depends on: serde_json, thiserror, tokio, parking_lot, core::types

use crate::core::error::EngineError;
use crate::core::types::{MiningRecord, RecordStatus};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

static LOG_TARGET: &str = "luna::miner::history";

pub const HISTORY_FILE_NAME: &str = "mining_history.jsonl";

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Failed to serialize mining record")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("IO operation failed on {path:?}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<HistoryError> for EngineError {
    fn from(err: HistoryError) -> Self {
        let path = match &err {
            HistoryError::IoError { path, .. } => path.clone(),
            HistoryError::SerializationError { .. } => PathBuf::from(HISTORY_FILE_NAME),
        };
        EngineError::CorruptPersistedState {
            path,
            message: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Inserted,
    /// The block_id was already stored; nothing was written
    Duplicate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HistoryTotals {
    pub blocks_mined: u64,
    pub total_rewards: f64,
    pub rejected: u64,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub status: Option<RecordStatus>,
    pub limit: Option<usize>,
    pub newest_first: bool,
}

impl HistoryFilter {
    pub fn recent(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            newest_first: true,
            ..Default::default()
        }
    }

    fn matches(&self, record: &MiningRecord) -> bool {
        self.from.is_none_or(|from| record.timestamp >= from)
            && self.to.is_none_or(|to| record.timestamp <= to)
            && self.status.is_none_or(|status| record.status == status)
    }
}

/// Lazy view over a snapshot of the history. `restart` rewinds it.
#[derive(Debug, Clone)]
pub struct HistoryQuery {
    records: Arc<Vec<MiningRecord>>,
    filter: HistoryFilter,
    position: usize,
    yielded: usize,
}

impl HistoryQuery {
    pub fn restart(&mut self) {
        self.position = 0;
        self.yielded = 0;
    }
}

impl Iterator for HistoryQuery {
    type Item = MiningRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.filter.limit.is_some_and(|limit| self.yielded >= limit) {
            return None;
        }
        while self.position < self.records.len() {
            let index = if self.filter.newest_first {
                self.records.len() - 1 - self.position
            } else {
                self.position
            };
            self.position += 1;
            let record = &self.records[index];
            if self.filter.matches(record) {
                self.yielded += 1;
                return Some(record.clone());
            }
        }
        None
    }
}

struct HistoryWriter {
    file: File,
    block_ids: HashSet<String>,
    /// File length up to the last complete record
    committed_len: u64,
    /// Set when a torn line could not be truncated away
    needs_newline: bool,
}

impl HistoryWriter {
    async fn write_line(&mut self, line: &[u8]) -> std::io::Result<()> {
        self.file.write_all(line).await?;
        self.file.flush().await
    }

    /// Cut the file back to the last complete record after a failed write
    async fn discard_partial_write(&mut self, path: &Path) {
        if let Err(e) = self.file.set_len(self.committed_len).await {
            warn!(target: LOG_TARGET,
                "⚠️ Cannot truncate partial record in {:?}: {}; fencing it off", path, e
            );
            self.needs_newline = true;
        }
    }
}

pub struct HistoryStore {
    file_path: PathBuf,
    writer: Mutex<HistoryWriter>,
    records: RwLock<Arc<Vec<MiningRecord>>>,
}

impl HistoryStore {
    /// Open (or create) the history file, dropping records that cannot be parsed
    pub async fn open(data_dir: &Path) -> Result<Self, HistoryError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| HistoryError::IoError { path, source }
        };

        fs::create_dir_all(data_dir).await.map_err(io_err(data_dir))?;
        let file_path = data_dir.join(HISTORY_FILE_NAME);

        let raw = match fs::read(&file_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(io_err(&file_path)(e)),
        };

        let loaded = parse_lines(&raw, &file_path);

        if let Some(valid_len) = loaded.truncate_to {
            warn!(target: LOG_TARGET,
                "⚠️ Discarding corrupt trailing record in {:?} ({} bytes)",
                file_path,
                raw.len() as u64 - valid_len
            );
            let file = OpenOptions::new()
                .write(true)
                .open(&file_path)
                .await
                .map_err(io_err(&file_path))?;
            file.set_len(valid_len).await.map_err(io_err(&file_path))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file_path)
            .await
            .map_err(io_err(&file_path))?;

        if loaded.needs_newline {
            file.write_all(b"\n").await.map_err(io_err(&file_path))?;
            file.flush().await.map_err(io_err(&file_path))?;
        }
        let committed_len = file.metadata().await.map_err(io_err(&file_path))?.len();

        let block_ids = loaded.records.iter().map(|r| r.block_id.clone()).collect();
        info!(target: LOG_TARGET, "📚 Loaded {} mining records from {:?}", loaded.records.len(), file_path);

        Ok(Self {
            file_path,
            writer: Mutex::new(HistoryWriter {
                file,
                block_ids,
                committed_len,
                needs_newline: false,
            }),
            records: RwLock::new(Arc::new(loaded.records)),
        })
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Append a record; an existing block_id is a successful no-op
    pub async fn append(&self, record: MiningRecord) -> Result<AppendOutcome, HistoryError> {
        let mut writer = self.writer.lock().await;
        if writer.block_ids.contains(&record.block_id) {
            debug!(target: LOG_TARGET, "Record {} already stored", record.block_id);
            return Ok(AppendOutcome::Duplicate);
        }

        let mut line = Vec::new();
        if writer.needs_newline {
            line.push(b'\n');
        }
        serde_json::to_writer(&mut line, &record)?;
        line.push(b'\n');

        if let Err(source) = writer.write_line(&line).await {
            writer.discard_partial_write(&self.file_path).await;
            return Err(HistoryError::IoError {
                path: self.file_path.clone(),
                source,
            });
        }
        writer.committed_len += line.len() as u64;
        writer.needs_newline = false;

        writer.block_ids.insert(record.block_id.clone());
        Arc::make_mut(&mut *self.records.write()).push(record);
        Ok(AppendOutcome::Inserted)
    }

    pub fn query(&self, filter: HistoryFilter) -> HistoryQuery {
        HistoryQuery {
            records: self.records.read().clone(),
            filter,
            position: 0,
            yielded: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Totals over accepted records; the store is their source of truth
    pub fn totals(&self) -> HistoryTotals {
        let records = self.records.read().clone();
        records.iter().fold(HistoryTotals::default(), |mut totals, record| {
            match record.status {
                RecordStatus::Accepted => {
                    totals.blocks_mined += 1;
                    totals.total_rewards += record.reward;
                }
                RecordStatus::Rejected => totals.rejected += 1,
            }
            totals
        })
    }
}

struct LoadedHistory {
    records: Vec<MiningRecord>,
    /// Length to cut the file back to when the last line is corrupt
    truncate_to: Option<u64>,
    needs_newline: bool,
}

fn parse_lines(raw: &[u8], path: &Path) -> LoadedHistory {
    let mut records = Vec::new();
    let mut seen = HashSet::new();
    let mut truncate_to = None;
    let mut offset = 0usize;

    let lines: Vec<&[u8]> = raw.split(|b| *b == b'\n').collect();
    let last_content = lines.iter().rposition(|line| !line.iter().all(u8::is_ascii_whitespace));

    for (index, line) in lines.iter().enumerate() {
        let start = offset;
        offset += line.len() + 1;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<MiningRecord>(line) {
            Ok(record) => {
                if seen.insert(record.block_id.clone()) {
                    records.push(record);
                } else {
                    debug!(target: LOG_TARGET, "Skipping repeated block_id {} in {:?}", record.block_id, path);
                }
            }
            Err(e) if Some(index) == last_content => {
                debug!(target: LOG_TARGET, "Corrupt trailing record in {:?}: {}", path, e);
                truncate_to = Some(start as u64);
            }
            Err(e) => {
                warn!(target: LOG_TARGET, "⚠️ Skipping corrupt record on line {} of {:?}: {}", index + 1, path, e);
            }
        }
    }

    let needs_newline = truncate_to.is_none() && raw.last().is_some_and(|b| *b != b'\n');
    LoadedHistory {
        records,
        truncate_to,
        needs_newline,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SearcherKind;
    use chrono::TimeZone;

    fn record(block_id: &str, status: RecordStatus, reward: f64, minute: u32) -> MiningRecord {
        MiningRecord {
            block_id: block_id.to_string(),
            height: 1,
            timestamp: Utc.with_ymd_and_hms(2025, 7, 1, 12, minute, 0).unwrap(),
            reward,
            hash_rate_at_time: 1000.0,
            transport_used: None,
            status,
            nonce: 7,
            hash: "00ab".to_string(),
            difficulty: 2,
            mining_time: 1.5,
            found_by: SearcherKind::Cpu,
        }
    }

    #[tokio::test]
    async fn test_append_is_idempotent_by_block_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::open(dir.path()).await.unwrap();

        let first = record("1-aa", RecordStatus::Accepted, 5.0, 0);
        assert_eq!(store.append(first.clone()).await.unwrap(), AppendOutcome::Inserted);
        assert_eq!(store.append(first).await.unwrap(), AppendOutcome::Duplicate);
        assert_eq!(store.totals().blocks_mined, 1);
        assert_eq!(store.totals().total_rewards, 5.0);
    }

    #[tokio::test]
    async fn test_partial_write_is_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::open(dir.path()).await.unwrap();
        store.append(record("1-aa", RecordStatus::Accepted, 5.0, 0)).await.unwrap();
        {
            let mut writer = store.writer.lock().await;
            writer.write_line(b"{\"block_id\":\"2-ha").await.unwrap();
            writer.discard_partial_write(store.file_path()).await;
            assert!(!writer.needs_newline);
        }
        store.append(record("3-cc", RecordStatus::Accepted, 1.0, 2)).await.unwrap();

        let raw = fs::read_to_string(store.file_path()).await.unwrap();
        assert_eq!(raw.lines().count(), 2);
        assert!(raw.lines().all(|line| serde_json::from_str::<MiningRecord>(line).is_ok()));
    }

    #[tokio::test]
    async fn test_unremovable_partial_line_is_fenced_off() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = HistoryStore::open(dir.path()).await.unwrap();
            store.append(record("1-aa", RecordStatus::Accepted, 5.0, 0)).await.unwrap();
            {
                // Torn line left behind with truncation unavailable
                let mut writer = store.writer.lock().await;
                writer.write_line(b"{\"block_id\":\"2-ha").await.unwrap();
                writer.needs_newline = true;
            }
            store.append(record("3-cc", RecordStatus::Accepted, 1.0, 2)).await.unwrap();
        }

        let store = HistoryStore::open(dir.path()).await.unwrap();
        let ids: Vec<String> = store.query(HistoryFilter::default()).map(|r| r.block_id).collect();
        assert_eq!(ids, vec!["1-aa".to_string(), "3-cc".to_string()]);
    }

    #[tokio::test]
    async fn test_reopen_restores_records() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = HistoryStore::open(dir.path()).await.unwrap();
            store.append(record("1-aa", RecordStatus::Accepted, 5.0, 0)).await.unwrap();
            store.append(record("2-bb", RecordStatus::Rejected, 0.0, 1)).await.unwrap();
        }
        let store = HistoryStore::open(dir.path()).await.unwrap();
        assert_eq!(store.len(), 2);
        let totals = store.totals();
        assert_eq!(totals.blocks_mined, 1);
        assert_eq!(totals.rejected, 1);
        assert_eq!(
            store.append(record("1-aa", RecordStatus::Accepted, 5.0, 0)).await.unwrap(),
            AppendOutcome::Duplicate
        );
    }

    #[tokio::test]
    async fn test_corrupt_tail_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let good = serde_json::to_string(&record("1-aa", RecordStatus::Accepted, 5.0, 0)).unwrap();
        let path = dir.path().join(HISTORY_FILE_NAME);
        std::fs::write(&path, format!("{}\n{{\"block_id\": \"2-b", good)).unwrap();

        let store = HistoryStore::open(dir.path()).await.unwrap();
        assert_eq!(store.len(), 1);
        store.append(record("3-cc", RecordStatus::Accepted, 1.0, 2)).await.unwrap();
        drop(store);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.lines().all(|l| serde_json::from_str::<MiningRecord>(l).is_ok()));
    }

    #[tokio::test]
    async fn test_corrupt_middle_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let a = serde_json::to_string(&record("1-aa", RecordStatus::Accepted, 5.0, 0)).unwrap();
        let b = serde_json::to_string(&record("2-bb", RecordStatus::Accepted, 3.0, 1)).unwrap();
        std::fs::write(dir.path().join(HISTORY_FILE_NAME), format!("{}\nnot json\n{}", a, b)).unwrap();

        let store = HistoryStore::open(dir.path()).await.unwrap();
        assert_eq!(store.totals().blocks_mined, 2);
        store.append(record("4-dd", RecordStatus::Accepted, 1.0, 3)).await.unwrap();
        drop(store);

        let reopened = HistoryStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.len(), 3);
    }

    #[tokio::test]
    async fn test_query_filters_and_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::open(dir.path()).await.unwrap();
        for (i, status) in [RecordStatus::Accepted, RecordStatus::Rejected, RecordStatus::Accepted]
            .into_iter()
            .enumerate()
        {
            store.append(record(&format!("{}-x", i), status, 1.0, i as u32)).await.unwrap();
        }

        let mut accepted = store.query(HistoryFilter {
            status: Some(RecordStatus::Accepted),
            ..Default::default()
        });
        let ids: Vec<String> = accepted.by_ref().map(|r| r.block_id).collect();
        assert_eq!(ids, vec!["0-x", "2-x"]);
        accepted.restart();
        assert_eq!(accepted.count(), 2);

        let recent: Vec<String> = store.query(HistoryFilter::recent(2)).map(|r| r.block_id).collect();
        assert_eq!(recent, vec!["2-x", "1-x"]);

        let windowed = store.query(HistoryFilter {
            from: Some(Utc.with_ymd_and_hms(2025, 7, 1, 12, 1, 0).unwrap()),
            to: Some(Utc.with_ymd_and_hms(2025, 7, 1, 12, 1, 30).unwrap()),
            ..Default::default()
        });
        assert_eq!(windowed.map(|r| r.block_id).collect::<Vec<_>>(), vec!["1-x"]);
    }
}

// Changelog:
// - v1.1.0 (2025-07-09): Failed appends no longer leave a torn line for the next record.
//   - The file is truncated back to the last complete record.
//   - If truncation fails, the next record starts on a fresh line.
// - v1.0.0 (2025-07-02): Initial JSON-lines mining history store.
