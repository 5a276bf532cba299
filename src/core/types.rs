// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/core/types.rs
// Version: 2.0.0-engine
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file defines core data structures for the Luna miner, located in the
// core subdirectory. It includes work units, candidates, submission results,
// mining records and the block documents exchanged with the node.
//
// Tree Location:
// - src/core/types.rs (core data structures)
// - Depends on: serde, chrono, core::difficulty, core::hashing

use crate::core::difficulty::{U256, difficulty_to_target};
use crate::core::hashing::{PrefixHasher, block_preimage_prefix};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;

/// Identity of an issued work unit: the height it mines plus the issue sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkUnitId {
    pub height: u64,
    pub seq: u64,
}

impl fmt::Display for WorkUnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.height, self.seq)
    }
}

/// Raw block template as reported by the node (before the client issues it)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkTemplate {
    /// Height of the block to mine (latest index + 1)
    pub height: u64,

    /// Hash of the latest block on the node
    pub previous_hash: String,

    /// Difficulty the node expects, in leading zero nibbles
    pub difficulty: u32,

    /// Block timestamp (unix seconds, float on the wire)
    pub timestamp: f64,

    /// Transactions to include, opaque to the miner
    #[serde(default)]
    pub transactions: Vec<Value>,
}

/// A unit of mining work at a given network height/difficulty. Immutable once issued.
#[derive(Debug, Clone)]
pub struct WorkUnit {
    pub id: WorkUnitId,
    pub difficulty: u32,
    pub target: U256,
    pub previous_hash: String,
    pub timestamp: f64,
    pub transactions: Vec<Value>,
    pub miner_address: String,
    pub issued_at: DateTime<Utc>,
    preimage_prefix: Arc<Vec<u8>>,
}

impl WorkUnit {
    pub fn new(id: WorkUnitId, template: WorkTemplate, miner_address: String) -> Self {
        let preimage_prefix = block_preimage_prefix(
            id.height,
            &template.previous_hash,
            template.timestamp,
            &template.transactions,
        );
        Self {
            id,
            difficulty: template.difficulty,
            target: difficulty_to_target(template.difficulty),
            previous_hash: template.previous_hash,
            timestamp: template.timestamp,
            transactions: template.transactions,
            miner_address,
            issued_at: Utc::now(),
            preimage_prefix: Arc::new(preimage_prefix),
        }
    }

    pub fn height(&self) -> u64 {
        self.id.height
    }

    /// Constant bytes hashed before the nonce
    pub fn preimage_prefix(&self) -> &[u8] {
        &self.preimage_prefix
    }

    pub fn hasher(&self) -> PrefixHasher {
        PrefixHasher::new(&self.preimage_prefix)
    }

    /// Reward proposed by the template: reward amounts, fees and bill
    /// denominations, with a floor of 1.0 for empty blocks.
    pub fn proposed_reward(&self) -> f64 {
        let total: f64 = self
            .transactions
            .iter()
            .map(|tx| {
                let field = match tx.get("type").and_then(|t| t.as_str()) {
                    Some("reward") => "amount",
                    Some("transaction") => "fee",
                    Some("genesis_bill") => "denomination",
                    _ => return 0.0,
                };
                tx.get(field).and_then(|v| v.as_f64()).unwrap_or(0.0)
            })
            .sum();
        if total == 0.0 { 1.0 } else { total }
    }

    /// Block document submitted to the node once a nonce is found
    pub fn to_block(&self, candidate: &Candidate, reward: f64) -> BlockSubmission {
        BlockSubmission {
            index: self.id.height,
            previous_hash: self.previous_hash.clone(),
            timestamp: self.timestamp,
            transactions: self.transactions.clone(),
            miner: self.miner_address.clone(),
            difficulty: self.difficulty,
            nonce: candidate.nonce,
            reward,
            hash: candidate.hash_hex(),
        }
    }
}

/// Which search path produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearcherKind {
    Cpu,
    Gpu,
}

impl SearcherKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SearcherKind::Cpu => "cpu",
            SearcherKind::Gpu => "gpu",
        }
    }
}

/// A discovered nonce/hash pair believed to satisfy the current difficulty
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub work_unit: WorkUnitId,
    pub nonce: u64,
    pub hash: [u8; 32],
    pub found_at: DateTime<Utc>,
    pub found_by: SearcherKind,
}

impl Candidate {
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    /// Submission dedup key
    pub fn dedup_key(&self) -> (u64, u64) {
        (self.work_unit.height, self.nonce)
    }

    /// Block id used when the node does not name the block: `{height}-{hash prefix}`
    pub fn local_block_id(&self) -> String {
        let hash = self.hash_hex();
        format!("{}-{}", self.work_unit.height, &hash[..16])
    }
}

/// Which transport carried a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    Rich,
    Plain,
}

impl TransportKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Rich => "rich",
            TransportKind::Plain => "plain",
        }
    }
}

/// Outcome of submitting a candidate
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionResult {
    Accepted {
        reward: f64,
        block_id: String,
        transport: TransportKind,
    },
    Rejected {
        reason: String,
    },
    DuplicateIgnored,
    TransportFailed {
        retryable: bool,
    },
}

/// Block document posted to the node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockSubmission {
    pub index: u64,
    pub previous_hash: String,
    pub timestamp: f64,
    pub transactions: Vec<Value>,
    pub miner: String,
    pub difficulty: u32,
    pub nonce: u64,
    pub reward: f64,
    pub hash: String,
}

/// Node verdict on a submitted block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitReply {
    pub success: bool,

    #[serde(default)]
    pub block_id: Option<String>,

    #[serde(default)]
    pub reward: Option<f64>,

    #[serde(default)]
    pub message: Option<String>,
}

/// Network state returned by a sync call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkStatus {
    pub network_height: u64,
    pub difficulty: u32,
    #[serde(default)]
    pub mempool_size: u64,
    #[serde(default)]
    pub peer_count: u64,
}

/// Status of a stored mining record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Accepted,
    Rejected,
}

/// Persisted record of a submitted block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiningRecord {
    pub block_id: String,
    pub height: u64,
    pub timestamp: DateTime<Utc>,
    pub reward: f64,
    pub hash_rate_at_time: f64,
    pub transport_used: Option<TransportKind>,
    pub status: RecordStatus,
    pub nonce: u64,
    pub hash: String,
    pub difficulty: u32,
    /// Seconds spent searching
    pub mining_time: f64,
    pub found_by: SearcherKind,
}

/// Reward transaction added when the mempool is empty
pub fn empty_block_reward_tx(miner_address: &str, height: u64, timestamp: f64) -> Value {
    json!({
        "type": "reward",
        "from": "network",
        "to": miner_address,
        "amount": 1.0,
        "timestamp": timestamp,
        "block_height": height,
        "hash": format!("reward_{}_{}", height, timestamp as u64),
        "description": "Empty block mining reward"
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(transactions: Vec<Value>) -> WorkTemplate {
        WorkTemplate {
            height: 10,
            previous_hash: "ab".repeat(32),
            difficulty: 3,
            timestamp: 1700000000.25,
            transactions,
        }
    }

    #[test]
    fn test_proposed_reward_sums_known_transaction_types() {
        let unit = WorkUnit::new(
            WorkUnitId { height: 10, seq: 1 },
            template(vec![
                json!({"type": "transaction", "fee": 0.5, "amount": 100.0}),
                json!({"type": "genesis_bill", "denomination": 20.0}),
                json!({"type": "reward", "amount": 2.0}),
                json!({"type": "unknown", "amount": 999.0}),
            ]),
            "LUN_miner".to_string(),
        );
        assert_eq!(unit.proposed_reward(), 22.5);
    }

    #[test]
    fn test_empty_template_has_floor_reward() {
        let unit = WorkUnit::new(WorkUnitId { height: 10, seq: 1 }, template(vec![]), "m".to_string());
        assert_eq!(unit.proposed_reward(), 1.0);
    }

    #[test]
    fn test_block_document_carries_candidate() {
        let unit = WorkUnit::new(WorkUnitId { height: 10, seq: 2 }, template(vec![]), "m".to_string());
        let candidate = Candidate {
            work_unit: unit.id,
            nonce: 77,
            hash: unit.hasher().hash_nonce(77),
            found_at: Utc::now(),
            found_by: SearcherKind::Cpu,
        };
        let block = unit.to_block(&candidate, 1.0);
        assert_eq!(block.index, 10);
        assert_eq!(block.nonce, 77);
        assert_eq!(block.hash.len(), 64);
        assert_eq!(candidate.dedup_key(), (10, 77));
    }
}

// Changelog:
// - v2.0.0-engine (2025-07-02): Rewritten for the Luna engine.
//   - Replaced PoolJob/MiningJob/Share with WorkTemplate/WorkUnit/Candidate.
//   - Added SubmissionResult, MiningRecord, NetworkStatus and block documents.
//   - Moved command-line arguments to src/core/config.rs.
// - v1.1.1-web (2025-06-22): Added web dashboard support.
