// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/node/messages.rs
// Version: 2.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// This file defines the documents exchanged with a Luna node, located in the
// node subdirectory. It builds the JSON-RPC requests of the plain fallback,
// parses their responses, and decodes the REST documents of the rich client.
//
// Tree Location:
// - src/node/messages.rs (wire documents)
// - Depends on: serde, serde_json, chrono, node::transport

use crate::core::types::{BlockSubmission, NetworkStatus, WorkTemplate};
use crate::node::transport::TransportError;
use chrono::Utc;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};

const LOG_TARGET: &str = "luna::miner::node::messages";

pub const METHOD_GET_WORK: &str = "get_work";
pub const METHOD_SUBMIT_BLOCK: &str = "submit_block";
pub const METHOD_SYNC_STATUS: &str = "sync_status";

/// Latest block as reported by `GET /blockchain/latest`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestBlock {
    pub index: u64,
    pub hash: String,
    #[serde(default)]
    pub difficulty: Option<u32>,
}

/// `GET /mempool` answers either a bare list or `{"transactions": [...]}`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MempoolDocument {
    List(Vec<Value>),
    Wrapped { transactions: Vec<Value> },
}

impl MempoolDocument {
    pub fn into_transactions(self) -> Vec<Value> {
        match self {
            MempoolDocument::List(txs) | MempoolDocument::Wrapped { transactions: txs } => txs,
        }
    }
}

/// Current time as float unix seconds, the way the node stamps blocks
pub fn unix_timestamp_now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Template for the block after `latest`
pub fn template_from_latest(latest: LatestBlock, transactions: Vec<Value>) -> WorkTemplate {
    WorkTemplate {
        height: latest.index + 1,
        previous_hash: latest.hash,
        difficulty: latest.difficulty.unwrap_or(0),
        timestamp: unix_timestamp_now(),
        transactions,
    }
}

/// Constructs JSON-RPC 2.0 documents for the plain fallback
pub struct RpcProtocol {
    next_id: AtomicU64,
}

impl RpcProtocol {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    fn request(&self, method: &str, params: Value) -> Value {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        })
    }

    pub fn get_work_request(&self) -> Value {
        self.request(METHOD_GET_WORK, json!({}))
    }

    pub fn submit_block_request(&self, block: &BlockSubmission) -> Value {
        self.request(METHOD_SUBMIT_BLOCK, json!({ "block": block }))
    }

    pub fn sync_status_request(&self) -> Value {
        self.request(METHOD_SYNC_STATUS, json!({}))
    }

    /// Extract `result`, turning a JSON-RPC `error` into a protocol rejection
    pub fn parse_response<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, TransportError> {
        let document: Value = serde_json::from_slice(body)
            .map_err(|e| TransportError::InvalidResponse(format!("malformed JSON-RPC document: {}", e)))?;
        debug!(target: LOG_TARGET, "JSON-RPC response: {}", document);

        if let Some(error) = document.get("error").filter(|e| !e.is_null()) {
            let reason = error
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(TransportError::Rejected { reason });
        }

        let result = document
            .get("result")
            .cloned()
            .ok_or_else(|| TransportError::InvalidResponse("JSON-RPC response without result".to_string()))?;
        serde_json::from_value(result)
            .map_err(|e| TransportError::InvalidResponse(format!("unexpected result shape: {}", e)))
    }
}

impl Default for RpcProtocol {
    fn default() -> Self {
        Self::new()
    }
}

/// `GET /blockchain/status` document; field names follow the node's status page
#[derive(Debug, Clone, Deserialize)]
pub struct StatusDocument {
    #[serde(alias = "blockchain_height", alias = "height")]
    pub network_height: u64,
    #[serde(default)]
    pub difficulty: u32,
    #[serde(default, alias = "pending_transactions")]
    pub mempool_size: u64,
    #[serde(default, alias = "peers")]
    pub peer_count: u64,
}

impl From<StatusDocument> for NetworkStatus {
    fn from(doc: StatusDocument) -> Self {
        NetworkStatus {
            network_height: doc.network_height,
            difficulty: doc.difficulty,
            mempool_size: doc.mempool_size,
            peer_count: doc.peer_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::SubmitReply;

    #[test]
    fn test_requests_have_increasing_ids() {
        let rpc = RpcProtocol::new();
        let first = rpc.get_work_request();
        let second = rpc.sync_status_request();
        assert_eq!(first["method"], METHOD_GET_WORK);
        assert_eq!(first["jsonrpc"], "2.0");
        assert_eq!(second["id"].as_u64(), first["id"].as_u64().map(|id| id + 1));
    }

    #[test]
    fn test_parse_result_and_error() {
        let ok: SubmitReply =
            RpcProtocol::parse_response(br#"{"jsonrpc":"2.0","id":1,"result":{"success":true,"block_id":"9-ab"}}"#)
                .unwrap();
        assert!(ok.success);
        assert_eq!(ok.block_id.as_deref(), Some("9-ab"));

        let err = RpcProtocol::parse_response::<SubmitReply>(
            br#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"stale height"}}"#,
        )
        .unwrap_err();
        assert_eq!(err, TransportError::Rejected { reason: "stale height".into() });

        assert!(matches!(
            RpcProtocol::parse_response::<SubmitReply>(b"<html>"),
            Err(TransportError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_mempool_accepts_both_shapes() {
        let list: MempoolDocument = serde_json::from_str(r#"[{"type":"transaction"}]"#).unwrap();
        let wrapped: MempoolDocument = serde_json::from_str(r#"{"transactions":[{"type":"transaction"}]}"#).unwrap();
        assert_eq!(list.into_transactions().len(), 1);
        assert_eq!(wrapped.into_transactions().len(), 1);
    }

    #[test]
    fn test_template_targets_next_height() {
        let latest = LatestBlock {
            index: 41,
            hash: "ff".repeat(32),
            difficulty: Some(3),
        };
        let template = template_from_latest(latest, vec![]);
        assert_eq!(template.height, 42);
        assert_eq!(template.difficulty, 3);
        assert!(template.timestamp > 1_600_000_000.0);
    }

    #[test]
    fn test_status_aliases() {
        let doc: StatusDocument =
            serde_json::from_str(r#"{"blockchain_height": 12, "difficulty": 4, "pending_transactions": 3}"#).unwrap();
        let status: NetworkStatus = doc.into();
        assert_eq!(status.network_height, 12);
        assert_eq!(status.mempool_size, 3);
        assert_eq!(status.peer_count, 0);
    }
}

// Changelog:
// - v2.0.0 (2025-07-02): Replaced Stratum messages with Luna node documents.
//   - RpcProtocol builds get_work/submit_block/sync_status JSON-RPC requests.
//   - Added REST documents for the rich client (latest block, mempool, status).
