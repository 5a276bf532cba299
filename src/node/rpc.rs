// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/node/rpc.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// Rich transport: typed REST calls to the node through reqwest. Only compiled
// with the "rich-transport" feature.
//
// Tree Location:
// - src/node/rpc.rs (RichTransport)
// - Depends on: reqwest, async-trait, node::messages

use crate::core::types::{BlockSubmission, NetworkStatus, SubmitReply, TransportKind, WorkTemplate};
use crate::node::messages::{LatestBlock, MempoolDocument, StatusDocument, template_from_latest};
use crate::node::transport::{NodeTransport, TransportError};
use crate::utils::user_agent::user_agent;
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

const LOG_TARGET: &str = "luna::miner::node::rpc";

pub struct RichTransport {
    client: Client,
    base_url: String,
}

impl RichTransport {
    pub fn new(node_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(user_agent())
            .build()
            .map_err(|e| TransportError::Unavailable(format!("HTTP client construction failed: {}", e)))?;
        Ok(Self {
            client,
            base_url: node_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TransportError> {
        debug!(target: LOG_TARGET, "GET {}", path);
        let response = self.client.get(self.url(path)).send().await.map_err(classify)?;
        decode(response).await
    }
}

/// Map reqwest failures onto the transport/protocol split
fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_decode() || err.is_body() {
        TransportError::InvalidResponse(err.to_string())
    } else {
        TransportError::Unreachable(err.to_string())
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    let status = response.status();
    if status.is_client_error() {
        let reason = response.text().await.unwrap_or_default();
        return Err(TransportError::Rejected {
            reason: rejection_reason(status, &reason),
        });
    }
    if !status.is_success() {
        return Err(TransportError::InvalidResponse(format!("HTTP {}", status)));
    }
    response.json::<T>().await.map_err(|e| {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::InvalidResponse(e.to_string())
        }
    })
}

fn rejection_reason(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("HTTP {}", status))
}

#[async_trait]
impl NodeTransport for RichTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Rich
    }

    async fn fetch_work(&self) -> Result<WorkTemplate, TransportError> {
        let latest: LatestBlock = self.get_json("/blockchain/latest").await?;
        let mempool: MempoolDocument = self.get_json("/mempool").await?;
        Ok(template_from_latest(latest, mempool.into_transactions()))
    }

    async fn submit_block(&self, block: &BlockSubmission) -> Result<SubmitReply, TransportError> {
        debug!(target: LOG_TARGET, "POST /blockchain/submit-block (height {})", block.index);
        let response = self
            .client
            .post(self.url("/blockchain/submit-block"))
            .json(block)
            .send()
            .await
            .map_err(classify)?;
        let reply: SubmitReply = decode(response).await?;
        if !reply.success {
            return Err(TransportError::Rejected {
                reason: reply.message.unwrap_or_else(|| "block rejected".to_string()),
            });
        }
        Ok(reply)
    }

    async fn sync_status(&self) -> Result<NetworkStatus, TransportError> {
        let status: StatusDocument = self.get_json("/blockchain/status").await?;
        Ok(status.into())
    }
}
