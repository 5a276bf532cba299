// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/node/transport.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// The NodeTransport capability implemented by the rich HTTP client and the
// plain fallback, plus the error classification that decides whether the
// submission client may move on to the next transport.
//
// Tree Location:
// - src/node/transport.rs (NodeTransport, TransportError)
// - Depends on: async-trait, thiserror, core::types

use crate::core::error::EngineError;
use crate::core::types::{BlockSubmission, NetworkStatus, SubmitReply, TransportKind, WorkTemplate};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    #[error("node unreachable: {0}")]
    Unreachable(String),

    #[error("request timed out")]
    Timeout,

    /// Authoritative answer from the node; never retried on another transport
    #[error("rejected by node: {reason}")]
    Rejected { reason: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl TransportError {
    /// Transport-level failures advance the fallback chain and may be retried
    pub fn is_transport_level(&self) -> bool {
        matches!(
            self,
            TransportError::Unavailable(_) | TransportError::Unreachable(_) | TransportError::Timeout
        )
    }
}

impl From<TransportError> for EngineError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Unavailable(message) | TransportError::Unreachable(message) => {
                EngineError::NetworkUnreachable { message }
            }
            TransportError::Timeout => EngineError::Timeout,
            TransportError::Rejected { reason } => EngineError::ProtocolRejected { reason },
            TransportError::InvalidResponse(message) => EngineError::ProtocolRejected {
                reason: format!("invalid response: {}", message),
            },
        }
    }
}

/// One way of talking to the node. Implementations classify their failures;
/// timeouts are also enforced by the caller.
#[async_trait]
pub trait NodeTransport: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Block template for the next height
    async fn fetch_work(&self) -> Result<WorkTemplate, TransportError>;

    async fn submit_block(&self, block: &BlockSubmission) -> Result<SubmitReply, TransportError>;

    async fn sync_status(&self) -> Result<NetworkStatus, TransportError>;
}
