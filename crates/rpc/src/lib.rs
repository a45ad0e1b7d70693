use thiserror::Error;

pub mod client;
pub mod http;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use client::{BlockTag, ChainClient};
pub use http::HttpChainClient;
pub use types::*;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RpcError {
    /// The request could not be completed. `request_sent` is false only
    /// when the failure happened before any byte reached the node.
    #[error("Transport error: {message}")]
    Transport { message: String, request_sent: bool },
    
    /// The node answered with a JSON-RPC error object.
    #[error("Node rejected request ({code}): {message}")]
    Rpc { code: i64, message: String },
    
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl RpcError {
    /// Transient failures worth retrying with the same payload.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RpcError::Transport { .. } | RpcError::MalformedResponse(_))
    }
    
    /// Whether the node may have received and acted on the request.
    pub fn request_may_have_landed(&self) -> bool {
        match self {
            RpcError::Transport { request_sent, .. } => *request_sent,
            RpcError::MalformedResponse(_) => true,
            RpcError::Rpc { .. } => false,
        }
    }
    
    /// The node already holds a transaction with this hash.
    pub fn is_already_known(&self) -> bool {
        self.message_contains(&["already known", "known transaction", "already imported"])
    }
    
    /// The account's nonce has moved past the submitted one.
    pub fn is_nonce_too_low(&self) -> bool {
        self.message_contains(&["nonce too low", "nonce is too low", "invalid nonce"])
    }
    
    fn message_contains(&self, needles: &[&str]) -> bool {
        match self {
            RpcError::Rpc { message, .. } => {
                let message = message.to_ascii_lowercase();
                needles.iter().any(|needle| message.contains(needle))
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;
