use oracle_types::H256;
use thiserror::Error;

/// Per-request failure taxonomy. Each variant maps to a stable `kind`
/// string so callers can tell retryable outcomes from terminal ones.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OracleError {
    /// Missing or malformed request fields; nothing touched the chain.
    #[error("{0}")]
    Validation(String),
    
    #[error("Scoring failed: {0}")]
    Scoring(String),
    
    #[error("Signing failed: {0}")]
    Signing(String),
    
    /// RPC unreachable or rejected the transaction. `tx_hash` is set when
    /// the transaction may have reached the node.
    #[error("Broadcast failed: {message}")]
    Broadcast { message: String, tx_hash: Option<H256> },
    
    /// The transaction may still confirm; its outcome is unknown.
    #[error("Transaction {tx_hash:#x} was not confirmed before the deadline; outcome unknown")]
    SubmissionTimeout { tx_hash: H256 },
    
    #[error("Transaction {tx_hash:#x} reverted in block {block_number}; score not applied")]
    ContractReverted { tx_hash: H256, block_number: u64 },
}

impl OracleError {
    pub fn kind(&self) -> &'static str {
        match self {
            OracleError::Validation(_) => "validation_error",
            OracleError::Scoring(_) => "scoring_error",
            OracleError::Signing(_) => "signing_error",
            OracleError::Broadcast { .. } => "broadcast_error",
            OracleError::SubmissionTimeout { .. } => "submission_timeout",
            OracleError::ContractReverted { .. } => "contract_reverted",
        }
    }
    
    pub fn http_status(&self) -> u16 {
        match self {
            OracleError::Validation(_) => 400,
            _ => 500,
        }
    }
    
    /// Whether resending the same request can succeed without risking a
    /// second on-chain effect.
    pub fn retryable(&self) -> bool {
        matches!(self, OracleError::Broadcast { tx_hash: None, .. })
    }
    
    pub fn tx_hash(&self) -> Option<H256> {
        match self {
            OracleError::Broadcast { tx_hash, .. } => *tx_hash,
            OracleError::SubmissionTimeout { tx_hash } | OracleError::ContractReverted { tx_hash, .. } => {
                Some(*tx_hash)
            }
            _ => None,
        }
    }
    
    /// Diagnostic detail for the response body. Built from the error value
    /// itself, which never holds key material.
    pub fn trace(&self) -> String {
        format!("{:?}", self)
    }
}

pub type Result<T> = std::result::Result<T, OracleError>;

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_kinds_and_statuses() {
        let hash = H256::repeat_byte(1);
        let cases = [
            (OracleError::Validation("bad".into()), "validation_error", 400),
            (OracleError::Scoring("nan".into()), "scoring_error", 500),
            (OracleError::Signing("mismatch".into()), "signing_error", 500),
            (OracleError::Broadcast { message: "down".into(), tx_hash: None }, "broadcast_error", 500),
            (OracleError::SubmissionTimeout { tx_hash: hash }, "submission_timeout", 500),
            (OracleError::ContractReverted { tx_hash: hash, block_number: 9 }, "contract_reverted", 500),
        ];
        for (error, kind, status) in cases {
            assert_eq!(error.kind(), kind);
            assert_eq!(error.http_status(), status);
        }
    }
    
    #[test]
    fn test_only_unsent_broadcasts_are_retryable() {
        let hash = H256::repeat_byte(2);
        assert!(OracleError::Broadcast { message: "refused".into(), tx_hash: None }.retryable());
        assert!(!OracleError::Broadcast { message: "timeout".into(), tx_hash: Some(hash) }.retryable());
        assert!(!OracleError::SubmissionTimeout { tx_hash: hash }.retryable());
        assert_eq!(OracleError::SubmissionTimeout { tx_hash: hash }.tx_hash(), Some(hash));
    }
}
