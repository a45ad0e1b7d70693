use oracle_core::Receipt;
use oracle_rpc::RpcError;
use oracle_types::H256;
use thiserror::Error;

pub mod ledger;
pub mod nonce;
pub mod submitter;

pub use ledger::{SubmissionLedger, SubmissionRecord, SubmissionState};
pub use nonce::{NonceReservation, NonceSequencer};
pub use submitter::{Broadcast, Submitter, SubmitterConfig};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Broadcast failed after {attempts} attempt(s): {source}")]
    Broadcast {
        #[source]
        source: RpcError,
        attempts: u32,
        /// At least one attempt may have reached the node.
        maybe_sent: bool,
    },
    
    #[error("Transaction {tx_hash:#x} not confirmed before deadline")]
    Timeout { tx_hash: H256 },
    
    #[error("Transaction {:#x} reverted in block {}", .receipt.tx_hash, .receipt.block_number)]
    Reverted { receipt: Receipt },
}

impl SubmitError {
    /// Whether the nonce used for this submission must be treated as spent.
    pub fn nonce_consumed(&self) -> bool {
        match self {
            SubmitError::Broadcast { maybe_sent, .. } => *maybe_sent,
            SubmitError::Timeout { .. } | SubmitError::Reverted { .. } => true,
        }
    }
}

pub type Result<T> = std::result::Result<T, SubmitError>;
