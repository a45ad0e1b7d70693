pub mod abi;
pub mod builder;
pub mod receipt;
pub mod transaction;

pub use abi::{adjust_score_selector, decode_adjust_score, encode_adjust_score, ADJUST_SCORE_SIGNATURE};
pub use builder::{TransactionBuilder, DEFAULT_ADJUST_SCORE_GAS};
pub use receipt::{Receipt, ReceiptStatus};
pub use transaction::{PendingTransaction, SignedTransaction};

use oracle_types::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Invalid calldata: {0}")]
    InvalidCalldata(String),
    #[error("Invalid chain ID")]
    InvalidChainId,
    #[error("Signer {actual} does not match sender {expected}")]
    SenderMismatch { expected: Address, actual: Address },
    #[error("Malformed transaction: {0}")]
    Malformed(String),
    #[error("Crypto error: {0}")]
    Crypto(#[from] oracle_crypto::CryptoError),
    #[error("RLP error: {0}")]
    Rlp(#[from] oracle_rlp::RlpError),
}

pub type Result<T> = std::result::Result<T, TransactionError>;
