use thiserror::Error;
use sha3::{Digest, Keccak256};
use oracle_types::H256;

pub mod secp256k1_crypto;
pub use secp256k1_crypto::*;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid signature")]
    InvalidSignature,
    
    #[error("Invalid private key")]
    InvalidPrivateKey,
    
    #[error("Secp256k1 error: {0}")]
    Secp256k1(#[from] secp256k1::Error),
}

pub type Result<T> = std::result::Result<T, CryptoError>;

/// Compute the Keccak-256 hash of the input data
pub fn keccak256(data: &[u8]) -> H256 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let result = hasher.finalize();
    H256::from_slice(&result)
}

/// Compute the Keccak-256 hash of multiple slices of data
pub fn keccak256_concat(data: &[&[u8]]) -> H256 {
    let mut hasher = Keccak256::new();
    for slice in data {
        hasher.update(slice);
    }
    let result = hasher.finalize();
    H256::from_slice(&result)
}
