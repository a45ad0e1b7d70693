//! ABI encoding for the reputation contract's `adjustScore` entry point.

use oracle_crypto::keccak256;
use oracle_types::{Address, Bytes};

use crate::{Result, TransactionError};

/// Canonical signature of the only contract method the oracle calls.
pub const ADJUST_SCORE_SIGNATURE: &str = "adjustScore(address,int256)";

const WORD: usize = 32;

/// First four bytes of `keccak256("adjustScore(address,int256)")`.
pub fn adjust_score_selector() -> [u8; 4] {
    let hash = keccak256(ADJUST_SCORE_SIGNATURE.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&hash.as_bytes()[..4]);
    selector
}

/// Encode `adjustScore(user, delta)` calldata: selector, left-padded
/// address word, two's-complement int256 word.
pub fn encode_adjust_score(user: &Address, delta: i64) -> Bytes {
    let mut data = Vec::with_capacity(4 + 2 * WORD);
    data.extend_from_slice(&adjust_score_selector());
    
    let mut address_word = [0u8; WORD];
    address_word[12..].copy_from_slice(user.as_bytes());
    data.extend_from_slice(&address_word);
    
    data.extend_from_slice(&int256_word(delta));
    Bytes::from_vec(data)
}

/// Inverse of [`encode_adjust_score`].
pub fn decode_adjust_score(data: &[u8]) -> Result<(Address, i64)> {
    if data.len() != 4 + 2 * WORD {
        return Err(TransactionError::InvalidCalldata(format!(
            "expected {} bytes, got {}",
            4 + 2 * WORD,
            data.len()
        )));
    }
    if data[..4] != adjust_score_selector() {
        return Err(TransactionError::InvalidCalldata("unknown selector".to_string()));
    }
    
    let address_word = &data[4..4 + WORD];
    if address_word[..12].iter().any(|&b| b != 0) {
        return Err(TransactionError::InvalidCalldata("dirty address padding".to_string()));
    }
    let user = Address::from_slice(&address_word[12..])
        .map_err(|e| TransactionError::InvalidCalldata(e.to_string()))?;
    
    let delta_word = &data[4 + WORD..];
    let sign_fill = if delta_word[WORD - 8] & 0x80 != 0 { 0xff } else { 0x00 };
    if delta_word[..WORD - 8].iter().any(|&b| b != sign_fill) {
        return Err(TransactionError::InvalidCalldata("delta out of i64 range".to_string()));
    }
    let mut low = [0u8; 8];
    low.copy_from_slice(&delta_word[WORD - 8..]);
    
    Ok((user, i64::from_be_bytes(low)))
}

fn int256_word(value: i64) -> [u8; WORD] {
    let fill = if value < 0 { 0xff } else { 0x00 };
    let mut word = [fill; WORD];
    word[WORD - 8..].copy_from_slice(&value.to_be_bytes());
    word
}
