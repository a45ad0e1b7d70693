use primitive_types::{H160 as PrimitiveH160, H256 as PrimitiveH256};

pub type H160 = PrimitiveH160;
pub type H256 = PrimitiveH256;

/// Parse a `0x`-prefixed (or bare) 32-byte hex string, as returned by JSON-RPC.
pub fn h256_from_hex(s: &str) -> crate::Result<H256> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(stripped).map_err(|_| crate::TypesError::InvalidHex(s.to_string()))?;
    if bytes.len() != 32 {
        return Err(crate::TypesError::InvalidLength {
            expected: 32,
            actual: bytes.len(),
        });
    }
    Ok(H256::from_slice(&bytes))
}
