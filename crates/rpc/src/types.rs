use oracle_core::{Receipt, ReceiptStatus};
use oracle_types::{hash::h256_from_hex, H256, U256};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Result, RpcError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
    pub id: u64,
}

impl RpcRequest {
    pub fn new(id: u64, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorResponse>,
    pub id: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorResponse {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Receipt as returned by `eth_getTransactionReceipt`; quantities are hex strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    pub transaction_hash: String,
    pub block_hash: Option<String>,
    pub block_number: Option<String>,
    pub gas_used: Option<String>,
    pub status: Option<String>,
}

impl RpcReceipt {
    pub fn into_receipt(self) -> Result<Receipt> {
        let block_number = self
            .block_number
            .as_deref()
            .ok_or_else(|| RpcError::MalformedResponse("receipt without blockNumber".to_string()))?;
        let block_hash = self
            .block_hash
            .as_deref()
            .ok_or_else(|| RpcError::MalformedResponse("receipt without blockHash".to_string()))?;
        let status = self
            .status
            .as_deref()
            .ok_or_else(|| RpcError::MalformedResponse("receipt without status".to_string()))?;
        
        Ok(Receipt {
            tx_hash: parse_h256(&self.transaction_hash)?,
            status: ReceiptStatus::from_u64(parse_quantity(status)?),
            block_number: parse_quantity(block_number)?,
            block_hash: parse_h256(block_hash)?,
            gas_used: match self.gas_used.as_deref() {
                Some(gas_used) => parse_quantity(gas_used)?,
                None => 0,
            },
        })
    }
}

/// Parse a JSON-RPC `QUANTITY` (`0x`-prefixed, no leading zeros required).
pub fn parse_quantity(s: &str) -> Result<u64> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| RpcError::MalformedResponse(format!("quantity without 0x prefix: {}", s)))?;
    if digits.is_empty() {
        return Err(RpcError::MalformedResponse("empty quantity".to_string()));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| RpcError::MalformedResponse(format!("invalid quantity {}: {}", s, e)))
}

pub fn parse_u256_quantity(s: &str) -> Result<U256> {
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| RpcError::MalformedResponse(format!("quantity without 0x prefix: {}", s)))?;
    if digits.is_empty() || digits.len() > 64 {
        return Err(RpcError::MalformedResponse(format!("invalid quantity: {}", s)));
    }
    U256::from_str_radix(digits, 16)
        .map_err(|e| RpcError::MalformedResponse(format!("invalid quantity {}: {:?}", s, e)))
}

pub fn parse_h256(s: &str) -> Result<H256> {
    h256_from_hex(s).map_err(|e| RpcError::MalformedResponse(format!("invalid hash {}: {}", s, e)))
}

pub fn format_quantity(value: u64) -> String {
    format!("0x{:x}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    
    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_quantity("0x1b4").unwrap(), 436);
        assert!(parse_quantity("1b4").is_err());
        assert!(parse_quantity("0x").is_err());
        assert!(parse_quantity("0xzz").is_err());
        assert_eq!(format_quantity(436), "0x1b4");
    }
    
    #[test]
    fn test_parse_gas_price() {
        assert_eq!(parse_u256_quantity("0x5d21dba00").unwrap(), U256::from(25_000_000_000u64));
    }
    
    #[test]
    fn test_receipt_conversion() {
        let hash = format!("0x{}", "11".repeat(32));
        let block_hash = format!("0x{}", "22".repeat(32));
        let raw: RpcReceipt = serde_json::from_value(json!({
            "transactionHash": hash,
            "blockHash": block_hash,
            "blockNumber": "0x10",
            "gasUsed": "0x5208",
            "status": "0x0",
            "logs": []
        }))
        .unwrap();
        
        let receipt = raw.into_receipt().unwrap();
        assert_eq!(receipt.block_number, 16);
        assert_eq!(receipt.gas_used, 21000);
        assert_eq!(receipt.status, ReceiptStatus::Reverted);
        assert_eq!(format!("{:#x}", receipt.tx_hash), hash);
    }
    
    #[test]
    fn test_pending_receipt_is_malformed() {
        let raw: RpcReceipt = serde_json::from_value(json!({
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "blockHash": null,
            "blockNumber": null,
            "status": "0x1"
        }))
        .unwrap();
        assert!(matches!(raw.into_receipt(), Err(RpcError::MalformedResponse(_))));
    }
}
