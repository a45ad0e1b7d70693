use oracle_types::H256;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

impl ReceiptStatus {
    /// The chain's numeric status field (`1` success, `0` reverted).
    pub fn as_u8(&self) -> u8 {
        match self {
            ReceiptStatus::Success => 1,
            ReceiptStatus::Reverted => 0,
        }
    }
    
    pub fn from_u64(status: u64) -> Self {
        if status == 1 {
            ReceiptStatus::Success
        } else {
            ReceiptStatus::Reverted
        }
    }
}

/// The chain's record of an included transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub tx_hash: H256,
    pub status: ReceiptStatus,
    pub block_number: u64,
    pub block_hash: H256,
    pub gas_used: u64,
}

impl Receipt {
    pub fn is_success(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    
    #[test]
    fn test_status_mapping() {
        assert_eq!(ReceiptStatus::from_u64(1), ReceiptStatus::Success);
        assert_eq!(ReceiptStatus::from_u64(0), ReceiptStatus::Reverted);
        assert_eq!(ReceiptStatus::Success.as_u8(), 1);
        assert_eq!(ReceiptStatus::Reverted.as_u8(), 0);
    }
}
