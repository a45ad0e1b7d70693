use async_trait::async_trait;
use oracle_core::Receipt;
use oracle_types::{Address, Bytes, H256, U256};

use crate::Result;

/// Block parameter for state queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    /// Includes transactions still in the node's mempool.
    Pending,
}

impl BlockTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockTag::Latest => "latest",
            BlockTag::Pending => "pending",
        }
    }
}

/// The slice of the chain's JSON-RPC surface the oracle consumes.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn chain_id(&self) -> Result<u64>;
    
    async fn transaction_count(&self, address: Address, block: BlockTag) -> Result<u64>;
    
    async fn gas_price(&self) -> Result<U256>;
    
    async fn block_number(&self) -> Result<u64>;
    
    /// Broadcast a signed transaction; returns the hash the node reports.
    async fn send_raw_transaction(&self, raw: &Bytes) -> Result<H256>;
    
    /// `None` while the transaction is not (or no longer) included.
    async fn transaction_receipt(&self, hash: H256) -> Result<Option<Receipt>>;
}
