use anyhow::{Context, Result};
use oracle_account::Signer;
use oracle_core::TransactionBuilder;
use oracle_rpc::{BlockTag, ChainClient};
use oracle_txpool::NonceSequencer;
use oracle_types::Address;
use std::sync::Arc;
use tracing::info;

/// Process-wide oracle identity: signer, nonce sequencer and the fixed
/// transaction parameters. Built once at startup and shared by reference.
pub struct OracleAccountContext {
    signer: Arc<dyn Signer>,
    sequencer: NonceSequencer,
    builder: TransactionBuilder,
}

impl OracleAccountContext {
    pub fn new(signer: Arc<dyn Signer>, builder: TransactionBuilder, next_nonce: u64) -> Self {
        Self {
            signer,
            sequencer: NonceSequencer::new(next_nonce),
            builder,
        }
    }
    
    /// Verify the chain id and seed the sequencer from the account's pending
    /// transaction count.
    pub async fn initialize(
        signer: Arc<dyn Signer>,
        client: &dyn ChainClient,
        contract: Address,
        gas_limit: u64,
        expected_chain_id: Option<u64>,
    ) -> Result<Self> {
        let chain_id = client.chain_id().await.context("Failed to query chain id")?;
        if let Some(expected) = expected_chain_id {
            if expected != chain_id {
                anyhow::bail!("RPC endpoint reports chain id {}, configuration expects {}", chain_id, expected);
            }
        }
        
        let address = signer.address();
        let next_nonce = client
            .transaction_count(address, BlockTag::Pending)
            .await
            .context("Failed to query oracle account nonce")?;
        
        info!(%address, chain_id, next_nonce, contract = %contract, "oracle account initialized");
        
        let builder = TransactionBuilder::new(contract, address, chain_id).with_gas_limit(gas_limit);
        Ok(Self::new(signer, builder, next_nonce))
    }
    
    pub fn address(&self) -> Address {
        self.signer.address()
    }
    
    pub fn signer(&self) -> &dyn Signer {
        self.signer.as_ref()
    }
    
    pub fn sequencer(&self) -> &NonceSequencer {
        &self.sequencer
    }
    
    pub fn builder(&self) -> &TransactionBuilder {
        &self.builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracle_account::{LocalSigner, OracleAccount};
    use oracle_rpc::mock::MockChain;
    
    #[tokio::test]
    async fn test_initialize_seeds_nonce_from_chain() {
        let chain = MockChain::new(43113);
        let account = OracleAccount::random();
        chain.set_nonce(account.address(), 17);
        let signer: Arc<dyn Signer> = Arc::new(LocalSigner::new(account));
        
        let context = OracleAccountContext::initialize(signer, &chain, Address::from_bytes([0xaa; 20]), 250_000, Some(43113))
            .await
            .unwrap();
        assert_eq!(context.sequencer().peek(), 17);
        assert_eq!(context.builder().chain_id(), 43113);
    }
    
    #[tokio::test]
    async fn test_initialize_rejects_wrong_chain() {
        let chain = MockChain::new(43114);
        let signer: Arc<dyn Signer> = Arc::new(LocalSigner::new(OracleAccount::random()));
        
        let result = OracleAccountContext::initialize(signer, &chain, Address::from_bytes([0xaa; 20]), 250_000, Some(43113)).await;
        assert!(result.is_err());
    }
}
