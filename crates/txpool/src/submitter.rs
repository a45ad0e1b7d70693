use oracle_core::{Receipt, SignedTransaction};
use oracle_rpc::{ChainClient, RpcError};
use oracle_types::H256;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::{Result, SubmitError};

#[derive(Debug, Clone)]
pub struct SubmitterConfig {
    pub max_broadcast_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    pub poll_interval: Duration,
    pub receipt_timeout: Duration,
    /// Blocks (including the inclusion block) before a receipt is final.
    pub confirmations: u64,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            max_broadcast_attempts: 3,
            backoff_base: Duration::from_millis(250),
            backoff_max: Duration::from_secs(4),
            poll_interval: Duration::from_secs(1),
            receipt_timeout: Duration::from_secs(60),
            confirmations: 2,
        }
    }
}

impl SubmitterConfig {
    /// Delay before retry number `attempt` (zero-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.backoff_base
            .checked_mul(factor)
            .unwrap_or(self.backoff_max)
            .min(self.backoff_max)
    }
}

/// A transaction the node has acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Broadcast {
    pub tx_hash: H256,
    pub attempts: u32,
}

/// Sends signed transactions and follows them to a terminal receipt.
pub struct Submitter {
    client: Arc<dyn ChainClient>,
    config: SubmitterConfig,
}

impl Submitter {
    pub fn new(client: Arc<dyn ChainClient>, config: SubmitterConfig) -> Self {
        Self { client, config }
    }
    
    pub fn config(&self) -> &SubmitterConfig {
        &self.config
    }
    
    /// Broadcast, then wait for the receipt. Only a successful receipt is `Ok`.
    pub async fn submit(&self, tx: &SignedTransaction) -> Result<Receipt> {
        let broadcast = self.broadcast(tx).await?;
        self.wait_for_receipt(broadcast.tx_hash).await
    }
    
    /// Send the same signed bytes until the node acknowledges them or the
    /// attempt budget runs out.
    pub async fn broadcast(&self, tx: &SignedTransaction) -> Result<Broadcast> {
        let tx_hash = tx.hash();
        let max_attempts = self.config.max_broadcast_attempts.max(1);
        let mut maybe_sent = false;
        let mut last_error = None;
        
        for attempt in 0..max_attempts {
            if attempt > 0 {
                let delay = self.config.backoff(attempt - 1);
                debug!(tx_hash = ?tx_hash, attempt, ?delay, "backing off before rebroadcast");
                time::sleep(delay).await;
            }
            
            match self.client.send_raw_transaction(tx.raw()).await {
                Ok(reported) => {
                    if reported != tx_hash {
                        warn!(expected = ?tx_hash, reported = ?reported, "node reported a different transaction hash");
                    }
                    info!(tx_hash = ?tx_hash, nonce = tx.nonce(), attempts = attempt + 1, "transaction broadcast");
                    return Ok(Broadcast { tx_hash, attempts: attempt + 1 });
                }
                Err(e) if e.is_already_known() => {
                    info!(tx_hash = ?tx_hash, attempts = attempt + 1, "node already holds transaction");
                    return Ok(Broadcast { tx_hash, attempts: attempt + 1 });
                }
                Err(e) if e.is_nonce_too_low() && maybe_sent => {
                    // An earlier ambiguous attempt most likely landed.
                    info!(tx_hash = ?tx_hash, attempts = attempt + 1, "nonce already used after ambiguous attempt, polling for receipt");
                    return Ok(Broadcast { tx_hash, attempts: attempt + 1 });
                }
                Err(e) if e.is_retryable() => {
                    maybe_sent |= e.request_may_have_landed();
                    warn!(tx_hash = ?tx_hash, attempt = attempt + 1, error = %e, "broadcast attempt failed");
                    last_error = Some(e);
                }
                Err(e) => {
                    warn!(tx_hash = ?tx_hash, attempt = attempt + 1, error = %e, "broadcast rejected");
                    return Err(SubmitError::Broadcast {
                        source: e,
                        attempts: attempt + 1,
                        maybe_sent,
                    });
                }
            }
        }
        
        Err(SubmitError::Broadcast {
            source: last_error.unwrap_or_else(|| RpcError::Transport {
                message: "no broadcast attempt made".to_string(),
                request_sent: false,
            }),
            attempts: max_attempts,
            maybe_sent,
        })
    }
    
    /// Poll for the receipt until `receipt_timeout` elapses.
    pub async fn wait_for_receipt(&self, tx_hash: H256) -> Result<Receipt> {
        let deadline = Instant::now() + self.config.receipt_timeout;
        
        loop {
            match self.client.transaction_receipt(tx_hash).await {
                Ok(Some(receipt)) => {
                    if self.config.confirmations <= 1 {
                        return finalize(receipt);
                    }
                    if let Some(receipt) = self.await_confirmations(receipt, deadline).await? {
                        return finalize(receipt);
                    }
                    debug!(tx_hash = ?tx_hash, "receipt moved after reorg, resuming polling");
                }
                Ok(None) => {}
                Err(e) => debug!(tx_hash = ?tx_hash, error = %e, "receipt poll failed"),
            }
            
            self.sleep_until_next_poll(deadline, tx_hash).await?;
        }
    }
    
    /// Wait for the receipt's block to be buried, then check it is still there.
    /// `None` means the receipt vanished or moved.
    async fn await_confirmations(&self, receipt: Receipt, deadline: Instant) -> Result<Option<Receipt>> {
        let target = receipt.block_number + self.config.confirmations - 1;
        
        loop {
            match self.client.block_number().await {
                Ok(head) if head >= target => break,
                Ok(_) => {}
                Err(e) => debug!(error = %e, "block number query failed"),
            }
            self.sleep_until_next_poll(deadline, receipt.tx_hash).await?;
        }
        
        match self.client.transaction_receipt(receipt.tx_hash).await {
            Ok(Some(current)) if current.block_hash == receipt.block_hash => Ok(Some(current)),
            Ok(_) => {
                warn!(tx_hash = ?receipt.tx_hash, block = receipt.block_number, "receipt no longer in its block");
                Ok(None)
            }
            Err(e) => {
                debug!(error = %e, "receipt re-fetch failed");
                Ok(None)
            }
        }
    }
    
    async fn sleep_until_next_poll(&self, deadline: Instant, tx_hash: H256) -> Result<()> {
        let now = Instant::now();
        if now >= deadline {
            warn!(tx_hash = ?tx_hash, "receipt not observed before deadline");
            return Err(SubmitError::Timeout { tx_hash });
        }
        time::sleep(self.config.poll_interval.min(deadline - now)).await;
        Ok(())
    }
}

fn finalize(receipt: Receipt) -> Result<Receipt> {
    if receipt.is_success() {
        info!(tx_hash = ?receipt.tx_hash, block = receipt.block_number, "transaction confirmed");
        Ok(receipt)
    } else {
        warn!(tx_hash = ?receipt.tx_hash, block = receipt.block_number, "transaction reverted");
        Err(SubmitError::Reverted { receipt })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracle_account::{LocalSigner, OracleAccount, Signer};
    use oracle_core::TransactionBuilder;
    use oracle_rpc::mock::{BroadcastScript, MockChain};
    use oracle_types::{Address, U256};
    
    fn config() -> SubmitterConfig {
        SubmitterConfig {
            max_broadcast_attempts: 3,
            backoff_base: Duration::from_millis(100),
            backoff_max: Duration::from_millis(400),
            poll_interval: Duration::from_millis(50),
            receipt_timeout: Duration::from_secs(2),
            confirmations: 1,
        }
    }
    
    fn signed_tx(nonce: u64) -> SignedTransaction {
        let signer = LocalSigner::new(OracleAccount::from_hex(&"46".repeat(32)).unwrap());
        let tx = TransactionBuilder::new(Address::from_bytes([0x11; 20]), signer.address(), 43114)
            .build(&Address::from_bytes([0x22; 20]), 64, nonce, U256::from(25_000_000_000u64))
            .unwrap();
        signer.sign_transaction(tx).unwrap()
    }
    
    fn refused() -> RpcError {
        RpcError::Transport { message: "connection refused".into(), request_sent: false }
    }
    
    fn timed_out() -> RpcError {
        RpcError::Transport { message: "operation timed out".into(), request_sent: true }
    }
    
    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let config = config();
        assert_eq!(config.backoff(0), Duration::from_millis(100));
        assert_eq!(config.backoff(1), Duration::from_millis(200));
        assert_eq!(config.backoff(2), Duration::from_millis(400));
        assert_eq!(config.backoff(10), Duration::from_millis(400));
        assert_eq!(config.backoff(40), Duration::from_millis(400));
    }
    
    #[tokio::test(start_paused = true)]
    async fn test_fails_twice_then_succeeds() {
        let chain = Arc::new(MockChain::new(43114));
        chain.push_broadcast(BroadcastScript::Fail(refused()));
        chain.push_broadcast(BroadcastScript::Fail(refused()));
        let submitter = Submitter::new(chain.clone(), config());
        
        let tx = signed_tx(0);
        let receipt = submitter.submit(&tx).await.unwrap();
        assert_eq!(receipt.tx_hash, tx.hash());
        assert_eq!(chain.send_calls(), 3);
        assert_eq!(chain.accepted_nonces(), vec![0]);
    }
    
    #[tokio::test(start_paused = true)]
    async fn test_exhausted_connect_failures_are_not_sent() {
        let chain = Arc::new(MockChain::new(43114));
        for _ in 0..3 {
            chain.push_broadcast(BroadcastScript::Fail(refused()));
        }
        let submitter = Submitter::new(chain.clone(), config());
        
        let err = submitter.submit(&signed_tx(0)).await.unwrap_err();
        match &err {
            SubmitError::Broadcast { attempts, maybe_sent, .. } => {
                assert_eq!(*attempts, 3);
                assert!(!maybe_sent);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!err.nonce_consumed());
        assert_eq!(chain.receipt_calls(), 0);
    }
    
    #[tokio::test(start_paused = true)]
    async fn test_lost_response_then_already_known() {
        let chain = Arc::new(MockChain::new(43114));
        chain.push_broadcast(BroadcastScript::AcceptThenFail(timed_out()));
        let submitter = Submitter::new(chain.clone(), config());
        
        let tx = signed_tx(0);
        let broadcast = submitter.broadcast(&tx).await.unwrap();
        assert_eq!(broadcast.attempts, 2);
        assert_eq!(chain.accepted_nonces(), vec![0]);
        assert!(submitter.wait_for_receipt(broadcast.tx_hash).await.is_ok());
    }
    
    #[tokio::test(start_paused = true)]
    async fn test_nonce_too_low_after_ambiguous_attempt_is_acknowledged() {
        let chain = Arc::new(MockChain::new(43114));
        chain.push_broadcast(BroadcastScript::AcceptThenFail(timed_out()));
        chain.push_broadcast(BroadcastScript::Fail(RpcError::Rpc {
            code: -32000,
            message: "nonce too low".into(),
        }));
        let submitter = Submitter::new(chain.clone(), config());
        
        let tx = signed_tx(0);
        let receipt = submitter.submit(&tx).await.unwrap();
        assert_eq!(receipt.tx_hash, tx.hash());
    }
    
    #[tokio::test(start_paused = true)]
    async fn test_definitive_rejection_is_not_retried() {
        let chain = Arc::new(MockChain::new(43114));
        chain.push_broadcast(BroadcastScript::Fail(RpcError::Rpc {
            code: -32000,
            message: "insufficient funds for gas * price + value".into(),
        }));
        let submitter = Submitter::new(chain.clone(), config());
        
        let err = submitter.broadcast(&signed_tx(0)).await.unwrap_err();
        assert!(matches!(err, SubmitError::Broadcast { attempts: 1, maybe_sent: false, .. }));
        assert_eq!(chain.send_calls(), 1);
    }
    
    #[tokio::test(start_paused = true)]
    async fn test_timeout_does_not_rebroadcast() {
        let chain = Arc::new(MockChain::new(43114));
        chain.set_never_mine(true);
        let submitter = Submitter::new(chain.clone(), config());
        
        let tx = signed_tx(0);
        let err = submitter.submit(&tx).await.unwrap_err();
        assert!(matches!(err, SubmitError::Timeout { tx_hash } if tx_hash == tx.hash()));
        assert!(err.nonce_consumed());
        assert_eq!(chain.send_calls(), 1);
    }
    
    #[tokio::test(start_paused = true)]
    async fn test_reverted_receipt() {
        let chain = Arc::new(MockChain::new(43114));
        chain.set_revert_all(true);
        let submitter = Submitter::new(chain.clone(), config());
        
        let err = submitter.submit(&signed_tx(0)).await.unwrap_err();
        assert!(matches!(err, SubmitError::Reverted { .. }));
    }
    
    #[tokio::test(start_paused = true)]
    async fn test_delayed_receipt_is_polled() {
        let chain = Arc::new(MockChain::new(43114));
        chain.set_receipt_delay(5);
        let submitter = Submitter::new(chain.clone(), config());
        
        assert!(submitter.submit(&signed_tx(0)).await.is_ok());
        assert_eq!(chain.receipt_calls(), 6);
    }
    
    #[tokio::test(start_paused = true)]
    async fn test_reorg_during_confirmation() {
        let chain = Arc::new(MockChain::new(43114));
        chain.reorg_once();
        let mut config = config();
        config.confirmations = 3;
        let submitter = Submitter::new(chain.clone(), config);
        
        let tx = signed_tx(0);
        chain.send_raw_transaction(tx.raw()).await.unwrap();
        let receipt = submitter.wait_for_receipt(tx.hash()).await.unwrap();
        
        // Mined in block 101, then moved on the confirmation re-fetch.
        assert!(receipt.block_number > 101);
        assert_eq!(chain.receipt_calls(), 4);
    }
}
