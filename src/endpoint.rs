use oracle_core::{Receipt, SignedTransaction, TransactionBuilder};
use oracle_monitor::{OracleMetrics, Outcome};
use oracle_rpc::{BlockTag, ChainClient};
use oracle_txpool::{NonceReservation, SubmissionLedger, SubmissionRecord, SubmitError, Submitter};
use oracle_types::{Address, H256};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::context::OracleAccountContext;
use crate::error::{OracleError, Result};
use crate::scoring::{round_probability, CreditModel, FeatureVector, ScoreMapper};

pub const MISSING_FIELDS_MESSAGE: &str = "Missing 'features' or 'user' in request body";

/// A `/predict` body that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    pub features: FeatureVector,
    pub user: Address,
}

impl PredictionRequest {
    pub fn from_json(body: &Value) -> Result<Self> {
        let features = body.get("features").filter(|v| !is_blank(v));
        let user = body.get("user").filter(|v| !is_blank(v));
        let (features, user) = match (features, user) {
            (Some(features), Some(user)) => (features, user),
            _ => return Err(OracleError::Validation(MISSING_FIELDS_MESSAGE.to_string())),
        };
        
        let user = user
            .as_str()
            .ok_or_else(|| OracleError::Validation("'user' must be a string address".to_string()))?;
        let user = TransactionBuilder::parse_user(user)
            .map_err(|e| OracleError::Validation(format!("Invalid 'user': {}", e)))?;
        let features = FeatureVector::from_json(features)?;
        
        Ok(Self { features, user })
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Successful `/predict` response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub default_probability: f64,
    pub score_delta: i64,
    #[serde(serialize_with = "serialize_hash")]
    pub tx_hash: H256,
    pub status: u8,
}

fn serialize_hash<S: Serializer>(hash: &H256, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:#x}", hash))
}

/// Runs one prediction through scoring, nonce reservation, signing and
/// submission.
pub struct InferenceEndpoint {
    model: Arc<dyn CreditModel>,
    mapper: ScoreMapper,
    account: Arc<OracleAccountContext>,
    client: Arc<dyn ChainClient>,
    submitter: Arc<Submitter>,
    ledger: Arc<SubmissionLedger>,
    metrics: Option<Arc<OracleMetrics>>,
    request_timeout: Duration,
}

impl InferenceEndpoint {
    pub fn new(
        model: Arc<dyn CreditModel>,
        account: Arc<OracleAccountContext>,
        client: Arc<dyn ChainClient>,
        submitter: Arc<Submitter>,
        ledger: Arc<SubmissionLedger>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            model,
            mapper: ScoreMapper,
            account,
            client,
            submitter,
            ledger,
            metrics: None,
            request_timeout,
        }
    }
    
    pub fn with_metrics(mut self, metrics: Arc<OracleMetrics>) -> Self {
        metrics.set_next_nonce(self.account.sequencer().peek());
        self.metrics = Some(metrics);
        self
    }
    
    pub fn account(&self) -> &OracleAccountContext {
        &self.account
    }
    
    pub fn ledger(&self) -> &SubmissionLedger {
        &self.ledger
    }
    
    pub async fn predict(&self, body: &Value) -> Result<Prediction> {
        let result = self.run(body).await;
        if let Some(metrics) = &self.metrics {
            match &result {
                Ok(_) => metrics.record_outcome(Outcome::Confirmed),
                Err(e) => metrics.record_outcome(Outcome::Error(e.kind())),
            }
        }
        result
    }
    
    async fn run(&self, body: &Value) -> Result<Prediction> {
        let request = PredictionRequest::from_json(body)?;
        
        let probability = self.model.predict_default_probability(&request.features)?;
        let score_delta = self.mapper.map(probability)?;
        debug!(user = %request.user, probability, score_delta, "scored request");
        
        let gas_price = self.client.gas_price().await.map_err(|e| OracleError::Broadcast {
            message: format!("gas price query failed: {}", e),
            tx_hash: None,
        })?;
        
        let reservation = self.account.sequencer().reserve();
        let nonce = reservation.nonce();
        self.update_nonce_gauge();
        
        let signed = match self.build_and_sign(&request.user, score_delta, nonce, gas_price) {
            Ok(signed) => signed,
            Err(e) => {
                reservation.release();
                self.update_nonce_gauge();
                error!(nonce, error = %e, "failed before broadcast, nonce released");
                return Err(e);
            }
        };
        
        let tx_hash = signed.hash();
        self.ledger.record_pending(tx_hash, nonce, request.user, score_delta);
        info!(tx_hash = ?tx_hash, nonce, user = %request.user, score_delta, "submitting score adjustment");
        
        // The submission runs to a terminal outcome even if this request is
        // dropped or times out.
        let task = tokio::spawn(submit_detached(
            Arc::clone(&self.submitter),
            Arc::clone(&self.ledger),
            Arc::clone(&self.account),
            Arc::clone(&self.client),
            self.metrics.clone(),
            signed,
            reservation,
        ));
        
        let receipt = match tokio::time::timeout(self.request_timeout, task).await {
            Ok(Ok(outcome)) => outcome?,
            Ok(Err(join_error)) => {
                error!(tx_hash = ?tx_hash, error = %join_error, "submission task aborted");
                return Err(OracleError::SubmissionTimeout { tx_hash });
            }
            Err(_) => {
                warn!(tx_hash = ?tx_hash, "request deadline passed, submission continues in background");
                return Err(OracleError::SubmissionTimeout { tx_hash });
            }
        };
        
        Ok(Prediction {
            default_probability: round_probability(probability),
            score_delta,
            tx_hash: receipt.tx_hash,
            status: receipt.status.as_u8(),
        })
    }
    
    fn build_and_sign(&self, user: &Address, delta: i64, nonce: u64, gas_price: oracle_types::U256) -> Result<SignedTransaction> {
        let tx = self
            .account
            .builder()
            .build(user, delta, nonce, gas_price)
            .map_err(|e| OracleError::Signing(format!("transaction build failed: {}", e)))?;
        self.account
            .signer()
            .sign_transaction(tx)
            .map_err(|e| OracleError::Signing(e.to_string()))
    }
    
    fn update_nonce_gauge(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.set_next_nonce(self.account.sequencer().peek());
        }
    }
    
    /// Ledger entry for a submission; timed-out and unknown entries are re-checked on chain.
    pub async fn lookup_submission(&self, tx_hash: &H256) -> Option<SubmissionRecord> {
        match self.ledger.reconcile(tx_hash, self.client.as_ref()).await {
            Ok(record) => record,
            Err(e) => {
                warn!(tx_hash = ?tx_hash, error = %e, "reconciliation query failed");
                self.ledger.get(tx_hash)
            }
        }
    }
}

async fn submit_detached(
    submitter: Arc<Submitter>,
    ledger: Arc<SubmissionLedger>,
    account: Arc<OracleAccountContext>,
    client: Arc<dyn ChainClient>,
    metrics: Option<Arc<OracleMetrics>>,
    signed: SignedTransaction,
    reservation: NonceReservation,
) -> Result<Receipt> {
    let started = Instant::now();
    let tx_hash = signed.hash();
    let nonce = reservation.nonce();
    
    let outcome = match submitter.broadcast(&signed).await {
        Ok(broadcast) => {
            if let Some(metrics) = &metrics {
                metrics.record_broadcast_attempts(broadcast.attempts);
            }
            submitter.wait_for_receipt(broadcast.tx_hash).await
        }
        Err(e) => {
            if let (Some(metrics), SubmitError::Broadcast { attempts, .. }) = (&metrics, &e) {
                metrics.record_broadcast_attempts(*attempts);
            }
            Err(e)
        }
    };
    
    if let Some(metrics) = &metrics {
        metrics.observe_submission(started.elapsed());
    }
    
    match outcome {
        Ok(receipt) => {
            reservation.consume();
            ledger.mark_confirmed(&receipt);
            Ok(receipt)
        }
        Err(e) => {
            let stale_nonce = matches!(
                &e,
                SubmitError::Broadcast { source, maybe_sent: false, .. } if source.is_nonce_too_low()
            );
            if e.nonce_consumed() {
                reservation.consume();
            } else {
                reservation.release();
            }
            if stale_nonce {
                resync_nonce(&account, client.as_ref()).await;
            }
            if let Some(metrics) = &metrics {
                metrics.set_next_nonce(account.sequencer().peek());
            }
            
            let message = e.to_string();
            Err(match e {
                SubmitError::Timeout { tx_hash } => {
                    ledger.mark_timed_out(tx_hash);
                    OracleError::SubmissionTimeout { tx_hash }
                }
                SubmitError::Reverted { receipt } => {
                    ledger.mark_reverted(&receipt);
                    OracleError::ContractReverted {
                        tx_hash: receipt.tx_hash,
                        block_number: receipt.block_number,
                    }
                }
                SubmitError::Broadcast { maybe_sent, .. } => {
                    if maybe_sent {
                        ledger.mark_unknown(tx_hash, message.clone());
                    } else {
                        ledger.mark_failed(tx_hash, message.clone());
                    }
                    debug!(nonce, maybe_sent, "broadcast failed");
                    OracleError::Broadcast {
                        message,
                        tx_hash: maybe_sent.then_some(tx_hash),
                    }
                }
            })
        }
    }
}

async fn resync_nonce(account: &OracleAccountContext, client: &dyn ChainClient) {
    match client.transaction_count(account.address(), BlockTag::Pending).await {
        Ok(count) => {
            account.sequencer().resync(count);
        }
        Err(e) => warn!(error = %e, "nonce resync query failed"),
    }
}
