use oracle_core::Receipt;
use oracle_rpc::{ChainClient, RpcError};
use oracle_types::{Address, H256};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    /// Signed and handed to the submitter; no terminal outcome yet.
    Pending,
    Confirmed,
    Reverted,
    TimedOut,
    /// Broadcast was never acknowledged, but an attempt may have reached the node.
    Unknown,
    Failed,
}

impl SubmissionState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubmissionState::Pending)
    }
    
    /// Whether the chain may still hold a receipt the ledger has not seen.
    pub fn needs_reconcile(&self) -> bool {
        matches!(self, SubmissionState::TimedOut | SubmissionState::Unknown)
    }
}

/// What the oracle knows about one signed transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionRecord {
    pub tx_hash: H256,
    pub nonce: u64,
    pub user: Address,
    pub score_delta: i64,
    pub state: SubmissionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Bounded in-memory record of submissions keyed by transaction hash.
///
/// Entries outlive the HTTP request that created them so that outcomes of
/// detached submissions stay queryable.
pub struct SubmissionLedger {
    entries: RwLock<LedgerInner>,
    capacity: usize,
}

struct LedgerInner {
    records: HashMap<H256, SubmissionRecord>,
    order: VecDeque<H256>,
}

impl SubmissionLedger {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(LedgerInner {
                records: HashMap::new(),
                order: VecDeque::new(),
            }),
            capacity: capacity.max(1),
        }
    }
    
    pub fn record_pending(&self, tx_hash: H256, nonce: u64, user: Address, score_delta: i64) {
        let mut inner = self.entries.write();
        let record = SubmissionRecord {
            tx_hash,
            nonce,
            user,
            score_delta,
            state: SubmissionState::Pending,
            block_number: None,
            error: None,
        };
        if inner.records.insert(tx_hash, record).is_none() {
            inner.order.push_back(tx_hash);
        }
        
        while inner.order.len() > self.capacity {
            let LedgerInner { records, order } = &mut *inner;
            let position = order.iter().position(|hash| {
                records.get(hash).map_or(true, |record| record.state.is_terminal())
            });
            match position.and_then(|index| order.remove(index)) {
                Some(evicted) => {
                    records.remove(&evicted);
                }
                None => {
                    warn!(in_flight = order.len(), capacity = self.capacity, "ledger over capacity with only pending entries");
                    break;
                }
            }
        }
    }
    
    pub fn mark_confirmed(&self, receipt: &Receipt) {
        self.update(receipt.tx_hash, SubmissionState::Confirmed, Some(receipt.block_number), None);
    }
    
    pub fn mark_reverted(&self, receipt: &Receipt) {
        self.update(receipt.tx_hash, SubmissionState::Reverted, Some(receipt.block_number), None);
    }
    
    pub fn mark_timed_out(&self, tx_hash: H256) {
        self.update(tx_hash, SubmissionState::TimedOut, None, None);
    }
    
    pub fn mark_unknown(&self, tx_hash: H256, error: impl Into<String>) {
        self.update(tx_hash, SubmissionState::Unknown, None, Some(error.into()));
    }
    
    pub fn mark_failed(&self, tx_hash: H256, error: impl Into<String>) {
        self.update(tx_hash, SubmissionState::Failed, None, Some(error.into()));
    }
    
    fn update(&self, tx_hash: H256, state: SubmissionState, block_number: Option<u64>, error: Option<String>) {
        let mut inner = self.entries.write();
        if let Some(record) = inner.records.get_mut(&tx_hash) {
            debug!(tx_hash = ?tx_hash, from = ?record.state, to = ?state, "submission state change");
            record.state = state;
            record.block_number = block_number.or(record.block_number);
            record.error = error;
        }
    }
    
    pub fn get(&self, tx_hash: &H256) -> Option<SubmissionRecord> {
        self.entries.read().records.get(tx_hash).cloned()
    }
    
    pub fn len(&self) -> usize {
        self.entries.read().records.len()
    }
    
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    
    pub fn count_in_state(&self, state: SubmissionState) -> usize {
        self.entries
            .read()
            .records
            .values()
            .filter(|record| record.state == state)
            .count()
    }
    
    /// Look up an entry; a timed-out or unknown entry is checked against the
    /// chain once and updated if its receipt has since appeared.
    pub async fn reconcile(
        &self,
        tx_hash: &H256,
        client: &dyn ChainClient,
    ) -> std::result::Result<Option<SubmissionRecord>, RpcError> {
        let record = match self.get(tx_hash) {
            Some(record) => record,
            None => return Ok(None),
        };
        if !record.state.needs_reconcile() {
            return Ok(Some(record));
        }
        
        if let Some(receipt) = client.transaction_receipt(*tx_hash).await? {
            info!(tx_hash = ?tx_hash, block = receipt.block_number, success = receipt.is_success(), "reconciled submission");
            if receipt.is_success() {
                self.mark_confirmed(&receipt);
            } else {
                self.mark_reverted(&receipt);
            }
        }
        Ok(self.get(tx_hash))
    }
}
