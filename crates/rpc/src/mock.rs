//! In-memory chain used by tests across the workspace.

use async_trait::async_trait;
use oracle_core::{Receipt, ReceiptStatus, SignedTransaction};
use oracle_types::{Address, Bytes, H256, U256};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::client::{BlockTag, ChainClient};
use crate::{Result, RpcError};

/// Scripted outcome for the next broadcast.
#[derive(Debug, Clone)]
pub enum BroadcastScript {
    /// Reject without the transaction reaching the pool.
    Fail(RpcError),
    /// The transaction reaches the pool but the caller sees the error.
    AcceptThenFail(RpcError),
}

struct MockState {
    chain_id: u64,
    gas_price: U256,
    block_number: u64,
    nonces: HashMap<Address, u64>,
    broadcast_script: VecDeque<BroadcastScript>,
    known: HashSet<H256>,
    accepted: Vec<SignedTransaction>,
    receipts: HashMap<H256, Receipt>,
    receipt_polls: HashMap<H256, u32>,
    receipt_delay_polls: u32,
    revert_all: bool,
    never_mine: bool,
    reorg_once: bool,
    fail_gas_price: Option<RpcError>,
    calls: usize,
    send_calls: usize,
    receipt_calls: usize,
}

pub struct MockChain {
    state: Mutex<MockState>,
}

impl MockChain {
    pub fn new(chain_id: u64) -> Self {
        Self {
            state: Mutex::new(MockState {
                chain_id,
                gas_price: U256::from(25_000_000_000u64),
                block_number: 100,
                nonces: HashMap::new(),
                broadcast_script: VecDeque::new(),
                known: HashSet::new(),
                accepted: Vec::new(),
                receipts: HashMap::new(),
                receipt_polls: HashMap::new(),
                receipt_delay_polls: 0,
                revert_all: false,
                never_mine: false,
                reorg_once: false,
                fail_gas_price: None,
                calls: 0,
                send_calls: 0,
                receipt_calls: 0,
            }),
        }
    }
    
    pub fn set_nonce(&self, address: Address, nonce: u64) {
        self.state.lock().nonces.insert(address, nonce);
    }
    
    pub fn set_gas_price(&self, gas_price: U256) {
        self.state.lock().gas_price = gas_price;
    }
    
    pub fn fail_gas_price(&self, error: Option<RpcError>) {
        self.state.lock().fail_gas_price = error;
    }
    
    pub fn push_broadcast(&self, script: BroadcastScript) {
        self.state.lock().broadcast_script.push_back(script);
    }
    
    /// Receipts become visible only after this many polls per transaction.
    pub fn set_receipt_delay(&self, polls: u32) {
        self.state.lock().receipt_delay_polls = polls;
    }
    
    pub fn set_revert_all(&self, revert: bool) {
        self.state.lock().revert_all = revert;
    }
    
    pub fn set_never_mine(&self, never_mine: bool) {
        self.state.lock().never_mine = never_mine;
    }
    
    /// The next mined transaction is moved to a different block after its
    /// receipt has been observed once.
    pub fn reorg_once(&self) {
        self.state.lock().reorg_once = true;
    }
    
    /// Every trait method call, including reads.
    pub fn calls(&self) -> usize {
        self.state.lock().calls
    }
    
    pub fn send_calls(&self) -> usize {
        self.state.lock().send_calls
    }
    
    pub fn receipt_calls(&self) -> usize {
        self.state.lock().receipt_calls
    }
    
    pub fn accepted(&self) -> Vec<SignedTransaction> {
        self.state.lock().accepted.clone()
    }
    
    pub fn accepted_nonces(&self) -> Vec<u64> {
        self.state.lock().accepted.iter().map(|tx| tx.nonce()).collect()
    }
    
    pub fn nonce_of(&self, address: Address) -> u64 {
        self.state.lock().nonces.get(&address).copied().unwrap_or(0)
    }
    
    /// Include every accepted transaction that has no receipt yet.
    pub fn mine_pending(&self) {
        let mut state = self.state.lock();
        let unmined: Vec<H256> = state
            .accepted
            .iter()
            .map(|tx| tx.hash())
            .filter(|hash| !state.receipts.contains_key(hash))
            .collect();
        for hash in unmined {
            Self::mine(&mut state, hash);
        }
    }
    
    fn mine(state: &mut MockState, hash: H256) {
        state.block_number += 1;
        let status = if state.revert_all {
            ReceiptStatus::Reverted
        } else {
            ReceiptStatus::Success
        };
        state.receipts.insert(
            hash,
            Receipt {
                tx_hash: hash,
                status,
                block_number: state.block_number,
                block_hash: block_hash(state.block_number),
                gas_used: 43_000,
            },
        );
    }
    
    fn accept(state: &mut MockState, tx: SignedTransaction) {
        let hash = tx.hash();
        let next = state.nonces.entry(tx.from()).or_insert(0);
        *next = (*next).max(tx.nonce() + 1);
        state.known.insert(hash);
        
        if !state.never_mine {
            Self::mine(state, hash);
        }
        state.accepted.push(tx);
    }
}

fn block_hash(number: u64) -> H256 {
    H256::from_low_u64_be(0xb10c_0000 + number)
}

#[async_trait]
impl ChainClient for MockChain {
    async fn chain_id(&self) -> Result<u64> {
        let mut state = self.state.lock();
        state.calls += 1;
        Ok(state.chain_id)
    }
    
    async fn transaction_count(&self, address: Address, _block: BlockTag) -> Result<u64> {
        let mut state = self.state.lock();
        state.calls += 1;
        Ok(state.nonces.get(&address).copied().unwrap_or(0))
    }
    
    async fn gas_price(&self) -> Result<U256> {
        let mut state = self.state.lock();
        state.calls += 1;
        match &state.fail_gas_price {
            Some(error) => Err(error.clone()),
            None => Ok(state.gas_price),
        }
    }
    
    async fn block_number(&self) -> Result<u64> {
        let mut state = self.state.lock();
        state.calls += 1;
        // Every head query observes one new block.
        state.block_number += 1;
        Ok(state.block_number)
    }
    
    async fn send_raw_transaction(&self, raw: &Bytes) -> Result<H256> {
        let mut state = self.state.lock();
        state.calls += 1;
        state.send_calls += 1;
        
        let tx = SignedTransaction::from_raw(raw).map_err(|e| RpcError::Rpc {
            code: -32602,
            message: format!("invalid transaction: {}", e),
        })?;
        if tx.transaction().chain_id != state.chain_id {
            return Err(RpcError::Rpc {
                code: -32000,
                message: "invalid chain id for signer".to_string(),
            });
        }
        
        match state.broadcast_script.pop_front() {
            Some(BroadcastScript::Fail(error)) => return Err(error),
            Some(BroadcastScript::AcceptThenFail(error)) => {
                if !state.known.contains(&tx.hash()) {
                    Self::accept(&mut state, tx);
                }
                return Err(error);
            }
            None => {}
        }
        
        let hash = tx.hash();
        if state.known.contains(&hash) {
            return Err(RpcError::Rpc {
                code: -32000,
                message: "already known".to_string(),
            });
        }
        let expected = state.nonces.get(&tx.from()).copied().unwrap_or(0);
        if tx.nonce() < expected {
            return Err(RpcError::Rpc {
                code: -32000,
                message: format!("nonce too low: next nonce {}, tx nonce {}", expected, tx.nonce()),
            });
        }
        
        Self::accept(&mut state, tx);
        Ok(hash)
    }
    
    async fn transaction_receipt(&self, hash: H256) -> Result<Option<Receipt>> {
        let mut state = self.state.lock();
        state.calls += 1;
        state.receipt_calls += 1;
        
        let delay = state.receipt_delay_polls;
        let polls = state.receipt_polls.entry(hash).or_insert(0);
        *polls += 1;
        let polls = *polls;
        if polls <= delay {
            return Ok(None);
        }
        
        if state.reorg_once && polls > delay + 1 {
            state.reorg_once = false;
            state.block_number += 1;
            let number = state.block_number;
            if let Some(receipt) = state.receipts.get_mut(&hash) {
                receipt.block_number = number;
                receipt.block_hash = block_hash(number);
            }
        }
        
        Ok(state.receipts.get(&hash).cloned())
    }
}
