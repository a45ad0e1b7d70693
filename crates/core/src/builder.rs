use oracle_types::{Address, U256};
use std::str::FromStr;

use crate::abi::encode_adjust_score;
use crate::{PendingTransaction, Result, TransactionError};

/// Default gas limit for `adjustScore`: a storage write plus event, with
/// headroom for a cold account slot.
pub const DEFAULT_ADJUST_SCORE_GAS: u64 = 250_000;

/// Assembles `adjustScore(user, delta)` calls from the oracle account to the
/// reputation contract. Per-attempt inputs (nonce, gas price) are passed to
/// [`TransactionBuilder::build`]; everything fixed for the process lifetime
/// lives here.
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    contract: Address,
    from: Address,
    chain_id: u64,
    gas_limit: u64,
}

impl TransactionBuilder {
    pub fn new(contract: Address, from: Address, chain_id: u64) -> Self {
        Self {
            contract,
            from,
            chain_id,
            gas_limit: DEFAULT_ADJUST_SCORE_GAS,
        }
    }
    
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }
    
    pub fn contract(&self) -> Address {
        self.contract
    }
    
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }
    
    pub fn gas_limit(&self) -> u64 {
        self.gas_limit
    }
    
    /// Parse a user address the way `build` will accept it.
    pub fn parse_user(user: &str) -> Result<Address> {
        let address = Address::from_str(user.trim())
            .map_err(|e| TransactionError::InvalidAddress(e.to_string()))?;
        if address.is_zero() {
            return Err(TransactionError::InvalidAddress("zero address".to_string()));
        }
        Ok(address)
    }
    
    pub fn build(
        &self,
        user: &Address,
        delta: i64,
        nonce: u64,
        gas_price: U256,
    ) -> Result<PendingTransaction> {
        if user.is_zero() {
            return Err(TransactionError::InvalidAddress("zero address".to_string()));
        }
        
        Ok(PendingTransaction {
            from: self.from,
            to: self.contract,
            data: encode_adjust_score(user, delta),
            nonce,
            gas_limit: self.gas_limit,
            gas_price,
            chain_id: self.chain_id,
        })
    }
}
