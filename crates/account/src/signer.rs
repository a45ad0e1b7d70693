use oracle_core::{PendingTransaction, SignedTransaction};
use oracle_types::Address;

use crate::{AccountError, OracleAccount, Result};

/// Transaction signer trait
pub trait Signer: Send + Sync {
    /// Sign a transaction. Deterministic for a given key and transaction.
    fn sign_transaction(&self, tx: PendingTransaction) -> Result<SignedTransaction>;
    
    /// Get signer address
    fn address(&self) -> Address;
}

/// Local signer holding the key in process memory.
#[derive(Debug)]
pub struct LocalSigner {
    account: OracleAccount,
}

impl LocalSigner {
    pub fn new(account: OracleAccount) -> Self {
        Self { account }
    }
}

impl Signer for LocalSigner {
    fn sign_transaction(&self, tx: PendingTransaction) -> Result<SignedTransaction> {
        if tx.from != self.account.address() {
            return Err(AccountError::SigningError(format!(
                "transaction sender {} is not the signer {}",
                tx.from,
                self.account.address()
            )));
        }
        
        let nonce = tx.nonce;
        let signed = tx
            .sign(self.account.private_key())
            .map_err(|e| AccountError::SigningError(e.to_string()))?;
        
        tracing::debug!(nonce, tx_hash = ?signed.hash(), "Signed transaction");
        Ok(signed)
    }
    
    fn address(&self) -> Address {
        self.account.address()
    }
}
