use oracle_crypto::{keccak256, recover_address, sign_message, Signature};
use oracle_rlp::{traits::u64_from_item, Decoder, Encode, Encoder, RlpItem};
use oracle_types::{Address, Bytes, UintExt, H256, U256};
use secp256k1::SecretKey;
use serde::{Deserialize, Serialize};

use crate::{Result, TransactionError};

/// An unsigned legacy contract call, ready for EIP-155 signing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTransaction {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: U256,
    pub chain_id: u64,
}

impl PendingTransaction {
    /// EIP-155 signing digest:
    /// `keccak256(rlp([nonce, gasPrice, gas, to, value, data, chainId, 0, 0]))`.
    pub fn signing_hash(&self) -> H256 {
        let mut encoder = Encoder::new();
        encoder.encode_list_with(|list| {
            self.encode_fields(list);
            list.encode_u64(self.chain_id);
            list.encode_u64(0);
            list.encode_u64(0);
        });
        keccak256(&encoder.finish())
    }
    
    /// Sign with `key`. The key must belong to `self.from`; a mismatch is
    /// reported as a signing fault rather than producing a transaction the
    /// chain would attribute to another account.
    pub fn sign(self, key: &SecretKey) -> Result<SignedTransaction> {
        if self.chain_id == 0 {
            return Err(TransactionError::InvalidChainId);
        }
        let signature = sign_message(&self.signing_hash(), key)?;
        let signed = SignedTransaction::from_parts(self, &signature)?;
        
        let signer = signed.recover_sender()?;
        if signer != signed.tx.from {
            return Err(TransactionError::SenderMismatch {
                expected: signed.tx.from,
                actual: signer,
            });
        }
        Ok(signed)
    }
    
    fn encode_fields(&self, list: &mut Encoder) {
        list.encode_u64(self.nonce);
        self.gas_price.encode(list);
        list.encode_u64(self.gas_limit);
        self.to.encode(list);
        // The oracle never transfers value.
        U256::zero().encode(list);
        self.data.encode(list);
    }
}

/// A signed transaction. Immutable: the raw encoding and hash are computed
/// once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    tx: PendingTransaction,
    v: u64,
    r: U256,
    s: U256,
    hash: H256,
    raw: Bytes,
}

impl SignedTransaction {
    fn from_parts(tx: PendingTransaction, signature: &Signature) -> Result<Self> {
        let v = tx
            .chain_id
            .checked_mul(2)
            .and_then(|x| x.checked_add(35 + signature.recovery_id() as u64))
            .ok_or(TransactionError::InvalidChainId)?;
        let r = U256::from_big_endian(signature.r.as_bytes());
        let s = U256::from_big_endian(signature.s.as_bytes());
        
        let mut encoder = Encoder::new();
        encoder.encode_list_with(|list| {
            tx.encode_fields(list);
            list.encode_u64(v);
            r.encode(list);
            s.encode(list);
        });
        let raw = Bytes::from_vec(encoder.finish());
        let hash = keccak256(&raw);
        
        Ok(Self { tx, v, r, s, hash, raw })
    }
    
    /// Decode a raw EIP-155 legacy transaction and recover its sender.
    pub fn from_raw(raw: &[u8]) -> Result<Self> {
        let mut decoder = Decoder::new(raw)?;
        let item = decoder.decode_item()?;
        let fields = item
            .as_list()
            .ok_or_else(|| TransactionError::Malformed("expected list".to_string()))?;
        if fields.len() != 9 {
            return Err(TransactionError::Malformed(format!(
                "expected 9 fields, got {}",
                fields.len()
            )));
        }
        
        let bytes = |index: usize| field_bytes(fields, index);
        let uint = |index: usize| field_uint(fields, index);
        
        let v = u64_from_item(bytes(6)?)?;
        if v < 35 {
            return Err(TransactionError::InvalidChainId);
        }
        let chain_id = (v - 35) / 2;
        let recovery_id = ((v - 35) % 2) as u8;
        let r = uint(7)?;
        let s = uint(8)?;
        
        let mut tx = PendingTransaction {
            from: Address::ZERO,
            to: Address::from_slice(bytes(3)?)
                .map_err(|e| TransactionError::Malformed(e.to_string()))?,
            data: Bytes::from_slice(bytes(5)?),
            nonce: u64_from_item(bytes(0)?)?,
            gas_limit: u64_from_item(bytes(2)?)?,
            gas_price: uint(1)?,
            chain_id,
        };
        if !uint(4)?.is_zero() {
            return Err(TransactionError::Malformed("value transfer".to_string()));
        }
        
        let signature = Signature::new(
            H256::from(r.to_be_bytes_word()),
            H256::from(s.to_be_bytes_word()),
            recovery_id + 27,
        );
        tx.from = recover_address(&tx.signing_hash(), &signature)?;
        
        let signed = Self::from_parts(tx, &signature)?;
        if signed.raw.as_slice() != raw {
            return Err(TransactionError::Malformed("non-canonical encoding".to_string()));
        }
        Ok(signed)
    }
    
    pub fn hash(&self) -> H256 {
        self.hash
    }
    
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }
    
    pub fn nonce(&self) -> u64 {
        self.tx.nonce
    }
    
    pub fn from(&self) -> Address {
        self.tx.from
    }
    
    pub fn transaction(&self) -> &PendingTransaction {
        &self.tx
    }
    
    pub fn v(&self) -> u64 {
        self.v
    }
    
    /// Recover the signing account from the signature alone.
    pub fn recover_sender(&self) -> Result<Address> {
        let recovery_id = ((self.v - 35) % 2) as u8;
        let signature = Signature::new(
            H256::from(self.r.to_be_bytes_word()),
            H256::from(self.s.to_be_bytes_word()),
            recovery_id + 27,
        );
        Ok(recover_address(&self.tx.signing_hash(), &signature)?)
    }
}

fn field_bytes(fields: &[RlpItem], index: usize) -> Result<&[u8]> {
    fields[index]
        .as_bytes()
        .ok_or_else(|| TransactionError::Malformed(format!("field {} is a list", index)))
}

fn field_uint(fields: &[RlpItem], index: usize) -> Result<U256> {
    let field = field_bytes(fields, index)?;
    if field.len() > 32 {
        return Err(TransactionError::Malformed(format!("field {} overflows", index)));
    }
    Ok(U256::from_be_bytes_vec(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::encode_adjust_score;
    use oracle_crypto::public_key_to_address;
    use secp256k1::{PublicKey, Secp256k1};
    use std::str::FromStr;
    
    fn key_and_address() -> (SecretKey, Address) {
        let key = SecretKey::from_slice(&[0x46; 32]).unwrap();
        let public_key = PublicKey::from_secret_key(&Secp256k1::new(), &key);
        (key, public_key_to_address(&public_key))
    }
    
    fn pending(from: Address) -> PendingTransaction {
        let user = Address::from_str("0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed").unwrap();
        PendingTransaction {
            from,
            to: Address::from_bytes([0x35; 20]),
            data: encode_adjust_score(&user, 64),
            nonce: 9,
            gas_limit: 250_000,
            gas_price: U256::from(20_000_000_000u64),
            chain_id: 43113,
        }
    }
    
    #[test]
    fn test_eip155_signing_vector() {
        // Reference transaction from the EIP-155 specification.
        let tx = PendingTransaction {
            from: Address::ZERO,
            to: Address::from_bytes([0x35; 20]),
            data: Bytes::new(),
            nonce: 9,
            gas_limit: 21_000,
            gas_price: U256::from(20_000_000_000u64),
            chain_id: 1,
        };
        
        let mut encoder = Encoder::new();
        encoder.encode_list_with(|list| {
            list.encode_u64(tx.nonce);
            tx.gas_price.encode(list);
            list.encode_u64(tx.gas_limit);
            tx.to.encode(list);
            U256::from(1_000_000_000_000_000_000u64).encode(list);
            tx.data.encode(list);
            list.encode_u64(1);
            list.encode_u64(0);
            list.encode_u64(0);
        });
        assert_eq!(
            format!("{:x}", keccak256(&encoder.finish())),
            "daf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53"
        );
    }
    
    #[test]
    fn test_sign_and_recover_sender() {
        let (key, address) = key_and_address();
        let signed = pending(address).sign(&key).unwrap();
        
        assert_eq!(signed.recover_sender().unwrap(), address);
        assert_eq!(signed.nonce(), 9);
        assert!(signed.v() == 43113 * 2 + 35 || signed.v() == 43113 * 2 + 36);
        assert_eq!(signed.hash(), keccak256(signed.raw()));
    }
    
    #[test]
    fn test_signing_is_deterministic() {
        let (key, address) = key_and_address();
        let first = pending(address).sign(&key).unwrap();
        let second = pending(address).sign(&key).unwrap();
        assert_eq!(first.hash(), second.hash());
        assert_eq!(first.raw(), second.raw());
    }
    
    #[test]
    fn test_sign_rejects_foreign_sender() {
        let (key, _) = key_and_address();
        let err = pending(Address::from_bytes([0x01; 20])).sign(&key).unwrap_err();
        assert!(matches!(err, TransactionError::SenderMismatch { .. }));
    }
    
    #[test]
    fn test_sign_rejects_zero_chain_id() {
        let (key, address) = key_and_address();
        let mut tx = pending(address);
        tx.chain_id = 0;
        assert!(matches!(tx.sign(&key), Err(TransactionError::InvalidChainId)));
    }
    
    #[test]
    fn test_raw_decoding_recovers_transaction() {
        let (key, address) = key_and_address();
        let signed = pending(address).sign(&key).unwrap();
        
        let decoded = SignedTransaction::from_raw(signed.raw()).unwrap();
        assert_eq!(decoded, signed);
        assert_eq!(decoded.from(), address);
        assert_eq!(decoded.transaction().chain_id, 43113);
    }
    
    #[test]
    fn test_raw_decoding_rejects_garbage() {
        assert!(SignedTransaction::from_raw(&[0xc0]).is_err());
        assert!(SignedTransaction::from_raw(&[0x83, 1, 2, 3]).is_err());
    }
}
