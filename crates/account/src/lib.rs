use oracle_types::Address;
use oracle_crypto::{public_key_to_address, secret_key_from_hex};
use secp256k1::{PublicKey, Secp256k1, SecretKey};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod signer;

pub use signer::{LocalSigner, Signer};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    
    #[error("Key source not available: {0}")]
    KeySourceUnavailable(String),
    
    #[error("Signing error: {0}")]
    SigningError(String),
    
    #[error("IO error reading key file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, AccountError>;

/// Where the oracle's private key comes from. The key never lives in the
/// config file itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Hex-encoded key in the named environment variable.
    Env(String),
    /// Hex-encoded key in a file (trailing whitespace ignored).
    File(PathBuf),
}

impl KeySource {
    pub fn load(&self) -> Result<OracleAccount> {
        let encoded = match self {
            KeySource::Env(var) => std::env::var(var)
                .map_err(|_| AccountError::KeySourceUnavailable(format!("env var {} is not set", var)))?,
            KeySource::File(path) => read_key_file(path)?,
        };
        OracleAccount::from_hex(&encoded)
    }
}

fn read_key_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| AccountError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// The oracle's signing identity: private key plus the derived address.
///
/// `Debug` prints the address only.
#[derive(Clone)]
pub struct OracleAccount {
    address: Address,
    private_key: SecretKey,
}

impl OracleAccount {
    /// Create account from private key
    pub fn from_private_key(private_key: SecretKey) -> Self {
        let secp = Secp256k1::signing_only();
        let public_key = PublicKey::from_secret_key(&secp, &private_key);
        let address = public_key_to_address(&public_key);
        
        Self {
            address,
            private_key,
        }
    }
    
    /// Create account from a hex-encoded private key
    pub fn from_hex(key: &str) -> Result<Self> {
        let private_key = secret_key_from_hex(key).map_err(|_| AccountError::InvalidPrivateKey)?;
        Ok(Self::from_private_key(private_key))
    }
    
    /// Create a new random account
    pub fn random() -> Self {
        Self::from_private_key(oracle_crypto::generate_private_key())
    }
    
    /// Get account address
    pub fn address(&self) -> Address {
        self.address
    }
    
    pub(crate) fn private_key(&self) -> &SecretKey {
        &self.private_key
    }
}

impl fmt::Debug for OracleAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleAccount")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
