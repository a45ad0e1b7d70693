use anyhow::{Context, Result};
use oracle_account::KeySource;
use oracle_core::{TransactionBuilder, DEFAULT_ADJUST_SCORE_GAS};
use oracle_txpool::SubmitterConfig;
use oracle_types::Address;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Overrides `chain.rpc_url`.
pub const RPC_URL_ENV: &str = "AVAX_RPC_URL";
/// Overrides `contract.address`.
pub const CONTRACT_ADDRESS_ENV: &str = "REPUTATION_MANAGER_ADDRESS";

/// Complete oracle configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Chain RPC configuration
    pub chain: ChainConfig,
    /// Reputation contract configuration
    pub contract: ContractConfig,
    /// Oracle key configuration
    pub oracle: OracleConfig,
    /// Broadcast and confirmation policy
    pub submitter: SubmitterSection,
    /// Scoring model configuration
    pub model: ModelConfig,
    /// Logging configuration
    pub log: LogConfig,
    /// Metrics configuration
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Per-request deadline; a submission still in flight when it passes
    /// continues in the background.
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub rpc_url: String,
    /// Checked against `eth_chainId` at startup when set.
    pub chain_id: Option<u64>,
    pub rpc_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Reputation contract address
    pub address: String,
    pub gas_limit: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Environment variable holding the hex private key
    pub private_key_env: String,
    /// File holding the hex private key; takes precedence over the env var
    pub private_key_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitterSection {
    pub max_broadcast_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub poll_interval_ms: u64,
    pub receipt_timeout_secs: u64,
    pub confirmations: u64,
    /// Submissions kept for `/submissions` lookups
    pub ledger_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// JSON model artifact
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level
    pub level: String,
    /// Emit JSON lines
    pub json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Serve `/metrics`
    pub enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            request_timeout_secs: 150,
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:9650/ext/bc/C/rpc".to_string(),
            chain_id: None,
            rpc_timeout_secs: 10,
        }
    }
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            gas_limit: DEFAULT_ADJUST_SCORE_GAS,
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            private_key_env: "ORACLE_PRIVATE_KEY".to_string(),
            private_key_file: None,
        }
    }
}

impl Default for SubmitterSection {
    fn default() -> Self {
        Self {
            max_broadcast_attempts: 3,
            backoff_base_ms: 250,
            backoff_max_ms: 4_000,
            poll_interval_ms: 1_000,
            receipt_timeout_secs: 120,
            confirmations: 2,
            ledger_capacity: 10_000,
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("models/credit_model.json"),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl OracleConfig {
    pub fn key_source(&self) -> KeySource {
        match &self.private_key_file {
            Some(path) => KeySource::File(path.clone()),
            None => KeySource::Env(self.private_key_env.clone()),
        }
    }
}

impl SubmitterSection {
    pub fn to_submitter_config(&self) -> SubmitterConfig {
        SubmitterConfig {
            max_broadcast_attempts: self.max_broadcast_attempts,
            backoff_base: Duration::from_millis(self.backoff_base_ms),
            backoff_max: Duration::from_millis(self.backoff_max_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            receipt_timeout: Duration::from_secs(self.receipt_timeout_secs),
            confirmations: self.confirmations,
        }
    }
}

impl ContractConfig {
    pub fn contract_address(&self) -> Result<Address> {
        if self.address.trim().is_empty() {
            anyhow::bail!(
                "contract.address is not set (set it in the config file or via {})",
                CONTRACT_ADDRESS_ENV
            );
        }
        TransactionBuilder::parse_user(&self.address)
            .with_context(|| format!("Invalid contract address {}", self.address))
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context("Failed to read configuration file")?;
        
        let config: Config = toml::from_str(&content)
            .context("Failed to parse configuration")?;
        
        Ok(config)
    }
    
    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;
        
        fs::write(path, content)
            .context("Failed to write configuration file")?;
        
        Ok(())
    }
    
    /// File (or defaults), then environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }
    
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(RPC_URL_ENV).filter(|v| !v.is_empty()) {
            self.chain.rpc_url = url;
        }
        if let Some(address) = lookup(CONTRACT_ADDRESS_ENV).filter(|v| !v.is_empty()) {
            self.contract.address = address;
        }
    }
    
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.request_timeout_secs == 0 {
            anyhow::bail!("server.request_timeout_secs must be greater than 0");
        }
        
        if !(self.chain.rpc_url.starts_with("http://") || self.chain.rpc_url.starts_with("https://")) {
            anyhow::bail!("chain.rpc_url must be an http(s) URL, got {:?}", self.chain.rpc_url);
        }
        if self.chain.chain_id == Some(0) {
            anyhow::bail!("chain.chain_id must not be 0");
        }
        if self.chain.rpc_timeout_secs == 0 {
            anyhow::bail!("chain.rpc_timeout_secs must be greater than 0");
        }
        
        self.contract.contract_address()?;
        if self.contract.gas_limit < 21_000 {
            anyhow::bail!("contract.gas_limit must be at least 21000");
        }
        
        let submitter = &self.submitter;
        if submitter.max_broadcast_attempts == 0 {
            anyhow::bail!("submitter.max_broadcast_attempts must be greater than 0");
        }
        if submitter.backoff_base_ms > submitter.backoff_max_ms {
            anyhow::bail!("submitter.backoff_base_ms must not exceed backoff_max_ms");
        }
        if submitter.poll_interval_ms == 0 || submitter.receipt_timeout_secs == 0 {
            anyhow::bail!("submitter.poll_interval_ms and receipt_timeout_secs must be greater than 0");
        }
        if submitter.confirmations == 0 {
            anyhow::bail!("submitter.confirmations must be at least 1");
        }
        if submitter.ledger_capacity == 0 {
            anyhow::bail!("submitter.ledger_capacity must be greater than 0");
        }
        
        Ok(())
    }
}
