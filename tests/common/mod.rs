#![allow(dead_code)]

use oracle_account::OracleAccount;
use oracle_rpc::mock::MockChain;
use reputation_oracle::config::Config;
use reputation_oracle::error::{OracleError, Result};
use reputation_oracle::scoring::{CreditModel, FeatureVector};
use reputation_oracle::{service, AppState};
use std::sync::Arc;

pub const CHAIN_ID: u64 = 43113;
pub const CONTRACT: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
pub const USER: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";
pub const ORACLE_KEY: &str = "4646464646464646464646464646464646464646464646464646464646464646";
pub const START_NONCE: u64 = 7;

/// Reads the probability straight from the `probability` feature.
pub struct PassthroughModel;

impl CreditModel for PassthroughModel {
    fn predict_default_probability(&self, features: &FeatureVector) -> Result<f64> {
        features
            .get("probability")
            .ok_or_else(|| OracleError::Scoring("missing feature 'probability'".to_string()))
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.contract.address = CONTRACT.to_string();
    config.chain.chain_id = Some(CHAIN_ID);
    config.server.request_timeout_secs = 30;
    config.submitter.backoff_base_ms = 10;
    config.submitter.backoff_max_ms = 40;
    config.submitter.poll_interval_ms = 20;
    config.submitter.receipt_timeout_secs = 2;
    config.submitter.confirmations = 1;
    config
}

pub fn oracle_account() -> OracleAccount {
    OracleAccount::from_hex(ORACLE_KEY).unwrap()
}

pub async fn setup_with(config: Config) -> (AppState, Arc<MockChain>) {
    let chain = Arc::new(MockChain::new(CHAIN_ID));
    chain.set_nonce(oracle_account().address(), START_NONCE);
    
    let context = service::initialize_account(&config, oracle_account(), chain.as_ref())
        .await
        .unwrap();
    let state = service::assemble(&config, context, chain.clone(), Arc::new(PassthroughModel)).unwrap();
    (state, chain)
}

pub async fn setup() -> (AppState, Arc<MockChain>) {
    setup_with(test_config()).await
}

pub fn body(probability: f64) -> serde_json::Value {
    serde_json::json!({
        "features": { "probability": probability, "income": 52000 },
        "user": USER,
    })
}
