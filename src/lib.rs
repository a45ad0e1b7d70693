// Core modules
pub mod config;
pub mod context;
pub mod endpoint;
pub mod error;
pub mod scoring;
pub mod server;
pub mod service;

// Re-export commonly used types
pub use config::Config;
pub use context::OracleAccountContext;
pub use endpoint::{InferenceEndpoint, Prediction, PredictionRequest};
pub use error::OracleError;
pub use scoring::{CreditModel, FeatureVector, LogisticModel, ModelArtifact, ScoreMapper};
pub use server::AppState;

// Re-export crate modules
pub use oracle_account as account;
pub use oracle_core as core;
pub use oracle_crypto as crypto;
pub use oracle_monitor as monitor;
pub use oracle_rlp as rlp;
pub use oracle_rpc as rpc;
pub use oracle_txpool as txpool;
pub use oracle_types as types;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get client version string
pub fn client_version() -> String {
    format!("reputation-oracle/v{}/rust", VERSION)
}
