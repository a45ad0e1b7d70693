use anyhow::{Context, Result};
use oracle_account::{LocalSigner, OracleAccount, Signer};
use oracle_monitor::Monitor;
use oracle_rpc::{ChainClient, HttpChainClient};
use oracle_txpool::{SubmissionLedger, Submitter};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::Config;
use crate::context::OracleAccountContext;
use crate::endpoint::InferenceEndpoint;
use crate::scoring::{CreditModel, LogisticModel};
use crate::server::{self, AppState};

/// Chain-facing half of startup: chain id check and nonce seeding.
pub async fn initialize_account(
    config: &Config,
    account: OracleAccount,
    client: &dyn ChainClient,
) -> Result<OracleAccountContext> {
    let contract = config.contract.contract_address()?;
    let signer: Arc<dyn Signer> = Arc::new(LocalSigner::new(account));
    
    OracleAccountContext::initialize(
        signer,
        client,
        contract,
        config.contract.gas_limit,
        config.chain.chain_id,
    )
    .await
}

/// Build the shared request state from initialized parts.
pub fn assemble(
    config: &Config,
    context: OracleAccountContext,
    client: Arc<dyn ChainClient>,
    model: Arc<dyn CreditModel>,
) -> Result<AppState> {
    let submitter = Arc::new(Submitter::new(
        Arc::clone(&client),
        config.submitter.to_submitter_config(),
    ));
    let ledger = Arc::new(SubmissionLedger::new(config.submitter.ledger_capacity));
    
    let mut endpoint = InferenceEndpoint::new(
        model,
        Arc::new(context),
        client,
        submitter,
        ledger,
        Duration::from_secs(config.server.request_timeout_secs),
    );
    
    let monitor = if config.metrics.enabled {
        let monitor = Arc::new(Monitor::new().context("Failed to create metrics registry")?);
        endpoint = endpoint.with_metrics(monitor.metrics());
        Some(monitor)
    } else {
        None
    };
    
    Ok(AppState {
        endpoint: Arc::new(endpoint),
        monitor,
    })
}

/// Startup sequence for `serve`: key, chain checks, model, then HTTP.
pub async fn run(config: Config) -> Result<()> {
    let account = config
        .oracle
        .key_source()
        .load()
        .context("Failed to load oracle private key")?;
    info!(address = %account.address(), "Loaded oracle account");
    
    let client: Arc<dyn ChainClient> = Arc::new(
        HttpChainClient::new(
            config.chain.rpc_url.clone(),
            Duration::from_secs(config.chain.rpc_timeout_secs),
        )
        .context("Failed to create RPC client")?,
    );
    info!("Using RPC endpoint {}", config.chain.rpc_url);
    
    let context = initialize_account(&config, account, client.as_ref()).await?;
    
    let model: Arc<dyn CreditModel> = Arc::new(
        LogisticModel::from_file(&config.model.path).context("Failed to load scoring model")?,
    );
    info!("Loaded scoring model from {}", config.model.path.display());
    
    let state = assemble(&config, context, client, model)?;
    
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    server::serve(addr, state).await
}
