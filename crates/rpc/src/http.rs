use async_trait::async_trait;
use oracle_core::Receipt;
use oracle_types::{Address, Bytes, H256, U256};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::client::{BlockTag, ChainClient};
use crate::types::{parse_h256, parse_quantity, parse_u256_quantity, RpcReceipt, RpcRequest, RpcResponse};
use crate::{Result, RpcError};

/// JSON-RPC over HTTP against a single node endpoint.
pub struct HttpChainClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpChainClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport {
                message: e.to_string(),
                request_sent: false,
            })?;
        
        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }
    
    pub fn url(&self) -> &str {
        &self.url
    }
    
    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest::new(id, method, params);
        debug!("rpc call {} id={}", method, id);
        
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;
        
        let body: RpcResponse = response.json().await.map_err(|e| {
            if e.is_decode() {
                RpcError::MalformedResponse(e.to_string())
            } else {
                transport_error(e)
            }
        })?;
        
        if let Some(error) = body.error {
            return Err(RpcError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        
        let result = body.result.unwrap_or(Value::Null);
        serde_json::from_value(result)
            .map_err(|e| RpcError::MalformedResponse(format!("{}: {}", method, e)))
    }
}

/// Only connection failures are known not to have delivered the request.
fn transport_error(e: reqwest::Error) -> RpcError {
    RpcError::Transport {
        request_sent: !(e.is_connect() || e.is_builder()),
        message: e.to_string(),
    }
}

fn address_param(address: &Address) -> String {
    format!("0x{}", hex::encode(address.as_bytes()))
}

#[async_trait]
impl ChainClient for HttpChainClient {
    async fn chain_id(&self) -> Result<u64> {
        let id: String = self.call("eth_chainId", json!([])).await?;
        parse_quantity(&id)
    }
    
    async fn transaction_count(&self, address: Address, block: BlockTag) -> Result<u64> {
        let count: String = self
            .call(
                "eth_getTransactionCount",
                json!([address_param(&address), block.as_str()]),
            )
            .await?;
        parse_quantity(&count)
    }
    
    async fn gas_price(&self) -> Result<U256> {
        let price: String = self.call("eth_gasPrice", json!([])).await?;
        parse_u256_quantity(&price)
    }
    
    async fn block_number(&self) -> Result<u64> {
        let number: String = self.call("eth_blockNumber", json!([])).await?;
        parse_quantity(&number)
    }
    
    async fn send_raw_transaction(&self, raw: &Bytes) -> Result<H256> {
        let hash: String = self
            .call("eth_sendRawTransaction", json!([raw.to_hex()]))
            .await?;
        parse_h256(&hash)
    }
    
    async fn transaction_receipt(&self, hash: H256) -> Result<Option<Receipt>> {
        let receipt: Option<RpcReceipt> = self
            .call("eth_getTransactionReceipt", json!([format!("{:#x}", hash)]))
            .await?;
        
        match receipt {
            // Some nodes return a receipt shell before the block is sealed.
            Some(receipt) if receipt.block_number.is_none() => Ok(None),
            Some(receipt) => receipt.into_receipt().map(Some),
            None => Ok(None),
        }
    }
}
