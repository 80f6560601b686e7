// src/network/rpc.rs
use crate::utils::error::MinerError;
use reqwest::Client;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use url::Url;

/// Minimal Ethereum JSON-RPC client over HTTP
///
/// Only the handful of methods a mint needs. Request timeouts are enforced
/// by the underlying HTTP client.
#[derive(Debug)]
pub struct RpcClient {
    /// Endpoint every request is posted to
    url: Url,
    /// HTTP client for making RPC requests
    client: Client,
    /// Request id counter
    next_id: AtomicU64,
}

impl RpcClient {
    /// Creates a client for `url` with a per-request `timeout`
    pub fn new(url: Url, timeout: Duration) -> Result<Self, MinerError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("ierc_miner-rs/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(RpcClient {
            url,
            client,
            next_id: AtomicU64::new(1),
        })
    }

    /// Endpoint of this client
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Current gas price in wei (`eth_gasPrice`)
    pub async fn gas_price(&self) -> Result<u128, MinerError> {
        let result = self.call("eth_gasPrice", json!([])).await?;
        parse_quantity(&result)
    }

    /// Pending transaction count of `address` (`eth_getTransactionCount`)
    pub async fn transaction_count(&self, address: &[u8; 20]) -> Result<u64, MinerError> {
        let result = self
            .call(
                "eth_getTransactionCount",
                json!([format!("0x{}", hex::encode(address)), "pending"]),
            )
            .await?;
        u64::try_from(parse_quantity(&result)?)
            .map_err(|_| MinerError::ProtocolError("transaction count out of range".into()))
    }

    /// Chain id of the endpoint (`eth_chainId`)
    pub async fn chain_id(&self) -> Result<u64, MinerError> {
        let result = self.call("eth_chainId", json!([])).await?;
        u64::try_from(parse_quantity(&result)?)
            .map_err(|_| MinerError::ProtocolError("chain id out of range".into()))
    }

    /// Broadcasts a signed transaction, returning its hash
    pub async fn send_raw_transaction(&self, raw: &[u8]) -> Result<String, MinerError> {
        let result = self
            .call(
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(raw))]),
            )
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| MinerError::ProtocolError("transaction hash is not a string".into()))
    }

    /// Receipt of `hash`, or `None` while it is still pending
    pub async fn transaction_receipt(&self, hash: &str) -> Result<Option<Value>, MinerError> {
        let result = self.call("eth_getTransactionReceipt", json!([hash])).await?;
        Ok(if result.is_null() { None } else { Some(result) })
    }

    /// Makes an RPC call to the node
    ///
    /// # Returns
    /// * `Ok(Value)` - The `result` member of the response (may be `null`)
    /// * `Err(MinerError::RpcError)` - The node answered with an error object
    /// * `Err(MinerError)` - Transport or decoding failure
    async fn call(&self, method: &str, params: Value) -> Result<Value, MinerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let response: Value = self
            .client
            .post(self.url.clone())
            .json(&json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params
            }))
            .send()
            .await?
            .json()
            .await?;

        log::debug!("{} -> {}", method, response);
        extract_result(response)
    }
}

/// Splits a JSON-RPC response into its result or error
pub fn extract_result(mut response: Value) -> Result<Value, MinerError> {
    if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
        return Err(MinerError::RpcError {
            code: error["code"].as_i64().unwrap_or_default(),
            message: error["message"]
                .as_str()
                .unwrap_or("unknown error")
                .to_string(),
        });
    }

    match response.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(MinerError::ProtocolError(
            "response has neither result nor error".into(),
        )),
    }
}

/// Parses a hex quantity such as `"0x4a817c800"`
pub fn parse_quantity(value: &Value) -> Result<u128, MinerError> {
    let text = value
        .as_str()
        .ok_or_else(|| MinerError::ProtocolError(format!("expected hex quantity, got {}", value)))?;
    let digits = text
        .strip_prefix("0x")
        .ok_or_else(|| MinerError::ProtocolError(format!("quantity '{}' lacks 0x", text)))?;
    if digits.is_empty() {
        return Err(MinerError::ProtocolError("empty quantity".into()));
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| MinerError::ProtocolError(format!("bad quantity '{}': {}", text, e)))
}
