// src/network/submitter.rs
//! Transaction submission
//!
//! Turns a winning candidate into a signed mint transaction, broadcasts
//! it, and classifies the outcome. No retries happen here; a failed
//! submission is reported and the worker goes back to searching.

use crate::config::MiningConfig;
use crate::miner::search::Candidate;
use crate::network::rpc::RpcClient;
use crate::network::transaction::{LegacyTransaction, SignedTransaction};
use crate::utils::error::MinerError;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Outcome of one submission attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionResult {
    /// The network accepted the transaction; carries its hash
    Success(String),
    /// The network refused or reverted the transaction; carries the reason
    Rejected(String),
    /// The call could not complete (timeout, connection, malformed response)
    TransportError(String),
}

impl SubmissionResult {
    /// Classifies a failure that happened before the transaction reached the node
    ///
    /// Nothing was broadcast yet, so even node-side errors only mean the
    /// submission could not be completed.
    pub fn before_broadcast(error: MinerError) -> Self {
        SubmissionResult::TransportError(error.to_string())
    }

    /// Classifies the reply to `eth_sendRawTransaction`
    ///
    /// A JSON-RPC error object is the node refusing the transaction; any
    /// other failure is a transport problem.
    pub fn from_broadcast(result: Result<String, MinerError>) -> Self {
        match result {
            Ok(hash) => SubmissionResult::Success(hash),
            Err(MinerError::RpcError { message, .. }) => SubmissionResult::Rejected(message),
            Err(e) => SubmissionResult::TransportError(e.to_string()),
        }
    }
}

impl fmt::Display for SubmissionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionResult::Success(hash) => write!(f, "success: {}", hash),
            SubmissionResult::Rejected(reason) => write!(f, "rejected: {}", reason),
            SubmissionResult::TransportError(reason) => write!(f, "transport error: {}", reason),
        }
    }
}

/// Builds, signs and broadcasts the mint for a winning candidate
///
/// Implementations must not retry; the worker decides what happens next.
pub trait Submitter: Send + Sync {
    /// Submits `candidate` under `config`
    fn submit(
        &self,
        config: &MiningConfig,
        candidate: &Candidate,
    ) -> impl Future<Output = SubmissionResult> + Send;
}

/// Gas price actually offered: `base * premium_percent / 100`
///
/// `None` on overflow.
pub fn premium_gas_price(base: u128, premium_percent: u64) -> Option<u128> {
    base.checked_mul(premium_percent as u128).map(|v| v / 100)
}

/// Submitter that talks to an Ethereum node over JSON-RPC
pub struct ChainSubmitter {
    rpc: RpcClient,
    chain_id: OnceCell<u64>,
    confirm_receipts: bool,
    receipt_timeout: Duration,
    receipt_poll: Duration,
}

impl ChainSubmitter {
    /// Creates a submitter for the endpoint and timeouts in `config`
    pub fn new(config: &MiningConfig) -> Result<Self, MinerError> {
        let rpc = RpcClient::new(config.endpoint()?, config.request_timeout)?;
        log::info!(
            "Submitting from {} via {}",
            config.signing_key.address_hex(),
            rpc.url()
        );

        Ok(ChainSubmitter {
            rpc,
            chain_id: OnceCell::new(),
            confirm_receipts: config.confirm_receipts,
            receipt_timeout: config.receipt_timeout,
            receipt_poll: Duration::from_secs(2),
        })
    }

    /// Chain id of the endpoint, fetched once
    async fn chain_id(&self) -> Result<u64, MinerError> {
        self.chain_id
            .get_or_try_init(|| self.rpc.chain_id())
            .await
            .copied()
    }

    /// Builds and signs the transaction for `candidate`
    async fn prepare(
        &self,
        config: &MiningConfig,
        candidate: &Candidate,
    ) -> Result<SignedTransaction, MinerError> {
        let address = config.signing_key.address();
        let (base_price, account_nonce, chain_id) = futures::try_join!(
            self.rpc.gas_price(),
            self.rpc.transaction_count(&address),
            self.chain_id()
        )?;

        let gas_price = premium_gas_price(base_price, config.gas_premium).ok_or_else(|| {
            MinerError::ProtocolError(format!("gas price {} overflows with premium", base_price))
        })?;
        log::debug!(
            "nonce {} -> account nonce {}, gas price {} (base {})",
            candidate.nonce,
            account_nonce,
            gas_price,
            base_price
        );

        LegacyTransaction::mint(config, candidate, account_nonce, gas_price, chain_id)
            .sign(&config.signing_key)
    }

    /// Waits for the receipt of `hash`
    ///
    /// Returns the revert reason when the transaction was mined with status
    /// 0, `None` when it succeeded or no receipt showed up in time.
    async fn await_receipt(&self, hash: &str) -> Option<String> {
        let poll = async {
            loop {
                tokio::time::sleep(self.receipt_poll).await;
                match self.rpc.transaction_receipt(hash).await {
                    Ok(Some(receipt)) => return receipt_failure(&receipt),
                    Ok(None) => continue,
                    Err(e) => log::debug!("receipt poll for {} failed: {}", hash, e),
                }
            }
        };

        match tokio::time::timeout(self.receipt_timeout, poll).await {
            Ok(failure) => failure,
            Err(_) => {
                log::warn!("No receipt for {} after {:?}", hash, self.receipt_timeout);
                None
            }
        }
    }
}

/// Revert reason of a mined receipt, if it failed
fn receipt_failure(receipt: &Value) -> Option<String> {
    match receipt["status"].as_str() {
        Some("0x0") => Some("execution reverted".to_string()),
        _ => None,
    }
}

impl Submitter for ChainSubmitter {
    async fn submit(&self, config: &MiningConfig, candidate: &Candidate) -> SubmissionResult {
        let signed = match self.prepare(config, candidate).await {
            Ok(signed) => signed,
            Err(e) => return SubmissionResult::before_broadcast(e),
        };

        let result =
            SubmissionResult::from_broadcast(self.rpc.send_raw_transaction(&signed.raw).await);

        if let SubmissionResult::Success(hash) = &result {
            if !hash.eq_ignore_ascii_case(&signed.hash_hex()) {
                log::warn!("Node returned {} for local hash {}", hash, signed.hash_hex());
            }
            if self.confirm_receipts {
                if let Some(reason) = self.await_receipt(hash).await {
                    return SubmissionResult::Rejected(format!("{} ({})", reason, hash));
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::miner::algorithm::keccak256;
    use crate::miner::algorithm::testing::raw_config;
    use serde_json::json;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    type Handler = Arc<dyn Fn(&str, &Value) -> String + Send + Sync>;

    /// Requests seen by a [`MockNode`], in arrival order
    type Requests = Arc<Mutex<Vec<Value>>>;

    /// HTTP JSON-RPC endpoint answering each request through a handler
    struct MockNode {
        url: String,
        requests: Requests,
    }

    impl MockNode {
        async fn spawn(handler: impl Fn(&str, &Value) -> String + Send + Sync + 'static) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let url = format!("http://{}/", listener.local_addr().unwrap());
            let handler: Handler = Arc::new(handler);
            let requests = Requests::default();

            let seen = Arc::clone(&requests);
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    tokio::spawn(serve(stream, Arc::clone(&handler), Arc::clone(&seen)));
                }
            });
            MockNode { url, requests }
        }

        fn calls_of(&self, method: &str) -> Vec<Value> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r["method"] == method)
                .cloned()
                .collect()
        }
    }

    /// Answers keep-alive HTTP/1.1 requests until the client hangs up
    async fn serve(mut stream: TcpStream, handler: Handler, requests: Requests) {
        let mut buf = Vec::new();
        loop {
            let header_end = loop {
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
                if !read_more(&mut stream, &mut buf).await {
                    return;
                }
            };
            let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
            let length = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while buf.len() < header_end + length {
                if !read_more(&mut stream, &mut buf).await {
                    return;
                }
            }

            let request: Value = serde_json::from_slice(&buf[header_end..header_end + length]).unwrap();
            buf.drain(..header_end + length);
            let method = request["method"].as_str().unwrap_or_default().to_string();
            let body = handler(method.as_str(), &request);
            requests.lock().unwrap().push(request);

            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n{}",
                body.len(),
                body
            );
            if stream.write_all(response.as_bytes()).await.is_err() {
                return;
            }
        }
    }

    async fn read_more(stream: &mut TcpStream, buf: &mut Vec<u8>) -> bool {
        let mut chunk = [0u8; 4096];
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => false,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                true
            }
        }
    }

    fn result(request: &Value, result: Value) -> String {
        json!({"jsonrpc": "2.0", "id": request["id"], "result": result}).to_string()
    }

    /// Node state every mint needs: 1 gwei gas, account nonce 5, Sepolia
    fn account_state(method: &str, request: &Value) -> Option<String> {
        match method {
            "eth_gasPrice" => Some(result(request, json!("0x3b9aca00"))),
            "eth_getTransactionCount" => Some(result(request, json!("0x5"))),
            "eth_chainId" => Some(result(request, json!("0xaa36a7"))),
            _ => None,
        }
    }

    /// Answers `eth_sendRawTransaction` with the keccak hash of the raw bytes
    fn accept_broadcast(request: &Value) -> String {
        let raw = request["params"][0].as_str().unwrap();
        let bytes = hex::decode(raw.trim_start_matches("0x")).unwrap();
        result(request, json!(format!("0x{}", hex::encode(keccak256(&bytes)))))
    }

    fn node_config(node: &MockNode, confirm_receipts: bool) -> MiningConfig {
        Config {
            rpc_url: Some(node.url.clone()),
            request_timeout_secs: Some(5),
            confirm_receipts: Some(confirm_receipts),
            ..raw_config("0xffff")
        }
        .validate()
        .unwrap()
    }

    fn candidate(nonce: u64) -> Candidate {
        Candidate { nonce, digest: [0; 32] }
    }

    #[test]
    fn premium_multiplies_in_percent() {
        assert_eq!(premium_gas_price(1_000_000_000, 110), Some(1_100_000_000));
        assert_eq!(premium_gas_price(20_000_000_000, 100), Some(20_000_000_000));
        assert_eq!(premium_gas_price(u128::MAX, 110), None);
    }

    #[test]
    fn broadcast_classification() {
        assert_eq!(
            SubmissionResult::from_broadcast(Ok("0xabc".into())),
            SubmissionResult::Success("0xabc".into())
        );
        assert_eq!(
            SubmissionResult::from_broadcast(Err(MinerError::RpcError {
                code: -32000,
                message: "nonce too low".into()
            })),
            SubmissionResult::Rejected("nonce too low".into())
        );
        assert!(matches!(
            SubmissionResult::from_broadcast(Err(MinerError::ProtocolError("garbage".into()))),
            SubmissionResult::TransportError(_)
        ));
    }

    #[test]
    fn node_errors_before_broadcast_are_transport_errors() {
        let result = SubmissionResult::before_broadcast(MinerError::RpcError {
            code: -32601,
            message: "method not found".into(),
        });
        assert!(matches!(result, SubmissionResult::TransportError(_)));
    }

    #[test]
    fn reverted_receipt_is_a_failure() {
        assert_eq!(
            receipt_failure(&json!({"status": "0x0"})),
            Some("execution reverted".to_string())
        );
        assert_eq!(receipt_failure(&json!({"status": "0x1"})), None);
    }

    #[tokio::test]
    async fn unreachable_node_is_a_transport_error() {
        let config = Config {
            rpc_url: Some("http://127.0.0.1:9".into()),
            request_timeout_secs: Some(2),
            ..raw_config("0xffff")
        }
        .validate()
        .unwrap();
        let submitter = ChainSubmitter::new(&config).unwrap();
        let candidate = Candidate { nonce: 1, digest: [0; 32] };

        let result = submitter.submit(&config, &candidate).await;
        assert!(
            matches!(result, SubmissionResult::TransportError(_)),
            "got {:?}",
            result
        );
    }

    #[tokio::test]
    async fn accepted_broadcast_carries_premium_gas_and_payload() {
        let node = MockNode::spawn(|method, request| {
            account_state(method, request).unwrap_or_else(|| accept_broadcast(request))
        })
        .await;
        let config = node_config(&node, false);
        let submitter = ChainSubmitter::new(&config).unwrap();

        let first = submitter.submit(&config, &candidate(77)).await;
        let second = submitter.submit(&config, &candidate(78)).await;

        let broadcasts = node.calls_of("eth_sendRawTransaction");
        assert_eq!(broadcasts.len(), 2);
        let raw = broadcasts[0]["params"][0].as_str().unwrap().to_string();
        let bytes = hex::decode(raw.trim_start_matches("0x")).unwrap();
        assert_eq!(
            first,
            SubmissionResult::Success(format!("0x{}", hex::encode(keccak256(&bytes))))
        );
        assert!(matches!(second, SubmissionResult::Success(_)));

        // 1 gwei * 110 / 100, RLP-encoded
        assert!(raw.contains("844190ab00"), "{}", raw);
        assert!(raw.contains(&hex::encode(config.inscription.payload(77))));

        let count = &node.calls_of("eth_getTransactionCount")[0];
        assert_eq!(
            count["params"],
            json!(["0x2c7536e3605d9c16a7a3d7b1898e529396a65c23", "pending"])
        );
        assert_eq!(node.calls_of("eth_chainId").len(), 1, "chain id is fetched once");
    }

    #[tokio::test]
    async fn node_error_object_is_a_rejection_with_its_reason() {
        let node = MockNode::spawn(|method, request| {
            account_state(method, request).unwrap_or_else(|| {
                json!({
                    "jsonrpc": "2.0",
                    "id": request["id"],
                    "error": {"code": -32000, "message": "insufficient funds for gas * price + value"}
                })
                .to_string()
            })
        })
        .await;
        let config = node_config(&node, false);
        let submitter = ChainSubmitter::new(&config).unwrap();

        assert_eq!(
            submitter.submit(&config, &candidate(1)).await,
            SubmissionResult::Rejected("insufficient funds for gas * price + value".into())
        );
    }

    #[tokio::test]
    async fn malformed_broadcast_reply_is_a_transport_error() {
        let node = MockNode::spawn(|method, request| {
            account_state(method, request).unwrap_or_else(|| "{not json".to_string())
        })
        .await;
        let config = node_config(&node, false);
        let submitter = ChainSubmitter::new(&config).unwrap();

        let result = submitter.submit(&config, &candidate(1)).await;
        assert!(
            matches!(result, SubmissionResult::TransportError(_)),
            "got {:?}",
            result
        );
        assert_eq!(node.calls_of("eth_sendRawTransaction").len(), 1);
    }

    #[tokio::test]
    async fn reverted_receipt_turns_success_into_rejection() {
        let node = MockNode::spawn(|method, request| match method {
            "eth_sendRawTransaction" => result(request, json!("0xabc")),
            "eth_getTransactionReceipt" => result(request, json!({"status": "0x0"})),
            _ => account_state(method, request).unwrap(),
        })
        .await;
        let config = node_config(&node, true);
        let mut submitter = ChainSubmitter::new(&config).unwrap();
        submitter.receipt_poll = Duration::from_millis(10);

        assert_eq!(
            submitter.submit(&config, &candidate(1)).await,
            SubmissionResult::Rejected("execution reverted (0xabc)".into())
        );
        assert_eq!(
            node.calls_of("eth_getTransactionReceipt")[0]["params"],
            json!(["0xabc"])
        );
    }

    #[tokio::test]
    async fn missing_receipt_keeps_the_success() {
        let node = MockNode::spawn(|method, request| match method {
            "eth_sendRawTransaction" => result(request, json!("0xabc")),
            "eth_getTransactionReceipt" => result(request, Value::Null),
            _ => account_state(method, request).unwrap(),
        })
        .await;
        let config = node_config(&node, true);
        let mut submitter = ChainSubmitter::new(&config).unwrap();
        submitter.receipt_poll = Duration::from_millis(10);
        submitter.receipt_timeout = Duration::from_millis(100);

        assert_eq!(
            submitter.submit(&config, &candidate(1)).await,
            SubmissionResult::Success("0xabc".into())
        );
        assert!(!node.calls_of("eth_getTransactionReceipt").is_empty());
    }
}
