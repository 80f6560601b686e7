// src/utils/error.rs
use crate::miner::worker::WorkerEvent;
use serde_json;
use std::io;
use thiserror::Error;
use url;

/// Main error type for the mining application
///
/// This enum represents all possible error conditions that can occur
/// while configuring a run, talking to the RPC node, or signing
/// transactions. Submission outcomes are not errors; they are reported
/// through [`crate::network::SubmissionResult`].
#[derive(Error, Debug)]
pub enum MinerError {
    /// Errors raised by a digest algorithm
    #[error("Algorithm error: {0}")]
    AlgorithmError(String),

    /// Errors in protocol handling or invalid protocol messages
    #[error("Protocol violation: {0}")]
    ProtocolError(String),

    /// JSON-RPC error object returned by the node
    #[error("RPC error {code}: {message}")]
    RpcError {
        /// JSON-RPC error code
        code: i64,
        /// Message as reported by the node
        message: String,
    },

    /// Standard I/O operation errors
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    /// HTTP request/response errors
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Configuration file or parameter errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Thread communication channel errors
    #[error("Thread communication error: {0}")]
    ChannelError(String),

    /// Invalid user input or parameter errors
    #[error("Invalid input: {0}")]
    InputError(String),

    /// Cryptographic operation errors
    #[error("Cryptographic error: {0}")]
    CryptoError(String),

    /// Async task execution errors
    #[error("Task execution error: {0}")]
    TaskError(String),
}

/// Converts crossbeam channel send errors for worker events into MinerError
///
/// Raised when the pool listener has gone away while a worker still holds
/// a sender.
impl From<crossbeam_channel::SendError<WorkerEvent>> for MinerError {
    fn from(e: crossbeam_channel::SendError<WorkerEvent>) -> Self {
        MinerError::ChannelError(format!("Event send failed: {}", e))
    }
}

/// Converts hex decoding errors into MinerError
///
/// Used when invalid hex data is encountered in the signing key, the
/// difficulty target, or RPC quantities.
impl From<hex::FromHexError> for MinerError {
    fn from(e: hex::FromHexError) -> Self {
        MinerError::InputError(format!("Hex conversion failed: {}", e))
    }
}

/// Converts secp256k1 failures (bad scalar, bad message) into MinerError
impl From<secp256k1::Error> for MinerError {
    fn from(e: secp256k1::Error) -> Self {
        MinerError::CryptoError(e.to_string())
    }
}
