// src/network/mod.rs
//! Network communication components
//!
//! Everything between a winning nonce and the chain:
//! - `RpcClient`: JSON-RPC over HTTP
//! - `LegacyTransaction`: mint transaction encoding and EIP-155 signing
//! - `Submitter` / `ChainSubmitter`: gas policy, broadcast and outcome classification

/// Ethereum JSON-RPC client
pub mod rpc;

/// RLP encoder
pub mod rlp;

/// Signing key and address derivation
pub mod signer;

/// Mint transaction building and signing
pub mod transaction;

/// Transaction submission and outcome classification
pub mod submitter;

// Re-export main components for cleaner imports
pub use rpc::RpcClient;
pub use signer::SigningKey;
pub use submitter::{ChainSubmitter, SubmissionResult, Submitter, premium_gas_price};
pub use transaction::{LegacyTransaction, SignedTransaction};
