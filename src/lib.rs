//! IERC PoW Miner - proof-of-work inscription minting on EVM chains
//!
//! This crate searches for nonces whose Keccak-256 inscription digest meets
//! a difficulty target and mints each hit with a signed transaction:
//! - A pool of CPU workers on disjoint nonce partitions
//! - Legacy EIP-155 mint transactions with a configurable gas premium
//! - Aggregated hash rate, success count and a bounded log feed
//! - Performance benchmarking and hardware monitoring

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Miner core implementation including algorithms and scheduling
pub mod miner;

/// RPC client, transaction encoding and submission
pub mod network;

/// Statistics collection and reporting functionality
pub mod stats;

/// Utility functions and error handling
pub mod utils;

/// Command-line interface definitions
pub mod cli;

/// Configuration management
pub mod config;

/// Shared type definitions
pub mod types;

// Core exports
pub use cli::Commands;
pub use config::{Config, MiningConfig};
pub use miner::{
    Algorithm, Candidate, Inscription, Keccak, PoolHandle, Scheduler, Target, Worker,
    WorkerEvent, WorkerHandle,
};
pub use network::{ChainSubmitter, SubmissionResult, Submitter};
pub use stats::{AggregateState, Aggregator, HardwareStats, StatsReporter};
pub use types::{Environment, Severity};
pub use utils::{MinerError, init_logging};
