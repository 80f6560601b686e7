// src/miner/algorithm/mod.rs
//! Digest algorithms for the proof-of-work search
//!
//! Currently implements:
//! - Keccak-256 over the canonical inscription payload

/// Keccak-256 implementation
pub mod keccak;

use crate::miner::inscription::Inscription;
use crate::utils::error::MinerError;

pub use keccak::{Keccak, keccak256};

/// Common interface for all digest algorithms
///
/// Implementations must be pure: the same inscription and nonce always
/// produce the same digest, and no state is shared between calls. Workers
/// call `hash` in their hot loop from many threads at once.
pub trait Algorithm: Send + Sync {
    /// Compute the 32-byte big-endian digest for `nonce`
    ///
    /// An `Err` is treated as an internal fault of the calling worker.
    fn hash(&self, inscription: &Inscription, nonce: u64) -> Result<[u8; 32], MinerError>;

    /// Short name used in logs and benchmarks
    fn name(&self) -> &'static str;
}
