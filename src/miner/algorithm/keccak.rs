// src/miner/algorithm/keccak.rs
//! Keccak-256 digest
//!
//! Ethereum's hash function (the pre-standard Keccak padding, not
//! SHA3-256). Used both for the proof-of-work digest and for transaction
//! hashing and address derivation.

use crate::miner::algorithm::Algorithm;
use crate::miner::inscription::Inscription;
use crate::utils::error::MinerError;
use sha3::{Digest, Keccak256};

/// Keccak-256 over the canonical inscription payload
///
/// Starts from the inscription's pre-absorbed head, so each nonce only
/// hashes its digits and the closing tail.
#[derive(Debug, Clone, Copy, Default)]
pub struct Keccak;

impl Algorithm for Keccak {
    fn hash(&self, inscription: &Inscription, nonce: u64) -> Result<[u8; 32], MinerError> {
        Ok(inscription.keccak(nonce))
    }

    fn name(&self) -> &'static str {
        "keccak256"
    }
}

/// Keccak-256 of `data`
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}
