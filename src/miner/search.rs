// src/miner/search.rs
//! Hash search unit
//!
//! One call computes one candidate. No state survives between calls, so
//! workers can run it concurrently without coordination.

use crate::miner::algorithm::Algorithm;
use crate::miner::inscription::Inscription;
use crate::miner::target::Target;
use crate::utils::error::MinerError;

/// A nonce together with the digest it produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Nonce written into the payload
    pub nonce: u64,
    /// Big-endian digest of the payload
    pub digest: [u8; 32],
}

impl Candidate {
    /// Whether this candidate satisfies `target`
    #[inline]
    pub fn is_winning(&self, target: &Target) -> bool {
        target.is_met_by(&self.digest)
    }

    /// `0x`-prefixed digest for logs
    pub fn digest_hex(&self) -> String {
        format!("0x{}", hex::encode(self.digest))
    }
}

/// Computes the candidate for `nonce`
#[inline]
pub fn search<A: Algorithm + ?Sized>(
    algorithm: &A,
    inscription: &Inscription,
    nonce: u64,
) -> Result<Candidate, MinerError> {
    Ok(Candidate {
        nonce,
        digest: algorithm.hash(inscription, nonce)?,
    })
}
