// src/miner/inscription.rs
//! Canonical inscription payload
//!
//! The same bytes serve as the proof-of-work digest input and as the
//! calldata of the mint transaction:
//!
//! ```text
//! data:application/json,{"p":"ierc-pow","op":"mint","tick":"ierc-m5","amt":"10000","nonce":"42"}
//! ```
//!
//! Everything except the nonce is fixed for a run, so the text before the
//! nonce is rendered and absorbed into a Keccak state once. Hashing a nonce
//! clones that state and feeds it only the nonce digits and the tail.

use crate::types::Environment;
use crate::utils::error::MinerError;
use sha3::{Digest, Keccak256};
use std::fmt;

const DATA_URI_PREFIX: &str = "data:application/json,";
const TAIL: &str = "\"}";

/// Longest decimal rendering of a `u64`
const MAX_NONCE_DIGITS: usize = 20;

/// Immutable protocol fields of a mint, plus the pre-rendered payload head
#[derive(Clone)]
pub struct Inscription {
    tick: String,
    amount: u64,
    environment: Environment,
    head: String,
    head_state: Keccak256,
}

impl Inscription {
    /// Builds the inscription for `tick`/`amount` in `environment`
    ///
    /// The tick is JSON-escaped, so any string is representable.
    pub fn new(
        tick: impl Into<String>,
        amount: u64,
        environment: Environment,
    ) -> Result<Self, MinerError> {
        let tick = tick.into();
        let head = format!(
            "{}{{\"p\":\"{}\",\"op\":\"mint\",\"tick\":{},\"amt\":\"{}\",\"nonce\":\"",
            DATA_URI_PREFIX,
            environment.protocol(),
            serde_json::to_string(&tick)?,
            amount
        );

        let head_state = Keccak256::new_with_prefix(head.as_bytes());

        Ok(Inscription {
            tick,
            amount,
            environment,
            head,
            head_state,
        })
    }

    /// Token symbol being minted
    pub fn tick(&self) -> &str {
        &self.tick
    }

    /// Units minted per successful solve
    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// Environment the payload is bound to
    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Renders the full payload for `nonce`
    pub fn payload(&self, nonce: u64) -> Vec<u8> {
        let mut digits = [0u8; MAX_NONCE_DIGITS];
        let digits = decimal(nonce, &mut digits);

        let mut out = Vec::with_capacity(self.head.len() + digits.len() + TAIL.len());
        out.extend_from_slice(self.head.as_bytes());
        out.extend_from_slice(digits);
        out.extend_from_slice(TAIL.as_bytes());
        out
    }

    /// Keccak-256 of `payload(nonce)` without rendering or rehashing the head
    #[inline]
    pub fn keccak(&self, nonce: u64) -> [u8; 32] {
        let mut digits = [0u8; MAX_NONCE_DIGITS];
        let mut hasher = self.head_state.clone();
        hasher.update(decimal(nonce, &mut digits));
        hasher.update(TAIL.as_bytes());

        let mut out = [0u8; 32];
        out.copy_from_slice(&hasher.finalize());
        out
    }
}

impl PartialEq for Inscription {
    fn eq(&self, other: &Self) -> bool {
        // The head and its hash state follow from these three.
        self.tick == other.tick
            && self.amount == other.amount
            && self.environment == other.environment
    }
}

impl Eq for Inscription {}

impl fmt::Debug for Inscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inscription")
            .field("tick", &self.tick)
            .field("amount", &self.amount)
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}

/// Writes `value` in decimal at the end of `buf` and returns the digits
fn decimal(mut value: u64, buf: &mut [u8; MAX_NONCE_DIGITS]) -> &[u8] {
    let mut start = buf.len();
    loop {
        start -= 1;
        buf[start] = b'0' + (value % 10) as u8;
        value /= 10;
        if value == 0 {
            break;
        }
    }
    &buf[start..]
}
