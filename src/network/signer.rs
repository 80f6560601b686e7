// src/network/signer.rs
//! Signing key and account address
//!
//! Wraps a secp256k1 secret key. The key never appears in `Debug` output;
//! only the derived address does.

use crate::miner::algorithm::keccak256;
use crate::utils::error::MinerError;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use std::fmt;

/// Recoverable ECDSA signature split into Ethereum's `(recovery id, r, s)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    /// Recovery id (0 or 1)
    pub recovery_id: u8,
    /// `r` component, big-endian
    pub r: [u8; 32],
    /// `s` component, big-endian (low-s normalised)
    pub s: [u8; 32],
}

/// Secret key of the minting account
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey {
    secret: SecretKey,
    address: [u8; 20],
}

impl SigningKey {
    /// Parses a 32-byte key given as 64 hex characters, with or without `0x`
    ///
    /// # Errors
    /// `ConfigError` when the length or alphabet is wrong, `CryptoError`
    /// when the bytes are not a valid secp256k1 scalar.
    pub fn from_hex(value: &str) -> Result<Self, MinerError> {
        let value = value.trim();
        let digits = value.strip_prefix("0x").unwrap_or(value);
        if digits.len() != 64 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(MinerError::ConfigError(
                "private key must be 64 hex characters (optional 0x prefix)".into(),
            ));
        }

        let bytes = hex::decode(digits)?;
        let secret = SecretKey::from_slice(&bytes)?;
        Ok(Self::from_secret(secret))
    }

    fn from_secret(secret: SecretKey) -> Self {
        let secp = Secp256k1::signing_only();
        let public = PublicKey::from_secret_key(&secp, &secret).serialize_uncompressed();
        let hash = keccak256(&public[1..]);
        let mut address = [0u8; 20];
        address.copy_from_slice(&hash[12..]);
        SigningKey { secret, address }
    }

    /// 20-byte account address
    pub fn address(&self) -> [u8; 20] {
        self.address
    }

    /// `0x`-prefixed lowercase account address
    pub fn address_hex(&self) -> String {
        format!("0x{}", hex::encode(self.address))
    }

    /// Signs a 32-byte prehash (deterministic, RFC 6979)
    pub fn sign_prehash(&self, hash: &[u8; 32]) -> Result<Signature, MinerError> {
        let secp = Secp256k1::signing_only();
        let message = Message::from_slice(hash)?;
        let (recovery_id, compact) = secp
            .sign_ecdsa_recoverable(&message, &self.secret)
            .serialize_compact();

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&compact[..32]);
        s.copy_from_slice(&compact[32..]);

        Ok(Signature {
            recovery_id: recovery_id.to_i32() as u8,
            r,
            s,
        })
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("address", &self.address_hex())
            .finish_non_exhaustive()
    }
}
