// src/miner/target.rs
//! Difficulty target
//!
//! A target is a hex-encoded unsigned integer. Short targets are
//! left-padded to 32 bytes, so `0xffff` is the number 65535 and not a
//! prefix. A digest wins when, read as a big-endian integer, it is less
//! than or equal to the target.

use crate::utils::error::MinerError;
use std::fmt;

/// Parsed difficulty threshold (32 bytes, big-endian)
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Target([u8; 32]);

impl Target {
    /// Largest target; every digest satisfies it
    pub const MAX: Target = Target([0xff; 32]);

    /// Parses a hex target with optional `0x` prefix
    ///
    /// # Errors
    /// `InputError` when the string is empty, longer than 64 hex digits,
    /// or not hexadecimal.
    pub fn from_hex(value: &str) -> Result<Self, MinerError> {
        let value = value.trim();
        let digits = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
            .unwrap_or(value);

        if digits.is_empty() {
            return Err(MinerError::InputError("difficulty target is empty".into()));
        }
        if digits.len() > 64 {
            return Err(MinerError::InputError(format!(
                "difficulty target has {} hex digits, at most 64 allowed",
                digits.len()
            )));
        }

        let padded = format!("{:0>64}", digits);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(padded, &mut bytes)?;
        Ok(Target(bytes))
    }

    /// Raw big-endian bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// `true` if `digest <= target` as unsigned big-endian integers
    #[inline]
    pub fn is_met_by(&self, digest: &[u8; 32]) -> bool {
        // Lexicographic order on equal-length big-endian arrays is numeric order.
        digest <= &self.0
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Target({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest_from_u64(value: u64) -> [u8; 32] {
        let mut digest = [0u8; 32];
        digest[24..].copy_from_slice(&value.to_be_bytes());
        digest
    }

    #[test]
    fn short_target_is_left_padded() {
        let target = Target::from_hex("0xffff").unwrap();
        assert!(target.is_met_by(&digest_from_u64(0xffff)));
        assert!(!target.is_met_by(&digest_from_u64(0x1_0000)));
    }

    #[test]
    fn odd_length_and_uppercase_prefix_parse() {
        let target = Target::from_hex("0XfFf").unwrap();
        assert_eq!(target, Target::from_hex("0fff").unwrap());
    }

    #[test]
    fn equal_digest_wins() {
        let full = format!("0x0000{}", "f".repeat(60));
        let target = Target::from_hex(&full).unwrap();
        assert!(target.is_met_by(target.as_bytes()));

        let mut above = *target.as_bytes();
        above[1] = 1;
        assert!(!target.is_met_by(&above));
    }

    #[test]
    fn rejects_bad_targets() {
        assert!(Target::from_hex("").is_err());
        assert!(Target::from_hex("0x").is_err());
        assert!(Target::from_hex("0xzz").is_err());
        assert!(Target::from_hex(&"f".repeat(65)).is_err());
    }

    #[test]
    fn max_accepts_everything() {
        assert!(Target::MAX.is_met_by(&[0xff; 32]));
        assert_eq!(Target::from_hex(&"f".repeat(64)).unwrap(), Target::MAX);
    }
}
