// src/types.rs
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Network environment a mining run targets
///
/// The environment is part of the inscription payload, so a nonce found
/// for one environment is never valid for the other.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Formal environment (Ethereum mainnet)
    #[default]
    #[clap(name = "production")]
    Production,

    /// Test environment (Sepolia)
    #[clap(name = "test")]
    Test,
}

impl Environment {
    /// Protocol identifier written into the `p` field of the payload
    pub fn protocol(&self) -> &'static str {
        match self {
            Environment::Production => "ierc-pow",
            Environment::Test => "ierc-pow-test",
        }
    }

    /// Public RPC endpoint used when the configuration gives none
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Environment::Production => "https://ethereum.publicnode.com",
            Environment::Test => "https://ethereum-sepolia.publicnode.com",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Test => write!(f, "test"),
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Ok(Environment::Production),
            "test" | "testnet" => Ok(Environment::Test),
            _ => Err(format!("Unknown environment: {}", s)),
        }
    }
}

/// Severity attached to every entry of the log feed
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Progress and lifecycle messages
    Info,
    /// A mint transaction was accepted by the network
    Success,
    /// Submission failures and worker faults
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Success => write!(f, "success"),
            Severity::Error => write!(f, "error"),
        }
    }
}
