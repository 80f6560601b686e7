// src/config/mod.rs
//! Configuration management for the IERC miner
//!
//! This module handles all configuration-related functionality including:
//! - Loading and parsing configuration files
//! - Generating configuration templates
//! - Validating a file into the immutable [`MiningConfig`] of a run
//!
//! The configuration uses TOML format.

/// Core configuration implementation
pub mod config;

// Re-export key items for easy access
pub use config::{
    Config, DEFAULT_GAS_PREMIUM, DEFAULT_LOG_CAPACITY, MIN_GAS_PREMIUM, MiningConfig,
    default_worker_count,
};

use crate::utils::error::MinerError;
use std::path::PathBuf;

/// Loads miner configuration from a TOML file
///
/// # Arguments
/// * `path` - Path to the configuration file (anything convertible to PathBuf)
///
/// # Returns
/// * `Ok(Config)` - Successfully loaded configuration
/// * `Err(MinerError)` - If the file couldn't be read or parsed
pub fn load(path: impl Into<PathBuf>) -> Result<Config, MinerError> {
    Config::load(path)
}

/// Generates a commented configuration template
pub fn generate_template() -> String {
    Config::generate_template()
}
