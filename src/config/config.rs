// src/config/config.rs
use crate::{
    miner::{inscription::Inscription, target::Target},
    network::signer::SigningKey,
    types::Environment,
    utils::error::MinerError,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Default gas premium in percent (1.1x the network gas price)
pub const DEFAULT_GAS_PREMIUM: u64 = 110;
/// Lowest accepted gas premium (no premium)
pub const MIN_GAS_PREMIUM: u64 = 100;
/// Default capacity of the rolling log feed
pub const DEFAULT_LOG_CAPACITY: usize = 500;

/// Configuration file contents, before validation
///
/// Every field is optional at this level so that missing values can be
/// reported one by one. [`Config::validate`] turns it into the immutable
/// [`MiningConfig`] a run is started with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Hex private key of the minting account (required)
    pub private_key: Option<String>,

    /// RPC endpoint; the environment's public node when absent
    pub rpc_url: Option<String>,

    /// Token symbol, e.g. "ierc-m5" (required)
    pub tick: Option<String>,

    /// Amount per mint (required, positive)
    pub amount: Option<u64>,

    /// Hex difficulty target (required)
    pub difficulty: Option<String>,

    /// Gas premium in percent (default 110, minimum 100)
    pub gas_premium: Option<u64>,

    /// Target environment (default production)
    #[serde(default)]
    pub environment: Environment,

    /// Number of mining workers (default: number of CPU cores)
    pub worker_threads: Option<i64>,

    /// First nonce of the search space (default 0)
    pub start_nonce: Option<u64>,

    /// Throughput sampling window in milliseconds (default 1000)
    pub rate_window_ms: Option<u64>,

    /// Seconds between periodic statistics lines (default 10)
    pub report_interval_secs: Option<u64>,

    /// Maximum number of entries kept in the log feed (default 500)
    pub log_capacity: Option<usize>,

    /// Timeout of a single RPC request in seconds (default 30)
    pub request_timeout_secs: Option<u64>,

    /// Wait for a receipt after broadcasting (default false)
    pub confirm_receipts: Option<bool>,

    /// How long to wait for a receipt in seconds (default 60)
    pub receipt_timeout_secs: Option<u64>,
}

/// Validated, immutable settings of one mining run
#[derive(Debug, Clone)]
pub struct MiningConfig {
    /// Key that signs every mint transaction
    pub signing_key: SigningKey,
    /// Explicit RPC endpoint, if one was configured
    pub rpc_url: Option<Url>,
    /// Protocol fields (tick, amount, environment) and payload encoding
    pub inscription: Inscription,
    /// Difficulty threshold a digest must not exceed
    pub target: Target,
    /// Gas premium in percent, at least [`MIN_GAS_PREMIUM`]
    pub gas_premium: u64,
    /// Start of the nonce space the pool partitions
    pub start_nonce: u64,
    /// Throughput sampling window
    pub rate_window: Duration,
    /// Interval of the periodic statistics line
    pub report_interval: Duration,
    /// Log feed capacity
    pub log_capacity: usize,
    /// Per-request RPC timeout
    pub request_timeout: Duration,
    /// Whether submissions wait for a receipt
    pub confirm_receipts: bool,
    /// Receipt wait limit
    pub receipt_timeout: Duration,
}

impl MiningConfig {
    /// Environment of the run
    pub fn environment(&self) -> Environment {
        self.inscription.environment()
    }

    /// RPC endpoint to use, falling back to the environment default
    pub fn endpoint(&self) -> Result<Url, MinerError> {
        match &self.rpc_url {
            Some(url) => Ok(url.clone()),
            None => Ok(Url::parse(self.environment().default_rpc_url())?),
        }
    }
}

/// Returns the worker count used when none is configured
///
/// The number of logical CPUs, never less than one.
pub fn default_worker_count() -> usize {
    num_cpus::get().max(1)
}

fn required<T>(value: Option<T>, message: &str) -> Result<T, MinerError> {
    value.ok_or_else(|| MinerError::ConfigError(message.to_string()))
}

impl Config {
    /// Loads configuration from a file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file (TOML format)
    ///
    /// # Returns
    /// * `Ok(Config)` - Successfully loaded configuration
    /// * `Err(MinerError)` - If file couldn't be read or parsed
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, MinerError> {
        let path = path.into();
        let config_str = std::fs::read_to_string(&path).map_err(|e| {
            MinerError::ConfigError(format!(
                "Failed to read config at {}: {}",
                path.display(),
                e
            ))
        })?;

        toml::from_str(&config_str)
            .map_err(|e| MinerError::ConfigError(format!("Invalid config format: {}", e)))
    }

    /// Resolves the number of workers
    ///
    /// Absent means one worker per CPU. An explicit value must be a
    /// positive integer; zero and negative values are errors rather than
    /// a silent fallback to the default.
    pub fn worker_count(&self) -> Result<usize, MinerError> {
        match self.worker_threads {
            None => Ok(default_worker_count()),
            Some(n) if n >= 1 => usize::try_from(n)
                .map_err(|_| MinerError::ConfigError(format!("worker count {} is too large", n))),
            Some(n) => Err(MinerError::ConfigError(format!(
                "worker count must be a positive integer, got {}",
                n
            ))),
        }
    }

    /// Checks every field and builds the immutable run configuration
    ///
    /// # Errors
    /// `ConfigError` naming the first missing or invalid field.
    pub fn validate(&self) -> Result<MiningConfig, MinerError> {
        let private_key = required(
            self.private_key.as_deref().filter(|k| !k.trim().is_empty()),
            "no private key",
        )?;
        let signing_key = SigningKey::from_hex(private_key)
            .map_err(|e| MinerError::ConfigError(format!("invalid private key: {}", e)))?;

        let tick = required(
            self.tick.as_deref().map(str::trim).filter(|t| !t.is_empty()),
            "no tick",
        )?;

        let amount = required(self.amount.filter(|a| *a > 0), "no quantity")?;

        let difficulty = required(
            self.difficulty.as_deref().filter(|d| !d.trim().is_empty()),
            "no difficulty",
        )?;
        let target = Target::from_hex(difficulty)
            .map_err(|e| MinerError::ConfigError(format!("invalid difficulty: {}", e)))?;

        let gas_premium = self.gas_premium.unwrap_or(DEFAULT_GAS_PREMIUM);
        if gas_premium < MIN_GAS_PREMIUM {
            return Err(MinerError::ConfigError(format!(
                "gas premium must be at least {}, got {}",
                MIN_GAS_PREMIUM, gas_premium
            )));
        }

        let rpc_url = match self.rpc_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => Some(
                Url::parse(url)
                    .map_err(|e| MinerError::ConfigError(format!("invalid RPC url '{}': {}", url, e)))?,
            ),
            _ => None,
        };

        let rate_window_ms = self.rate_window_ms.unwrap_or(1000);
        if rate_window_ms == 0 {
            return Err(MinerError::ConfigError("rate window must be positive".into()));
        }

        Ok(MiningConfig {
            signing_key,
            rpc_url,
            inscription: Inscription::new(tick, amount, self.environment)?,
            target,
            gas_premium,
            start_nonce: self.start_nonce.unwrap_or(0),
            rate_window: Duration::from_millis(rate_window_ms),
            report_interval: Duration::from_secs(self.report_interval_secs.unwrap_or(10).max(1)),
            log_capacity: self.log_capacity.unwrap_or(DEFAULT_LOG_CAPACITY).max(1),
            request_timeout: Duration::from_secs(self.request_timeout_secs.unwrap_or(30).max(1)),
            confirm_receipts: self.confirm_receipts.unwrap_or(false),
            receipt_timeout: Duration::from_secs(self.receipt_timeout_secs.unwrap_or(60)),
        })
    }

    /// Generates a configuration template string
    ///
    /// # Returns
    /// String containing a commented TOML configuration template
    pub fn generate_template() -> String {
        let mut template = String::new();
        template.push_str("# IERC PoW Miner Configuration\n\n");
        template.push_str("# Private key, with or without 0x (required)\n");
        template.push_str("private_key = \"0x...\"\n");
        template.push_str("# Tick to mint (required)\n");
        template.push_str("tick = \"ierc-m5\"\n");
        template.push_str("# Amount per mint (required)\n");
        template.push_str("amount = 10000\n");
        template.push_str("# Difficulty target, hexadecimal (required)\n");
        template.push_str("difficulty = \"0x0000ffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff\"\n");
        template.push_str("# production or test\n");
        template.push_str("environment = \"production\"\n\n");
        template.push_str("# RPC endpoint (optional, defaults to a public node; your own is better)\n");
        template.push_str("# rpc_url = \"https://ethereum.publicnode.com\"\n");
        template.push_str("# Gas premium in percent of the current gas price (default 110, minimum 100)\n");
        template.push_str("gas_premium = 110\n");
        template.push_str("# Number of worker threads (default: all CPU cores)\n");
        template.push_str("# worker_threads = 4\n\n");
        template.push_str("# Wait for receipts and report reverted mints as rejected\n");
        template.push_str("confirm_receipts = false\n");
        template.push_str("# Seconds between statistics lines\n");
        template.push_str("report_interval_secs = 10\n");

        template
    }
}
