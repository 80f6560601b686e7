// src/cli/commands.rs
use crate::types::Environment;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// IERC PoW Miner CLI - proof-of-work inscription minting in Rust
#[derive(Parser, Debug)]
#[command(name = "ierc-miner-rs")]
#[command(version, about, long_about = None)]
pub struct Commands {
    /// The action to perform (start mining, run benchmarks, or generate config)
    #[command(subcommand)]
    pub action: Action,
}

/// Top-level commands for the miner application
#[derive(Subcommand, Debug)]
pub enum Action {
    /// Start mining with the given configuration
    Start(StartOptions),

    /// Measure search throughput without submitting anything
    Benchmark(BenchmarkOptions),

    /// Generate configuration file template
    Config(ConfigOptions),
}

/// Options for starting the mining operation
#[derive(Parser, Debug)]
pub struct StartOptions {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Number of worker threads to use (overrides config)
    #[arg(short, long, allow_negative_numbers = true)]
    pub workers: Option<i64>,

    /// Environment to mint in (overrides config)
    #[arg(short, long, value_enum)]
    pub environment: Option<Environment>,

    /// RPC endpoint (overrides config)
    #[arg(short, long)]
    pub rpc: Option<String>,

    /// Gas premium in percent, at least 100 (overrides config)
    #[arg(short, long)]
    pub gas_premium: Option<u64>,
}

/// Options for running search benchmarks
#[derive(Parser, Debug)]
pub struct BenchmarkOptions {
    /// Duration of benchmark in seconds
    #[arg(short, long, default_value_t = 60)]
    pub duration: u64,

    /// Number of threads to use
    #[arg(short, long, default_value_t = num_cpus::get())]
    pub threads: usize,

    /// Tick written into the benchmark payload
    #[arg(long, default_value = "ierc-m5")]
    pub tick: String,

    /// Amount written into the benchmark payload
    #[arg(long, default_value_t = 10000)]
    pub amount: u64,
}

/// Options for generating configuration files
#[derive(Parser, Debug)]
pub struct ConfigOptions {
    /// Output file path
    #[arg(short, long, default_value = "config.toml")]
    pub output: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_overrides_parse() {
        let cli = Commands::try_parse_from([
            "ierc-miner-rs",
            "start",
            "--workers",
            "-1",
            "--environment",
            "test",
            "--gas-premium",
            "150",
        ])
        .unwrap();

        match cli.action {
            Action::Start(opts) => {
                assert_eq!(opts.workers, Some(-1));
                assert_eq!(opts.environment, Some(Environment::Test));
                assert_eq!(opts.gas_premium, Some(150));
                assert_eq!(opts.config, PathBuf::from("config.toml"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn benchmark_defaults() {
        let cli = Commands::try_parse_from(["ierc-miner-rs", "benchmark", "-d", "5"]).unwrap();
        match cli.action {
            Action::Benchmark(opts) => {
                assert_eq!(opts.duration, 5);
                assert_eq!(opts.tick, "ierc-m5");
                assert!(opts.threads >= 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
