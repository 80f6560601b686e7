//! Command-line interface
//!
//! Three sub-commands: `start`, `benchmark` and `config`.

/// clap command tree
pub mod commands;

pub use commands::{Action, BenchmarkOptions, Commands, ConfigOptions, StartOptions};
