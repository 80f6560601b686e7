//! Statistics collection and reporting module
//!
//! This module provides functionality for tracking and reporting mining statistics,
//! including:
//! - Per-worker hash rates and their total
//! - Success/failure counters and the rolling log feed
//! - Hardware monitoring (CPU, memory, temperature)
//!
//! [`Aggregator`] merges worker events into an [`AggregateState`];
//! [`StatsReporter`] periodically logs it.

/// Rate and event aggregation
///
/// The aggregator handles:
/// - Last-write-wins rate samples per worker
/// - Success and failure counting
/// - A bounded, newest-first log feed
/// - Discarding events once a pool has stopped
pub mod aggregator;

/// Periodic statistics logging with host hardware figures
pub mod reporter;

// Re-export main components
pub use aggregator::{AggregateState, Aggregator, LogEntry, LogFeed};
pub use reporter::{HardwareStats, StatsReporter};
