// src/stats/aggregator.rs
//! Rate/event aggregation
//!
//! [`AggregateState`] is a plain reducer over [`WorkerEvent`]s: per-worker
//! rates with last-write-wins semantics, success/failure counters and a
//! bounded log feed. [`Aggregator`] shares one state between the pool's
//! event listener and its observers. Every reset starts a new epoch;
//! events are applied only while the aggregator is open and carry the
//! current epoch, so nothing from a stopped pool leaks into the next one.

use crate::miner::worker::WorkerEvent;
use crate::types::Severity;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// One entry of the log feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Seconds since the Unix epoch
    pub timestamp: u64,
    /// Entry severity
    pub severity: Severity,
    /// Entry text
    pub message: String,
    /// Worker the entry came from, `None` for pool-level entries
    pub worker: Option<usize>,
}

impl LogEntry {
    fn now(severity: Severity, message: String, worker: Option<usize>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        LogEntry {
            timestamp,
            severity,
            message,
            worker,
        }
    }
}

/// Fixed-capacity log feed, newest entry first
#[derive(Debug, Clone)]
pub struct LogFeed {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl LogFeed {
    /// Creates an empty feed holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        LogFeed {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Prepends `entry`, dropping the oldest one when full
    pub fn push(&mut self, entry: LogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(entry);
    }

    /// Entries, newest first
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// Number of entries held
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the feed is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Removes every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Merged view of every worker's events
#[derive(Debug, Clone)]
pub struct AggregateState {
    rates: BTreeMap<usize, u64>,
    success_count: u64,
    failure_count: u64,
    log_feed: LogFeed,
}

impl AggregateState {
    /// Empty state whose log feed keeps `log_capacity` entries
    pub fn new(log_capacity: usize) -> Self {
        AggregateState {
            rates: BTreeMap::new(),
            success_count: 0,
            failure_count: 0,
            log_feed: LogFeed::new(log_capacity),
        }
    }

    /// Applies one worker event
    ///
    /// A rate sample replaces the previous sample of the same worker. A
    /// success log bumps the success counter, an error log the failure
    /// counter. A fatal event drops the worker's rate and is logged as an
    /// error naming the worker.
    pub fn apply_event(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Rate { index, rate } => {
                self.rates.insert(index, rate);
            }
            WorkerEvent::Log {
                index,
                severity,
                message,
            } => {
                match severity {
                    Severity::Success => self.success_count += 1,
                    Severity::Error => self.failure_count += 1,
                    Severity::Info => {}
                }
                self.log_feed
                    .push(LogEntry::now(severity, message, Some(index)));
            }
            WorkerEvent::Fatal { index, reason } => {
                self.rates.remove(&index);
                self.log_feed.push(LogEntry::now(
                    Severity::Error,
                    format!("Worker {} error: {}", index, reason),
                    Some(index),
                ));
            }
        }
    }

    /// Adds a pool-level entry that is not tied to a worker
    pub fn push_log(&mut self, severity: Severity, message: impl Into<String>) {
        self.log_feed
            .push(LogEntry::now(severity, message.into(), None));
    }

    /// Sum of the latest sample of every known worker
    pub fn total_rate(&self) -> u64 {
        self.rates.values().sum()
    }

    /// Latest sample of worker `index`
    pub fn rate_of(&self, index: usize) -> Option<u64> {
        self.rates.get(&index).copied()
    }

    /// Number of accepted mints
    pub fn success_count(&self) -> u64 {
        self.success_count
    }

    /// Number of failed submissions
    pub fn failure_count(&self) -> u64 {
        self.failure_count
    }

    /// The log feed, newest first
    pub fn logs(&self) -> &LogFeed {
        &self.log_feed
    }

    /// Empties the log feed; counters and rates are kept
    pub fn clear_logs(&mut self) {
        self.log_feed.clear();
    }

    /// One-line summary: `efficiency => <rate> c/s, successes => <count>`
    pub fn header(&self) -> String {
        format!(
            "efficiency => {} c/s, successes => {}",
            self.total_rate(),
            self.success_count
        )
    }
}

impl Default for AggregateState {
    fn default() -> Self {
        AggregateState::new(crate::config::DEFAULT_LOG_CAPACITY)
    }
}

struct Inner {
    state: AggregateState,
    open: bool,
    epoch: u64,
}

impl Inner {
    fn accepts(&self, epoch: u64) -> bool {
        self.open && self.epoch == epoch
    }
}

/// Shared, closable [`AggregateState`]
///
/// Starts closed; a pool opens it with [`Aggregator::reset`] and closes it
/// on stop. Events applied while closed, or tagged with an older epoch,
/// are discarded.
#[derive(Clone)]
pub struct Aggregator {
    inner: Arc<Mutex<Inner>>,
}

impl Aggregator {
    /// Creates a closed aggregator with the given log capacity
    pub fn new(log_capacity: usize) -> Self {
        Aggregator {
            inner: Arc::new(Mutex::new(Inner {
                state: AggregateState::new(log_capacity),
                open: false,
                epoch: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clears everything and opens a new epoch; returns that epoch
    pub fn reset(&self, log_capacity: usize) -> u64 {
        let mut inner = self.lock();
        inner.state = AggregateState::new(log_capacity);
        inner.open = true;
        inner.epoch += 1;
        inner.epoch
    }

    /// Stops accepting events of `epoch`
    ///
    /// Once this returns, no event of that epoch is ever applied. Closing
    /// an epoch that is no longer current does nothing.
    pub fn close(&self, epoch: u64) {
        let mut inner = self.lock();
        if inner.epoch == epoch {
            inner.open = false;
        }
    }

    /// Whether events are currently accepted
    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    /// Applies `event` if `epoch` is open; returns whether it was applied
    pub fn apply(&self, epoch: u64, event: WorkerEvent) -> bool {
        let mut inner = self.lock();
        if !inner.accepts(epoch) {
            return false;
        }

        match &event {
            WorkerEvent::Rate { .. } => {}
            WorkerEvent::Log {
                severity: Severity::Error,
                message,
                ..
            } => log::error!("{}", message),
            WorkerEvent::Log { message, .. } => log::info!("{}", message),
            WorkerEvent::Fatal { index, reason } => {
                log::error!("Worker {} error: {}", index, reason)
            }
        }
        inner.state.apply_event(event);
        true
    }

    /// Adds a pool-level entry if `epoch` is open
    pub fn record(&self, epoch: u64, severity: Severity, message: impl Into<String>) -> bool {
        let mut inner = self.lock();
        if !inner.accepts(epoch) {
            return false;
        }

        let message = message.into();
        match severity {
            Severity::Error => log::error!("{}", message),
            _ => log::info!("{}", message),
        }
        inner.state.push_log(severity, message);
        true
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> AggregateState {
        self.lock().state.clone()
    }

    /// Empties the log feed
    pub fn clear_logs(&self) {
        self.lock().state.clear_logs();
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Aggregator::new(crate::config::DEFAULT_LOG_CAPACITY)
    }
}
