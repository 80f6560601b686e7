// src/miner/mod.rs
//! Core mining functionality
//!
//! This module contains all components related to the mining process:
//! - The inscription payload and difficulty target of a run
//! - Digest algorithms and the hash search unit
//! - Worker threads and the pool that schedules them

/// Digest algorithm implementations
///
/// Contains the [`Algorithm`] trait and the Keccak-256 digest used by
/// proof-of-work inscriptions.
pub mod algorithm;

/// Canonical inscription payload
pub mod inscription;

/// Worker pool management
///
/// Starts workers on disjoint nonce partitions, relays their events to the
/// aggregator and stops them again.
pub mod scheduler;

/// Hash search unit
pub mod search;

/// Difficulty target
pub mod target;

/// Worker thread implementation
///
/// Contains the search/submit loop of a single worker and the events it
/// reports to the pool.
pub mod worker;

// Re-export main components for cleaner imports
pub use self::algorithm::{Algorithm, Keccak};
pub use self::inscription::Inscription;
pub use self::scheduler::{PoolHandle, Scheduler, WorkerHandle};
pub use self::search::{Candidate, search};
pub use self::target::Target;
pub use self::worker::{StateCell, Worker, WorkerEvent, WorkerState};
