// src/miner/scheduler.rs
//! Worker pool management
//!
//! Spawns the mining workers of one run, gives each a disjoint slice of
//! the nonce space, and relays their events to the shared [`Aggregator`].
//! Worker `i` of `n` searches `start + i, start + i + n, start + i + 2n, ...`,
//! so no two workers of a pool ever hash the same nonce.

use crate::config::MiningConfig;
use crate::miner::algorithm::Algorithm;
use crate::miner::worker::{StateCell, Worker, WorkerEvent, WorkerState};
use crate::network::submitter::Submitter;
use crate::stats::aggregator::{AggregateState, Aggregator};
use crate::types::Severity;
use crate::utils::error::MinerError;
use crossbeam_channel::{Receiver, unbounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

/// Pool-side view of one worker
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    /// Worker index, unique within the pool
    pub index: usize,
    /// First nonce of the worker's partition
    pub nonce_range_start: u64,
    /// Latest throughput sample, hashes per second
    pub last_reported_rate: u64,
    /// Whether the worker is still running
    pub alive: bool,
    /// Lifecycle state the worker last published
    pub state: WorkerState,
    /// When the pool last heard from the worker
    pub last_event: Instant,
}

/// Starts worker pools
///
/// Holds what every worker of every pool shares: the digest algorithm,
/// the submitter, the runtime submissions are driven on, and the
/// aggregator events end up in.
pub struct Scheduler<S> {
    algorithm: Arc<dyn Algorithm>,
    submitter: Arc<S>,
    runtime: Handle,
    aggregator: Aggregator,
}

impl<S: Submitter + 'static> Scheduler<S> {
    /// Creates a new Scheduler instance
    ///
    /// # Arguments
    /// * `algorithm` - Digest used by the search loop
    /// * `submitter` - Sends winning candidates to the network
    /// * `runtime` - Handle of a multi-threaded tokio runtime
    /// * `aggregator` - Receives the events of every pool started here
    pub fn new(
        algorithm: Arc<dyn Algorithm>,
        submitter: Arc<S>,
        runtime: Handle,
        aggregator: Aggregator,
    ) -> Self {
        Scheduler {
            algorithm,
            submitter,
            runtime,
            aggregator,
        }
    }

    /// The aggregator pools of this scheduler report to
    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Starts `workers` mining workers for `config`
    ///
    /// Resets the aggregator before the first worker runs.
    ///
    /// # Errors
    /// `ConfigError` when `workers` is zero or the partitions would not fit
    /// in the nonce space; `IoError` when a thread cannot be spawned, in
    /// which case every worker already started is stopped again.
    pub fn start(
        &self,
        config: Arc<MiningConfig>,
        workers: usize,
    ) -> Result<PoolHandle, MinerError> {
        if workers == 0 {
            return Err(MinerError::ConfigError(
                "worker count must be a positive integer, got 0".into(),
            ));
        }
        let stride = workers as u64;
        let starts = (0..stride)
            .map(|i| config.start_nonce.checked_add(i))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| {
                MinerError::ConfigError(format!(
                    "start nonce {} leaves no room for {} workers",
                    config.start_nonce, workers
                ))
            })?;

        let epoch = self.aggregator.reset(config.log_capacity);
        self.aggregator.record(epoch, Severity::Info, "Start Mining...");
        log::info!(
            "Starting {} workers on {} ({}, tick {}, target {})",
            workers,
            self.algorithm.name(),
            config.environment(),
            config.inscription.tick(),
            config.target
        );

        let now = Instant::now();
        let handles = starts
            .iter()
            .enumerate()
            .map(|(index, start)| WorkerHandle {
                index,
                nonce_range_start: *start,
                last_reported_rate: 0,
                alive: true,
                state: WorkerState::Idle,
                last_event: now,
            })
            .collect();

        let (sender, receiver) = unbounded();
        let mut pool = PoolHandle {
            active: Arc::new(AtomicBool::new(true)),
            stopped: AtomicBool::new(false),
            aggregator: self.aggregator.clone(),
            epoch,
            handles: Arc::new(Mutex::new(handles)),
            states: Vec::with_capacity(workers),
            threads: Vec::with_capacity(workers),
            listener: None,
        };

        for (index, start) in starts.into_iter().enumerate() {
            let worker = Worker::new(
                index,
                start,
                stride,
                Arc::clone(&config),
                Arc::clone(&self.algorithm),
                Arc::clone(&self.submitter),
                self.runtime.clone(),
                sender.clone(),
                Arc::clone(&pool.active),
            );
            pool.states.push(worker.state_cell());
            let spawned = thread::Builder::new()
                .name(format!("miner-{}", index))
                .spawn(move || worker.run());

            match spawned {
                Ok(handle) => pool.threads.push(handle),
                Err(e) => {
                    pool.stop();
                    return Err(e.into());
                }
            }
        }
        // Workers own the only senders left; the listener ends once they exit.
        drop(sender);

        let listener = spawn_listener(
            receiver,
            self.aggregator.clone(),
            epoch,
            Arc::clone(&pool.handles),
        );
        match listener {
            Ok(handle) => pool.listener = Some(handle),
            Err(e) => {
                pool.stop();
                return Err(e.into());
            }
        }

        Ok(pool)
    }
}

fn spawn_listener(
    receiver: Receiver<WorkerEvent>,
    aggregator: Aggregator,
    epoch: u64,
    handles: Arc<Mutex<Vec<WorkerHandle>>>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("miner-events".into())
        .spawn(move || {
            for event in receiver {
                {
                    let mut handles = lock(&handles);
                    if let Some(handle) = handles.get_mut(event.index()) {
                        handle.last_event = Instant::now();
                        match &event {
                            WorkerEvent::Rate { rate, .. } => handle.last_reported_rate = *rate,
                            WorkerEvent::Fatal { .. } => handle.alive = false,
                            WorkerEvent::Log { .. } => {}
                        }
                    }
                }
                aggregator.apply(epoch, event);
            }
            log::debug!("All workers of epoch {} have exited", epoch);
        })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Running pool
///
/// Dropping the handle stops the pool without waiting for the threads.
pub struct PoolHandle {
    active: Arc<AtomicBool>,
    stopped: AtomicBool,
    aggregator: Aggregator,
    epoch: u64,
    handles: Arc<Mutex<Vec<WorkerHandle>>>,
    states: Vec<StateCell>,
    threads: Vec<JoinHandle<()>>,
    listener: Option<JoinHandle<()>>,
}

impl PoolHandle {
    /// Stops every worker
    ///
    /// After this returns the aggregator accepts no further event from this
    /// pool. A transaction already handed to the node is not recalled and
    /// may still be mined. Calling `stop` again does nothing.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        self.active.store(false, Ordering::SeqCst);
        self.aggregator.close(self.epoch);
        log::info!("Mining stopped");
        log::warn!("Transactions already broadcast are not cancelled and may still be mined");
    }

    /// Whether the pool has not been stopped and at least one worker runs
    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst) && self.workers().iter().any(|w| w.alive)
    }

    /// Number of workers the pool was started with
    pub fn worker_count(&self) -> usize {
        self.threads.len()
    }

    /// Current view of every worker
    ///
    /// A worker counts as dead once it reported a fatal fault or its thread
    /// has finished.
    pub fn workers(&self) -> Vec<WorkerHandle> {
        let mut handles = lock(&self.handles).clone();
        for (handle, thread) in handles.iter_mut().zip(&self.threads) {
            handle.alive = handle.alive && !thread.is_finished();
        }
        for (handle, state) in handles.iter_mut().zip(&self.states) {
            handle.state = state.get();
        }
        handles
    }

    /// Indices of workers not heard from within `threshold`
    ///
    /// A worker emits at least one rate sample per sampling window while
    /// searching, so silence well beyond it means the worker died or is
    /// stuck in a submission.
    pub fn stalled(&self, threshold: Duration) -> Vec<usize> {
        self.workers()
            .into_iter()
            .filter(|w| !w.alive || w.last_event.elapsed() > threshold)
            .map(|w| w.index)
            .collect()
    }

    /// Copy of the aggregated state
    pub fn snapshot(&self) -> AggregateState {
        self.aggregator.snapshot()
    }

    /// Stops the pool and waits for every thread to exit
    ///
    /// Blocks until workers caught in a submission get their answer.
    pub fn join(mut self) {
        self.stop();
        for thread in self.threads.drain(..) {
            let _ = thread.join();
        }
        if let Some(listener) = self.listener.take() {
            let _ = listener.join();
        }
    }
}

impl Drop for PoolHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
