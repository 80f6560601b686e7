// src/miner/worker.rs
//! Mining worker
//!
//! Each worker owns one OS thread and one nonce partition
//! (`start, start + stride, start + 2 * stride, ...`). It hashes in a tight
//! loop, reports its throughput once per sampling window, and on a winning
//! candidate blocks on the async runtime just long enough to submit the
//! mint. Whatever the submission outcome, the worker resumes searching at
//! the next nonce of its partition.
//!
//! The only way out is the pool's stop flag, a closed event channel, or an
//! internal fault. A fault (an algorithm error or a panic) is reported as a
//! [`WorkerEvent::Fatal`] before the thread exits.

use crate::config::MiningConfig;
use crate::miner::algorithm::Algorithm;
use crate::miner::search::{Candidate, search};
use crate::network::submitter::{SubmissionResult, Submitter};
use crate::types::Severity;
use crate::utils::error::MinerError;
use crossbeam_channel::Sender;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Instant;
use tokio::runtime::Handle;

/// Hashes between two clock reads
const CLOCK_CHECK_INTERVAL: u64 = 64;

/// Message sent from a worker to the pool
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerEvent {
    /// Throughput over the last sampling window
    ///
    /// Normalized to hashes per second, so with the default 1000 ms window
    /// it equals the number of nonces tried in that window.
    Rate {
        /// Emitting worker
        index: usize,
        /// Hashes per second
        rate: u64,
    },
    /// Human-readable log entry
    Log {
        /// Emitting worker
        index: usize,
        /// Entry severity
        severity: Severity,
        /// Entry text
        message: String,
    },
    /// The worker hit an internal fault and has stopped
    Fatal {
        /// Failed worker
        index: usize,
        /// Fault description
        reason: String,
    },
}

impl WorkerEvent {
    /// Index of the worker that emitted the event
    pub fn index(&self) -> usize {
        match self {
            WorkerEvent::Rate { index, .. }
            | WorkerEvent::Log { index, .. }
            | WorkerEvent::Fatal { index, .. } => *index,
        }
    }
}

/// Lifecycle of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    /// Created, not yet running
    Idle,
    /// Hashing its partition
    Searching,
    /// Holding a winning candidate
    Found,
    /// Waiting on the submitter
    Submitting,
    /// Last submission succeeded
    Success,
    /// Last submission failed
    Failed,
    /// Stopped; never left
    Terminated,
}

impl WorkerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => WorkerState::Idle,
            1 => WorkerState::Searching,
            2 => WorkerState::Found,
            3 => WorkerState::Submitting,
            4 => WorkerState::Success,
            5 => WorkerState::Failed,
            _ => WorkerState::Terminated,
        }
    }
}

/// Shared view of a worker's [`WorkerState`]
///
/// The worker writes it, the pool reads it from other threads.
#[derive(Debug, Clone)]
pub struct StateCell(Arc<AtomicU8>);

impl StateCell {
    fn new(state: WorkerState) -> Self {
        StateCell(Arc::new(AtomicU8::new(state as u8)))
    }

    /// Latest state published by the worker
    pub fn get(&self) -> WorkerState {
        WorkerState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn set(&self, state: WorkerState) {
        self.0.store(state as u8, Ordering::Release);
    }
}

/// Worker thread that performs mining computations
pub struct Worker<S> {
    index: usize,
    next_nonce: u64,
    stride: u64,
    config: Arc<MiningConfig>,
    algorithm: Arc<dyn Algorithm>,
    submitter: Arc<S>,
    runtime: Handle,
    events: Sender<WorkerEvent>,
    active: Arc<AtomicBool>,
    state: StateCell,
}

impl<S: Submitter> Worker<S> {
    /// Creates a worker for the partition starting at `start` with `stride`
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        index: usize,
        start: u64,
        stride: u64,
        config: Arc<MiningConfig>,
        algorithm: Arc<dyn Algorithm>,
        submitter: Arc<S>,
        runtime: Handle,
        events: Sender<WorkerEvent>,
        active: Arc<AtomicBool>,
    ) -> Self {
        Worker {
            index,
            next_nonce: start,
            stride: stride.max(1),
            config,
            algorithm,
            submitter,
            runtime,
            events,
            active,
            state: StateCell::new(WorkerState::Idle),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> WorkerState {
        self.state.get()
    }

    /// Handle that keeps observing the state after `run` takes the worker
    pub fn state_cell(&self) -> StateCell {
        self.state.clone()
    }

    /// Runs the worker until stopped
    ///
    /// Never unwinds: a panic inside the loop is caught and reported as a
    /// fatal event, like an error returned by the loop.
    pub fn run(mut self) {
        let index = self.index;
        let events = self.events.clone();
        let state = self.state.clone();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.mine()));
        state.set(WorkerState::Terminated);
        let reason = match outcome {
            Ok(Ok(())) => return,
            // The pool stopped listening; nothing left to report to.
            Ok(Err(MinerError::ChannelError(_))) => return,
            Ok(Err(e)) => e.to_string(),
            Err(payload) => panic_message(payload.as_ref()),
        };

        log::debug!("Worker {} stopped: {}", index, reason);
        let _ = events.send(WorkerEvent::Fatal { index, reason });
    }

    /// Search loop; returns `Ok` on a regular stop
    ///
    /// Every nonce is fully handled, submission included, before the
    /// partition advances, so its last nonce is searched too.
    fn mine(&mut self) -> Result<(), MinerError> {
        self.state.set(WorkerState::Searching);
        log::debug!(
            "Worker {} searching from nonce {} (stride {})",
            self.index,
            self.next_nonce,
            self.stride
        );

        let mut window_start = Instant::now();
        let mut hashes: u64 = 0;

        while self.active.load(Ordering::Relaxed) {
            let candidate = search(
                self.algorithm.as_ref(),
                &self.config.inscription,
                self.next_nonce,
            )?;
            hashes += 1;

            let submitted = if candidate.is_winning(&self.config.target) {
                self.state.set(WorkerState::Found);
                self.submit(candidate)?;
                self.state.set(WorkerState::Searching);
                true
            } else {
                false
            };

            if submitted || hashes % CLOCK_CHECK_INTERVAL == 0 {
                let elapsed = window_start.elapsed();
                if elapsed >= self.config.rate_window {
                    let rate = (hashes as f64 / elapsed.as_secs_f64()).round() as u64;
                    self.emit(WorkerEvent::Rate {
                        index: self.index,
                        rate,
                    })?;
                    hashes = 0;
                    window_start = Instant::now();
                }
            }

            self.advance()?;
        }

        Ok(())
    }

    /// Moves to the next nonce of the partition
    fn advance(&mut self) -> Result<(), MinerError> {
        self.next_nonce = self.next_nonce.checked_add(self.stride).ok_or_else(|| {
            MinerError::AlgorithmError(format!("nonce partition of worker {} exhausted", self.index))
        })?;
        Ok(())
    }

    /// Hands a winning candidate to the submitter and reports the outcome
    fn submit(&mut self, candidate: Candidate) -> Result<(), MinerError> {
        self.state.set(WorkerState::Submitting);
        log::debug!(
            "Worker {} found nonce {} ({})",
            self.index,
            candidate.nonce,
            candidate.digest_hex()
        );

        let submitter = Arc::clone(&self.submitter);
        let result = self
            .runtime
            .block_on(submitter.submit(&self.config, &candidate));

        let (severity, message) = match result {
            SubmissionResult::Success(tx) => {
                self.state.set(WorkerState::Success);
                (
                    Severity::Success,
                    format!(
                        "Worker {} minted {} {} (nonce {}): {}",
                        self.index,
                        self.config.inscription.amount(),
                        self.config.inscription.tick(),
                        candidate.nonce,
                        tx
                    ),
                )
            }
            SubmissionResult::Rejected(reason) => {
                self.state.set(WorkerState::Failed);
                (
                    Severity::Error,
                    format!(
                        "Worker {} mint rejected (nonce {}): {}",
                        self.index, candidate.nonce, reason
                    ),
                )
            }
            SubmissionResult::TransportError(reason) => {
                self.state.set(WorkerState::Failed);
                (
                    Severity::Error,
                    format!(
                        "Worker {} transport error (nonce {}): {}",
                        self.index, candidate.nonce, reason
                    ),
                )
            }
        };

        self.emit(WorkerEvent::Log {
            index: self.index,
            severity,
            message,
        })
    }

    fn emit(&self, event: WorkerEvent) -> Result<(), MinerError> {
        self.events.send(event)?;
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miner::Inscription;
    use crate::miner::algorithm::testing::{ModuloDigest, PanickingDigest, config};
    use crossbeam_channel::{Receiver, unbounded};
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    /// Records every submitted nonce and answers with a fixed outcome
    struct RecordingSubmitter {
        outcome: SubmissionResult,
        nonces: Mutex<Vec<u64>>,
    }

    impl RecordingSubmitter {
        fn new(outcome: SubmissionResult) -> Arc<Self> {
            Arc::new(RecordingSubmitter {
                outcome,
                nonces: Mutex::new(Vec::new()),
            })
        }
    }

    impl Submitter for RecordingSubmitter {
        async fn submit(&self, _config: &MiningConfig, candidate: &Candidate) -> SubmissionResult {
            self.nonces.lock().unwrap().push(candidate.nonce);
            self.outcome.clone()
        }
    }

    /// Blocks every submission until the test hands out permits
    struct GatedSubmitter {
        gate: tokio::sync::Semaphore,
    }

    impl Submitter for GatedSubmitter {
        async fn submit(&self, _config: &MiningConfig, _candidate: &Candidate) -> SubmissionResult {
            self.gate.acquire().await.unwrap().forget();
            SubmissionResult::Success("0x02".into())
        }
    }

    struct Running {
        active: Arc<AtomicBool>,
        events: Receiver<WorkerEvent>,
        state: StateCell,
        handle: thread::JoinHandle<()>,
    }

    fn spawn_partition<S: Submitter + 'static>(
        algorithm: Arc<dyn Algorithm>,
        submitter: Arc<S>,
        difficulty: &str,
        start: u64,
        stride: u64,
        runtime: &tokio::runtime::Runtime,
    ) -> Running {
        let (tx, rx) = unbounded();
        let active = Arc::new(AtomicBool::new(true));
        let worker = Worker::new(
            1,
            start,
            stride,
            Arc::new(config(difficulty)),
            algorithm,
            submitter,
            runtime.handle().clone(),
            tx,
            active.clone(),
        );
        assert_eq!(worker.state(), WorkerState::Idle);
        let state = worker.state_cell();
        Running {
            active,
            events: rx,
            state,
            handle: thread::spawn(move || worker.run()),
        }
    }

    fn spawn_worker<S: Submitter + 'static>(
        algorithm: Arc<dyn Algorithm>,
        submitter: Arc<S>,
        difficulty: &str,
        runtime: &tokio::runtime::Runtime,
    ) -> (Arc<AtomicBool>, Receiver<WorkerEvent>, thread::JoinHandle<()>) {
        let running = spawn_partition(algorithm, submitter, difficulty, 1, 2, runtime);
        (running.active, running.events, running.handle)
    }

    fn wait_for_state(cell: &StateCell, wanted: WorkerState) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while cell.get() != wanted {
            assert!(Instant::now() < deadline, "worker never reached {:?}", wanted);
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn only_winning_nonces_of_own_partition_are_submitted() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let submitter = RecordingSubmitter::new(SubmissionResult::Success("0x01".into()));
        // digest = nonce % 100000 <= 10
        let (active, rx, handle) =
            spawn_worker(Arc::new(ModuloDigest), submitter.clone(), "0xa", &runtime);

        let mut successes = 0;
        while successes < 3 {
            if let WorkerEvent::Log { severity, .. } = rx.recv_timeout(Duration::from_secs(10)).unwrap() {
                assert_eq!(severity, Severity::Success);
                successes += 1;
            }
        }
        active.store(false, Ordering::SeqCst);
        handle.join().unwrap();

        let nonces = submitter.nonces.lock().unwrap().clone();
        assert!(nonces.len() >= 3);
        for nonce in nonces {
            assert_eq!(nonce % 2, 1, "nonce {} outside partition", nonce);
            assert!(nonce % 100_000 <= 10, "nonce {} does not meet target", nonce);
        }
    }

    #[test]
    fn rejected_submissions_keep_the_worker_searching() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let submitter =
            RecordingSubmitter::new(SubmissionResult::Rejected("insufficient funds".into()));
        let (active, rx, handle) =
            spawn_worker(Arc::new(ModuloDigest), submitter.clone(), "0xffff", &runtime);

        let mut errors = 0;
        let mut rates = 0;
        while errors < 5 || rates < 2 {
            match rx.recv_timeout(Duration::from_secs(10)).unwrap() {
                WorkerEvent::Log { severity, message, .. } => {
                    assert_eq!(severity, Severity::Error);
                    assert!(message.contains("insufficient funds"));
                    errors += 1;
                }
                WorkerEvent::Rate { .. } => rates += 1,
                WorkerEvent::Fatal { reason, .. } => panic!("worker died: {}", reason),
            }
        }

        assert!(!handle.is_finished());
        active.store(false, Ordering::SeqCst);
        handle.join().unwrap();
    }

    #[test]
    fn panic_becomes_fatal_event() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let submitter = RecordingSubmitter::new(SubmissionResult::Success("0x01".into()));
        let (_active, rx, handle) =
            spawn_worker(Arc::new(PanickingDigest), submitter, "0xffff", &runtime);

        handle.join().expect("worker thread must not unwind");
        match rx.recv_timeout(Duration::from_secs(1)).unwrap() {
            WorkerEvent::Fatal { index, reason } => {
                assert_eq!(index, 1);
                assert!(reason.contains("exploded"), "{}", reason);
            }
            other => panic!("expected fatal event, got {:?}", other),
        }
        assert!(rx.try_recv().is_err(), "no events after a fatal one");
    }

    #[test]
    fn closed_channel_ends_worker_quietly() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let submitter = RecordingSubmitter::new(SubmissionResult::Success("0x01".into()));
        let (_active, rx, handle) =
            spawn_worker(Arc::new(ModuloDigest), submitter, "0xffff", &runtime);

        drop(rx);
        handle.join().unwrap();
    }

    #[test]
    fn last_nonce_of_a_partition_is_still_submitted() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let submitter = RecordingSubmitter::new(SubmissionResult::Success("0x01".into()));
        let every_digest = "f".repeat(64);
        let running = spawn_partition(
            Arc::new(ModuloDigest),
            submitter.clone(),
            &every_digest,
            u64::MAX - 1,
            1,
            &runtime,
        );

        running.handle.join().unwrap();
        let events: Vec<WorkerEvent> = running.events.try_iter().collect();
        match events.last() {
            Some(WorkerEvent::Fatal { reason, .. }) => {
                assert!(reason.contains("exhausted"), "{}", reason)
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
        let minted = events
            .iter()
            .filter(|e| matches!(e, WorkerEvent::Log { severity: Severity::Success, .. }))
            .count();
        assert_eq!(minted, 2);
        assert_eq!(
            *submitter.nonces.lock().unwrap(),
            vec![u64::MAX - 1, u64::MAX]
        );
        assert_eq!(running.state.get(), WorkerState::Terminated);
    }

    #[test]
    fn state_is_visible_while_the_worker_runs() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let submitter = Arc::new(GatedSubmitter {
            gate: tokio::sync::Semaphore::new(0),
        });
        let running = spawn_partition(
            Arc::new(ModuloDigest),
            submitter.clone(),
            "0xa",
            1,
            2,
            &runtime,
        );

        // nonce 1 wins at once and the gate holds the submission
        wait_for_state(&running.state, WorkerState::Submitting);

        submitter.gate.add_permits(1 << 20);
        loop {
            match running.events.recv_timeout(Duration::from_secs(10)).unwrap() {
                WorkerEvent::Log { severity, message, .. } => {
                    assert_eq!(severity, Severity::Success);
                    assert!(message.contains("(nonce 1)"), "{}", message);
                    break;
                }
                WorkerEvent::Rate { .. } => {}
                WorkerEvent::Fatal { reason, .. } => panic!("worker died: {}", reason),
            }
        }
        assert_ne!(running.state.get(), WorkerState::Terminated);

        running.active.store(false, Ordering::SeqCst);
        running.handle.join().unwrap();
        assert_eq!(running.state.get(), WorkerState::Terminated);
    }

    /// Takes at least a millisecond per nonce
    struct SlowDigest;

    impl Algorithm for SlowDigest {
        fn hash(&self, inscription: &Inscription, nonce: u64) -> Result<[u8; 32], MinerError> {
            thread::sleep(Duration::from_millis(1));
            ModuloDigest.hash(inscription, nonce)
        }

        fn name(&self) -> &'static str {
            "slow"
        }
    }

    #[test]
    fn rate_is_normalized_to_hashes_per_second() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let submitter = RecordingSubmitter::new(SubmissionResult::Success("0x01".into()));
        // odd nonces never hit a multiple of 100000
        let (active, rx, handle) = spawn_worker(Arc::new(SlowDigest), submitter, "0x0", &runtime);

        let mut samples = Vec::new();
        while samples.len() < 3 {
            if let WorkerEvent::Rate { rate, .. } = rx.recv_timeout(Duration::from_secs(10)).unwrap() {
                samples.push(rate);
            }
        }
        active.store(false, Ordering::SeqCst);
        handle.join().unwrap();

        // Each sample spans one 64-hash clock check of at least 64 ms, so a
        // raw per-window count would always read 64.
        for rate in samples {
            assert!(rate <= 1000, "{} exceeds one hash per millisecond", rate);
            assert!(rate > 64, "{} looks like a raw count", rate);
        }
    }

    #[test]
    fn panic_messages_are_extracted() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "panicked: boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "panicked: bang");
        let boxed: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(boxed.as_ref()), "panicked");
    }
}
