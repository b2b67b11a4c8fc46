//! Fixed-size worker pool.
//!
//! Each worker is a plain OS thread pulling jobs off a bounded
//! `crossbeam_channel`; a panic inside [`plume_sim::run`] is caught so it
//! never takes the worker thread down, and a per-job [`AtomicBool`]
//! carries cooperative cancellation for both timeouts and shutdown.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use plume_core::{SimulationError, SimulationJob};

use crate::job::JobOutcome;

/// Observable lifecycle of the pool, reported through [`tracing`] spans
/// as [`WorkerPool::shutdown`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownState {
    /// Accepting new jobs.
    Running,
    /// `job_tx` closed; existing jobs may still be running.
    Draining,
    /// The grace period expired with workers still active; about to join
    /// unconditionally.
    Quiescing,
    /// Every worker thread has been joined.
    Stopped,
}

struct Envelope {
    job: SimulationJob,
    cancel: Arc<AtomicBool>,
    reply: crossbeam_channel::Sender<JobOutcome>,
}

/// A pending or running job, returned by [`WorkerPool::submit`].
pub struct JobHandle {
    result_rx: crossbeam_channel::Receiver<JobOutcome>,
    cancel: Arc<AtomicBool>,
}

impl JobHandle {
    /// Block for the result, up to `timeout`. On expiry, sets the
    /// cooperative cancellation flag and reports [`JobOutcome::TimeExceeded`]
    /// regardless of whether the worker later finishes the job; the pool
    /// itself resumes serving the next job immediately.
    pub fn wait(&self, timeout: Duration) -> JobOutcome {
        match self.result_rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(_) => {
                self.cancel.store(true, Ordering::Relaxed);
                JobOutcome::TimeExceeded
            }
        }
    }

    /// Request cooperative cancellation without waiting (used by the
    /// supervisor to cancel not-yet-started or in-flight jobs on
    /// shutdown).
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }
}

/// A fixed-size pool of worker threads executing [`plume_sim::run`].
pub struct WorkerPool {
    job_tx: Option<crossbeam_channel::Sender<Envelope>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `size` worker threads, each pulling jobs from a shared,
    /// bounded queue of depth `size`, so the number of in-flight jobs is
    /// bounded by the pool size.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let (job_tx, job_rx) = crossbeam_channel::bounded::<Envelope>(size);
        let mut workers = Vec::with_capacity(size);
        for index in 0..size {
            let job_rx = job_rx.clone();
            let handle = thread::Builder::new()
                .name(format!("plume-worker-{index}"))
                .spawn(move || worker_loop(index, job_rx))
                .expect("failed to spawn worker thread");
            workers.push(handle);
        }
        tracing::debug!(size, state = ?ShutdownState::Running, "worker pool started");
        Self {
            job_tx: Some(job_tx),
            workers,
        }
    }

    /// Number of worker threads in the pool.
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Hand a job to the pool. Returns a handle the caller waits on with
    /// its own timeout; correlation id and reply routing live in the
    /// broker layer, not here.
    ///
    /// Panics if called after [`WorkerPool::shutdown`] — a caller racing
    /// shutdown is a broker-layer bug, not a condition this pool papers
    /// over.
    pub fn submit(&self, job: SimulationJob) -> JobHandle {
        let (reply, result_rx) = crossbeam_channel::bounded(1);
        let cancel = Arc::new(AtomicBool::new(false));
        let envelope = Envelope {
            job,
            cancel: cancel.clone(),
            reply,
        };
        self.job_tx
            .as_ref()
            .expect("submit called after shutdown")
            .send(envelope)
            .expect("worker pool channel closed unexpectedly");
        JobHandle { result_rx, cancel }
    }

    /// Stop accepting new work and wait up to `grace` for running jobs to
    /// finish cooperatively, then join every worker thread.
    ///
    /// Rust gives no safe way to hard-kill a running OS thread; past the
    /// grace period this still blocks on `join()`. Jobs that outlive the
    /// grace period must instead notice a cancellation flag at their own
    /// step boundaries.
    pub fn shutdown(mut self, grace: Duration) {
        self.job_tx.take();
        tracing::debug!(state = ?ShutdownState::Draining, "worker pool draining");

        let deadline = Instant::now() + grace;
        while Instant::now() < deadline && self.workers.iter().any(|h| !h.is_finished()) {
            thread::yield_now();
        }

        if self.workers.iter().any(|h| !h.is_finished()) {
            tracing::debug!(state = ?ShutdownState::Quiescing, "grace period expired; joining regardless");
        }

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::error!("worker thread panicked during shutdown join");
            }
        }
        tracing::debug!(state = ?ShutdownState::Stopped, "worker pool stopped");
    }
}

fn worker_loop(index: usize, job_rx: crossbeam_channel::Receiver<Envelope>) {
    while let Ok(envelope) = job_rx.recv() {
        if envelope.cancel.load(Ordering::Relaxed) {
            let _ = envelope.reply.send(JobOutcome::TimeExceeded);
            continue;
        }

        let cancel = envelope.cancel.clone();
        let job = envelope.job;
        let result = catch_unwind(AssertUnwindSafe(|| plume_sim::run(&job, &cancel)));

        let outcome = match result {
            Ok(driver_result) => JobOutcome::from_driver_result(driver_result),
            Err(panic) => {
                let reason = panic_message(&panic);
                tracing::error!(worker = index, reason, "simulation panicked");
                JobOutcome::Failed(SimulationError::InvalidJob(format!(
                    "internal error: {reason}"
                )))
            }
        };

        if let Some(kind) = outcome.error_kind() {
            tracing::warn!(worker = index, %kind, "job failed");
        }

        let _ = envelope.reply.send(outcome);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
