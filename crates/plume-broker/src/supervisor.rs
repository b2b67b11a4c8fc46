//! Lifecycle supervisor: signal handling and shutdown coordination.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::info;

use plume_worker::WorkerPool;

/// Grace period given to the broker's consume loop to finish draining
/// before the worker pool is torn down.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

/// Grace period given to in-flight worker-pool jobs before their
/// threads are joined regardless.
const POOL_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Coordinates shutdown across the broker client and worker pool.
///
/// Idempotent: [`Supervisor::trigger_shutdown`] may be called more than
/// once (e.g. a second signal arriving mid-shutdown) without double
/// running the teardown sequence.
pub struct Supervisor {
    shutdown: Arc<Notify>,
    shutting_down: Arc<AtomicBool>,
}

impl Supervisor {
    /// Build a supervisor with fresh shutdown-coordination primitives.
    pub fn new() -> Self {
        Self {
            shutdown: Arc::new(Notify::new()),
            shutting_down: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The shutdown notifier handed to the broker client; `notified()`
    /// resolves once [`Supervisor::trigger_shutdown`] has been called.
    pub fn shutdown_notify(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// Shared flag the broker client checks before starting new work.
    /// No new task should be started once this flag is observed set.
    pub fn shutting_down_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutting_down)
    }

    /// Idempotently begin shutdown: flips the flag once, then wakes every
    /// waiter on the notifier.
    pub fn trigger_shutdown(&self) {
        if self.shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("shutdown triggered");
        self.shutdown.notify_waiters();
    }

    /// Install handlers for `SIGTERM` and `SIGINT` and trigger shutdown
    /// on whichever arrives first.
    #[cfg(unix)]
    pub async fn wait_for_signal(&self) {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("install SIGINT handler");

        tokio::select! {
            _ = sigterm.recv() => info!(signal = "SIGTERM", "received shutdown signal"),
            _ = sigint.recv() => info!(signal = "SIGINT", "received shutdown signal"),
        }
        self.trigger_shutdown();
    }

    /// Non-Unix fallback: Ctrl-C is the only portable signal.
    #[cfg(not(unix))]
    pub async fn wait_for_signal(&self) {
        let _ = tokio::signal::ctrl_c().await;
        info!(signal = "ctrl_c", "received shutdown signal");
        self.trigger_shutdown();
    }

    /// Tear down the worker pool after the broker session has drained,
    /// bounded by [`POOL_SHUTDOWN_GRACE`].
    pub async fn shutdown_pool(pool: WorkerPool) {
        tokio::task::spawn_blocking(move || pool.shutdown(POOL_SHUTDOWN_GRACE))
            .await
            .ok();
    }

    /// The grace period allotted to the broker drain phase.
    pub fn drain_grace(&self) -> Duration {
        DRAIN_GRACE
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trigger_shutdown_is_idempotent_and_wakes_waiters() {
        let supervisor = Supervisor::new();
        let notify = supervisor.shutdown_notify();

        let waiter = tokio::spawn(async move {
            notify.notified().await;
        });

        supervisor.trigger_shutdown();
        supervisor.trigger_shutdown(); // second call must not panic or double-fire badly

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter must wake")
            .expect("task must not panic");

        assert!(supervisor.shutting_down_flag().load(Ordering::SeqCst));
    }
}
