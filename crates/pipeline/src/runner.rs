//! Supervised fire-and-forget tasks.
//!
//! Work started from a request (the delete cascade, a transcription retry)
//! outlives that request but not the process: every task is tracked, bounded
//! by its own timeout and handed a cancellation token that fires when
//! shutdown runs out of patience.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Tracks background tasks so shutdown can wait for them.
#[derive(Debug, Clone, Default)]
pub struct TaskRunner {
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl TaskRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` with a deadline.
    ///
    /// The closure receives a token that is cancelled on forced shutdown.
    /// A task that exceeds `timeout` is dropped, which kills any child
    /// process it owns and removes its scratch directory. Returns `false`
    /// if the runner is already shutting down and the task was not started.
    pub fn spawn_with_timeout<F, Fut>(&self, name: &'static str, timeout: Duration, task: F) -> bool
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.tracker.is_closed() {
            tracing::warn!(task = name, "Runner is shutting down, task not started");
            return false;
        }

        let fut = task(self.cancel.child_token());
        self.tracker.spawn(async move {
            if tokio::time::timeout(timeout, fut).await.is_err() {
                tracing::warn!(
                    task = name,
                    timeout_secs = timeout.as_secs(),
                    "Background task timed out"
                );
            }
        });
        true
    }

    /// Number of tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Stop accepting tasks and wait up to `grace` for the running ones.
    ///
    /// If they are still running after that, their tokens are cancelled and
    /// the runner waits once more for the same period. Returns `true` when
    /// every task finished.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.tracker.close();
        if tokio::time::timeout(grace, self.tracker.wait()).await.is_ok() {
            return true;
        }

        tracing::warn!(
            in_flight = self.tracker.len(),
            "Grace period elapsed, cancelling background tasks"
        );
        self.cancel.cancel();
        tokio::time::timeout(grace, self.tracker.wait()).await.is_ok()
    }
}
