//! Ticker-driven batch workers.
//!
//! A [`PeriodicWorker`] owns one loop: wait for a tick, run one batch, repeat
//! until cancelled. The tick source is a trait so tests can fire ticks by
//! hand instead of waiting on the clock.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Source of "run now" signals.
#[async_trait::async_trait]
pub trait Ticker: Send {
    async fn tick(&mut self);
}

/// Wall-clock ticker. The first tick fires immediately.
#[derive(Debug)]
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        // A slow batch should not cause a burst of catch-up runs.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

#[async_trait::async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

/// Counts from one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub selected: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// One poll-process-mark pass over a bounded batch.
///
/// Implementations log and count per-item failures; a batch never aborts
/// the worker loop.
#[async_trait::async_trait]
pub trait BatchJob: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run_batch(&self) -> BatchReport;
}

/// Handle to a running batch loop.
#[derive(Debug)]
pub struct PeriodicWorker {
    name: &'static str,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl PeriodicWorker {
    /// Spawn the loop. It stops when `cancel` (or [`Self::stop`]) fires;
    /// a batch already running is allowed to finish.
    pub fn start<T>(job: Arc<dyn BatchJob>, mut ticker: T, cancel: CancellationToken) -> Self
    where
        T: Ticker + 'static,
    {
        let name = job.name();
        let loop_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            tracing::info!(worker = name, "Periodic worker started");
            loop {
                tokio::select! {
                    _ = loop_cancel.cancelled() => {
                        tracing::info!(worker = name, "Periodic worker stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        let report = job.run_batch().await;
                        if report.selected > 0 {
                            tracing::info!(
                                worker = name,
                                selected = report.selected,
                                succeeded = report.succeeded,
                                failed = report.failed,
                                "Batch finished"
                            );
                        } else {
                            tracing::debug!(worker = name, "Nothing to do");
                        }
                    }
                }
            }
        });

        Self {
            name,
            cancel,
            handle,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Cancel the loop and wait for it to exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            tracing::error!(worker = self.name, error = %e, "Periodic worker panicked");
        }
    }
}
