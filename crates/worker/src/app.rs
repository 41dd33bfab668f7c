//! Builds the pipeline services from configuration and owns their
//! lifetime.

use std::sync::Arc;
use std::time::Duration;

use screenreel_db::DbPool;
use screenreel_events::{LifecycleNudge, Mailer};
use screenreel_pipeline::cue_repair::CueRepairWorker;
use screenreel_pipeline::enqueue::PgJobEnqueuer;
use screenreel_pipeline::lifecycle::VideoLifecycle;
use screenreel_pipeline::lifecycle_email::LifecycleEmailWorker;
use screenreel_pipeline::media::{MediaToolkit, SystemToolkit};
use screenreel_pipeline::runner::TaskRunner;
use screenreel_pipeline::schedule::{IntervalTicker, PeriodicWorker};
use screenreel_pipeline::store::{PgUserStore, PgVideoStore, UserStore, VideoStore};
use screenreel_pipeline::transcription::TranscriptionPipeline;
use screenreel_storage::ObjectStore;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;

/// Running services of the worker process.
pub struct App {
    /// Entry point for request-driven transitions.
    pub lifecycle: Arc<VideoLifecycle>,
    runner: TaskRunner,
    workers: Vec<PeriodicWorker>,
    cancel: CancellationToken,
}

impl App {
    /// Wire the services and start the periodic workers.
    ///
    /// Lifecycle emails run only when a `mailer` is supplied.
    pub fn start(
        config: &WorkerConfig,
        pool: DbPool,
        objects: Arc<dyn ObjectStore>,
        mailer: Option<Arc<dyn Mailer>>,
    ) -> Self {
        let videos: Arc<dyn VideoStore> = Arc::new(PgVideoStore::new(pool.clone()));
        let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool.clone()));
        let jobs = Arc::new(PgJobEnqueuer::new(pool));
        let tools: Arc<dyn MediaToolkit> = Arc::new(SystemToolkit);
        let runner = TaskRunner::new();
        let cancel = CancellationToken::new();

        let transcription = Arc::new(TranscriptionPipeline::new(
            Arc::clone(&videos),
            Arc::clone(&objects),
            Arc::clone(&tools),
            config.transcription.clone(),
            Arc::new(Semaphore::new(config.transcription.concurrency)),
        ));
        tracing::info!(
            enabled = config.transcription.enabled,
            concurrency = config.transcription.concurrency,
            "Transcription pipeline ready"
        );

        let lifecycle = Arc::new(
            VideoLifecycle::new(
                Arc::clone(&videos),
                Arc::clone(&objects),
                jobs,
                runner.clone(),
                config.lifecycle.clone(),
            )
            .with_transcription(transcription),
        );

        let mut workers = Vec::new();

        if config.cue_repair_enabled {
            let job = Arc::new(CueRepairWorker::new(
                Arc::clone(&videos),
                Arc::clone(&objects),
                Arc::clone(&tools),
            ));
            workers.push(PeriodicWorker::start(
                job,
                IntervalTicker::new(config.cue_repair_interval),
                cancel.child_token(),
            ));
        } else {
            tracing::info!("Cue repair disabled");
        }

        match mailer {
            Some(mailer) => {
                for nudge in [LifecycleNudge::Day2, LifecycleNudge::Day7] {
                    let job = Arc::new(LifecycleEmailWorker::new(
                        nudge,
                        Arc::clone(&users),
                        Arc::clone(&mailer),
                        config.app_base_url.clone(),
                    ));
                    workers.push(PeriodicWorker::start(
                        job,
                        IntervalTicker::new(config.lifecycle_email_interval),
                        cancel.child_token(),
                    ));
                }
            }
            None => tracing::info!("SMTP not configured, lifecycle emails disabled"),
        }

        tracing::info!(workers = workers.len(), "Periodic workers started");
        Self {
            lifecycle,
            runner,
            workers,
            cancel,
        }
    }

    /// Stop the periodic workers, then drain request-spawned tasks.
    pub async fn shutdown(self, grace: Duration) {
        self.cancel.cancel();
        for worker in self.workers {
            let name = worker.name();
            worker.stop().await;
            tracing::info!(worker = name, "Periodic worker stopped");
        }

        let in_flight = self.runner.in_flight();
        if in_flight > 0 {
            tracing::info!(in_flight, "Waiting for background tasks");
        }
        if !self.runner.shutdown(grace).await {
            tracing::warn!(
                in_flight = self.runner.in_flight(),
                "Background tasks still running at exit"
            );
        }
    }
}
