//! Handing planned jobs to the external job queue.

use screenreel_core::dispatch::PlannedJob;
use screenreel_core::types::DbId;
use screenreel_db::repositories::JobRepo;
use screenreel_db::DbPool;

/// Producer side of the background job queue.
#[async_trait::async_trait]
pub trait JobEnqueuer: Send + Sync {
    async fn enqueue(&self, video_id: DbId, job: &PlannedJob) -> Result<(), sqlx::Error>;
}

/// Inserts jobs into the `jobs` table.
#[derive(Debug, Clone)]
pub struct PgJobEnqueuer {
    pool: DbPool,
}

impl PgJobEnqueuer {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl JobEnqueuer for PgJobEnqueuer {
    async fn enqueue(&self, video_id: DbId, job: &PlannedJob) -> Result<(), sqlx::Error> {
        let row = JobRepo::enqueue(&self.pool, job.kind.as_str(), video_id, &job.payload).await?;
        tracing::debug!(job_id = row.id, video_id, job_type = %job.kind, "Job enqueued");
        Ok(())
    }
}

/// Enqueue every job, logging failures instead of returning them.
///
/// Runs after the status transition has committed, so a failed insert
/// leaves the video in its new status without the job. Returns the number
/// of jobs that were queued.
pub async fn enqueue_all(
    enqueuer: &dyn JobEnqueuer,
    video_id: DbId,
    jobs: &[PlannedJob],
) -> usize {
    let mut queued = 0;
    for job in jobs {
        match enqueuer.enqueue(video_id, job).await {
            Ok(()) => queued += 1,
            Err(e) => {
                tracing::warn!(video_id, job_type = %job.kind, error = %e, "Failed to enqueue job");
            }
        }
    }
    queued
}
