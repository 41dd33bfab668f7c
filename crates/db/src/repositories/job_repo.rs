//! Repository for the `jobs` table.
//!
//! Only the producer side lives here: rows are inserted as `pending` and
//! picked up by the external job runner.

use screenreel_core::types::DbId;
use sqlx::PgPool;

use crate::models::job::{Job, JOB_STATUS_PENDING};

/// Column list for `jobs` queries.
const COLUMNS: &str = "id, job_type, video_id, payload, status, attempts, created_at, updated_at";

/// Inserts background jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert a pending job for `video_id`.
    pub async fn enqueue(
        pool: &PgPool,
        job_type: &str,
        video_id: DbId,
        payload: &serde_json::Value,
    ) -> Result<Job, sqlx::Error> {
        let query = format!(
            "INSERT INTO jobs (job_type, video_id, payload, status) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Job>(&query)
            .bind(job_type)
            .bind(video_id)
            .bind(payload)
            .bind(JOB_STATUS_PENDING)
            .fetch_one(pool)
            .await
    }
}
