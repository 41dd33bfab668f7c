//! Rows of the `jobs` table consumed by the external job runner.

use screenreel_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Status given to every newly enqueued job.
pub const JOB_STATUS_PENDING: &str = "pending";

/// A row from the `jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Job {
    pub id: DbId,
    pub job_type: String,
    pub video_id: DbId,
    pub payload: serde_json::Value,
    pub status: String,
    pub attempts: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
