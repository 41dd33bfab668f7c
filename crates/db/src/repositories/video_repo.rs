//! Repository for the `videos` table.
//!
//! Status changes are compare-and-swap updates: each one names the status it
//! expects the row to be in, and reports whether a row actually moved. Two
//! callers racing on the same transition see exactly one success.

use screenreel_core::status::{SummaryStatus, TranscriptStatus, VideoStatus};
use screenreel_core::types::DbId;
use sqlx::PgPool;

use crate::models::video::{DeletedVideoKeys, TranscriptResult, Video};

/// Column list for `videos` queries.
const COLUMNS: &str = "\
    id, owner_id, share_token, title, status, content_type, \
    file_key, thumbnail_key, webcam_key, transcript_key, \
    transcript_status, transcript_segments, summary_status, \
    cues_fixed, noise_reduced, duration, file_size, view_count, \
    file_purged_at, created_at, updated_at";

fn status_strings(statuses: &[TranscriptStatus]) -> Vec<String> {
    statuses.iter().map(|s| s.as_str().to_string()).collect()
}

/// Provides guarded reads and writes for videos.
pub struct VideoRepo;

impl VideoRepo {
    /// Find a video by id, including soft-deleted rows.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Video>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM videos WHERE id = $1");
        sqlx::query_as::<_, Video>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Move an `uploading` video to `target` and record the noise-reduction flag.
    ///
    /// Returns the updated row, or `None` if the video was not in `uploading`.
    pub async fn confirm_upload(
        pool: &PgPool,
        id: DbId,
        target: VideoStatus,
        noise_reduced: bool,
    ) -> Result<Option<Video>, sqlx::Error> {
        let query = format!(
            "UPDATE videos \
             SET status = $2, noise_reduced = $3, updated_at = NOW() \
             WHERE id = $1 AND status = $4 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Video>(&query)
            .bind(id)
            .bind(target.as_str())
            .bind(noise_reduced)
            .bind(VideoStatus::Uploading.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Generic guarded status transition. Returns `true` if the row moved.
    pub async fn transition(
        pool: &PgPool,
        id: DbId,
        from: VideoStatus,
        to: VideoStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE videos SET status = $3, updated_at = NOW() \
             WHERE id = $1 AND status = $2",
        )
        .bind(id)
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Soft-delete a video that is not already deleted.
    ///
    /// Returns the storage keys to clean up, or `None` if another request
    /// already deleted it.
    pub async fn soft_delete(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<DeletedVideoKeys>, sqlx::Error> {
        sqlx::query_as::<_, DeletedVideoKeys>(
            "UPDATE videos SET status = $2, updated_at = NOW() \
             WHERE id = $1 AND status <> $2 \
             RETURNING file_key, thumbnail_key, webcam_key, transcript_key",
        )
        .bind(id)
        .bind(VideoStatus::Deleted.as_str())
        .fetch_optional(pool)
        .await
    }

    /// Stamp `file_purged_at` for the video whose primary object is `file_key`.
    pub async fn mark_file_purged(pool: &PgPool, file_key: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE videos SET file_purged_at = NOW(), updated_at = NOW() \
             WHERE file_key = $1 AND file_purged_at IS NULL",
        )
        .bind(file_key)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Guarded transcript status change from any of `from` to `to`.
    ///
    /// Deleted videos are never touched.
    pub async fn set_transcript_status(
        pool: &PgPool,
        id: DbId,
        from: &[TranscriptStatus],
        to: TranscriptStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE videos SET transcript_status = $3, updated_at = NOW() \
             WHERE id = $1 AND transcript_status = ANY($2) AND status <> $4",
        )
        .bind(id)
        .bind(status_strings(from))
        .bind(to.as_str())
        .bind(VideoStatus::Deleted.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Persist a finished transcript and mark it `ready`.
    ///
    /// Only applies while the transcript is `processing` and the video has
    /// not been deleted. Returns `false` otherwise.
    pub async fn complete_transcript(
        pool: &PgPool,
        id: DbId,
        result: &TranscriptResult<'_>,
    ) -> Result<bool, sqlx::Error> {
        let outcome = sqlx::query(
            "UPDATE videos \
             SET transcript_key = $2, transcript_segments = $3, transcript_status = $4, \
                 summary_status = CASE WHEN $5 THEN $6 ELSE summary_status END, \
                 updated_at = NOW() \
             WHERE id = $1 AND transcript_status = $7 AND status <> $8",
        )
        .bind(id)
        .bind(result.transcript_key)
        .bind(result.segments)
        .bind(TranscriptStatus::Ready.as_str())
        .bind(result.request_summary)
        .bind(SummaryStatus::Pending.as_str())
        .bind(TranscriptStatus::Processing.as_str())
        .bind(VideoStatus::Deleted.as_str())
        .execute(pool)
        .await?;
        Ok(outcome.rows_affected() > 0)
    }

    /// Newest ready native recordings whose seek index has not been repaired.
    ///
    /// `content_type` is matched on its base type, so codec parameters
    /// recorded by the browser do not hide a row.
    pub async fn list_cue_repair_candidates(
        pool: &PgPool,
        content_type: &str,
        limit: i64,
    ) -> Result<Vec<Video>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM videos \
             WHERE btrim(split_part(lower(content_type), ';', 1)) = $1 \
               AND status = $2 AND cues_fixed = FALSE \
             ORDER BY created_at DESC \
             LIMIT $3"
        );
        sqlx::query_as::<_, Video>(&query)
            .bind(content_type)
            .bind(VideoStatus::Ready.as_str())
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Flag a video's container as repaired.
    pub async fn mark_cues_fixed(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE videos SET cues_fixed = TRUE, updated_at = NOW() \
             WHERE id = $1 AND cues_fixed = FALSE",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
