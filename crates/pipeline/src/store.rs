//! Persistence seams used by the pipeline, with PostgreSQL adapters.
//!
//! The traits mirror the guarded repository methods one to one so that the
//! compare-and-swap semantics stay visible at the call sites.

use screenreel_core::status::{TranscriptStatus, VideoStatus};
use screenreel_core::types::DbId;
use screenreel_core::video::MIME_WEBM;
use screenreel_db::models::user::{AccountSettings, EmailCandidate};
use screenreel_db::models::video::{DeletedVideoKeys, TranscriptResult, Video};
use screenreel_db::repositories::{UserRepo, VideoRepo};
use screenreel_db::DbPool;
use screenreel_events::LifecycleNudge;

/// Video reads and guarded status writes.
#[async_trait::async_trait]
pub trait VideoStore: Send + Sync {
    async fn find(&self, id: DbId) -> Result<Option<Video>, sqlx::Error>;

    /// `uploading` -> `target`. Returns the updated row if this call won.
    async fn confirm_upload(
        &self,
        id: DbId,
        target: VideoStatus,
        noise_reduced: bool,
    ) -> Result<Option<Video>, sqlx::Error>;

    async fn transition(
        &self,
        id: DbId,
        from: VideoStatus,
        to: VideoStatus,
    ) -> Result<bool, sqlx::Error>;

    /// Any non-deleted status -> `deleted`. Returns the keys to purge if
    /// this call won.
    async fn soft_delete(&self, id: DbId) -> Result<Option<DeletedVideoKeys>, sqlx::Error>;

    async fn mark_file_purged(&self, file_key: &str) -> Result<bool, sqlx::Error>;

    async fn set_transcript_status(
        &self,
        id: DbId,
        from: &[TranscriptStatus],
        to: TranscriptStatus,
    ) -> Result<bool, sqlx::Error>;

    /// `processing` -> `ready` with the transcript key and segments.
    async fn complete_transcript(
        &self,
        id: DbId,
        result: &TranscriptResult<'_>,
    ) -> Result<bool, sqlx::Error>;

    /// Ready browser recordings that still need their seek index rebuilt.
    async fn cue_repair_candidates(&self, limit: i64) -> Result<Vec<Video>, sqlx::Error>;

    async fn mark_cues_fixed(&self, id: DbId) -> Result<bool, sqlx::Error>;

    /// Processing switches of the owner. Missing accounts get the defaults.
    async fn account_settings(&self, owner_id: DbId) -> Result<AccountSettings, sqlx::Error>;
}

/// Lifecycle email eligibility and sent markers.
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    async fn nudge_candidates(
        &self,
        nudge: LifecycleNudge,
        limit: i64,
    ) -> Result<Vec<EmailCandidate>, sqlx::Error>;

    async fn mark_nudge_sent(&self, nudge: LifecycleNudge, user_id: DbId)
        -> Result<bool, sqlx::Error>;
}

/// [`VideoStore`] over the `videos` and `users` tables.
#[derive(Debug, Clone)]
pub struct PgVideoStore {
    pool: DbPool,
}

impl PgVideoStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl VideoStore for PgVideoStore {
    async fn find(&self, id: DbId) -> Result<Option<Video>, sqlx::Error> {
        VideoRepo::find_by_id(&self.pool, id).await
    }

    async fn confirm_upload(
        &self,
        id: DbId,
        target: VideoStatus,
        noise_reduced: bool,
    ) -> Result<Option<Video>, sqlx::Error> {
        VideoRepo::confirm_upload(&self.pool, id, target, noise_reduced).await
    }

    async fn transition(
        &self,
        id: DbId,
        from: VideoStatus,
        to: VideoStatus,
    ) -> Result<bool, sqlx::Error> {
        VideoRepo::transition(&self.pool, id, from, to).await
    }

    async fn soft_delete(&self, id: DbId) -> Result<Option<DeletedVideoKeys>, sqlx::Error> {
        VideoRepo::soft_delete(&self.pool, id).await
    }

    async fn mark_file_purged(&self, file_key: &str) -> Result<bool, sqlx::Error> {
        VideoRepo::mark_file_purged(&self.pool, file_key).await
    }

    async fn set_transcript_status(
        &self,
        id: DbId,
        from: &[TranscriptStatus],
        to: TranscriptStatus,
    ) -> Result<bool, sqlx::Error> {
        VideoRepo::set_transcript_status(&self.pool, id, from, to).await
    }

    async fn complete_transcript(
        &self,
        id: DbId,
        result: &TranscriptResult<'_>,
    ) -> Result<bool, sqlx::Error> {
        VideoRepo::complete_transcript(&self.pool, id, result).await
    }

    async fn cue_repair_candidates(&self, limit: i64) -> Result<Vec<Video>, sqlx::Error> {
        VideoRepo::list_cue_repair_candidates(&self.pool, MIME_WEBM, limit).await
    }

    async fn mark_cues_fixed(&self, id: DbId) -> Result<bool, sqlx::Error> {
        VideoRepo::mark_cues_fixed(&self.pool, id).await
    }

    async fn account_settings(&self, owner_id: DbId) -> Result<AccountSettings, sqlx::Error> {
        Ok(UserRepo::settings(&self.pool, owner_id)
            .await?
            .unwrap_or_default())
    }
}

/// [`UserStore`] over the `users` table.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: DbPool,
}

impl PgUserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserStore for PgUserStore {
    async fn nudge_candidates(
        &self,
        nudge: LifecycleNudge,
        limit: i64,
    ) -> Result<Vec<EmailCandidate>, sqlx::Error> {
        match nudge {
            LifecycleNudge::Day2 => UserRepo::list_day2_candidates(&self.pool, limit).await,
            LifecycleNudge::Day7 => UserRepo::list_day7_candidates(&self.pool, limit).await,
        }
    }

    async fn mark_nudge_sent(
        &self,
        nudge: LifecycleNudge,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        match nudge {
            LifecycleNudge::Day2 => UserRepo::mark_day2_sent(&self.pool, user_id).await,
            LifecycleNudge::Day7 => UserRepo::mark_day7_sent(&self.pool, user_id).await,
        }
    }
}
