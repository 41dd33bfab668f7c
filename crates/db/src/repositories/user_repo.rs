//! Repository for the `users` table: processing preferences and the
//! lifecycle-email eligibility queries.

use screenreel_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::{AccountSettings, EmailCandidate, PLAN_FREE};

/// Column list for lifecycle email candidates.
const CANDIDATE_COLUMNS: &str = "u.id, u.email, u.name, u.created_at";

/// Provides account reads and sent-marker writes.
pub struct UserRepo;

impl UserRepo {
    /// Processing switches for an account. `None` if the account is gone.
    pub async fn settings(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<AccountSettings>, sqlx::Error> {
        sqlx::query_as::<_, AccountSettings>(
            "SELECT ai_summary_enabled, noise_reduction FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Verified accounts at least two days old whose videos have no views yet.
    pub async fn list_day2_candidates(
        pool: &PgPool,
        limit: i64,
    ) -> Result<Vec<EmailCandidate>, sqlx::Error> {
        let query = format!(
            "SELECT {CANDIDATE_COLUMNS} FROM users u \
             WHERE u.day2_email_sent_at IS NULL \
               AND u.email_verified = TRUE \
               AND u.created_at <= NOW() - INTERVAL '2 days' \
               AND u.created_at > NOW() - INTERVAL '7 days' \
               AND NOT EXISTS ( \
                   SELECT 1 FROM videos v \
                   WHERE v.owner_id = u.id AND v.view_count > 0 \
               ) \
             ORDER BY u.created_at ASC \
             LIMIT $1"
        );
        sqlx::query_as::<_, EmailCandidate>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Accounts at least seven days old that are still on the free plan.
    pub async fn list_day7_candidates(
        pool: &PgPool,
        limit: i64,
    ) -> Result<Vec<EmailCandidate>, sqlx::Error> {
        let query = format!(
            "SELECT {CANDIDATE_COLUMNS} FROM users u \
             WHERE u.day7_email_sent_at IS NULL \
               AND u.plan = $1 \
               AND u.created_at <= NOW() - INTERVAL '7 days' \
               AND u.created_at > NOW() - INTERVAL '14 days' \
             ORDER BY u.created_at ASC \
             LIMIT $2"
        );
        sqlx::query_as::<_, EmailCandidate>(&query)
            .bind(PLAN_FREE)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    /// Record that the day-2 email went out. Returns `false` if already marked.
    pub async fn mark_day2_sent(pool: &PgPool, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET day2_email_sent_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND day2_email_sent_at IS NULL",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Record that the day-7 email went out. Returns `false` if already marked.
    pub async fn mark_day7_sent(pool: &PgPool, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET day7_email_sent_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND day7_email_sent_at IS NULL",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
