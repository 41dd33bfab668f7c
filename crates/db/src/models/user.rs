//! Account rows consumed by the pipeline.

use screenreel_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Plan name for accounts that have not upgraded.
pub const PLAN_FREE: &str = "free";

/// Per-account switches that change how uploads are processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize)]
pub struct AccountSettings {
    pub ai_summary_enabled: bool,
    pub noise_reduction: bool,
}

/// An account selected for a lifecycle email.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct EmailCandidate {
    pub id: DbId,
    pub email: String,
    pub name: Option<String>,
    pub created_at: Timestamp,
}
