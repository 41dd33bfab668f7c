//! Video entity model and the row shapes returned by guarded updates.

use screenreel_core::status::{SummaryStatus, TranscriptStatus, VideoStatus};
use screenreel_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `videos` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Video {
    pub id: DbId,
    pub owner_id: DbId,
    pub share_token: String,
    pub title: String,
    #[sqlx(try_from = "String")]
    pub status: VideoStatus,
    pub content_type: String,
    pub file_key: String,
    pub thumbnail_key: Option<String>,
    pub webcam_key: Option<String>,
    pub transcript_key: Option<String>,
    #[sqlx(try_from = "String")]
    pub transcript_status: TranscriptStatus,
    pub transcript_segments: Option<serde_json::Value>,
    #[sqlx(try_from = "String")]
    pub summary_status: SummaryStatus,
    pub cues_fixed: bool,
    pub noise_reduced: bool,
    pub duration: Option<i32>,
    pub file_size: Option<i64>,
    pub view_count: i64,
    pub file_purged_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Storage keys returned by the guarded soft delete.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct DeletedVideoKeys {
    pub file_key: String,
    pub thumbnail_key: Option<String>,
    pub webcam_key: Option<String>,
    pub transcript_key: Option<String>,
}

impl DeletedVideoKeys {
    /// Secondary objects to clean up after the primary file, in order.
    pub fn secondary_keys(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("thumbnail", self.thumbnail_key.as_deref()),
            ("webcam", self.webcam_key.as_deref()),
            ("transcript", self.transcript_key.as_deref()),
        ]
        .into_iter()
        .filter_map(|(label, key)| key.map(|k| (label, k)))
    }
}

/// A completed transcript to persist.
#[derive(Debug, Clone)]
pub struct TranscriptResult<'a> {
    pub transcript_key: &'a str,
    pub segments: &'a serde_json::Value,
    /// Also move `summary_status` to `pending` for the summariser.
    pub request_summary: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secondary_keys_skip_absent_objects() {
        let keys = DeletedVideoKeys {
            file_key: "a.webm".into(),
            thumbnail_key: Some("a.jpg".into()),
            webcam_key: None,
            transcript_key: Some("a.vtt".into()),
        };
        let secondary: Vec<_> = keys.secondary_keys().collect();
        assert_eq!(secondary, vec![("thumbnail", "a.jpg"), ("transcript", "a.vtt")]);
    }
}
