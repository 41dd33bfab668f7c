//! Storage cleanup after a soft delete.

use screenreel_db::models::video::DeletedVideoKeys;
use screenreel_storage::{delete_with_retry, ObjectStore};
use tokio_util::sync::CancellationToken;

use crate::store::VideoStore;

/// What the cascade managed to remove.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub primary_deleted: bool,
    /// Labels of secondary objects that could not be deleted.
    pub secondary_failures: Vec<&'static str>,
    pub purge_recorded: bool,
}

/// Delete the primary recording, then the thumbnail, webcam track and
/// transcript, each with bounded retries.
///
/// A failed secondary delete is logged and the cascade moves on.
/// `file_purged_at` is stamped only if the primary object is gone; a
/// missing stamp marks the video for a later sweep.
pub async fn purge_video_objects(
    videos: &dyn VideoStore,
    objects: &dyn ObjectStore,
    keys: &DeletedVideoKeys,
    max_attempts: u32,
    cancel: &CancellationToken,
) -> PurgeReport {
    let mut report = PurgeReport::default();

    match delete_with_retry(objects, &keys.file_key, max_attempts, cancel).await {
        Ok(_) => report.primary_deleted = true,
        Err(e) => {
            tracing::error!(key = %keys.file_key, error = %e, "Failed to delete primary object");
        }
    }

    for (label, key) in keys.secondary_keys() {
        if let Err(e) = delete_with_retry(objects, key, max_attempts, cancel).await {
            tracing::warn!(object = label, key, error = %e, "Failed to delete secondary object");
            report.secondary_failures.push(label);
        }
    }

    if report.primary_deleted {
        match videos.mark_file_purged(&keys.file_key).await {
            Ok(marked) => report.purge_recorded = marked,
            Err(e) => {
                tracing::error!(key = %keys.file_key, error = %e, "Failed to record file purge");
            }
        }
    }

    tracing::info!(
        file_key = %keys.file_key,
        primary_deleted = report.primary_deleted,
        secondary_failures = report.secondary_failures.len(),
        "Storage cleanup finished"
    );
    report
}
