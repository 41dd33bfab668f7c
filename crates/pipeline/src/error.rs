use screenreel_core::error::CoreError;
use screenreel_core::process::ToolError;
use screenreel_core::status::{TranscriptStatus, VideoStatus};
use screenreel_core::types::DbId;
use screenreel_core::upload::UploadRejection;
use screenreel_events::EmailError;
use screenreel_storage::StorageError;

/// Error type for pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A domain-level error from `screenreel_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The upload did not match what was declared. Nothing was changed.
    #[error("Upload rejected: {0}")]
    UploadRejected(#[from] UploadRejection),

    #[error("Video {0} not found")]
    VideoNotFound(DbId),

    /// The guarded update found the row in a different status, typically
    /// because a concurrent request already performed the transition.
    #[error("Video {id} is not {expected}")]
    StaleTransition { id: DbId, expected: VideoStatus },

    #[error("Transcript of video {id} is not {expected}")]
    StaleTranscript { id: DbId, expected: TranscriptStatus },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Email(#[from] EmailError),

    #[error("Transcript output could not be parsed: {0}")]
    TranscriptParse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
