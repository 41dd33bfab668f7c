//! Object storage for recordings, thumbnails, and transcripts.
//!
//! [`ObjectStore`] is the narrow seam the pipeline consumes; [`S3ObjectStore`]
//! implements it against any S3-compatible endpoint.

pub mod error;
pub mod keys;
pub mod retry;
pub mod s3;

use std::path::Path;
use std::time::Duration;

pub use error::StorageError;
pub use retry::delete_with_retry;
pub use s3::{S3Config, S3ObjectStore};

/// Size and content type of a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHead {
    pub size: i64,
    pub content_type: Option<String>,
}

/// Operations the pipeline needs from object storage.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stream an object into a local file, creating or truncating it.
    async fn download_to_file(&self, key: &str, path: &Path) -> Result<(), StorageError>;

    /// Upload a local file, replacing any object already at `key`.
    async fn upload_file(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<(), StorageError>;

    /// Delete an object. Deleting a missing key is not an error.
    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;

    /// Fetch size and content type without downloading the body.
    async fn head_object(&self, key: &str) -> Result<ObjectHead, StorageError>;

    /// Presigned PUT URL for a direct browser upload.
    async fn generate_upload_url(
        &self,
        key: &str,
        content_type: &str,
        size: i64,
        ttl: Duration,
    ) -> Result<String, StorageError>;

    /// Presigned GET URL for playback.
    async fn generate_download_url(&self, key: &str, ttl: Duration)
        -> Result<String, StorageError>;
}
