//! S3-compatible implementation of [`ObjectStore`].

use std::path::Path;
use std::time::Duration;

use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tokio::io::AsyncWriteExt;

use crate::{ObjectHead, ObjectStore, StorageError};

/// Connection settings for the bucket.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    /// Custom endpoint for S3-compatible services (R2, MinIO). Enables
    /// path-style addressing.
    pub endpoint: Option<String>,
}

impl S3Config {
    /// Load from environment variables.
    ///
    /// | Variable      | Required | Default |
    /// |---------------|----------|---------|
    /// | `S3_BUCKET`   | yes      | n/a     |
    /// | `S3_ENDPOINT` | no       | AWS     |
    ///
    /// Credentials and region come from the standard AWS environment.
    pub fn from_env() -> Option<Self> {
        let bucket = std::env::var("S3_BUCKET").ok()?;
        Some(Self {
            bucket,
            endpoint: std::env::var("S3_ENDPOINT").ok().filter(|e| !e.is_empty()),
        })
    }
}

/// [`ObjectStore`] backed by a single S3 bucket.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

fn service_error<E>(err: E) -> StorageError
where
    E: std::error::Error,
{
    StorageError::Service(DisplayErrorContext(err).to_string())
}

impl S3ObjectStore {
    /// Build a client from the default AWS credential chain.
    pub async fn connect(config: &S3Config) -> Self {
        let shared = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
        }
    }

    fn presigning(ttl: Duration) -> Result<PresigningConfig, StorageError> {
        PresigningConfig::expires_in(ttl).map_err(|e| StorageError::Presign(e.to_string()))
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3ObjectStore {
    async fn download_to_file(&self, key: &str, path: &Path) -> Result<(), StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(se) if se.is_no_such_key() => StorageError::NotFound(key.to_string()),
                _ => service_error(e),
            })?;

        let mut body = output.body.into_async_read();
        let mut file = tokio::fs::File::create(path).await?;
        tokio::io::copy(&mut body, &mut file).await?;
        file.flush().await?;

        tracing::debug!(key, path = %path.display(), "Downloaded object");
        Ok(())
    }

    async fn upload_file(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<(), StorageError> {
        let body = ByteStream::from_path(path).await.map_err(service_error)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(service_error)?;

        tracing::debug!(key, content_type, "Uploaded object");
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(service_error)?;
        Ok(())
    }

    async fn head_object(&self, key: &str) -> Result<ObjectHead, StorageError> {
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(se) if se.is_not_found() => StorageError::NotFound(key.to_string()),
                _ => service_error(e),
            })?;

        Ok(ObjectHead {
            size: output.content_length().unwrap_or(0),
            content_type: output.content_type().map(str::to_string),
        })
    }

    async fn generate_upload_url(
        &self,
        key: &str,
        content_type: &str,
        size: i64,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .content_length(size)
            .presigned(Self::presigning(ttl)?)
            .await
            .map_err(service_error)?;
        Ok(request.uri().to_string())
    }

    async fn generate_download_url(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(Self::presigning(ttl)?)
            .await
            .map_err(service_error)?;
        Ok(request.uri().to_string())
    }
}
