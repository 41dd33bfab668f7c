/// Error type for object storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("storage service error: {0}")]
    Service(String),

    #[error("failed to presign request: {0}")]
    Presign(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
