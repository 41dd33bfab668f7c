/// Domain-level errors shared by every crate.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The requested change is not a legal lifecycle step.
    #[error("Conflict: {0}")]
    Conflict(String),
}
