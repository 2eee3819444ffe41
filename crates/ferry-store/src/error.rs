use ferry_scope::Cancelled;
use ferry_types::TypeError;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No live object exists at the location.
    #[error("object not found: {bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    /// The bucket, key or byte range was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] TypeError),

    /// The scope the stream was opened under has been cancelled.
    #[error("operation cancelled")]
    Cancelled,

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Object metadata could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn not_found(bucket: &str, key: &str) -> Self {
        Self::ObjectNotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ObjectNotFound { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<Cancelled> for StoreError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
