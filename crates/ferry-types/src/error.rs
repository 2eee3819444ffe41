use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid bucket name {name:?}: {reason}")]
    InvalidBucketName { name: String, reason: String },

    #[error("invalid object key {key:?}: {reason}")]
    InvalidObjectKey { key: String, reason: String },

    #[error("invalid range: offset {offset}, length {length} for object of {size} bytes")]
    InvalidRange { offset: i64, length: i64, size: u64 },
}
