use std::io;
use std::path::{Path, PathBuf};

use ferry_store::StoreError;
use ferry_types::HandleKind;
use thiserror::Error;

/// Errors returned by transfer operations.
///
/// Every operation yields either a live handle or one of these, never both.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("{0} must not be null")]
    NullArgument(&'static str),

    #[error("invalid {0} handle")]
    InvalidHandle(HandleKind),

    #[error("failed to open object stream: {0}")]
    StoreOpenFailed(#[source] StoreError),

    #[error("object stream failed: {0}")]
    StoreIoFailed(#[source] StoreError),

    #[error("failed to commit object: {0}")]
    StoreCommitFailed(#[source] StoreError),

    #[error("failed to read {}: {source}", path.display())]
    FileSystemReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    FileSystemWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error("{0} session already finished")]
    SessionFinished(HandleKind),
}

/// Machine-distinguishable classification of a [`TransferError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NullArgument,
    InvalidHandle,
    StoreOpenFailed,
    StoreIoFailed,
    StoreCommitFailed,
    FileSystemReadFailed,
    FileSystemWriteFailed,
    Cancelled,
    SessionFinished,
}

impl TransferError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NullArgument(_) => ErrorKind::NullArgument,
            Self::InvalidHandle(_) => ErrorKind::InvalidHandle,
            Self::StoreOpenFailed(_) => ErrorKind::StoreOpenFailed,
            Self::StoreIoFailed(_) => ErrorKind::StoreIoFailed,
            Self::StoreCommitFailed(_) => ErrorKind::StoreCommitFailed,
            Self::FileSystemReadFailed { .. } => ErrorKind::FileSystemReadFailed,
            Self::FileSystemWriteFailed { .. } => ErrorKind::FileSystemWriteFailed,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::SessionFinished(_) => ErrorKind::SessionFinished,
        }
    }

    /// The store error behind a store failure, if any.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::StoreOpenFailed(e) | Self::StoreIoFailed(e) | Self::StoreCommitFailed(e) => {
                Some(e)
            }
            _ => None,
        }
    }

    pub(crate) fn open(e: StoreError) -> Self {
        if e.is_cancelled() {
            Self::Cancelled
        } else {
            Self::StoreOpenFailed(e)
        }
    }

    pub(crate) fn io(e: StoreError) -> Self {
        if e.is_cancelled() {
            Self::Cancelled
        } else {
            Self::StoreIoFailed(e)
        }
    }

    pub(crate) fn commit(e: StoreError) -> Self {
        if e.is_cancelled() {
            Self::Cancelled
        } else {
            Self::StoreCommitFailed(e)
        }
    }

    pub(crate) fn read(path: &Path, source: io::Error) -> Self {
        Self::FileSystemReadFailed {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn write(path: &Path, source: io::Error) -> Self {
        Self::FileSystemWriteFailed {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl From<ferry_scope::Cancelled> for TransferError {
    fn from(_: ferry_scope::Cancelled) -> Self {
        Self::Cancelled
    }
}

/// Result alias for transfer operations.
pub type TransferResult<T> = Result<T, TransferError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(TransferError::NullArgument("bucket").kind(), ErrorKind::NullArgument);
        assert_eq!(
            TransferError::InvalidHandle(HandleKind::Project).kind(),
            ErrorKind::InvalidHandle
        );
        assert_eq!(TransferError::Cancelled.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn messages() {
        assert_eq!(
            TransferError::NullArgument("bucket").to_string(),
            "bucket must not be null"
        );
        assert_eq!(
            TransferError::InvalidHandle(HandleKind::Download).to_string(),
            "invalid download handle"
        );
        let e = TransferError::read(
            Path::new("/tmp/missing"),
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );
        assert_eq!(e.to_string(), "failed to read /tmp/missing: no such file");
    }

    #[test]
    fn store_cancellation_maps_to_cancelled() {
        assert_eq!(TransferError::open(StoreError::Cancelled).kind(), ErrorKind::Cancelled);
        assert_eq!(TransferError::io(StoreError::Cancelled).kind(), ErrorKind::Cancelled);
        assert_eq!(TransferError::commit(StoreError::Cancelled).kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn store_error_is_exposed() {
        let e = TransferError::open(StoreError::not_found("bucket", "k"));
        assert_eq!(e.kind(), ErrorKind::StoreOpenFailed);
        assert!(e.store_error().unwrap().is_not_found());
        assert!(TransferError::Cancelled.store_error().is_none());
    }
}
