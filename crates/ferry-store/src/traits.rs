//! The interface the transfer core drives.

use ferry_scope::Scope;
use ferry_types::{DownloadOptions, UploadOptions};

use crate::error::StoreResult;
use crate::object::ObjectInfo;

/// A remote object store addressed by `(bucket, key)`.
///
/// Implementations must satisfy these invariants:
/// - An object becomes visible only when its writer commits. A writer that is
///   aborted or dropped leaves the destination key untouched.
/// - Readers and writers observe the scope they were opened under and fail
///   with [`StoreError::Cancelled`](crate::StoreError::Cancelled) once it is
///   cancelled.
/// - The object behind an open reader does not change size while it is read.
/// - The store never retries; retry policy belongs to the caller.
pub trait ObjectStore: Send + Sync {
    /// Open a read stream over the byte range selected by `options`.
    fn open_read(
        &self,
        scope: &Scope,
        bucket: &str,
        key: &str,
        options: &DownloadOptions,
    ) -> StoreResult<Box<dyn ObjectReader>>;

    /// Open a write stream that creates (or replaces) the object on commit.
    fn open_write(
        &self,
        scope: &Scope,
        bucket: &str,
        key: &str,
        options: &UploadOptions,
    ) -> StoreResult<Box<dyn ObjectWriter>>;

    /// Metadata of a live object.
    fn stat(&self, bucket: &str, key: &str) -> StoreResult<ObjectInfo>;

    /// Returns `true` if a live object exists at the location.
    fn exists(&self, bucket: &str, key: &str) -> StoreResult<bool> {
        match self.stat(bucket, key) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// A stream over a fixed byte range of one object.
pub trait ObjectReader: Send {
    /// Read up to `buf.len()` bytes. `Ok(0)` means the range is exhausted.
    fn read(&mut self, buf: &mut [u8]) -> StoreResult<usize>;

    /// Metadata of the object being read.
    fn info(&self) -> &ObjectInfo;

    /// Bytes left in the selected range.
    fn remaining(&self) -> u64;
}

/// An uncommitted upload.
///
/// `commit` and `abort` consume the writer, so nothing can be written once
/// it reaches a terminal state. Dropping a writer without committing is
/// equivalent to aborting it.
pub trait ObjectWriter: Send {
    /// Append bytes, returning how many were accepted.
    fn write(&mut self, data: &[u8]) -> StoreResult<usize>;

    /// Bytes accepted so far.
    fn written(&self) -> u64;

    /// Make the object durable and visible.
    fn commit(self: Box<Self>) -> StoreResult<ObjectInfo>;

    /// Discard the upload.
    fn abort(self: Box<Self>) -> StoreResult<()>;
}
