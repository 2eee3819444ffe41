//! Upload and download sessions.
//!
//! A session owns the scope it was opened under and the store stream it
//! drives. Dropping a session cancels its scope; dropping an upload that
//! never committed aborts it.

use std::fmt;
use std::time::SystemTime;

use ferry_scope::{OwnedScope, Scope};
use ferry_store::{ObjectInfo, ObjectReader, ObjectWriter};
use ferry_types::{DownloadOptions, HandleKind, ObjectLocation, UploadOptions};
use tracing::{debug, warn};

use crate::error::{TransferError, TransferResult};

/// Lifecycle of an upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadState {
    /// Stream created, nothing written yet.
    Opened,
    /// Bytes are being copied.
    Writing,
    /// The object is durable and visible.
    Committed,
    /// The upload was discarded.
    Aborted,
}

impl UploadState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Aborted)
    }
}

/// Snapshot of an upload session.
#[derive(Clone, Debug)]
pub struct UploadStatus {
    pub state: UploadState,
    pub location: ObjectLocation,
    pub bytes_written: u64,
    pub expires: Option<SystemTime>,
    /// Present once committed.
    pub info: Option<ObjectInfo>,
}

/// An in-flight or finished upload.
pub struct UploadSession {
    scope: OwnedScope,
    writer: Option<Box<dyn ObjectWriter>>,
    location: ObjectLocation,
    options: UploadOptions,
    state: UploadState,
    bytes_written: u64,
    info: Option<ObjectInfo>,
}

impl UploadSession {
    pub fn new(
        scope: Scope,
        writer: Box<dyn ObjectWriter>,
        location: ObjectLocation,
        options: UploadOptions,
    ) -> Self {
        debug!(%location, "upload opened");
        Self {
            scope: OwnedScope::new(scope),
            writer: Some(writer),
            location,
            options,
            state: UploadState::Opened,
            bytes_written: 0,
            info: None,
        }
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    pub fn scope(&self) -> &Scope {
        self.scope.scope()
    }

    pub fn location(&self) -> &ObjectLocation {
        &self.location
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Metadata of the committed object.
    pub fn info(&self) -> Option<&ObjectInfo> {
        self.info.as_ref()
    }

    pub fn status(&self) -> UploadStatus {
        UploadStatus {
            state: self.state,
            location: self.location.clone(),
            bytes_written: self.bytes_written,
            expires: self.options.expires,
            info: self.info.clone(),
        }
    }

    fn writer(&mut self) -> TransferResult<&mut Box<dyn ObjectWriter>> {
        self.writer
            .as_mut()
            .ok_or(TransferError::SessionFinished(HandleKind::Upload))
    }

    /// Write bytes into the upload, returning how many were accepted.
    ///
    /// A failed write aborts the upload.
    pub fn write(&mut self, data: &[u8]) -> TransferResult<usize> {
        if self.writer.is_none() {
            return Err(TransferError::SessionFinished(HandleKind::Upload));
        }
        if let Err(e) = self.scope.ensure_active() {
            self.discard();
            return Err(e.into());
        }
        let result = self.writer()?.write(data);
        match result {
            Ok(n) => {
                self.state = UploadState::Writing;
                self.bytes_written += n as u64;
                Ok(n)
            }
            Err(e) => {
                warn!(location = %self.location, error = %e, "upload write failed");
                self.discard();
                Err(TransferError::io(e))
            }
        }
    }

    /// Write all of `data`.
    pub fn write_all(&mut self, mut data: &[u8]) -> TransferResult<()> {
        while !data.is_empty() {
            let n = self.write(data)?;
            if n == 0 {
                self.discard();
                return Err(TransferError::StoreIoFailed(ferry_store::StoreError::Backend(
                    "writer accepted zero bytes".into(),
                )));
            }
            data = &data[n..];
        }
        Ok(())
    }

    /// Commit the upload. This is the single point of no return.
    pub fn commit(&mut self) -> TransferResult<&ObjectInfo> {
        let writer = self
            .writer
            .take()
            .ok_or(TransferError::SessionFinished(HandleKind::Upload))?;
        if let Err(e) = self.scope.ensure_active() {
            self.state = UploadState::Aborted;
            if let Err(abort_err) = writer.abort() {
                warn!(location = %self.location, error = %abort_err, "failed to abort upload");
            }
            debug!(location = %self.location, "cancelled upload aborted before commit");
            return Err(e.into());
        }
        match writer.commit() {
            Ok(info) => {
                self.state = UploadState::Committed;
                tracing::info!(
                    location = %self.location,
                    size = info.size,
                    hash = %info.content_hash_hex(),
                    "upload committed"
                );
                Ok(self.info.insert(info))
            }
            Err(e) => {
                self.state = UploadState::Aborted;
                warn!(location = %self.location, error = %e, "upload commit failed");
                Err(TransferError::commit(e))
            }
        }
    }

    /// Discard the upload.
    pub fn abort(&mut self) -> TransferResult<()> {
        let writer = self
            .writer
            .take()
            .ok_or(TransferError::SessionFinished(HandleKind::Upload))?;
        self.state = UploadState::Aborted;
        debug!(location = %self.location, "upload aborted");
        writer.abort().map_err(TransferError::io)
    }

    fn discard(&mut self) {
        if let Some(writer) = self.writer.take() {
            self.state = UploadState::Aborted;
            if let Err(e) = writer.abort() {
                warn!(location = %self.location, error = %e, "failed to abort upload");
            } else {
                debug!(location = %self.location, "upload aborted");
            }
        }
    }
}

impl Drop for UploadSession {
    fn drop(&mut self) {
        self.discard();
    }
}

impl fmt::Debug for UploadSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadSession")
            .field("location", &self.location)
            .field("state", &self.state)
            .field("bytes_written", &self.bytes_written)
            .finish_non_exhaustive()
    }
}

/// Lifecycle of a download.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DownloadState {
    Opened,
    Reading,
    /// Every byte of the selected range has been consumed.
    Drained,
}

/// Snapshot of a download session.
#[derive(Clone, Debug)]
pub struct DownloadStatus {
    pub state: DownloadState,
    pub location: ObjectLocation,
    pub options: DownloadOptions,
    pub bytes_read: u64,
    pub info: ObjectInfo,
}

/// An in-flight or drained download.
pub struct DownloadSession {
    scope: OwnedScope,
    reader: Box<dyn ObjectReader>,
    location: ObjectLocation,
    options: DownloadOptions,
    state: DownloadState,
    bytes_read: u64,
}

impl DownloadSession {
    pub fn new(
        scope: Scope,
        reader: Box<dyn ObjectReader>,
        location: ObjectLocation,
        options: DownloadOptions,
    ) -> Self {
        debug!(%location, offset = options.offset, length = options.length, "download opened");
        Self {
            scope: OwnedScope::new(scope),
            reader,
            location,
            options,
            state: DownloadState::Opened,
            bytes_read: 0,
        }
    }

    pub fn state(&self) -> DownloadState {
        self.state
    }

    pub fn scope(&self) -> &Scope {
        self.scope.scope()
    }

    pub fn location(&self) -> &ObjectLocation {
        &self.location
    }

    pub fn options(&self) -> DownloadOptions {
        self.options
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Metadata of the object being downloaded.
    pub fn info(&self) -> &ObjectInfo {
        self.reader.info()
    }

    pub fn status(&self) -> DownloadStatus {
        DownloadStatus {
            state: self.state,
            location: self.location.clone(),
            options: self.options,
            bytes_read: self.bytes_read,
            info: self.reader.info().clone(),
        }
    }

    /// Read the next bytes. `Ok(0)` means the download is drained.
    pub fn read(&mut self, buf: &mut [u8]) -> TransferResult<usize> {
        if self.state == DownloadState::Drained {
            return Ok(0);
        }
        self.scope.ensure_active()?;
        if buf.is_empty() {
            return Ok(0);
        }
        let n = self.reader.read(buf).map_err(TransferError::io)?;
        if n == 0 {
            self.state = DownloadState::Drained;
            tracing::info!(location = %self.location, bytes = self.bytes_read, "download drained");
        } else {
            self.state = DownloadState::Reading;
            self.bytes_read += n as u64;
        }
        Ok(n)
    }
}

impl fmt::Debug for DownloadSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadSession")
            .field("location", &self.location)
            .field("state", &self.state)
            .field("bytes_read", &self.bytes_read)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_store::{InMemoryObjectStore, ObjectStore};

    fn location(key: &str) -> ObjectLocation {
        ObjectLocation::new("bucket", key).unwrap()
    }

    fn open_upload(store: &InMemoryObjectStore, key: &str) -> UploadSession {
        let scope = Scope::root();
        let writer = store
            .open_write(&scope, "bucket", key, &UploadOptions::default())
            .unwrap();
        UploadSession::new(scope, writer, location(key), UploadOptions::default())
    }

    #[test]
    fn upload_lifecycle() {
        let store = InMemoryObjectStore::new();
        let mut s = open_upload(&store, "life");
        assert_eq!(s.state(), UploadState::Opened);

        s.write_all(b"abc").unwrap();
        assert_eq!(s.state(), UploadState::Writing);
        assert_eq!(s.bytes_written(), 3);

        let info = s.commit().unwrap().clone();
        assert_eq!(info.size, 3);
        assert_eq!(s.state(), UploadState::Committed);
        assert!(s.state().is_terminal());
        assert_eq!(s.status().info, Some(info));
        assert!(store.exists("bucket", "life").unwrap());
    }

    #[test]
    fn no_writes_after_commit() {
        let store = InMemoryObjectStore::new();
        let mut s = open_upload(&store, "done");
        s.commit().unwrap();
        let err = s.write(b"late").unwrap_err();
        assert!(matches!(err, TransferError::SessionFinished(HandleKind::Upload)));
        assert!(s.commit().is_err());
        assert!(s.abort().is_err());
    }

    #[test]
    fn abort_discards() {
        let store = InMemoryObjectStore::new();
        let mut s = open_upload(&store, "gone");
        s.write_all(b"data").unwrap();
        s.abort().unwrap();
        assert_eq!(s.state(), UploadState::Aborted);
        assert!(s.write(b"x").is_err());
        assert!(!store.exists("bucket", "gone").unwrap());
        assert_eq!(store.aborted_uploads(), 1);
    }

    #[test]
    fn drop_aborts_uncommitted_upload() {
        let store = InMemoryObjectStore::new();
        let mut s = open_upload(&store, "dropped");
        s.write_all(b"data").unwrap();
        let scope = s.scope().clone();
        drop(s);
        assert!(scope.is_cancelled());
        assert_eq!(store.pending_uploads(), 0);
        assert!(!store.exists("bucket", "dropped").unwrap());
    }

    #[test]
    fn drop_after_commit_keeps_object() {
        let store = InMemoryObjectStore::new();
        let mut s = open_upload(&store, "kept");
        s.write_all(b"data").unwrap();
        s.commit().unwrap();
        drop(s);
        assert!(store.exists("bucket", "kept").unwrap());
        assert_eq!(store.aborted_uploads(), 0);
    }

    #[test]
    fn cancelled_write_aborts() {
        let store = InMemoryObjectStore::new();
        let mut s = open_upload(&store, "cancel");
        s.scope().cancel();
        let err = s.write(b"x").unwrap_err();
        assert!(matches!(err, TransferError::Cancelled));
        assert_eq!(s.state(), UploadState::Aborted);
        assert_eq!(store.pending_uploads(), 0);
    }

    fn open_detached_upload(store: &InMemoryObjectStore, key: &str) -> UploadSession {
        // The store stream never sees the session's scope.
        let writer = store
            .open_write(&Scope::root(), "bucket", key, &UploadOptions::default())
            .unwrap();
        UploadSession::new(Scope::root(), writer, location(key), UploadOptions::default())
    }

    #[test]
    fn cancelled_session_stops_writes_without_store_help() {
        let store = InMemoryObjectStore::new();
        let mut s = open_detached_upload(&store, "detached");
        s.write_all(b"first").unwrap();
        s.scope().cancel();

        let err = s.write(b"second").unwrap_err();
        assert!(matches!(err, TransferError::Cancelled));
        assert_eq!(s.state(), UploadState::Aborted);
        assert_eq!(s.bytes_written(), 5);
        assert_eq!(store.pending_uploads(), 0);
        assert_eq!(store.aborted_uploads(), 1);
    }

    #[test]
    fn cancelled_session_refuses_commit_without_store_help() {
        let store = InMemoryObjectStore::new();
        let mut s = open_detached_upload(&store, "detached");
        s.write_all(b"payload").unwrap();
        s.scope().cancel();

        let err = s.commit().unwrap_err();
        assert!(matches!(err, TransferError::Cancelled));
        assert_eq!(s.state(), UploadState::Aborted);
        assert!(!store.exists("bucket", "detached").unwrap());
        assert_eq!(store.aborted_uploads(), 1);
    }

    #[test]
    fn download_lifecycle() {
        let store = InMemoryObjectStore::new();
        store
            .insert("bucket", "obj", b"0123456789".to_vec(), &UploadOptions::default())
            .unwrap();
        let scope = Scope::root();
        let options = DownloadOptions {
            offset: 2,
            length: 5,
        };
        let reader = store.open_read(&scope, "bucket", "obj", &options).unwrap();
        let mut s = DownloadSession::new(scope, reader, location("obj"), options);
        assert_eq!(s.state(), DownloadState::Opened);
        assert_eq!(s.info().size, 10);

        let mut buf = [0u8; 3];
        assert_eq!(s.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"234");
        assert_eq!(s.state(), DownloadState::Reading);
        assert_eq!(s.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"56");
        assert_eq!(s.read(&mut buf).unwrap(), 0);
        assert_eq!(s.state(), DownloadState::Drained);
        assert_eq!(s.bytes_read(), 5);
        // Drained is terminal.
        assert_eq!(s.read(&mut buf).unwrap(), 0);
        assert_eq!(s.status().bytes_read, 5);
    }

    #[test]
    fn cancelled_download_fails() {
        let store = InMemoryObjectStore::new();
        store
            .insert("bucket", "obj", b"abc".to_vec(), &UploadOptions::default())
            .unwrap();
        let scope = Scope::root();
        let reader = store
            .open_read(&scope, "bucket", "obj", &DownloadOptions::default())
            .unwrap();
        let mut s = DownloadSession::new(scope.child(), reader, location("obj"), DownloadOptions::default());
        scope.cancel();
        let mut buf = [0u8; 8];
        assert!(matches!(s.read(&mut buf), Err(TransferError::Cancelled)));
    }
}
