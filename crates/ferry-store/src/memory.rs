use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use ferry_scope::Scope;
use ferry_types::{DownloadOptions, ObjectLocation, UploadOptions};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::object::{ContentDigest, ObjectInfo};
use crate::traits::{ObjectReader, ObjectStore, ObjectWriter};

struct StoredObject {
    info: ObjectInfo,
    data: Arc<[u8]>,
}

#[derive(Default)]
struct Shared {
    objects: RwLock<HashMap<ObjectLocation, StoredObject>>,
    pending_uploads: AtomicUsize,
    aborted_uploads: AtomicU64,
}

/// In-memory, HashMap-based object store.
///
/// Intended for tests and embedding. Committed objects are immutable byte
/// buffers shared with open readers, so an object replaced mid-read does not
/// change under the reader. Expired objects read as not found.
#[derive(Clone, Default)]
pub struct InMemoryObjectStore {
    shared: Arc<Shared>,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed objects, expired ones included.
    pub fn len(&self) -> usize {
        self.shared.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no object has been committed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writers opened but neither committed nor aborted yet.
    pub fn pending_uploads(&self) -> usize {
        self.shared.pending_uploads.load(Ordering::SeqCst)
    }

    /// Writers that ended without committing.
    pub fn aborted_uploads(&self) -> u64 {
        self.shared.aborted_uploads.load(Ordering::SeqCst)
    }

    /// Store an object directly, bypassing the writer protocol.
    pub fn insert(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        options: &UploadOptions,
    ) -> StoreResult<ObjectInfo> {
        let location = ObjectLocation::new(bucket, key)?;
        let mut digest = ContentDigest::default();
        digest.update(&data);
        let info = ObjectInfo {
            bucket: location.bucket.clone(),
            key: location.key.clone(),
            size: digest.len(),
            created: SystemTime::now(),
            expires: options.expires,
            content_hash: digest.finalize(),
        };
        self.shared.objects.write().expect("lock poisoned").insert(
            location,
            StoredObject {
                info: info.clone(),
                data: data.into(),
            },
        );
        Ok(info)
    }

    /// Remove an object. Returns `true` if it existed.
    pub fn remove(&self, bucket: &str, key: &str) -> bool {
        let location = ObjectLocation {
            bucket: bucket.to_string(),
            key: key.to_string(),
        };
        self.shared
            .objects
            .write()
            .expect("lock poisoned")
            .remove(&location)
            .is_some()
    }

    fn live(&self, location: &ObjectLocation) -> StoreResult<(ObjectInfo, Arc<[u8]>)> {
        let map = self.shared.objects.read().expect("lock poisoned");
        match map.get(location) {
            Some(obj) if !obj.info.is_expired_at(SystemTime::now()) => {
                Ok((obj.info.clone(), Arc::clone(&obj.data)))
            }
            _ => Err(StoreError::not_found(&location.bucket, &location.key)),
        }
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn open_read(
        &self,
        scope: &Scope,
        bucket: &str,
        key: &str,
        options: &DownloadOptions,
    ) -> StoreResult<Box<dyn ObjectReader>> {
        scope.ensure_active()?;
        let location = ObjectLocation::new(bucket, key)?;
        let (info, data) = self.live(&location)?;
        let range = options.byte_range(info.size)?;
        debug!(%location, start = range.start, end = range.end, "in-memory read opened");
        Ok(Box::new(MemoryReader {
            scope: scope.clone(),
            info,
            data,
            pos: range.start as usize,
            end: range.end as usize,
        }))
    }

    fn open_write(
        &self,
        scope: &Scope,
        bucket: &str,
        key: &str,
        options: &UploadOptions,
    ) -> StoreResult<Box<dyn ObjectWriter>> {
        scope.ensure_active()?;
        let location = ObjectLocation::new(bucket, key)?;
        self.shared.pending_uploads.fetch_add(1, Ordering::SeqCst);
        debug!(%location, "in-memory write opened");
        Ok(Box::new(MemoryWriter {
            scope: scope.clone(),
            store: self.clone(),
            location,
            options: *options,
            buffer: Vec::new(),
            digest: ContentDigest::default(),
            finished: false,
        }))
    }

    fn stat(&self, bucket: &str, key: &str) -> StoreResult<ObjectInfo> {
        let location = ObjectLocation::new(bucket, key)?;
        self.live(&location).map(|(info, _)| info)
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &self.len())
            .field("pending_uploads", &self.pending_uploads())
            .finish()
    }
}

struct MemoryReader {
    scope: Scope,
    info: ObjectInfo,
    data: Arc<[u8]>,
    pos: usize,
    end: usize,
}

impl ObjectReader for MemoryReader {
    fn read(&mut self, buf: &mut [u8]) -> StoreResult<usize> {
        self.scope.ensure_active()?;
        let n = buf.len().min(self.end - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }

    fn info(&self) -> &ObjectInfo {
        &self.info
    }

    fn remaining(&self) -> u64 {
        (self.end - self.pos) as u64
    }
}

struct MemoryWriter {
    scope: Scope,
    store: InMemoryObjectStore,
    location: ObjectLocation,
    options: UploadOptions,
    buffer: Vec<u8>,
    digest: ContentDigest,
    finished: bool,
}

impl MemoryWriter {
    fn finish(&mut self, committed: bool) {
        if self.finished {
            return;
        }
        self.finished = true;
        self.store
            .shared
            .pending_uploads
            .fetch_sub(1, Ordering::SeqCst);
        if !committed {
            self.store
                .shared
                .aborted_uploads
                .fetch_add(1, Ordering::SeqCst);
            debug!(location = %self.location, "in-memory write discarded");
        }
    }
}

impl ObjectWriter for MemoryWriter {
    fn write(&mut self, data: &[u8]) -> StoreResult<usize> {
        self.scope.ensure_active()?;
        self.buffer.extend_from_slice(data);
        self.digest.update(data);
        Ok(data.len())
    }

    fn written(&self) -> u64 {
        self.digest.len()
    }

    fn commit(mut self: Box<Self>) -> StoreResult<ObjectInfo> {
        // A cancelled writer is dropped here, which counts it as aborted.
        self.scope.ensure_active()?;
        let info = ObjectInfo {
            bucket: self.location.bucket.clone(),
            key: self.location.key.clone(),
            size: self.digest.len(),
            created: SystemTime::now(),
            expires: self.options.expires,
            content_hash: self.digest.finalize(),
        };
        let data: Arc<[u8]> = std::mem::take(&mut self.buffer).into();
        self.store
            .shared
            .objects
            .write()
            .expect("lock poisoned")
            .insert(
                self.location.clone(),
                StoredObject {
                    info: info.clone(),
                    data,
                },
            );
        self.finish(true);
        debug!(location = %self.location, size = info.size, "in-memory write committed");
        Ok(info)
    }

    fn abort(mut self: Box<Self>) -> StoreResult<()> {
        self.finish(false);
        Ok(())
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        self.finish(false);
    }
}
