//! Directory-backed object store.
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/
//!   staging/                          in-flight uploads (temporary files)
//!   buckets/<bucket>/<id>.json        object metadata, names the live body
//!   buckets/<bucket>/<id>.<hash>      object contents, one file per version
//! ```
//!
//! `<id>` is the hex BLAKE3 hash of the object key and `<hash>` the hex
//! BLAKE3 hash of the contents. A commit first moves its body into place
//! under a name no reader is using, then renames the metadata over the old
//! one. That rename is the only step that publishes a new version, so a
//! reader always pairs metadata with the body it names.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use ferry_scope::Scope;
use ferry_types::{DownloadOptions, ObjectLocation, UploadOptions};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::object::{ContentDigest, ObjectInfo};
use crate::traits::{ObjectReader, ObjectStore, ObjectWriter};

const STAGING_DIR: &str = "staging";
const BUCKETS_DIR: &str = "buckets";

/// Contents of an object's `.json` file.
#[derive(Debug, Serialize, Deserialize)]
struct Sidecar {
    /// File name of the live body, relative to the bucket directory.
    body: String,
    info: ObjectInfo,
}

struct ObjectPaths {
    dir: PathBuf,
    id: String,
    meta: PathBuf,
}

impl ObjectPaths {
    fn body(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

/// An [`ObjectStore`] that keeps objects as files under a root directory.
#[derive(Clone, Debug)]
pub struct DirObjectStore {
    root: PathBuf,
    /// Serializes publish and cleanup of bodies within this process.
    commits: Arc<Mutex<()>>,
}

impl DirObjectStore {
    /// Open (or create) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(STAGING_DIR))?;
        fs::create_dir_all(root.join(BUCKETS_DIR))?;
        debug!(root = %root.display(), "directory store opened");
        Ok(Self {
            root,
            commits: Arc::new(Mutex::new(())),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn paths(&self, location: &ObjectLocation) -> ObjectPaths {
        let id = hex::encode(blake3::hash(location.key.as_bytes()).as_bytes());
        let dir = self.root.join(BUCKETS_DIR).join(&location.bucket);
        let meta = dir.join(format!("{id}.json"));
        ObjectPaths { dir, id, meta }
    }

    /// The published sidecar, or `None` if the key has never been committed.
    fn read_sidecar(&self, paths: &ObjectPaths) -> StoreResult<Option<Sidecar>> {
        let raw = match fs::read(&paths.meta) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&raw)
            .map(Some)
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn live_sidecar(&self, location: &ObjectLocation, paths: &ObjectPaths) -> StoreResult<Sidecar> {
        match self.read_sidecar(paths)? {
            Some(sidecar) if !sidecar.info.is_expired_at(SystemTime::now()) => Ok(sidecar),
            _ => Err(StoreError::not_found(&location.bucket, &location.key)),
        }
    }

    /// Open the live body together with the metadata that names it.
    fn open_body(&self, location: &ObjectLocation) -> StoreResult<(ObjectInfo, File)> {
        let paths = self.paths(location);
        let mut last_seen: Option<(String, SystemTime)> = None;
        loop {
            let sidecar = self.live_sidecar(location, &paths)?;
            let version = (sidecar.body.clone(), sidecar.info.created);
            match File::open(paths.body(&sidecar.body)) {
                Ok(file) => return Ok((sidecar.info, file)),
                // The same published version twice without its body: the
                // object is gone.
                Err(e)
                    if e.kind() == io::ErrorKind::NotFound
                        && last_seen.as_ref() == Some(&version) =>
                {
                    return Err(StoreError::not_found(&location.bucket, &location.key));
                }
                // Replaced between reading the metadata and opening the body.
                Err(e) if e.kind() == io::ErrorKind::NotFound => last_seen = Some(version),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl ObjectStore for DirObjectStore {
    fn open_read(
        &self,
        scope: &Scope,
        bucket: &str,
        key: &str,
        options: &DownloadOptions,
    ) -> StoreResult<Box<dyn ObjectReader>> {
        scope.ensure_active()?;
        let location = ObjectLocation::new(bucket, key)?;
        let (info, mut file) = self.open_body(&location)?;
        let range = options.byte_range(info.size)?;
        file.seek(SeekFrom::Start(range.start))?;
        debug!(%location, start = range.start, end = range.end, "file read opened");

        Ok(Box::new(FileReader {
            scope: scope.clone(),
            info,
            file,
            remaining: range.end - range.start,
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
        let staging = NamedTempFile::new_in(self.root.join(STAGING_DIR))?;
        debug!(%location, staging = %staging.path().display(), "file write opened");

        Ok(Box::new(FileWriter {
            scope: scope.clone(),
            store: self.clone(),
            location,
            options: *options,
            staging: Some(staging),
            digest: ContentDigest::default(),
        }))
    }

    fn stat(&self, bucket: &str, key: &str) -> StoreResult<ObjectInfo> {
        let location = ObjectLocation::new(bucket, key)?;
        let paths = self.paths(&location);
        self.live_sidecar(&location, &paths).map(|s| s.info)
    }
}

struct FileReader {
    scope: Scope,
    info: ObjectInfo,
    file: File,
    remaining: u64,
}

impl ObjectReader for FileReader {
    fn read(&mut self, buf: &mut [u8]) -> StoreResult<usize> {
        self.scope.ensure_active()?;
        let want = (buf.len() as u64).min(self.remaining) as usize;
        if want == 0 {
            return Ok(0);
        }
        let n = self.file.read(&mut buf[..want])?;
        if n == 0 {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "object body shorter than its metadata",
            )));
        }
        self.remaining -= n as u64;
        Ok(n)
    }

    fn info(&self) -> &ObjectInfo {
        &self.info
    }

    fn remaining(&self) -> u64 {
        self.remaining
    }
}

struct FileWriter {
    scope: Scope,
    store: DirObjectStore,
    location: ObjectLocation,
    options: UploadOptions,
    staging: Option<NamedTempFile>,
    digest: ContentDigest,
}

impl FileWriter {
    fn staging(&mut self) -> StoreResult<&mut NamedTempFile> {
        self.staging
            .as_mut()
            .ok_or_else(|| StoreError::Backend("upload already finished".into()))
    }
}

impl ObjectWriter for FileWriter {
    fn write(&mut self, data: &[u8]) -> StoreResult<usize> {
        self.scope.ensure_active()?;
        self.staging()?.write_all(data)?;
        self.digest.update(data);
        Ok(data.len())
    }

    fn written(&self) -> u64 {
        self.digest.len()
    }

    fn commit(mut self: Box<Self>) -> StoreResult<ObjectInfo> {
        self.scope.ensure_active()?;
        let staging = self
            .staging
            .take()
            .ok_or_else(|| StoreError::Backend("upload already finished".into()))?;
        staging.as_file().sync_all()?;

        let info = ObjectInfo {
            bucket: self.location.bucket.clone(),
            key: self.location.key.clone(),
            size: self.digest.len(),
            created: SystemTime::now(),
            expires: self.options.expires,
            content_hash: self.digest.finalize(),
        };
        let paths = self.store.paths(&self.location);
        let body_name = format!("{}.{}", paths.id, info.content_hash_hex());
        let sidecar = Sidecar {
            body: body_name.clone(),
            info,
        };
        let meta_json = serde_json::to_vec_pretty(&sidecar)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut meta_tmp = NamedTempFile::new_in(self.store.root.join(STAGING_DIR))?;
        meta_tmp.write_all(&meta_json)?;
        meta_tmp.as_file().sync_all()?;

        let _guard = self.store.commits.lock().expect("commit lock poisoned");
        fs::create_dir_all(&paths.dir)?;
        let previous = match self.store.read_sidecar(&paths) {
            Ok(found) => found.map(|s| s.body),
            Err(e) => {
                warn!(location = %self.location, error = %e, "unreadable metadata replaced");
                None
            }
        };

        // A body with the same name holds the same bytes, so replacing it is
        // invisible to readers.
        let body = paths.body(&body_name);
        staging.persist(&body).map_err(|e| StoreError::Io(e.error))?;

        if let Err(e) = meta_tmp.persist(&paths.meta) {
            if previous.as_deref() != Some(body_name.as_str()) {
                remove_body(&body, &self.location);
            }
            return Err(StoreError::Io(e.error));
        }

        if let Some(old) = previous.filter(|old| *old != body_name) {
            remove_body(&paths.body(&old), &self.location);
        }

        debug!(location = %self.location, size = sidecar.info.size, "file write committed");
        Ok(sidecar.info)
    }

    fn abort(mut self: Box<Self>) -> StoreResult<()> {
        if let Some(staging) = self.staging.take() {
            staging.close()?;
            debug!(location = %self.location, "file write aborted");
        }
        Ok(())
    }
}

impl Drop for FileWriter {
    fn drop(&mut self) {
        if let Some(staging) = self.staging.take() {
            if let Err(e) = staging.close() {
                warn!(location = %self.location, error = %e, "failed to remove staging file");
            }
        }
    }
}

fn remove_body(path: &Path, location: &ObjectLocation) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            warn!(%location, path = %path.display(), error = %e, "failed to remove object body");
        }
    }
}
