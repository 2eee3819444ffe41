//! The transfer service: a registry of projects and sessions plus the
//! operations that create and drive them.

use std::sync::{Arc, Mutex, MutexGuard};

use ferry_registry::Registry;
use ferry_scope::Scope;
use ferry_store::{ObjectInfo, ObjectStore};
use ferry_types::{DownloadOptions, Handle, HandleKind, ObjectLocation, UploadOptions};
use tracing::{debug, info};

use crate::config::TransferConfig;
use crate::error::{TransferError, TransferResult};
use crate::project::Project;
use crate::request::{DownloadRequest, UploadRequest};
use crate::session::{DownloadSession, DownloadStatus, UploadSession, UploadStatus};

/// A registered session together with its scope.
///
/// The scope is kept outside the mutex so a session can be cancelled while
/// another thread is blocked inside it.
pub struct SessionRef<S> {
    scope: Scope,
    session: Arc<Mutex<S>>,
}

impl<S> SessionRef<S> {
    fn lock(&self) -> MutexGuard<'_, S> {
        self.session.lock().expect("session lock poisoned")
    }
}

impl<S> Clone for SessionRef<S> {
    fn clone(&self) -> Self {
        Self {
            scope: self.scope.clone(),
            session: Arc::clone(&self.session),
        }
    }
}

/// Everything a handle can refer to.
#[derive(Clone)]
pub enum Entry {
    Project(Arc<Project>),
    Upload(SessionRef<UploadSession>),
    Download(SessionRef<DownloadSession>),
}

impl Entry {
    pub(crate) fn upload(session: UploadSession) -> Self {
        Self::Upload(SessionRef {
            scope: session.scope().clone(),
            session: Arc::new(Mutex::new(session)),
        })
    }

    pub(crate) fn download(session: DownloadSession) -> Self {
        Self::Download(SessionRef {
            scope: session.scope().clone(),
            session: Arc::new(Mutex::new(session)),
        })
    }

    pub fn kind(&self) -> HandleKind {
        match self {
            Entry::Project(_) => HandleKind::Project,
            Entry::Upload(_) => HandleKind::Upload,
            Entry::Download(_) => HandleKind::Download,
        }
    }

    fn scope(&self) -> &Scope {
        match self {
            Entry::Project(p) => p.scope(),
            Entry::Upload(s) => &s.scope,
            Entry::Download(s) => &s.scope,
        }
    }
}

/// Owner of all live projects and sessions.
///
/// There is no global state: the process entry point creates a `Transfers`
/// and hands references to whoever needs to start or drive transfers. All
/// methods take `&self` and may be called from many threads at once.
pub struct Transfers {
    registry: Registry<Entry>,
    config: TransferConfig,
}

impl Transfers {
    pub fn new(config: TransferConfig) -> Self {
        Self {
            registry: Registry::new(),
            config,
        }
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Number of live handles of any kind.
    pub fn live_handles(&self) -> usize {
        self.registry.len()
    }

    /// Kind of object behind a live handle.
    pub fn kind_of(&self, handle: Handle) -> Option<HandleKind> {
        self.registry.get(handle).map(|e| e.kind())
    }

    // ---- Projects ----

    /// Register a project over `store`.
    pub fn open_project(&self, store: Arc<dyn ObjectStore>) -> Handle {
        let handle = self.registry.add(Entry::Project(Arc::new(Project::new(store))));
        info!(%handle, "project opened");
        handle
    }

    /// Close a project, cancelling every session started from it.
    pub fn close_project(&self, handle: Handle) -> TransferResult<()> {
        self.release(handle, HandleKind::Project)?;
        info!(%handle, "project closed");
        Ok(())
    }

    pub(crate) fn project(&self, handle: Handle) -> TransferResult<Arc<Project>> {
        match self.registry.get(handle) {
            Some(Entry::Project(p)) => Ok(p),
            _ => Err(TransferError::InvalidHandle(HandleKind::Project)),
        }
    }

    fn upload_ref(&self, handle: Handle) -> TransferResult<SessionRef<UploadSession>> {
        match self.registry.get(handle) {
            Some(Entry::Upload(s)) => Ok(s),
            _ => Err(TransferError::InvalidHandle(HandleKind::Upload)),
        }
    }

    fn download_ref(&self, handle: Handle) -> TransferResult<SessionRef<DownloadSession>> {
        match self.registry.get(handle) {
            Some(Entry::Download(s)) => Ok(s),
            _ => Err(TransferError::InvalidHandle(HandleKind::Download)),
        }
    }

    pub(crate) fn register(&self, entry: Entry) -> Handle {
        self.registry.add(entry)
    }

    // ---- Handle lifecycle ----

    fn typed_entry(&self, handle: Handle, kind: HandleKind) -> TransferResult<Entry> {
        match self.registry.get(handle) {
            Some(entry) if entry.kind() == kind => Ok(entry),
            _ => Err(TransferError::InvalidHandle(kind)),
        }
    }

    /// Cancel the object behind a handle without releasing it.
    ///
    /// Cancelling a project cancels every session started from it.
    pub fn cancel(&self, handle: Handle, kind: HandleKind) -> TransferResult<()> {
        let entry = self.typed_entry(handle, kind)?;
        entry.scope().cancel();
        debug!(%handle, %kind, "handle cancelled");
        Ok(())
    }

    /// Release a handle.
    ///
    /// The object's scope is cancelled at once; an upload that has not been
    /// committed is aborted.
    pub fn release(&self, handle: Handle, kind: HandleKind) -> TransferResult<()> {
        self.typed_entry(handle, kind)?;
        let entry = self
            .registry
            .remove(handle)
            .ok_or(TransferError::InvalidHandle(kind))?;
        entry.scope().cancel();
        debug!(%handle, %kind, "handle released");
        Ok(())
    }

    // ---- Session primitives ----

    /// Open an upload stream and register it without writing anything.
    pub fn begin_upload(&self, request: &UploadRequest<'_>) -> TransferResult<Handle> {
        let session = self.open_upload(request)?;
        let handle = self.register(Entry::upload(session));
        debug!(%handle, "upload session registered");
        Ok(handle)
    }

    pub(crate) fn open_upload(&self, request: &UploadRequest<'_>) -> TransferResult<UploadSession> {
        let (bucket, key) = request.validate()?;
        let project = self.project(request.project)?;
        let scope = project.scope().child();
        let options = UploadOptions::resolve(request.expires);
        let writer = project
            .store()
            .open_write(&scope, bucket, key, &options)
            .map_err(TransferError::open)?;
        Ok(UploadSession::new(
            scope,
            writer,
            location(bucket, key),
            options,
        ))
    }

    pub fn upload_write(&self, handle: Handle, data: &[u8]) -> TransferResult<usize> {
        self.upload_ref(handle)?.lock().write(data)
    }

    pub fn upload_commit(&self, handle: Handle) -> TransferResult<ObjectInfo> {
        self.upload_ref(handle)?.lock().commit().cloned()
    }

    pub fn upload_abort(&self, handle: Handle) -> TransferResult<()> {
        self.upload_ref(handle)?.lock().abort()
    }

    pub fn upload_status(&self, handle: Handle) -> TransferResult<UploadStatus> {
        Ok(self.upload_ref(handle)?.lock().status())
    }

    /// Open a download stream and register it without reading anything.
    pub fn begin_download(&self, request: &DownloadRequest<'_>) -> TransferResult<Handle> {
        let session = self.open_download(request)?;
        let handle = self.register(Entry::download(session));
        debug!(%handle, "download session registered");
        Ok(handle)
    }

    pub(crate) fn open_download(
        &self,
        request: &DownloadRequest<'_>,
    ) -> TransferResult<DownloadSession> {
        let (bucket, key) = request.validate()?;
        let project = self.project(request.project)?;
        let scope = project.scope().child();
        let options = DownloadOptions::resolve(request.options);
        let reader = project
            .store()
            .open_read(&scope, bucket, key, &options)
            .map_err(TransferError::open)?;
        Ok(DownloadSession::new(
            scope,
            reader,
            location(bucket, key),
            options,
        ))
    }

    pub fn download_read(&self, handle: Handle, buf: &mut [u8]) -> TransferResult<usize> {
        self.download_ref(handle)?.lock().read(buf)
    }

    pub fn download_status(&self, handle: Handle) -> TransferResult<DownloadStatus> {
        Ok(self.download_ref(handle)?.lock().status())
    }
}

impl Default for Transfers {
    fn default() -> Self {
        Self::new(TransferConfig::default())
    }
}

impl std::fmt::Debug for Transfers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transfers")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

// Names were validated by the store when the stream was opened.
fn location(bucket: &str, key: &str) -> ObjectLocation {
    ObjectLocation {
        bucket: bucket.to_string(),
        key: key.to_string(),
    }
}
