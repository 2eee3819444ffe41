//! Transfer sessions and file orchestration for ferry.
//!
//! [`Transfers`] is the entry point. It owns a registry of opaque
//! [`Handle`](ferry_types::Handle)s, each referring to a [`Project`], an
//! [`UploadSession`] or a [`DownloadSession`], and offers two families of
//! operations:
//!
//! - whole-file transfers: [`Transfers::download_object_to_file`] and
//!   [`Transfers::upload_object_from_file`];
//! - session primitives for callers that stream themselves:
//!   `begin_*`, `upload_write`, `upload_commit`, `download_read` and friends.
//!
//! # Guarantees
//!
//! 1. Bad arguments and stale handles are rejected before any I/O.
//! 2. A failed download never leaves a partial destination file.
//! 3. An upload that is not committed is aborted, never half-visible.
//! 4. Closing a project cancels every session started from it.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use ferry_store::InMemoryObjectStore;
//! use ferry_transfer::{DownloadRequest, Transfers, UploadRequest};
//!
//! let transfers = Transfers::default();
//! let project = transfers.open_project(Arc::new(InMemoryObjectStore::new()));
//!
//! transfers.upload_object_from_file(
//!     &UploadRequest::new(project, "photos", "cat.jpg"),
//!     Path::new("cat.jpg"),
//! )?;
//! transfers.download_object_to_file(
//!     &DownloadRequest::new(project, "photos", "cat.jpg"),
//!     Path::new("copy.jpg"),
//! )?;
//! transfers.close_project(project)?;
//! # Ok::<(), ferry_transfer::TransferError>(())
//! ```

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod project;
pub mod request;
pub mod session;
pub mod transfers;

#[cfg(test)]
mod testing;

pub use config::{TransferConfig, DEFAULT_CHUNK_SIZE};
pub use error::{ErrorKind, TransferError, TransferResult};
pub use project::Project;
pub use request::{DownloadRequest, UploadRequest};
pub use session::{
    DownloadSession, DownloadState, DownloadStatus, UploadSession, UploadState, UploadStatus,
};
pub use transfers::{Entry, SessionRef, Transfers};
