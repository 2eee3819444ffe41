//! Foundation types for ferry, a client-side object transfer layer.
//!
//! Every other ferry crate depends on `ferry-types`.
//!
//! # Key Types
//!
//! - [`Handle`] — Opaque integer reference to a registry-held object
//! - [`HandleKind`] — The kind of object a handle is expected to name
//! - [`DownloadOptions`] — Byte range selection for downloads
//! - [`UploadOptions`] — Expiration for uploaded objects
//! - [`ObjectLocation`] — A `(bucket, key)` pair

pub mod error;
pub mod handle;
pub mod names;
pub mod options;

pub use error::TypeError;
pub use handle::{Handle, HandleKind};
pub use names::{validate_bucket_name, validate_object_key, ObjectLocation};
pub use options::{DownloadOptions, UploadOptions};
