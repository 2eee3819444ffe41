//! Object store interface and backends for ferry.
//!
//! The transfer core never talks to a storage backend directly. It drives
//! the [`ObjectStore`] trait, opening an [`ObjectReader`] to download and an
//! [`ObjectWriter`] to upload, each bound to a cancellable
//! [`Scope`](ferry_scope::Scope).
//!
//! # Storage Backends
//!
//! - [`InMemoryObjectStore`] -- `HashMap`-based store for tests and embedding
//! - [`DirObjectStore`] -- one file per object under a root directory
//!
//! # Design Rules
//!
//! 1. An object becomes visible only on commit; aborted uploads leave no trace.
//! 2. Every stream call checks its scope and fails once it is cancelled.
//! 3. Objects are immutable once committed; a new commit replaces them whole.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod dir;
pub mod error;
pub mod memory;
pub mod object;
pub mod traits;

#[cfg(test)]
mod testing;

pub use dir::DirObjectStore;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryObjectStore;
pub use object::ObjectInfo;
pub use traits::{ObjectReader, ObjectStore, ObjectWriter};
