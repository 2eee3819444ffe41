use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque reference to an object held in a registry.
///
/// The value `0` is reserved as the null handle and is never issued. A
/// handle maps to exactly one live object until it is released, and its
/// value is never handed out again for the lifetime of the registry that
/// issued it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(u64);

impl Handle {
    /// The reserved, always-invalid handle.
    pub const NULL: Handle = Handle(0);

    /// Wrap a raw handle value, e.g. one received from a caller.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw integer value.
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    /// Returns `true` for the reserved null handle.
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.0)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h#{}", self.0)
    }
}

/// The kind of object a handle is expected to refer to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    Project,
    Upload,
    Download,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandleKind::Project => "project",
            HandleKind::Upload => "upload",
            HandleKind::Download => "download",
        };
        f.write_str(name)
    }
}
