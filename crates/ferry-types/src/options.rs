//! Options accepted by download and upload operations.

use std::ops::Range;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Byte range selection for a download.
///
/// `length < 0` means "read to the end of the object".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadOptions {
    pub offset: i64,
    pub length: i64,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            offset: 0,
            length: -1,
        }
    }
}

impl DownloadOptions {
    /// Effective options for a call.
    ///
    /// Caller-supplied options replace both defaults verbatim; there is no
    /// field-by-field merging.
    pub fn resolve(options: Option<DownloadOptions>) -> Self {
        options.unwrap_or_default()
    }

    /// Resolve these options against an object of `size` bytes.
    ///
    /// A negative offset, or an offset past the end, is rejected. A length
    /// running past the end is clamped.
    pub fn byte_range(&self, size: u64) -> Result<Range<u64>, TypeError> {
        let invalid = || TypeError::InvalidRange {
            offset: self.offset,
            length: self.length,
            size,
        };
        if self.offset < 0 {
            return Err(invalid());
        }
        let start = self.offset as u64;
        if start > size {
            return Err(invalid());
        }
        let end = if self.length < 0 {
            size
        } else {
            start.saturating_add(self.length as u64).min(size)
        };
        Ok(start..end)
    }
}

/// Options for an upload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOptions {
    /// When the object stops being readable. `None` means never.
    pub expires: Option<SystemTime>,
}

impl UploadOptions {
    /// Build options from a unix timestamp in seconds.
    ///
    /// Only a strictly positive value sets an expiration.
    pub fn from_unix_seconds(expires: i64) -> Self {
        if expires > 0 {
            Self {
                expires: Some(UNIX_EPOCH + Duration::from_secs(expires as u64)),
            }
        } else {
            Self::default()
        }
    }

    /// Effective options for a call with an optional expiration.
    pub fn resolve(expires_unix_seconds: Option<i64>) -> Self {
        expires_unix_seconds
            .map(Self::from_unix_seconds)
            .unwrap_or_default()
    }
}
