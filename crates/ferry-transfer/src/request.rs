use ferry_types::{DownloadOptions, Handle};

use crate::error::{TransferError, TransferResult};

/// Arguments of a download.
///
/// `None` for the bucket or key, or a null project handle, is rejected with
/// [`TransferError::NullArgument`] before any I/O happens.
#[derive(Clone, Debug, Default)]
pub struct DownloadRequest<'a> {
    pub project: Handle,
    pub bucket: Option<&'a str>,
    pub key: Option<&'a str>,
    /// Replaces both defaults (`offset = 0`, `length = -1`) when present.
    pub options: Option<DownloadOptions>,
}

impl<'a> DownloadRequest<'a> {
    pub fn new(project: Handle, bucket: &'a str, key: &'a str) -> Self {
        Self {
            project,
            bucket: Some(bucket),
            key: Some(key),
            options: None,
        }
    }

    pub fn with_options(mut self, options: DownloadOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub(crate) fn validate(&self) -> TransferResult<(&'a str, &'a str)> {
        validate_common(self.project, self.bucket, self.key)
    }
}

/// Arguments of an upload.
#[derive(Clone, Debug, Default)]
pub struct UploadRequest<'a> {
    pub project: Handle,
    pub bucket: Option<&'a str>,
    pub key: Option<&'a str>,
    /// Unix seconds. Only a positive value sets an expiration.
    pub expires: Option<i64>,
}

impl<'a> UploadRequest<'a> {
    pub fn new(project: Handle, bucket: &'a str, key: &'a str) -> Self {
        Self {
            project,
            bucket: Some(bucket),
            key: Some(key),
            expires: None,
        }
    }

    pub fn with_expires(mut self, unix_seconds: i64) -> Self {
        self.expires = Some(unix_seconds);
        self
    }

    pub(crate) fn validate(&self) -> TransferResult<(&'a str, &'a str)> {
        validate_common(self.project, self.bucket, self.key)
    }
}

fn validate_common<'a>(
    project: Handle,
    bucket: Option<&'a str>,
    key: Option<&'a str>,
) -> TransferResult<(&'a str, &'a str)> {
    if project.is_null() {
        return Err(TransferError::NullArgument("project"));
    }
    let bucket = bucket.ok_or(TransferError::NullArgument("bucket"))?;
    let key = key.ok_or(TransferError::NullArgument("key"))?;
    Ok((bucket, key))
}
