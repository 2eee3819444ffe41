//! Bucket name and object key validation.
//!
//! Valid bucket names:
//! - Are 3 to 63 characters long
//! - Contain only lowercase ASCII letters, digits, `.` and `-`
//! - Start and end with a letter or digit
//! - Do not contain `..`
//!
//! Valid object keys are non-empty, at most 1024 bytes, and contain no NUL.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

const MIN_BUCKET_LEN: usize = 3;
const MAX_BUCKET_LEN: usize = 63;
const MAX_KEY_LEN: usize = 1024;

/// Validate a bucket name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use ferry_types::validate_bucket_name;
///
/// assert!(validate_bucket_name("photos").is_ok());
/// assert!(validate_bucket_name("my.bucket-01").is_ok());
/// assert!(validate_bucket_name("ab").is_err());
/// assert!(validate_bucket_name("Photos").is_err());
/// ```
pub fn validate_bucket_name(name: &str) -> Result<(), TypeError> {
    let fail = |reason: &str| {
        Err(TypeError::InvalidBucketName {
            name: name.to_string(),
            reason: reason.to_string(),
        })
    };

    if name.len() < MIN_BUCKET_LEN || name.len() > MAX_BUCKET_LEN {
        return fail("must be between 3 and 63 characters");
    }
    if let Some(ch) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '.' || *c == '-'))
    {
        return fail(&format!("contains forbidden character: {ch:?}"));
    }
    let alnum = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    if !alnum(name.chars().next()) || !alnum(name.chars().last()) {
        return fail("must start and end with a letter or digit");
    }
    if name.contains("..") {
        return fail("must not contain '..'");
    }
    Ok(())
}

/// Validate an object key, returning `Ok(())` if valid.
pub fn validate_object_key(key: &str) -> Result<(), TypeError> {
    let fail = |reason: &str| {
        Err(TypeError::InvalidObjectKey {
            key: key.to_string(),
            reason: reason.to_string(),
        })
    };

    if key.is_empty() {
        return fail("key must not be empty");
    }
    if key.len() > MAX_KEY_LEN {
        return fail("key must be at most 1024 bytes");
    }
    if key.contains('\0') {
        return fail("key must not contain NUL");
    }
    Ok(())
}

/// A validated `(bucket, key)` pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    /// Validate both parts and build a location.
    pub fn new(bucket: &str, key: &str) -> Result<Self, TypeError> {
        validate_bucket_name(bucket)?;
        validate_object_key(key)?;
        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}
