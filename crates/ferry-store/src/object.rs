use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use ferry_types::ObjectLocation;

/// Metadata of a committed object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub bucket: String,
    pub key: String,
    /// Size of the whole object in bytes.
    pub size: u64,
    pub created: SystemTime,
    pub expires: Option<SystemTime>,
    /// BLAKE3 digest of the object contents.
    pub content_hash: [u8; 32],
}

impl ObjectInfo {
    pub fn location(&self) -> ObjectLocation {
        ObjectLocation {
            bucket: self.bucket.clone(),
            key: self.key.clone(),
        }
    }

    /// Returns `true` if the object has expired as of `now`.
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        matches!(self.expires, Some(t) if t <= now)
    }

    pub fn content_hash_hex(&self) -> String {
        hex::encode(self.content_hash)
    }
}

/// Incrementally hashes and counts the bytes of an object being written.
#[derive(Debug, Default)]
pub(crate) struct ContentDigest {
    hasher: blake3::Hasher,
    len: u64,
}

impl ContentDigest {
    pub(crate) fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
        self.len += data.len() as u64;
    }

    pub(crate) fn len(&self) -> u64 {
        self.len
    }

    pub(crate) fn finalize(&self) -> [u8; 32] {
        *self.hasher.finalize().as_bytes()
    }
}
