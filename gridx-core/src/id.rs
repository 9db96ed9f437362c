use crate::error::{GridxError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 64 bits of entropy; shorter ids are refused.
pub const MIN_ID_BYTES: usize = 8;
pub const MAX_ID_BYTES: usize = 64;

/// Lowercase hex identifier of a stored file.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    /// Accepts only what [`IdGenerator`] can produce, so an id is always safe
    /// to embed in a storage key or path.
    pub fn parse(s: &str) -> Option<Self> {
        let len = s.len();
        if len % 2 != 0 || len < MIN_ID_BYTES * 2 || len > MAX_ID_BYTES * 2 {
            return None;
        }
        if !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return None;
        }
        Some(Self(s.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Two-character shard prefix used by directory-backed stores.
    pub fn shard(&self) -> &str {
        &self.0[..2]
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FileId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Copy, Debug)]
pub struct IdGenerator {
    len: usize,
}

impl IdGenerator {
    pub fn new(id_bytes: usize) -> Result<Self> {
        if !(MIN_ID_BYTES..=MAX_ID_BYTES).contains(&id_bytes) {
            return Err(GridxError::Config(format!(
                "id length must be {MIN_ID_BYTES}..={MAX_ID_BYTES} bytes, got {id_bytes}"
            )));
        }
        Ok(Self { len: id_bytes })
    }

    /// Draw a fresh id from the OS random source.
    pub fn generate(&self) -> Result<FileId> {
        let mut buf = vec![0u8; self.len];
        getrandom::getrandom(&mut buf)
            .map_err(|e| GridxError::EntropyUnavailable(e.to_string()))?;
        Ok(FileId(hex::encode(buf)))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self { len: MIN_ID_BYTES }
    }
}
