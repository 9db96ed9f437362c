// gridx_core/src/domain.rs
use crate::error::{GridxError, Result};
use crate::id::FileId;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Upload in progress; never listed.
    Pending,
    Complete,
    /// Tombstone; chunks reclaimed or about to be.
    Deleted,
}

impl FileStatus {
    pub fn can_become(self, next: FileStatus) -> bool {
        matches!(
            (self, next),
            (FileStatus::Pending, FileStatus::Complete)
                | (FileStatus::Pending, FileStatus::Deleted)
                | (FileStatus::Complete, FileStatus::Deleted)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: FileId,
    pub name: String,
    pub size_bytes: u64,
    pub chunk_count: u64,
    /// Maximum payload length of any chunk of this file.
    pub chunk_size: u64,
    pub content_type: Option<String>,
    /// Unix timestamp, nanoseconds (UTC).
    pub created_at: i64,
    /// Last write to this record; refreshed by a live upload after each chunk.
    #[serde(default)]
    pub updated_at: i64,
    /// Hex blake3 of the whole content; set on completion.
    pub blake3: Option<String>,
    pub status: FileStatus,
}

impl FileRecord {
    pub fn pending(
        id: FileId,
        name: String,
        content_type: Option<String>,
        chunk_size: u64,
    ) -> Self {
        let now = now_nanos();
        Self {
            id,
            name,
            size_bytes: 0,
            chunk_count: 0,
            chunk_size,
            content_type,
            created_at: now,
            updated_at: now,
            blake3: None,
            status: FileStatus::Pending,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == FileStatus::Complete
    }

    pub fn last_activity(&self) -> i64 {
        self.created_at.max(self.updated_at)
    }

    pub fn touch(&mut self) {
        self.updated_at = now_nanos();
    }

    fn transition(&mut self, next: FileStatus) -> Result<()> {
        if !self.status.can_become(next) {
            return Err(GridxError::Format(format!(
                "file {}: illegal status change {:?} -> {:?}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }

    pub fn finalize(&mut self, size_bytes: u64, chunk_count: u64, blake3: String) -> Result<()> {
        self.transition(FileStatus::Complete)?;
        self.touch();
        self.size_bytes = size_bytes;
        self.chunk_count = chunk_count;
        self.blake3 = Some(blake3);
        Ok(())
    }

    pub fn mark_deleted(&mut self) -> Result<()> {
        self.transition(FileStatus::Deleted)?;
        self.touch();
        Ok(())
    }
}

pub(crate) fn now_nanos() -> i64 {
    let ns = OffsetDateTime::now_utc().unix_timestamp_nanos();
    i64::try_from(ns).unwrap_or(i64::MAX)
}
