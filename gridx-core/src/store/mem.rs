use std::sync::Mutex;

use dashmap::DashMap;

use super::ChunkStore;
use crate::domain::FileRecord;
use crate::error::{GridxError, Result};
use crate::id::FileId;

/// In-process chunk store. Nothing survives the process; useful for tests and
/// throwaway servers.
#[derive(Default)]
pub struct MemChunkStore {
    chunks: DashMap<(FileId, u64), Vec<u8>>,
    // Vec keeps insertion order for listings.
    records: Mutex<Vec<FileRecord>>,
}

impl MemChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chunk_len(&self) -> usize {
        self.chunks.len()
    }
}

impl ChunkStore for MemChunkStore {
    fn put_chunk(&self, file_id: &FileId, sequence: u64, payload: &[u8]) -> Result<()> {
        self.chunks
            .insert((file_id.clone(), sequence), payload.to_vec());
        Ok(())
    }

    fn get_chunk(&self, file_id: &FileId, sequence: u64) -> Result<Vec<u8>> {
        self.chunks
            .get(&(file_id.clone(), sequence))
            .map(|c| c.value().clone())
            .ok_or_else(|| GridxError::ChunkNotFound {
                file_id: file_id.clone(),
                sequence,
            })
    }

    fn delete_chunks(&self, file_id: &FileId) -> Result<()> {
        self.chunks.retain(|(owner, _), _| owner != file_id);
        Ok(())
    }

    fn chunk_owners(&self) -> Result<Vec<FileId>> {
        let mut out: Vec<FileId> = self.chunks.iter().map(|e| e.key().0.clone()).collect();
        out.sort();
        out.dedup();
        Ok(out)
    }

    fn put_metadata(&self, record: &FileRecord) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| GridxError::lock_poisoned("records"))?;
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(slot) => *slot = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(())
    }

    fn get_metadata(&self, id: &FileId) -> Result<FileRecord> {
        let records = self
            .records
            .lock()
            .map_err(|_| GridxError::lock_poisoned("records"))?;
        records
            .iter()
            .find(|r| &r.id == id)
            .cloned()
            .ok_or_else(|| GridxError::FileNotFound(id.to_string()))
    }

    fn delete_metadata(&self, id: &FileId) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| GridxError::lock_poisoned("records"))?
            .retain(|r| &r.id != id);
        Ok(())
    }

    fn list_metadata(&self) -> Result<Vec<FileRecord>> {
        Ok(self
            .records
            .lock()
            .map_err(|_| GridxError::lock_poisoned("records"))?
            .clone())
    }
}
