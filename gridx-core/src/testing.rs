//! Shared test utilities.
//!
//! Available behind the `testing` feature or in `#[cfg(test)]` within
//! gridx-core. Provides a fault-injecting store wrapper and byte sources that
//! fail part-way through.

use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::domain::FileRecord;
use crate::error::{GridxError, Result};
use crate::id::FileId;
use crate::store::{ChunkStore, MemChunkStore, SharedStore};

/// Switches for [`FaultyStore`]. All off by default.
pub struct Faults {
    /// `put_chunk` fails for every sequence `>=` this value.
    pub put_chunk_from: AtomicU64,
    pub put_metadata: AtomicBool,
    /// `put_metadata` writes through, then reports failure anyway.
    pub put_metadata_lands: AtomicBool,
    pub delete_chunks: AtomicBool,
    pub delete_metadata: AtomicBool,
    pub get_chunk: AtomicBool,
}

impl Default for Faults {
    fn default() -> Self {
        Self {
            put_chunk_from: AtomicU64::new(u64::MAX),
            put_metadata: AtomicBool::new(false),
            put_metadata_lands: AtomicBool::new(false),
            delete_chunks: AtomicBool::new(false),
            delete_metadata: AtomicBool::new(false),
            get_chunk: AtomicBool::new(false),
        }
    }
}

/// Wraps a real store and fails selected operations on demand.
pub struct FaultyStore {
    inner: SharedStore,
    pub faults: Faults,
}

impl FaultyStore {
    pub fn new(inner: SharedStore) -> Self {
        Self {
            inner,
            faults: Faults::default(),
        }
    }

    pub fn in_memory() -> Arc<Self> {
        Arc::new(Self::new(Arc::new(MemChunkStore::new())))
    }
}

fn injected(op: &str) -> GridxError {
    GridxError::Io(io::Error::other(format!("injected {op} failure")))
}

impl ChunkStore for FaultyStore {
    fn put_chunk(&self, file_id: &FileId, sequence: u64, payload: &[u8]) -> Result<()> {
        if sequence >= self.faults.put_chunk_from.load(Ordering::SeqCst) {
            return Err(injected("put_chunk"));
        }
        self.inner.put_chunk(file_id, sequence, payload)
    }

    fn get_chunk(&self, file_id: &FileId, sequence: u64) -> Result<Vec<u8>> {
        if self.faults.get_chunk.load(Ordering::SeqCst) {
            return Err(injected("get_chunk"));
        }
        self.inner.get_chunk(file_id, sequence)
    }

    fn delete_chunks(&self, file_id: &FileId) -> Result<()> {
        if self.faults.delete_chunks.load(Ordering::SeqCst) {
            return Err(injected("delete_chunks"));
        }
        self.inner.delete_chunks(file_id)
    }

    fn chunk_owners(&self) -> Result<Vec<FileId>> {
        self.inner.chunk_owners()
    }

    fn put_metadata(&self, record: &FileRecord) -> Result<()> {
        if self.faults.put_metadata.load(Ordering::SeqCst) {
            return Err(injected("put_metadata"));
        }
        self.inner.put_metadata(record)?;
        if self.faults.put_metadata_lands.load(Ordering::SeqCst) {
            return Err(injected("put_metadata"));
        }
        Ok(())
    }

    fn get_metadata(&self, id: &FileId) -> Result<FileRecord> {
        self.inner.get_metadata(id)
    }

    fn delete_metadata(&self, id: &FileId) -> Result<()> {
        if self.faults.delete_metadata.load(Ordering::SeqCst) {
            return Err(injected("delete_metadata"));
        }
        self.inner.delete_metadata(id)
    }

    fn list_metadata(&self) -> Result<Vec<FileRecord>> {
        self.inner.list_metadata()
    }
}

/// Yields `data[..fail_after]`, then fails like a dropped connection.
pub struct FailingReader {
    data: Vec<u8>,
    pos: usize,
    fail_after: usize,
}

impl FailingReader {
    pub fn new(data: Vec<u8>, fail_after: usize) -> Self {
        Self {
            data,
            pos: 0,
            fail_after,
        }
    }
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let end = self.fail_after.min(self.data.len());
        if self.pos >= end {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "client went away",
            ));
        }
        let n = buf.len().min(end - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Deterministic, mildly varied test content.
pub fn sample_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}
