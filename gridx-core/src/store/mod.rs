//! Chunk Store: durable persistence of chunk payloads and file records.
//!
//! Every method is write-through: when it returns `Ok`, the change is on the
//! backing medium. Implementations hold no state that another instance over
//! the same medium could not see.

use crate::domain::FileRecord;
use crate::error::Result;
use crate::id::FileId;
use std::path::PathBuf;
use std::sync::Arc;

pub mod frame;
pub mod fs;
pub mod mem;

pub use fs::FsChunkStore;
pub use mem::MemChunkStore;

pub trait ChunkStore: Send + Sync {
    /// Write one chunk; overwrites an existing chunk at the same position.
    fn put_chunk(&self, file_id: &FileId, sequence: u64, payload: &[u8]) -> Result<()>;

    /// Fails with `ChunkNotFound` if absent.
    fn get_chunk(&self, file_id: &FileId, sequence: u64) -> Result<Vec<u8>>;

    /// Remove every chunk of `file_id`; no-op if there are none.
    fn delete_chunks(&self, file_id: &FileId) -> Result<()>;

    /// Ids that currently own at least one chunk.
    fn chunk_owners(&self) -> Result<Vec<FileId>>;

    fn put_metadata(&self, record: &FileRecord) -> Result<()>;

    /// Fails with `FileNotFound` if absent.
    fn get_metadata(&self, id: &FileId) -> Result<FileRecord>;

    /// No-op if absent.
    fn delete_metadata(&self, id: &FileId) -> Result<()>;

    /// Every record, any status, in insertion order.
    fn list_metadata(&self) -> Result<Vec<FileRecord>>;

    /// Records named `name`, any status, in insertion order.
    fn find_by_name(&self, name: &str) -> Result<Vec<FileRecord>> {
        Ok(self
            .list_metadata()?
            .into_iter()
            .filter(|r| r.name == name)
            .collect())
    }
}

pub type SharedStore = Arc<dyn ChunkStore>;

#[derive(Clone, Debug)]
pub enum Backend {
    Fs {
        root: PathBuf,
        /// Compress chunks with zstd at this level when it pays off.
        zstd_level: Option<i32>,
    },
    Memory,
}

pub fn open_store(backend: Backend) -> Result<SharedStore> {
    match backend {
        Backend::Fs { root, zstd_level } => {
            let mut store = FsChunkStore::open(&root)?;
            if let Some(level) = zstd_level {
                store = store.with_zstd(level);
            }
            Ok(Arc::new(store))
        }
        Backend::Memory => Ok(Arc::new(MemChunkStore::new())),
    }
}
