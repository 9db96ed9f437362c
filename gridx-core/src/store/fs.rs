use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use walkdir::WalkDir;

use super::ChunkStore;
use super::frame;
use crate::codec::Codec;
use crate::codec::zstdc::ZstdCodec;
use crate::domain::FileRecord;
use crate::error::{GridxError, Result};
use crate::id::FileId;

const META_EXT: &str = "cbor";
/// Compressed chunks are kept only if they save at least this fraction.
const MIN_GAIN: f32 = 0.05;

/// Directory-backed chunk store.
///
/// ```text
/// {root}/
///   meta/{id}.cbor                          # FileRecord (CBOR)
///   chunks/{id[0..2]}/{id}/{seq:016x}.chunk # framed payload
/// ```
///
/// Each file is written to a temp file in its target directory, synced, and
/// renamed into place, so a reader sees either the old or the new content.
pub struct FsChunkStore {
    root: PathBuf,
    meta_dir: PathBuf,
    chunk_dir: PathBuf,
    zstd: Option<ZstdCodec>,
}

impl FsChunkStore {
    pub fn open(root: &Path) -> Result<Self> {
        let meta_dir = root.join("meta");
        let chunk_dir = root.join("chunks");
        fs::create_dir_all(&meta_dir)?;
        fs::create_dir_all(&chunk_dir)?;
        tracing::debug!(root = %root.display(), "opened fs chunk store");
        Ok(Self {
            root: root.to_path_buf(),
            meta_dir,
            chunk_dir,
            zstd: None,
        })
    }

    pub fn with_zstd(mut self, level: i32) -> Self {
        self.zstd = Some(ZstdCodec { level });
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn meta_path(&self, id: &FileId) -> PathBuf {
        self.meta_dir.join(format!("{id}.{META_EXT}"))
    }

    fn chunk_set_dir(&self, id: &FileId) -> PathBuf {
        self.chunk_dir.join(id.shard()).join(id.as_str())
    }

    fn chunk_path(&self, id: &FileId, sequence: u64) -> PathBuf {
        self.chunk_set_dir(id).join(format!("{sequence:016x}.chunk"))
    }

    fn read_record(path: &Path) -> Result<Option<FileRecord>> {
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: FileRecord = ciborium::de::from_reader(&bytes[..])
            .map_err(|e| GridxError::Format(format!("{}: {e}", path.display())))?;
        Ok(Some(record))
    }
}

fn write_durable(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| GridxError::Format(format!("{} has no parent", path.display())))?;
    // A concurrent delete of a sibling chunk set may prune the shard dir
    // between mkdir and the temp file; one retry recreates it.
    match write_in(parent, path, bytes) {
        Err(e) if e.kind() == ErrorKind::NotFound => write_in(parent, path, bytes)?,
        other => other?,
    }
    sync_dir(parent)?;
    Ok(())
}

fn write_in(parent: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    fs::create_dir_all(parent)?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

fn ignore_missing(r: std::io::Result<()>) -> std::io::Result<()> {
    match r {
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

impl ChunkStore for FsChunkStore {
    fn put_chunk(&self, file_id: &FileId, sequence: u64, payload: &[u8]) -> Result<()> {
        let compressor = self.zstd.as_ref().map(|z| z as &dyn Codec);
        let framed = frame::encode(payload, compressor, MIN_GAIN)?;
        write_durable(&self.chunk_path(file_id, sequence), &framed)
    }

    fn get_chunk(&self, file_id: &FileId, sequence: u64) -> Result<Vec<u8>> {
        let framed = match fs::read(self.chunk_path(file_id, sequence)) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(GridxError::ChunkNotFound {
                    file_id: file_id.clone(),
                    sequence,
                });
            }
            Err(e) => return Err(e.into()),
        };
        frame::decode(&framed).map_err(|e| GridxError::CorruptFile {
            id: file_id.clone(),
            reason: format!("chunk {sequence}: {e}"),
        })
    }

    fn delete_chunks(&self, file_id: &FileId) -> Result<()> {
        let dir = self.chunk_set_dir(file_id);
        ignore_missing(fs::remove_dir_all(&dir))?;
        if let Some(shard) = dir.parent() {
            // Fails while other ids share the shard; that is fine.
            if fs::remove_dir(shard).is_ok() {
                sync_dir(&self.chunk_dir)?;
            } else {
                ignore_missing(sync_dir(shard))?;
            }
        }
        Ok(())
    }

    fn chunk_owners(&self) -> Result<Vec<FileId>> {
        let mut out = Vec::new();
        for e in WalkDir::new(&self.chunk_dir).min_depth(2).max_depth(2) {
            let e = e.map_err(std::io::Error::from)?;
            if !e.file_type().is_dir() {
                continue;
            }
            if let Some(id) = e.file_name().to_str().and_then(FileId::parse) {
                out.push(id);
            }
        }
        out.sort();
        Ok(out)
    }

    fn put_metadata(&self, record: &FileRecord) -> Result<()> {
        let mut buf = Vec::with_capacity(256);
        ciborium::ser::into_writer(record, &mut buf)
            .map_err(|e| GridxError::Format(format!("record encode: {e}")))?;
        write_durable(&self.meta_path(&record.id), &buf)
    }

    fn get_metadata(&self, id: &FileId) -> Result<FileRecord> {
        Self::read_record(&self.meta_path(id))?
            .ok_or_else(|| GridxError::FileNotFound(id.to_string()))
    }

    fn delete_metadata(&self, id: &FileId) -> Result<()> {
        ignore_missing(fs::remove_file(self.meta_path(id)))?;
        sync_dir(&self.meta_dir)?;
        Ok(())
    }

    fn list_metadata(&self) -> Result<Vec<FileRecord>> {
        let mut out = Vec::new();
        for e in WalkDir::new(&self.meta_dir).min_depth(1).max_depth(1) {
            let e = e.map_err(std::io::Error::from)?;
            let path = e.path();
            if !e.file_type().is_file()
                || path.extension().and_then(|x| x.to_str()) != Some(META_EXT)
            {
                continue;
            }
            // Deleted between listing and reading.
            if let Some(r) = Self::read_record(path)? {
                out.push(r);
            }
        }
        // Records are first written when an upload begins, so creation time
        // is insertion order.
        out.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(out)
    }
}
