//! Stream Writer: slices a byte stream into chunks and finalizes the record.
//!
//! The record is written `pending` before the first chunk and rewritten
//! `complete` after the last one; that final write is the only place a file
//! becomes visible. Any failure in between runs the cleanup path, and so does
//! dropping an [`UploadSession`] that was never finished.

use std::io::{ErrorKind, Read};

use crate::domain::{FileRecord, FileStatus};
use crate::error::{GridxError, Result};
use crate::id::{FileId, IdGenerator};
use crate::naming::{self, NameMode};
use crate::options::StoreOptions;
use crate::store::SharedStore;

pub struct StreamWriter {
    store: SharedStore,
    ids: IdGenerator,
    chunk_size: usize,
    naming: NameMode,
}

impl StreamWriter {
    pub fn new(store: SharedStore, opts: &StoreOptions) -> Result<Self> {
        opts.validate()?;
        Ok(Self {
            store,
            ids: IdGenerator::new(opts.id_bytes)?,
            chunk_size: opts.chunk_size,
            naming: opts.naming,
        })
    }

    /// Create the `pending` record and return a session to feed bytes into.
    pub fn begin(&self, name_hint: &str, content_type: Option<&str>) -> Result<UploadSession> {
        let id = self.ids.generate()?;
        let name = naming::display_name(self.naming, &id, name_hint);
        let record = FileRecord::pending(
            id,
            name,
            content_type.map(str::to_owned),
            self.chunk_size as u64,
        );
        let mut session = UploadSession {
            store: self.store.clone(),
            record,
            chunk_size: self.chunk_size,
            buf: Vec::with_capacity(self.chunk_size),
            next_seq: 0,
            size: 0,
            hasher: blake3::Hasher::new(),
            state: SessionState::Open,
        };
        if let Err(e) = session.store.put_metadata(&session.record) {
            return Err(session.fail(e));
        }
        tracing::debug!(id = %session.record.id, name = %session.record.name, "upload started");
        Ok(session)
    }

    /// Store everything `source` yields until end of stream.
    pub fn write<R: Read>(
        &self,
        name_hint: &str,
        content_type: Option<&str>,
        mut source: R,
    ) -> Result<FileRecord> {
        let mut session = self.begin(name_hint, content_type)?;
        let mut buf = vec![0u8; self.chunk_size];
        loop {
            let n = match source.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(session.abort_with(GridxError::Io(e))),
            };
            session.push(&buf[..n])?;
        }
        session.finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SessionState {
    Open,
    Finished,
    Aborted,
}

/// One in-flight upload. Holds at most one chunk of unflushed bytes.
pub struct UploadSession {
    store: SharedStore,
    /// Snapshot taken at `begin`; the stored copy is re-read before each write.
    record: FileRecord,
    chunk_size: usize,
    buf: Vec<u8>,
    next_seq: u64,
    size: u64,
    hasher: blake3::Hasher,
    state: SessionState,
}

impl UploadSession {
    pub fn id(&self) -> &FileId {
        &self.record.id
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    pub fn bytes_received(&self) -> u64 {
        self.size
    }

    /// Append bytes; every full chunk is written before this returns.
    pub fn push(&mut self, mut data: &[u8]) -> Result<()> {
        self.ensure_open()?;
        self.hasher.update(data);
        self.size += data.len() as u64;
        while !data.is_empty() {
            let take = (self.chunk_size - self.buf.len()).min(data.len());
            self.buf.extend_from_slice(&data[..take]);
            data = &data[take..];
            if self.buf.len() == self.chunk_size {
                if let Err(e) = self.flush_chunk() {
                    return Err(self.fail(e));
                }
            }
        }
        Ok(())
    }

    /// Flush the tail chunk and mark the file `complete`.
    pub fn finish(mut self) -> Result<FileRecord> {
        self.ensure_open()?;
        if !self.buf.is_empty() {
            if let Err(e) = self.flush_chunk() {
                return Err(self.fail(e));
            }
        }
        let digest = self.hasher.finalize().to_hex().to_string();
        let finalized = self.live_record().and_then(|mut done| {
            done.finalize(self.size, self.next_seq, digest)?;
            self.store.put_metadata(&done)?;
            Ok(done)
        });
        let done = match finalized {
            Ok(done) => done,
            Err(e) => return Err(self.fail(e)),
        };
        self.state = SessionState::Finished;
        tracing::info!(
            id = %done.id,
            name = %done.name,
            size = done.size_bytes,
            chunks = done.chunk_count,
            "upload complete"
        );
        Ok(done)
    }

    /// Give up because the byte source failed; returns the `UploadFailed` error.
    pub fn abort(self, cause: impl Into<String>) -> GridxError {
        self.abort_with(GridxError::Source(cause.into()))
    }

    pub(crate) fn abort_with(mut self, cause: GridxError) -> GridxError {
        if self.state != SessionState::Open {
            return cause;
        }
        self.fail(cause)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state != SessionState::Open {
            return Err(GridxError::Format(format!(
                "upload {} is no longer open",
                self.record.id
            )));
        }
        Ok(())
    }

    fn flush_chunk(&mut self) -> Result<()> {
        self.store
            .put_chunk(&self.record.id, self.next_seq, &self.buf)?;
        let mut stored = self.live_record()?;
        stored.touch();
        self.store.put_metadata(&stored)?;
        tracing::trace!(
            id = %self.record.id,
            sequence = self.next_seq,
            len = self.buf.len(),
            "chunk written"
        );
        self.next_seq += 1;
        self.buf.clear();
        Ok(())
    }

    /// The stored record, as long as it is still ours to finish. A sweep or a
    /// delete may have reclaimed it while bytes were streaming.
    fn live_record(&self) -> Result<FileRecord> {
        let stored = self.store.get_metadata(&self.record.id)?;
        if stored.status != FileStatus::Pending {
            return Err(GridxError::Format(format!(
                "upload {} became {:?} while streaming",
                self.record.id, stored.status
            )));
        }
        Ok(stored)
    }

    fn fail(&mut self, cause: GridxError) -> GridxError {
        self.state = SessionState::Aborted;
        self.buf.clear();
        tracing::warn!(id = %self.record.id, error = %cause, "upload aborted");
        self.cleanup();
        GridxError::UploadFailed {
            id: self.record.id.clone(),
            source: Box::new(cause),
        }
    }

    /// Best effort: tombstone, then chunks, then the record. A finalize write
    /// that landed before failing is hidden by the tombstone. Leftovers are
    /// reclaimed by `Catalog::sweep`.
    fn cleanup(&self) {
        let id = &self.record.id;
        let mut tombstone = self.record.clone();
        if tombstone.mark_deleted().is_ok() {
            if let Err(e) = self.store.put_metadata(&tombstone) {
                tracing::warn!(%id, error = %e, "could not tombstone aborted upload");
            }
        }
        if let Err(e) = self.store.delete_chunks(id) {
            tracing::warn!(%id, error = %e, "chunks of aborted upload left for sweep");
        }
        if let Err(e) = self.store.delete_metadata(id) {
            tracing::warn!(%id, error = %e, "record of aborted upload left for sweep");
        }
    }
}

impl Drop for UploadSession {
    fn drop(&mut self) {
        if self.state == SessionState::Open {
            self.state = SessionState::Aborted;
            tracing::warn!(id = %self.record.id, "upload dropped before completion");
            self.cleanup();
        }
    }
}
