use std::io::{Cursor, Read};
use std::iter::FusedIterator;

use crate::catalog::Catalog;
use crate::domain::FileRecord;
use crate::error::{GridxError, Result};
use crate::store::SharedStore;

/// Lazy, in-order reassembly of one complete file.
///
/// Iterating yields one payload per chunk; `Read` flattens them. Chunks are
/// fetched one at a time, so memory use is bounded by the chunk size. Totals
/// and the content digest are checked before the last chunk is handed out.
pub struct FileReader {
    store: SharedStore,
    record: FileRecord,
    next_seq: u64,
    delivered: u64,
    hasher: blake3::Hasher,
    cur_buf: Option<Cursor<Vec<u8>>>,
    done: bool,
}

impl FileReader {
    pub fn new(store: SharedStore, record: FileRecord) -> Result<Self> {
        if !record.is_complete() {
            return Err(GridxError::FileNotFound(record.id.to_string()));
        }
        Ok(Self {
            store,
            record,
            next_seq: 0,
            delivered: 0,
            hasher: blake3::Hasher::new(),
            cur_buf: None,
            done: false,
        })
    }

    /// Resolve `id_or_name` through the catalog and start at chunk 0.
    pub fn open(store: SharedStore, id_or_name: &str) -> Result<Self> {
        let record = Catalog::new(store.clone()).lookup(id_or_name)?;
        Self::new(store, record)
    }

    pub fn record(&self) -> &FileRecord {
        &self.record
    }

    pub fn next_chunk(&mut self) -> Result<Option<Vec<u8>>> {
        if self.done {
            return Ok(None);
        }
        let count = self.record.chunk_count;
        if self.next_seq >= count {
            self.done = true;
            return self.check_totals().map(|()| None);
        }

        let seq = self.next_seq;
        let payload = match self.store.get_chunk(&self.record.id, seq) {
            Ok(p) => p,
            Err(GridxError::ChunkNotFound { .. }) => {
                return Err(self.corrupt(format!("chunk {seq} of {count} is missing")));
            }
            Err(e) => {
                self.done = true;
                return Err(e);
            }
        };
        if payload.is_empty() || payload.len() as u64 > self.record.chunk_size {
            return Err(self.corrupt(format!(
                "chunk {seq} has {} bytes, chunk size is {}",
                payload.len(),
                self.record.chunk_size
            )));
        }

        self.delivered += payload.len() as u64;
        if self.delivered > self.record.size_bytes {
            return Err(self.corrupt(format!(
                "chunks exceed recorded size of {} bytes",
                self.record.size_bytes
            )));
        }
        self.hasher.update(&payload);
        self.next_seq += 1;
        if self.next_seq == count {
            self.check_totals()?;
        }
        Ok(Some(payload))
    }

    fn check_totals(&mut self) -> Result<()> {
        if self.delivered != self.record.size_bytes {
            return Err(self.corrupt(format!(
                "read {} bytes, record says {}",
                self.delivered, self.record.size_bytes
            )));
        }
        if let Some(expected) = self.record.blake3.as_deref() {
            if self.hasher.finalize().to_hex().as_str() != expected {
                return Err(self.corrupt("content digest mismatch".to_string()));
            }
        }
        Ok(())
    }

    fn corrupt(&mut self, reason: String) -> GridxError {
        self.done = true;
        tracing::error!(id = %self.record.id, %reason, "corrupt file");
        GridxError::CorruptFile {
            id: self.record.id.clone(),
            reason,
        }
    }
}

impl Iterator for FileReader {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_chunk().transpose()
    }
}

impl FusedIterator for FileReader {}

impl Read for FileReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if let Some(ref mut cur) = self.cur_buf {
                let n = cur.read(buf)?;
                if n > 0 {
                    return Ok(n);
                }
                self.cur_buf = None;
            }
            match self.next_chunk() {
                Ok(Some(chunk)) => self.cur_buf = Some(Cursor::new(chunk)),
                Ok(None) => return Ok(0),
                Err(e) => return Err(std::io::Error::other(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::StoreOptions;
    use crate::store::{ChunkStore, MemChunkStore};
    use crate::testing::{FaultyStore, sample_bytes};
    use crate::writer::StreamWriter;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    fn stored(data: &[u8], chunk_size: usize) -> (Arc<MemChunkStore>, FileRecord) {
        let store = Arc::new(MemChunkStore::new());
        let opts = StoreOptions {
            chunk_size,
            ..Default::default()
        };
        let rec = StreamWriter::new(store.clone(), &opts)
            .unwrap()
            .write("f.bin", None, data)
            .unwrap();
        (store, rec)
    }

    #[test]
    fn chunks_come_back_in_order() {
        let data = sample_bytes(10);
        let (store, rec) = stored(&data, 4);
        let chunks: Vec<Vec<u8>> = FileReader::new(store, rec)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(chunks, vec![data[..4].to_vec(), data[4..8].to_vec(), data[8..].to_vec()]);
    }

    #[test]
    fn read_flattens_chunks() {
        let data = sample_bytes(1000);
        let (store, rec) = stored(&data, 64);
        let mut out = Vec::new();
        FileReader::new(store, rec)
            .unwrap()
            .read_to_end(&mut out)
            .unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn each_open_restarts_at_zero() {
        let data = sample_bytes(9);
        let (store, rec) = stored(&data, 4);
        let mut first = FileReader::new(store.clone(), rec.clone()).unwrap();
        first.next().unwrap().unwrap();
        let mut second = FileReader::new(store, rec).unwrap();
        assert_eq!(second.next().unwrap().unwrap(), data[..4].to_vec());
    }

    #[test]
    fn pending_record_is_not_readable() {
        let store = Arc::new(MemChunkStore::new());
        let opts = StoreOptions::default();
        let w = StreamWriter::new(store.clone(), &opts).unwrap();
        let s = w.begin("wip", None).unwrap();
        let rec = store.get_metadata(s.id()).unwrap();
        assert!(matches!(
            FileReader::new(store.clone(), rec),
            Err(GridxError::FileNotFound(_))
        ));
    }

    #[test]
    fn store_read_error_propagates_and_fuses() {
        let store = FaultyStore::in_memory();
        let rec = StreamWriter::new(
            store.clone(),
            &StoreOptions {
                chunk_size: 4,
                ..Default::default()
            },
        )
        .unwrap()
        .write("f.bin", None, &sample_bytes(10)[..])
        .unwrap();

        let mut r = FileReader::new(store.clone(), rec).unwrap();
        assert!(r.next().unwrap().is_ok());
        store.faults.get_chunk.store(true, Ordering::SeqCst);
        assert!(matches!(r.next(), Some(Err(GridxError::Io(_)))));
        store.faults.get_chunk.store(false, Ordering::SeqCst);
        assert!(r.next().is_none());
    }

    #[test]
    fn missing_chunk_is_corrupt_and_fuses() {
        let (store, rec) = stored(&sample_bytes(12), 4);
        store.delete_chunks(&rec.id).unwrap();
        store.put_chunk(&rec.id, 0, &sample_bytes(4)).unwrap();

        let mut r = FileReader::new(store, rec).unwrap();
        assert!(r.next().unwrap().is_ok());
        assert!(matches!(r.next(), Some(Err(GridxError::CorruptFile { .. }))));
        assert!(r.next().is_none());
    }

    #[test]
    fn tampered_payload_fails_digest_before_eof() {
        let data = sample_bytes(8);
        let (store, rec) = stored(&data, 4);
        let mut bad = data[4..].to_vec();
        bad[0] ^= 0x55;
        store.put_chunk(&rec.id, 1, &bad).unwrap();

        let mut out = Vec::new();
        let err = FileReader::new(store, rec)
            .unwrap()
            .read_to_end(&mut out)
            .unwrap_err();
        assert!(err.to_string().contains("digest"), "{err}");
    }

    #[test]
    fn oversize_chunk_is_corrupt() {
        let (store, rec) = stored(&sample_bytes(8), 4);
        store.put_chunk(&rec.id, 0, &sample_bytes(5)).unwrap();
        let mut r = FileReader::new(store, rec).unwrap();
        assert!(matches!(r.next(), Some(Err(GridxError::CorruptFile { .. }))));
    }

    #[test]
    fn empty_file_yields_nothing() {
        let (store, rec) = stored(b"", 4);
        let mut r = FileReader::new(store, rec).unwrap();
        assert!(r.next().is_none());
    }
}
