use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use gridx_core::testing::{FailingReader, FaultyStore, sample_bytes};
use gridx_core::{
    Backend, FileStatus, GridxError, NameMode, SharedStore, StoreOptions, Vault,
};
use tempfile::TempDir;

const C: usize = 4;

fn opts() -> StoreOptions {
    StoreOptions {
        chunk_size: C,
        ..Default::default()
    }
}

/// Runs `check` once per backend. The temp dir lives until `check` returns.
fn on_each_backend(check: impl Fn(&Vault)) {
    let mem = Vault::open(Backend::Memory, opts()).unwrap();
    check(&mem);

    let dir = TempDir::new().unwrap();
    let fs = Vault::open(
        Backend::Fs {
            root: dir.path().to_path_buf(),
            zstd_level: Some(3),
        },
        opts(),
    )
    .unwrap();
    check(&fs);
}

fn read_all(vault: &Vault, id_or_name: &str) -> gridx_core::Result<Vec<u8>> {
    let mut out = Vec::new();
    for chunk in vault.download(id_or_name)? {
        out.extend_from_slice(&chunk?);
    }
    Ok(out)
}

#[test]
fn round_trip_various_lengths() {
    on_each_backend(|v| {
        for len in [0usize, 1, 3, 4, 5, 8, 100, 1023] {
            let data = sample_bytes(len);
            let rec = v.upload("blob.bin", None, &data[..]).unwrap();
            assert_eq!(rec.size_bytes, len as u64);
            assert_eq!(rec.chunk_count, len.div_ceil(C) as u64);
            assert_eq!(read_all(v, rec.id.as_str()).unwrap(), data);
        }
    });
}

#[test]
fn ten_bytes_make_three_chunks() {
    on_each_backend(|v| {
        let rec = v.upload("ten", None, &sample_bytes(10)[..]).unwrap();
        let lens: Vec<usize> = v
            .download(rec.id.as_str())
            .unwrap()
            .map(|c| c.unwrap().len())
            .collect();
        assert_eq!(lens, vec![4, 4, 2]);
        assert_eq!(rec.size_bytes, 10);
    });
}

#[test]
fn delete_removes_everything() {
    on_each_backend(|v| {
        let rec = v.upload("x.txt", None, &sample_bytes(9)[..]).unwrap();
        v.delete(rec.id.as_str()).unwrap();
        assert!(matches!(
            v.store().get_metadata(&rec.id),
            Err(GridxError::FileNotFound(_))
        ));
        assert!(matches!(
            v.store().get_chunk(&rec.id, 0),
            Err(GridxError::ChunkNotFound { .. })
        ));
        assert!(v.download("x.txt").is_err());
        assert!(matches!(
            v.delete(rec.id.as_str()),
            Err(GridxError::FileNotFound(_))
        ));
    });
}

#[test]
fn list_shows_only_complete_in_upload_order() {
    on_each_backend(|v| {
        let a = v.upload("a", None, &b"aaaa"[..]).unwrap();
        let _pending = v.begin_upload("p", None).unwrap();
        let b = v.upload("b", None, &b"bb"[..]).unwrap();
        let listed = v.list().unwrap();
        assert_eq!(listed, vec![a, b]);
        assert!(listed.iter().all(|r| r.status == FileStatus::Complete));
    });
}

#[test]
fn duplicate_names_resolve_to_latest() {
    on_each_backend(|v| {
        let _old = v.upload("report.pdf", None, &b"old"[..]).unwrap();
        let new = v.upload("report.pdf", None, &b"newer"[..]).unwrap();
        assert_eq!(v.catalog().resolve_name("report.pdf").unwrap(), new.id);
        assert_eq!(read_all(v, "report.pdf").unwrap(), b"newer");
    });
}

#[test]
fn missing_name_is_not_found() {
    on_each_backend(|v| {
        assert!(matches!(
            v.download("missing.txt"),
            Err(GridxError::FileNotFound(_))
        ));
    });
}

#[test]
fn interrupted_source_leaves_nothing_behind() {
    on_each_backend(|v| {
        let err = v
            .upload("cut.bin", None, FailingReader::new(sample_bytes(12), 5))
            .unwrap_err();
        let GridxError::UploadFailed { id, .. } = err else {
            panic!("unexpected error: {err}");
        };
        assert!(v.list().unwrap().is_empty());
        assert!(v.store().chunk_owners().unwrap().is_empty());
        assert!(v.store().get_metadata(&id).is_err());
    });
}

#[test]
fn ids_name_files_when_asked() {
    let v = Vault::open(
        Backend::Memory,
        StoreOptions {
            naming: NameMode::IdExt,
            ..opts()
        },
    )
    .unwrap();
    let rec = v.upload("scan.pdf", Some("application/pdf"), &b"%PDF"[..]).unwrap();
    assert_eq!(rec.name, format!("{}.pdf", rec.id));
    assert_eq!(rec.content_type.as_deref(), Some("application/pdf"));
    assert_eq!(v.download(&rec.name).unwrap().record().id, rec.id);
}

#[test]
fn failed_record_removal_keeps_tombstone() {
    let faulty = FaultyStore::in_memory();
    let store: SharedStore = faulty.clone();
    let v = Vault::new(store, opts()).unwrap();
    let rec = v.upload("t", None, &b"0123456789"[..]).unwrap();

    faulty.faults.delete_metadata.store(true, Ordering::SeqCst);
    assert!(v.delete(rec.id.as_str()).is_err());
    assert_eq!(
        v.store().get_metadata(&rec.id).unwrap().status,
        FileStatus::Deleted
    );
    assert!(v.store().chunk_owners().unwrap().is_empty());

    faulty.faults.delete_metadata.store(false, Ordering::SeqCst);
    let report = v.catalog().sweep(Duration::ZERO).unwrap();
    assert_eq!(report.records_removed, 1);
    assert!(v.store().list_metadata().unwrap().is_empty());
}

#[test]
fn missing_chunk_surfaces_as_corrupt() {
    on_each_backend(|v| {
        let rec = v.upload("holey", None, &sample_bytes(12)[..]).unwrap();
        v.store().delete_chunks(&rec.id).unwrap();
        let mut reader = v.download(rec.id.as_str()).unwrap();
        assert!(matches!(
            reader.next(),
            Some(Err(GridxError::CorruptFile { .. }))
        ));
        assert!(reader.next().is_none());
    });
}

#[test]
fn damaged_chunk_file_surfaces_as_corrupt() {
    let dir = TempDir::new().unwrap();
    let v = Vault::open(
        Backend::Fs {
            root: dir.path().to_path_buf(),
            zstd_level: None,
        },
        opts(),
    )
    .unwrap();
    let rec = v.upload("d", None, &sample_bytes(8)[..]).unwrap();
    let path = dir
        .path()
        .join("chunks")
        .join(rec.id.shard())
        .join(rec.id.as_str())
        .join(format!("{:016x}.chunk", 1));
    let mut bytes = std::fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    std::fs::write(&path, bytes).unwrap();

    let mut out = Vec::new();
    let err = v
        .download(rec.id.as_str())
        .unwrap()
        .read_to_end(&mut out)
        .unwrap_err();
    assert!(err.to_string().contains("corrupt"), "{err}");
}

#[test]
fn sweep_collects_orphans_on_both_backends() {
    on_each_backend(|v| {
        let keep = v.upload("keep", None, &b"data"[..]).unwrap();
        let orphan = gridx_core::FileId::parse("0123456789abcdef").unwrap();
        v.store().put_chunk(&orphan, 0, b"lost").unwrap();

        let report = v.catalog().sweep(Duration::from_secs(3600)).unwrap();
        assert_eq!(report.orphan_chunk_sets, 1);
        assert_eq!(v.store().chunk_owners().unwrap(), vec![keep.id.clone()]);
        assert_eq!(read_all(v, keep.id.as_str()).unwrap(), b"data");
    });
}

#[test]
fn reopened_fs_store_sees_previous_files() {
    let dir = TempDir::new().unwrap();
    let backend = Backend::Fs {
        root: dir.path().to_path_buf(),
        zstd_level: Some(1),
    };
    let rec = Vault::open(backend.clone(), opts())
        .unwrap()
        .upload("kept.txt", None, &sample_bytes(33)[..])
        .unwrap();

    let again = Vault::open(backend, opts()).unwrap();
    assert_eq!(again.list().unwrap(), vec![rec]);
    assert_eq!(read_all(&again, "kept.txt").unwrap(), sample_bytes(33));
}

#[test]
fn vault_rejects_bad_options() {
    let store: SharedStore = Arc::new(gridx_core::store::MemChunkStore::new());
    let bad = StoreOptions {
        chunk_size: 0,
        ..Default::default()
    };
    assert!(matches!(
        Vault::new(store.clone(), bad),
        Err(GridxError::Config(_))
    ));
    let huge = StoreOptions {
        chunk_size: gridx_core::options::MAX_CHUNK_SIZE + 1,
        ..Default::default()
    };
    assert!(matches!(
        Vault::new(store, huge),
        Err(GridxError::Config(_))
    ));
}

#[test]
fn concurrent_uploads_and_deletes_stay_consistent() {
    on_each_backend(|v| {
        let kept: Vec<Vec<_>> = std::thread::scope(|s| {
            let workers: Vec<_> = (0..4usize)
                .map(|t| {
                    s.spawn(move || {
                        let mut kept = Vec::new();
                        for i in 0..12usize {
                            let data = sample_bytes(t * 17 + i * 5);
                            let name = format!("t{t}-{i}.bin");
                            let rec = v.upload(&name, None, &data[..]).unwrap();
                            if i % 2 == 0 {
                                v.delete(rec.id.as_str()).unwrap();
                            } else {
                                kept.push((rec.id, data));
                            }
                        }
                        kept
                    })
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });
        let kept: Vec<_> = kept.into_iter().flatten().collect();

        let mut listed: Vec<_> = v.list().unwrap().into_iter().map(|r| r.id).collect();
        let mut expected: Vec<_> = kept.iter().map(|(id, _)| id.clone()).collect();
        listed.sort();
        expected.sort();
        assert_eq!(listed, expected);
        assert_eq!(v.store().list_metadata().unwrap().len(), kept.len());

        for (id, data) in &kept {
            assert_eq!(&read_all(v, id.as_str()).unwrap(), data);
        }
        let report = v.catalog().sweep(Duration::from_secs(3600)).unwrap();
        assert_eq!(report, gridx_core::SweepReport::default());
    });
}
