use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use gridx_core::error::{GridxError, Result};
use gridx_core::{Backend, FileRecord, NameMode, StoreOptions, Vault};

fn vault_from_args(store: PathBuf, opts: StoreOptions, zstd_level: Option<i32>) -> Result<Vault> {
    Vault::open(
        Backend::Fs {
            root: store,
            zstd_level,
        },
        opts,
    )
}

fn vault_at(store: PathBuf) -> Result<Vault> {
    vault_from_args(store, StoreOptions::default(), None)
}

pub fn handle_put(
    store: PathBuf,
    src: PathBuf,
    name: Option<String>,
    content_type: Option<String>,
    chunk_size: usize,
    naming: NameMode,
    zstd: Option<i32>,
) -> Result<()> {
    let opts = StoreOptions {
        chunk_size,
        naming,
        ..Default::default()
    };
    let vault = vault_from_args(store, opts, zstd)?;
    let rec = put_file(&vault, &src, name.as_deref(), content_type.as_deref())?;
    println!("{}", rec.id);
    eprintln!(
        "put: {} -> {} ({} bytes, {} chunks)",
        src.display(),
        rec.name,
        rec.size_bytes,
        rec.chunk_count
    );
    Ok(())
}

fn put_file(
    vault: &Vault,
    src: &Path,
    name: Option<&str>,
    content_type: Option<&str>,
) -> Result<FileRecord> {
    let hint = match name {
        Some(n) => n.to_owned(),
        None => src.to_string_lossy().into_owned(),
    };
    let file = File::open(src)?;
    vault.upload(&hint, content_type, file)
}

pub fn handle_ls(store: PathBuf, long: bool) -> Result<()> {
    let vault = vault_at(store)?;
    write_listing(&vault, long, &mut io::stdout().lock())
}

fn write_listing(vault: &Vault, long: bool, out: &mut impl Write) -> Result<()> {
    for rec in vault.list()? {
        if long {
            writeln!(
                out,
                "{}  {:>12}  {:<24}  {}",
                rec.id,
                rec.size_bytes,
                rec.content_type.as_deref().unwrap_or("-"),
                rec.name
            )?;
        } else {
            writeln!(out, "{}", rec.name)?;
        }
    }
    Ok(())
}

pub fn handle_cat(store: PathBuf, file: String) -> Result<()> {
    let vault = vault_at(store)?;
    copy_out(&vault, &file, &mut io::stdout().lock())
}

pub fn handle_get(store: PathBuf, file: String, out: PathBuf) -> Result<()> {
    let vault = vault_at(store)?;
    let mut dst = File::create(&out)?;
    copy_out(&vault, &file, &mut dst)?;
    dst.sync_all()?;
    eprintln!("get: {} -> {}", file, out.display());
    Ok(())
}

/// Chunk-by-chunk copy so core errors reach the caller untouched.
fn copy_out(vault: &Vault, id_or_name: &str, out: &mut impl Write) -> Result<()> {
    for chunk in vault.download(id_or_name)? {
        out.write_all(&chunk?)?;
    }
    out.flush()?;
    Ok(())
}

pub fn handle_rm(store: PathBuf, id: String) -> Result<()> {
    vault_at(store)?.delete(&id)?;
    eprintln!("rm: {}", id);
    Ok(())
}

pub fn handle_resolve(store: PathBuf, name: String) -> Result<()> {
    let id = vault_at(store)?.catalog().resolve_name(&name)?;
    println!("{}", id);
    Ok(())
}

pub fn handle_verify(store: PathBuf) -> Result<()> {
    let vault = vault_at(store)?;
    let (checked, failed) = verify_all(&vault)?;
    if failed > 0 {
        return Err(GridxError::Format(format!(
            "verify: {failed} of {checked} files failed"
        )));
    }
    eprintln!("verify: OK ({checked} files)");
    Ok(())
}

fn verify_all(vault: &Vault) -> Result<(usize, usize)> {
    let records = vault.list()?;
    let mut failed = 0;
    for rec in &records {
        if let Err(e) = copy_out(vault, rec.id.as_str(), &mut io::sink()) {
            eprintln!("verify: {} ({}): {}", rec.id, rec.name, e);
            failed += 1;
        }
    }
    Ok((records.len(), failed))
}

pub fn handle_stats(store: PathBuf) -> Result<()> {
    let s = vault_at(store)?.catalog().stats()?;
    println!("files:          {}", s.files);
    println!("pending:        {}", s.pending);
    println!("deleted:        {}", s.deleted);
    println!("chunks:         {}", s.chunks);
    println!("logical_bytes:  {}", s.logical_bytes);
    Ok(())
}

pub fn handle_sweep(store: PathBuf, grace_secs: u64) -> Result<()> {
    let report = vault_at(store)?
        .catalog()
        .sweep(Duration::from_secs(grace_secs))?;
    eprintln!(
        "sweep: removed {} records, {} orphaned chunk sets",
        report.records_removed, report.orphan_chunk_sets
    );
    Ok(())
}
