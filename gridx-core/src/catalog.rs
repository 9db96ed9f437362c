//! Catalog: listing, name resolution, deletion and garbage collection over a
//! chunk store.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::{FileRecord, FileStatus, now_nanos};
use crate::error::{GridxError, Result};
use crate::id::FileId;
use crate::stats::Stats;
use crate::store::SharedStore;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub records_removed: u64,
    pub orphan_chunk_sets: u64,
}

#[derive(Clone)]
pub struct Catalog {
    store: SharedStore,
}

impl Catalog {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Complete records in insertion order.
    pub fn list(&self) -> Result<Vec<FileRecord>> {
        Ok(self
            .store
            .list_metadata()?
            .into_iter()
            .filter(FileRecord::is_complete)
            .collect())
    }

    /// Most recently created complete file named `name`.
    pub fn resolve_name(&self, name: &str) -> Result<FileId> {
        self.resolve_record(name).map(|r| r.id)
    }

    fn resolve_record(&self, name: &str) -> Result<FileRecord> {
        // max_by_key keeps the last maximum, so later insertion wins ties.
        self.store
            .find_by_name(name)?
            .into_iter()
            .filter(FileRecord::is_complete)
            .max_by_key(|r| r.created_at)
            .ok_or_else(|| GridxError::FileNotFound(name.to_owned()))
    }

    /// Complete record for an id, falling back to a name lookup.
    pub fn lookup(&self, id_or_name: &str) -> Result<FileRecord> {
        if let Some(id) = FileId::parse(id_or_name) {
            match self.store.get_metadata(&id) {
                Ok(rec) if rec.is_complete() => return Ok(rec),
                Ok(_) | Err(GridxError::FileNotFound(_)) => {}
                Err(e) => return Err(e),
            }
        }
        self.resolve_record(id_or_name)
    }

    /// Tombstone, drop chunks, drop the record. Works on any status.
    pub fn delete(&self, id: &str) -> Result<()> {
        let id = FileId::parse(id).ok_or_else(|| GridxError::FileNotFound(id.to_owned()))?;
        let mut record = self.store.get_metadata(&id)?;
        if record.status != FileStatus::Deleted {
            record.mark_deleted()?;
            self.store.put_metadata(&record)?;
        }
        self.store.delete_chunks(&id)?;
        if let Err(e) = self.store.delete_metadata(&id) {
            tracing::warn!(%id, error = %e, "record left as tombstone");
            return Err(e);
        }
        tracing::info!(%id, name = %record.name, "file deleted");
        Ok(())
    }

    /// Reclaim tombstones, pending records idle for longer than
    /// `pending_older_than`, and chunk sets nobody owns.
    pub fn sweep(&self, pending_older_than: Duration) -> Result<SweepReport> {
        let grace = i64::try_from(pending_older_than.as_nanos()).unwrap_or(i64::MAX);
        let cutoff = now_nanos().saturating_sub(grace);
        let mut report = SweepReport::default();

        let records = self.store.list_metadata()?;
        let mut owned: HashSet<FileId> = HashSet::with_capacity(records.len());
        for rec in records {
            let stale = match rec.status {
                FileStatus::Deleted => true,
                FileStatus::Pending => rec.last_activity() < cutoff,
                FileStatus::Complete => false,
            };
            if !stale {
                owned.insert(rec.id);
                continue;
            }
            self.store.delete_chunks(&rec.id)?;
            self.store.delete_metadata(&rec.id)?;
            tracing::debug!(id = %rec.id, status = ?rec.status, "swept record");
            report.records_removed += 1;
        }

        for owner in self.store.chunk_owners()? {
            if owned.contains(&owner) {
                continue;
            }
            // An upload may have started after the listing above.
            match self.store.get_metadata(&owner) {
                Ok(_) => continue,
                Err(GridxError::FileNotFound(_)) => {}
                Err(e) => return Err(e),
            }
            self.store.delete_chunks(&owner)?;
            tracing::debug!(id = %owner, "swept orphan chunks");
            report.orphan_chunk_sets += 1;
        }

        if report != SweepReport::default() {
            tracing::info!(
                records = report.records_removed,
                orphans = report.orphan_chunk_sets,
                "sweep finished"
            );
        }
        Ok(report)
    }

    pub fn stats(&self) -> Result<Stats> {
        let mut stats = Stats::default();
        for rec in self.store.list_metadata()? {
            match rec.status {
                FileStatus::Complete => {
                    stats.files += 1;
                    stats.chunks += rec.chunk_count;
                    stats.logical_bytes += rec.size_bytes;
                }
                FileStatus::Pending => stats.pending += 1,
                FileStatus::Deleted => stats.deleted += 1,
            }
        }
        Ok(stats)
    }
}
