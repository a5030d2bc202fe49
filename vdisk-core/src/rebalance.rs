use crate::catalog::{Catalog, ChunkRef, Method};
use crate::error::Result;
use crate::hash::ChunkHash;
use tracing::warn;

/// A logical chunk whose only recorded copy lived on the removed disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LostChunk {
    pub file_id: u64,
    pub file: String,
    pub index: u64,
    pub hash: ChunkHash,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RebalanceReport {
    pub disk: String,
    /// Records whose disk list or entries changed.
    pub files_updated: usize,
    /// Mirror entries dropped because another copy remains.
    pub entries_dropped: usize,
    /// Entries left pointing at the removed disk; their chunks are unrecoverable.
    pub stale_entries: usize,
    pub unrecoverable: Vec<LostChunk>,
    /// Chunk files found in the disk directory when it was deleted.
    pub chunk_files_deleted: usize,
    pub directory_removed: bool,
}

/// Rewrite every record that references `disk` so it no longer lists it.
///
/// Only bookkeeping changes; no chunk bytes are read, moved or copied. Stripe entries on
/// `disk` stay as stale pointers so the gap is detected at its index. Mirror entries on
/// `disk` are dropped when every logical chunk keeps another copy; otherwise they stay.
pub fn rebalance(catalog: &mut Catalog, disk: &str) -> Result<RebalanceReport> {
    let mut report = RebalanceReport { disk: disk.to_string(), ..Default::default() };
    for record in catalog.records.iter_mut().filter(|r| r.references(disk)) {
        // Legacy records derive the count from the disk list, which is about to shrink.
        record.chunk_count = record.logical_count();
        let mut lost = Vec::new();
        let mut all_covered = true;
        for chunk in record.logical_chunks()? {
            if chunk.replicas.iter().all(|d| *d == disk) {
                all_covered = false;
                lost.push(LostChunk {
                    file_id: record.id,
                    file: record.name.clone(),
                    index: chunk.index,
                    hash: chunk.hash,
                });
            }
        }

        let on_disk = record.chunks.iter().filter(|c| c.disk() == disk).count();
        if record.method == Method::Mirror && all_covered {
            record.chunks.retain(|c: &ChunkRef| c.disk() != disk);
            report.entries_dropped += on_disk;
        } else {
            report.stale_entries += on_disk;
        }
        record.disks.retain(|d| d != disk);

        if !lost.is_empty() {
            warn!(file = %record.name, id = record.id, disk, lost = lost.len(), "chunks left without a copy");
        }
        report.unrecoverable.extend(lost);
        report.files_updated += 1;
    }
    Ok(report)
}
