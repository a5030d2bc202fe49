use crate::catalog::FileRecord;
use crate::chunk_store::ChunkStore;
use crate::error::Result;
use crate::fs::Backend;
use crate::hash::merkle_root;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Logical chunks with at least one intact copy.
    pub chunks_ok: u64,
    /// Logical chunks with no intact copy.
    pub chunks_lost: u64,
    pub copies_ok: u64,
    pub copies_bad: u64,
    pub copies_missing: u64,
    /// `None` for records stored without a root.
    pub merkle_ok: Option<bool>,
}

impl VerifyReport {
    pub fn is_healthy(&self) -> bool {
        self.chunks_lost == 0 && self.copies_bad == 0 && self.merkle_ok != Some(false)
    }
}

/// Re-hash every recorded copy of every chunk of `record`.
pub fn verify<F: Backend>(store: &ChunkStore<F>, record: &FileRecord) -> Result<VerifyReport> {
    let mut report = VerifyReport::default();
    let mut hashes = Vec::new();
    for chunk in record.logical_chunks()? {
        let mut intact = false;
        for disk in &chunk.replicas {
            match store.get(disk, &chunk.hash)? {
                Some(buf) if chunk.hash.matches(&buf) => {
                    report.copies_ok += 1;
                    intact = true;
                }
                Some(_) => report.copies_bad += 1,
                None => report.copies_missing += 1,
            }
        }
        if intact {
            report.chunks_ok += 1;
        } else {
            report.chunks_lost += 1;
        }
        hashes.push(chunk.hash);
    }
    if !record.root_hex.is_empty() {
        report.merkle_ok = Some(merkle_root(&hashes).to_hex() == record.root_hex);
    }
    Ok(report)
}
