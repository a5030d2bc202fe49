use crate::catalog::{FileRecord, LogicalChunk, Method};
use crate::chunk_store::ChunkStore;
use crate::error::{Result, StoreError};
use crate::fs::Backend;
use crate::hash::ChunkHash;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, warn};

/// What to do when a logical chunk has no readable copy.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReadPolicy {
    /// Fail the whole reconstruction with `ChunkUnavailable`.
    #[default]
    Strict,
    /// Skip the chunk and report it in [`Reconstruction::gaps`].
    Lenient,
}

/// A logical chunk that could not be read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Gap {
    pub index: u64,
    pub hash: ChunkHash,
}

#[derive(Clone, Debug, Default)]
pub struct Reconstruction {
    pub data: Vec<u8>,
    /// Empty unless the lenient policy skipped chunks. Non-empty means `data` is truncated.
    pub gaps: Vec<Gap>,
}

impl Reconstruction {
    pub fn is_complete(&self) -> bool {
        self.gaps.is_empty()
    }
}

/// Disks to try for one logical chunk: the recorded copies in order, then, for mirror,
/// the other disks of the record.
fn candidates<'a>(record: &'a FileRecord, chunk: &LogicalChunk<'a>) -> Vec<&'a str> {
    let mut out = chunk.replicas.clone();
    if record.method == Method::Mirror {
        for d in &record.disks {
            if !out.contains(&d.as_str()) {
                out.push(d.as_str());
            }
        }
    }
    out
}

/// Read one representative copy of a logical chunk. A copy whose bytes do not hash
/// to the recorded hash is treated as missing.
pub fn read_logical_chunk<F: Backend>(
    store: &ChunkStore<F>,
    record: &FileRecord,
    chunk: &LogicalChunk<'_>,
) -> Result<Option<Vec<u8>>> {
    for (attempt, disk) in candidates(record, chunk).into_iter().enumerate() {
        match store.get(disk, &chunk.hash)? {
            Some(buf) if chunk.hash.matches(&buf) => {
                if attempt > 0 {
                    warn!(file = %record.name, index = chunk.index, disk, "read chunk from fallback copy");
                } else {
                    debug!(file = %record.name, index = chunk.index, disk, "read chunk");
                }
                return Ok(Some(buf));
            }
            Some(_) => {
                warn!(file = %record.name, index = chunk.index, disk, "chunk copy fails hash check");
            }
            None => {
                debug!(file = %record.name, index = chunk.index, disk, "chunk copy missing");
            }
        }
    }
    Ok(None)
}

/// Stream a record's bytes into `out` in logical chunk order, one copy per chunk.
pub fn reconstruct_into<F: Backend, W: Write>(
    store: &ChunkStore<F>,
    record: &FileRecord,
    policy: ReadPolicy,
    out: &mut W,
) -> Result<Vec<Gap>> {
    let mut gaps = Vec::new();
    for chunk in record.logical_chunks()? {
        match read_logical_chunk(store, record, &chunk)? {
            Some(buf) => out
                .write_all(&buf)
                .map_err(|e| StoreError::io("write output", PathBuf::from(&record.name), e))?,
            None if policy == ReadPolicy::Strict => {
                return Err(StoreError::ChunkUnavailable {
                    file: record.name.clone(),
                    index: chunk.index,
                    hash: chunk.hash.to_hex(),
                });
            }
            None => {
                warn!(file = %record.name, index = chunk.index, chunk = %chunk.hash.short(), "skipping unavailable chunk");
                gaps.push(Gap { index: chunk.index, hash: chunk.hash });
            }
        }
    }
    Ok(gaps)
}

pub fn reconstruct<F: Backend>(
    store: &ChunkStore<F>,
    record: &FileRecord,
    policy: ReadPolicy,
) -> Result<Reconstruction> {
    let mut data = Vec::with_capacity(record.size as usize);
    let gaps = reconstruct_into(store, record, policy, &mut data)?;
    Ok(Reconstruction { data, gaps })
}
