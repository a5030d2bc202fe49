use crate::chunk_store::ChunkStore;
use crate::disk::DiskRegistry;
use crate::error::Result;
use crate::fs::Backend;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiskUsage {
    pub name: String,
    pub declared_size: u64,
    pub used_bytes: u64,
    pub chunk_files: usize,
    /// False when the registry lists the disk but its directory is gone.
    pub present: bool,
}

/// Bytes actually held in each registered disk's directory.
pub fn disk_usage<F: Backend>(
    store: &ChunkStore<F>,
    registry: &DiskRegistry,
) -> Result<Vec<DiskUsage>> {
    registry
        .disks
        .iter()
        .map(|d| {
            let files = store.scan_disk(&d.name)?;
            Ok(DiskUsage {
                name: d.name.clone(),
                declared_size: d.size,
                used_bytes: files.iter().map(|f| f.len).sum(),
                chunk_files: files.len(),
                present: store.disk_exists(&d.name),
            })
        })
        .collect()
}
