use crate::error::{Result, StoreError};
use crate::reconstruct::ReadPolicy;
use std::path::PathBuf;

/// Legacy block size: 1 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 1 << 20;
pub const DEFAULT_ROOT: &str = "virtual_disks";

#[derive(Clone, Debug)]
pub struct StorageConfig {
    /// Holds `metadata.json`, `files_metadata.json` and one directory per disk.
    pub root: PathBuf,
    pub chunk_size: usize,
    pub read_policy: ReadPolicy,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            chunk_size: DEFAULT_CHUNK_SIZE,
            read_policy: ReadPolicy::Strict,
        }
    }
}

impl StorageConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), ..Default::default() }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_read_policy(mut self, policy: ReadPolicy) -> Self {
        self.read_policy = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(StoreError::InvalidChunkSize(self.chunk_size));
        }
        Ok(())
    }
}
