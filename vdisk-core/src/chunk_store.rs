use crate::error::Result;
use crate::fs::{Backend, FileInfo, LocalFs};
use crate::hash::ChunkHash;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Chunk bytes on disk: one file per (disk, hash) at `<root>/<disk>/<hex hash>`.
#[derive(Clone, Debug)]
pub struct ChunkStore<F: Backend = LocalFs> {
    root: PathBuf,
    fs: F,
}

impl ChunkStore<LocalFs> {
    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self::new(root, LocalFs)
    }
}

impl<F: Backend> ChunkStore<F> {
    pub fn new(root: impl Into<PathBuf>, fs: F) -> Self {
        Self { root: root.into(), fs }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn disk_dir(&self, disk: &str) -> PathBuf {
        self.root.join(disk)
    }

    pub fn chunk_path(&self, disk: &str, hash: &ChunkHash) -> PathBuf {
        self.disk_dir(disk).join(hash.to_hex())
    }

    pub fn create_disk(&self, disk: &str) -> Result<()> {
        self.fs.create_dir(&self.disk_dir(disk))
    }

    pub fn disk_exists(&self, disk: &str) -> bool {
        self.fs.exists(&self.disk_dir(disk))
    }

    /// Write a chunk. Same hash on same disk rewrites identical bytes.
    pub fn put(&self, disk: &str, hash: &ChunkHash, bytes: &[u8]) -> Result<()> {
        let path = self.chunk_path(disk, hash);
        self.fs.write(&path, bytes)?;
        debug!(disk, chunk = %hash.short(), len = bytes.len(), "chunk written");
        Ok(())
    }

    /// `Ok(None)` when the chunk file is absent (disk removed or file deleted).
    pub fn get(&self, disk: &str, hash: &ChunkHash) -> Result<Option<Vec<u8>>> {
        self.fs.read(&self.chunk_path(disk, hash))
    }

    pub fn contains(&self, disk: &str, hash: &ChunkHash) -> bool {
        self.fs.exists(&self.chunk_path(disk, hash))
    }

    /// Delete a disk directory and every chunk in it.
    pub fn destroy_disk(&self, disk: &str) -> Result<bool> {
        self.fs.remove_dir_all(&self.disk_dir(disk))
    }

    pub fn scan_disk(&self, disk: &str) -> Result<Vec<FileInfo>> {
        self.fs.scan(&self.disk_dir(disk))
    }
}
