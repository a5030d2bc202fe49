use crate::error::{Result, StoreError};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// A file found under a directory by [`Backend::scan`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub len: u64,
}

/// Filesystem operations the chunk store needs.
pub trait Backend {
    fn create_dir(&self, path: &Path) -> Result<()>;
    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()>;
    /// `Ok(None)` when nothing exists at `path`.
    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>>;
    fn exists(&self, path: &Path) -> bool;
    /// Recursively delete; `Ok(false)` when the directory was already gone.
    fn remove_dir_all(&self, path: &Path) -> Result<bool>;
    /// Regular files below `path`, recursively. Empty when `path` does not exist.
    fn scan(&self, path: &Path) -> Result<Vec<FileInfo>>;
}

/// The local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFs;

impl Backend for LocalFs {
    fn create_dir(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).map_err(|e| StoreError::io("create dir", path, e))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        fs::write(path, bytes).map_err(|e| StoreError::io("write", path, e))
    }

    fn read(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match fs::read(path) {
            Ok(buf) => Ok(Some(buf)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io("read", path, e)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn remove_dir_all(&self, path: &Path) -> Result<bool> {
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io("remove dir", path, e)),
        }
    }

    fn scan(&self, path: &Path) -> Result<Vec<FileInfo>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for ent in walkdir::WalkDir::new(path).min_depth(1) {
            let ent = ent.map_err(|e| {
                let p = e.path().unwrap_or(path).to_path_buf();
                StoreError::io("walk", p, e.into())
            })?;
            if !ent.file_type().is_file() {
                continue;
            }
            let len = ent.metadata().map_err(|e| StoreError::io("stat", ent.path(), e.into()))?.len();
            out.push(FileInfo { name: ent.file_name().to_string_lossy().to_string(), len });
        }
        Ok(out)
    }
}
