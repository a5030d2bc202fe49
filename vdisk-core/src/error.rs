//! Error taxonomy shared by every core operation.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    /// Store attempted with an empty target disk list.
    #[error("no disks available")]
    NoDisksAvailable,

    #[error("disk not found: {0}")]
    DiskNotFound(String),

    #[error("disk already exists: {0}")]
    DiskAlreadyExists(String),

    /// Disk names become directory names, so they must be a single plain component.
    #[error("invalid disk name: {0:?}")]
    InvalidDiskName(String),

    #[error("invalid disk size for {name}: {size}")]
    InvalidDiskSize { name: String, size: i64 },

    /// No readable copy exists for the logical chunk at `index`.
    #[error("chunk {index} ({hash}) of {file} unavailable")]
    ChunkUnavailable { file: String, index: u64, hash: String },

    #[error("invalid chunk size: {0}")]
    InvalidChunkSize(usize),

    #[error("invalid placement method: {0:?}")]
    InvalidMethod(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("corrupt file record {id} ({name}): {reason}")]
    CorruptRecord { id: u64, name: String, reason: String },

    #[error("metadata encoding: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("{op} {path:?}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io { op, path: path.into(), source }
    }

    /// Message code understood by [`crate::localize::FluentLoc`].
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::NoDisksAvailable => "err-no-disks",
            StoreError::DiskNotFound(_) => "err-disk-not-found",
            StoreError::DiskAlreadyExists(_) => "err-disk-exists",
            StoreError::InvalidDiskName(_) => "err-disk-name",
            StoreError::InvalidDiskSize { .. } => "err-disk-size",
            StoreError::ChunkUnavailable { .. } => "err-chunk-unavailable",
            StoreError::InvalidChunkSize(_) => "err-chunk-size",
            StoreError::InvalidMethod(_) => "err-invalid-method",
            StoreError::FileNotFound(_) => "err-file-not-found",
            StoreError::CorruptRecord { .. } => "err-corrupt-record",
            StoreError::Metadata(_) => "err-metadata",
            StoreError::Io { .. } => "err-io",
        }
    }

    /// Named arguments for the message returned by [`StoreError::code`].
    pub fn args(&self) -> Vec<(&'static str, String)> {
        match self {
            StoreError::NoDisksAvailable => vec![],
            StoreError::DiskNotFound(name)
            | StoreError::DiskAlreadyExists(name)
            | StoreError::InvalidDiskName(name) => vec![("name", name.clone())],
            StoreError::InvalidDiskSize { name, size } => {
                vec![("name", name.clone()), ("size", size.to_string())]
            }
            StoreError::ChunkUnavailable { file, index, hash } => vec![
                ("file", file.clone()),
                ("index", index.to_string()),
                ("hash", hash.chars().take(8).collect()),
            ],
            StoreError::InvalidChunkSize(size) => vec![("size", size.to_string())],
            StoreError::InvalidMethod(method) => vec![("method", method.clone())],
            StoreError::FileNotFound(name) => vec![("name", name.clone())],
            StoreError::CorruptRecord { id, name, reason } => vec![
                ("id", id.to_string()),
                ("name", name.clone()),
                ("reason", reason.clone()),
            ],
            StoreError::Metadata(e) => vec![("detail", e.to_string())],
            StoreError::Io { op, path, source } => vec![
                ("op", op.to_string()),
                ("path", path.display().to_string()),
                ("detail", source.to_string()),
            ],
        }
    }
}
