pub mod catalog;
pub mod chunk_store;
pub mod config;
pub mod disk;
pub mod error;
pub mod fs;
pub mod hash;
pub mod localize;
pub mod metadata;
pub mod placement;
pub mod rebalance;
pub mod reconstruct;
pub mod storage;
pub mod usage;
pub mod verify;

pub use catalog::{Catalog, ChunkRef, FileRecord, Method};
pub use config::StorageConfig;
pub use disk::{Disk, DiskRegistry};
pub use error::{Result, StoreError};
pub use reconstruct::{ReadPolicy, Reconstruction};
pub use storage::Storage;
