use crate::catalog::{Catalog, FileRecord};
use crate::disk::DiskRegistry;
use crate::error::{Result, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

pub const REGISTRY_FILE: &str = "metadata.json";
pub const CATALOG_FILE: &str = "files_metadata.json";

/// Whole-document load/save of the disk registry and the file catalog.
///
/// Every save replaces the entire document. Callers serialize access; there is no locking.
pub trait MetadataStore {
    fn load_registry(&self) -> Result<DiskRegistry>;
    fn save_registry(&mut self, registry: &DiskRegistry) -> Result<()>;
    fn load_catalog(&self) -> Result<Catalog>;

    /// Overwrite-all.
    fn save_catalog(&mut self, catalog: &Catalog) -> Result<()>;

    /// Append-one.
    fn append_record(&mut self, record: &FileRecord) -> Result<()> {
        let mut catalog = self.load_catalog()?;
        catalog.records.push(record.clone());
        self.save_catalog(&catalog)
    }
}

/// Pretty JSON documents under a root directory, replaced atomically on save.
#[derive(Clone, Debug)]
pub struct JsonMetadataStore {
    root: PathBuf,
}

impl JsonMetadataStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn registry_path(&self) -> PathBuf {
        self.root.join(REGISTRY_FILE)
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.root.join(CATALOG_FILE)
    }
}

fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    let f = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(StoreError::io("open", path, e)),
    };
    Ok(serde_json::from_reader(BufReader::new(f))?)
}

/// Write to a sibling temp file, sync, then rename over the target.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| StoreError::io("create dir", dir, e))?;
    let body = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    let mut f = File::create(&tmp).map_err(|e| StoreError::io("create", &tmp, e))?;
    f.write_all(&body).map_err(|e| StoreError::io("write", &tmp, e))?;
    f.sync_all().map_err(|e| StoreError::io("sync", &tmp, e))?;
    drop(f);
    fs::rename(&tmp, path).map_err(|e| StoreError::io("rename", path, e))
}

impl MetadataStore for JsonMetadataStore {
    fn load_registry(&self) -> Result<DiskRegistry> {
        read_json(&self.registry_path())
    }

    fn save_registry(&mut self, registry: &DiskRegistry) -> Result<()> {
        write_json_atomic(&self.registry_path(), registry)
    }

    fn load_catalog(&self) -> Result<Catalog> {
        read_json(&self.catalog_path())
    }

    fn save_catalog(&mut self, catalog: &Catalog) -> Result<()> {
        write_json_atomic(&self.catalog_path(), catalog)
    }
}

/// In-memory documents, for tests and for hosts that persist elsewhere.
#[derive(Clone, Debug, Default)]
pub struct MemoryMetadataStore {
    pub registry: DiskRegistry,
    pub catalog: Catalog,
}

impl MetadataStore for MemoryMetadataStore {
    fn load_registry(&self) -> Result<DiskRegistry> {
        Ok(self.registry.clone())
    }

    fn save_registry(&mut self, registry: &DiskRegistry) -> Result<()> {
        self.registry = registry.clone();
        Ok(())
    }

    fn load_catalog(&self) -> Result<Catalog> {
        Ok(self.catalog.clone())
    }

    fn save_catalog(&mut self, catalog: &Catalog) -> Result<()> {
        self.catalog = catalog.clone();
        Ok(())
    }

    fn append_record(&mut self, record: &FileRecord) -> Result<()> {
        self.catalog.records.push(record.clone());
        Ok(())
    }
}
