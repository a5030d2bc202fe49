use crate::catalog::{Catalog, ChunkRef, FileRecord, Method};
use crate::chunk_store::ChunkStore;
use crate::config::StorageConfig;
use crate::disk::{Disk, DiskRegistry};
use crate::error::{Result, StoreError};
use crate::fs::{Backend, LocalFs};
use crate::hash::{merkle_root, ChunkHash};
use crate::metadata::{JsonMetadataStore, MetadataStore};
use crate::placement::Placer;
use crate::rebalance::{rebalance, RebalanceReport};
use crate::reconstruct::{self, Gap, ReadPolicy, Reconstruction};
use crate::usage::{disk_usage, DiskUsage};
use crate::verify::{self, VerifyReport};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Disks, files and chunks under one root.
///
/// Operations are synchronous and assume the caller runs one at a time.
pub struct Storage<M: MetadataStore = JsonMetadataStore, F: Backend = LocalFs> {
    config: StorageConfig,
    meta: M,
    chunks: ChunkStore<F>,
}

impl Storage {
    /// JSON metadata and chunk directories under `config.root`.
    pub fn open(config: StorageConfig) -> Result<Self> {
        let meta = JsonMetadataStore::new(&config.root);
        Self::with_parts(config, meta, LocalFs)
    }
}

impl<M: MetadataStore, F: Backend> Storage<M, F> {
    pub fn with_parts(config: StorageConfig, meta: M, fs: F) -> Result<Self> {
        config.validate()?;
        let chunks = ChunkStore::new(config.root.clone(), fs);
        Ok(Self { config, meta, chunks })
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn metadata(&self) -> &M {
        &self.meta
    }

    pub fn chunk_store(&self) -> &ChunkStore<F> {
        &self.chunks
    }

    pub fn list_disks(&self) -> Result<Vec<Disk>> {
        Ok(self.meta.load_registry()?.disks)
    }

    pub fn add_disk(&mut self, name: &str, size: i64) -> Result<Disk> {
        let mut registry = self.meta.load_registry()?;
        let disk = registry.add(name, size)?.clone();
        let fresh = !self.chunks.disk_exists(name);
        self.chunks.create_disk(name)?;
        if let Err(e) = self.meta.save_registry(&registry) {
            if fresh {
                self.discard_disk_dir(name);
            }
            return Err(e);
        }
        info!(disk = name, size = disk.size, "disk added");
        Ok(disk)
    }

    /// Register several disks at once. Names already registered are skipped; every
    /// new entry is validated before anything is created.
    pub fn init_disks(&mut self, specs: &[(String, i64)]) -> Result<Vec<Disk>> {
        let mut registry = self.meta.load_registry()?;
        let mut added = Vec::new();
        for (name, size) in specs {
            if registry.contains(name) {
                info!(disk = %name, "disk already registered, skipping");
                continue;
            }
            added.push(registry.add(name, *size)?.clone());
        }
        let mut created = Vec::new();
        let mut result = Ok(());
        for disk in &added {
            let fresh = !self.chunks.disk_exists(&disk.name);
            result = self.chunks.create_disk(&disk.name);
            if result.is_err() {
                break;
            }
            if fresh {
                created.push(disk.name.as_str());
            }
        }
        if result.is_ok() && !added.is_empty() {
            result = self.meta.save_registry(&registry);
        }
        if let Err(e) = result {
            for name in created {
                self.discard_disk_dir(name);
            }
            return Err(e);
        }
        Ok(added)
    }

    /// Undo a directory created for a disk whose registration did not persist.
    fn discard_disk_dir(&self, name: &str) {
        if let Err(e) = self.chunks.destroy_disk(name) {
            warn!(disk = name, error = %e, "could not remove directory of unregistered disk");
        }
    }

    /// Unregister a disk, rewrite the records that referenced it, then delete its
    /// directory.
    ///
    /// Metadata is committed before any chunk file is deleted. If the registry cannot be
    /// saved, the previous catalog is written back and nothing is deleted.
    pub fn remove_disk(&mut self, name: &str) -> Result<RebalanceReport> {
        let mut registry = self.meta.load_registry()?;
        registry.remove(name)?;
        let original = self.catalog()?;
        let mut catalog = original.clone();
        let mut report = rebalance(&mut catalog, name)?;

        if report.files_updated > 0 {
            self.meta.save_catalog(&catalog)?;
        }
        if let Err(e) = self.meta.save_registry(&registry) {
            if report.files_updated > 0 {
                if let Err(restore) = self.meta.save_catalog(&original) {
                    warn!(disk = name, error = %restore, "catalog restore failed");
                }
            }
            return Err(e);
        }

        report.chunk_files_deleted = match self.chunks.scan_disk(name) {
            Ok(files) => files.len(),
            Err(e) => {
                warn!(disk = name, error = %e, "could not scan disk before deletion");
                0
            }
        };
        report.directory_removed = self.chunks.destroy_disk(name)?;
        info!(
            disk = name,
            files = report.files_updated,
            dropped = report.entries_dropped,
            stale = report.stale_entries,
            lost = report.unrecoverable.len(),
            "disk removed"
        );
        Ok(report)
    }

    pub fn list_files(&self) -> Result<Vec<FileRecord>> {
        Ok(self.catalog()?.records)
    }

    pub fn file(&self, id: u64) -> Result<FileRecord> {
        self.catalog()?.get(id).cloned().ok_or_else(|| StoreError::FileNotFound(id.to_string()))
    }

    /// Look a record up by numeric id, else by name. With duplicate names the most
    /// recently stored record wins.
    ///
    /// A numeric selector that matches an id shadows a file of that name; use
    /// [`Storage::find_by_name`] to reach it.
    pub fn find(&self, selector: &str) -> Result<FileRecord> {
        let catalog = self.catalog()?;
        if let Ok(id) = selector.parse::<u64>() {
            if let Some(r) = catalog.get(id) {
                return Ok(r.clone());
            }
        }
        catalog
            .by_name(selector)
            .last()
            .cloned()
            .ok_or_else(|| StoreError::FileNotFound(selector.to_string()))
    }

    /// Latest record stored under `name`, never interpreting it as an id.
    pub fn find_by_name(&self, name: &str) -> Result<FileRecord> {
        self.catalog()?
            .by_name(name)
            .last()
            .cloned()
            .ok_or_else(|| StoreError::FileNotFound(name.to_string()))
    }

    /// Store `data` across every registered disk, in registry order.
    pub fn store(&mut self, name: &str, data: &[u8], method: Method) -> Result<FileRecord> {
        self.store_reader(name, data, None, method)
    }

    /// Store `data` across the named disks, in the given order.
    pub fn store_on(
        &mut self,
        name: &str,
        data: &[u8],
        disks: &[String],
        method: Method,
    ) -> Result<FileRecord> {
        self.store_reader(name, data, Some(disks), method)
    }

    /// Store a local file under its base name.
    pub fn store_path(
        &mut self,
        path: &Path,
        disks: Option<&[String]>,
        method: Method,
    ) -> Result<FileRecord> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| StoreError::FileNotFound(path.display().to_string()))?;
        let f = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => StoreError::FileNotFound(path.display().to_string()),
            _ => StoreError::io("open", path, e),
        })?;
        self.store_reader(&name, f, disks, method)
    }

    /// Chunk `reader`, write every chunk to its assigned disks and append the record.
    ///
    /// A failed chunk write aborts the store and is returned; chunks written before it
    /// stay on disk and no record is appended.
    pub fn store_reader<R: Read>(
        &mut self,
        name: &str,
        mut reader: R,
        disks: Option<&[String]>,
        method: Method,
    ) -> Result<FileRecord> {
        let registry = self.meta.load_registry()?;
        let targets = select_disks(&registry, disks)?;
        let mut placer = Placer::new(&targets, method)?;

        let mut refs: Vec<ChunkRef> = Vec::new();
        let mut hashes = Vec::new();
        let mut size = 0u64;
        let mut buf = vec![0u8; self.config.chunk_size];
        loop {
            let n = read_full(&mut reader, &mut buf).map_err(|e| StoreError::io("read", name, e))?;
            if n == 0 {
                break;
            }
            let chunk = &buf[..n];
            let hash = ChunkHash::of(chunk);
            for a in placer.assign(hash) {
                self.chunks.put(&a.disk, &a.hash, chunk)?;
                refs.push(ChunkRef::from(&a));
            }
            hashes.push(hash);
            size += n as u64;
            if n < buf.len() {
                break;
            }
        }

        let mut catalog = self.meta.load_catalog()?;
        let renumbered = catalog.assign_missing_ids();
        let record = FileRecord {
            id: catalog.next_id(),
            name: name.to_string(),
            chunks: refs,
            disks: placer.disks().to_vec(),
            method,
            size,
            chunk_size: self.config.chunk_size,
            chunk_count: placer.chunk_count(),
            root_hex: merkle_root(&hashes).to_hex(),
            created_utc: chrono::Utc::now().to_rfc3339(),
        };
        if renumbered {
            catalog.records.push(record.clone());
            self.meta.save_catalog(&catalog)?;
        } else {
            self.meta.append_record(&record)?;
        }
        info!(
            file = name,
            id = record.id,
            %method,
            bytes = size,
            chunks = record.chunk_count,
            "file stored"
        );
        Ok(record)
    }

    /// Reassemble a record using the configured read policy.
    pub fn reconstruct(&self, record: &FileRecord) -> Result<Reconstruction> {
        self.reconstruct_with(record, self.config.read_policy)
    }

    pub fn reconstruct_with(&self, record: &FileRecord, policy: ReadPolicy) -> Result<Reconstruction> {
        reconstruct::reconstruct(&self.chunks, record, policy)
    }

    /// Reassemble a record into `<out_dir>/<name>`; returns the path and any gaps.
    pub fn retrieve_to(
        &self,
        record: &FileRecord,
        out_dir: &Path,
        policy: ReadPolicy,
    ) -> Result<(PathBuf, Vec<Gap>)> {
        std::fs::create_dir_all(out_dir).map_err(|e| StoreError::io("create dir", out_dir, e))?;
        let file_name = Path::new(&record.name)
            .file_name()
            .ok_or_else(|| StoreError::FileNotFound(record.name.clone()))?;
        let path = out_dir.join(file_name);
        let mut out = std::io::BufWriter::new(
            File::create(&path).map_err(|e| StoreError::io("create", &path, e))?,
        );
        let written = reconstruct::reconstruct_into(&self.chunks, record, policy, &mut out)
            .and_then(|gaps| {
                std::io::Write::flush(&mut out).map_err(|e| StoreError::io("write", &path, e))?;
                Ok(gaps)
            });
        match written {
            Ok(gaps) => Ok((path, gaps)),
            Err(e) => {
                drop(out);
                // No partial output is left behind on failure.
                if let Err(rm) = std::fs::remove_file(&path) {
                    warn!(path = %path.display(), error = %rm, "could not remove partial output");
                }
                Err(e)
            }
        }
    }

    pub fn verify(&self, record: &FileRecord) -> Result<VerifyReport> {
        verify::verify(&self.chunks, record)
    }

    pub fn usage(&self) -> Result<Vec<DiskUsage>> {
        disk_usage(&self.chunks, &self.meta.load_registry()?)
    }

    fn catalog(&self) -> Result<Catalog> {
        let mut catalog = self.meta.load_catalog()?;
        catalog.assign_missing_ids();
        Ok(catalog)
    }
}

/// Target disks for a store: the named ones in the caller's order (duplicates dropped),
/// or every registered disk.
fn select_disks(registry: &DiskRegistry, names: Option<&[String]>) -> Result<Vec<Disk>> {
    match names {
        None => Ok(registry.disks.clone()),
        Some(names) => {
            let mut unique: Vec<String> = Vec::with_capacity(names.len());
            for n in names {
                if !unique.contains(n) {
                    unique.push(n.clone());
                }
            }
            registry.resolve(&unique)
        }
    }
}

/// Fill `buf` unless EOF comes first; returns bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
