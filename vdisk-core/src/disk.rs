use crate::error::{Result, StoreError};
use crate::metadata::{CATALOG_FILE, REGISTRY_FILE};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(from = "DiskEntry")]
pub struct Disk {
    pub name: String,
    /// Declared capacity in bytes. Informational, never enforced.
    pub size: u64,
}

/// Registries written by the older tool list bare names; their size loads as 0.
#[derive(Deserialize)]
#[serde(untagged)]
enum DiskEntry {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        size: u64,
    },
}

impl From<DiskEntry> for Disk {
    fn from(e: DiskEntry) -> Self {
        match e {
            DiskEntry::Name(name) => Disk { name, size: 0 },
            DiskEntry::Full { name, size } => Disk { name, size },
        }
    }
}

/// Persisted as `{ "disks": [ { "name": .., "size": .. }, .. ] }`, order preserving.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct DiskRegistry {
    #[serde(default)]
    pub disks: Vec<Disk>,
}

impl DiskRegistry {
    pub fn get(&self, name: &str) -> Option<&Disk> {
        self.disks.iter().find(|d| d.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        self.disks.iter().map(|d| d.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.disks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.disks.len()
    }

    /// Append a disk. The registry is untouched on error.
    pub fn add(&mut self, name: &str, size: i64) -> Result<&Disk> {
        validate_disk_name(name)?;
        if size <= 0 {
            return Err(StoreError::InvalidDiskSize { name: name.to_string(), size });
        }
        if self.contains(name) {
            return Err(StoreError::DiskAlreadyExists(name.to_string()));
        }
        self.disks.push(Disk { name: name.to_string(), size: size as u64 });
        Ok(&self.disks[self.disks.len() - 1])
    }

    pub fn remove(&mut self, name: &str) -> Result<Disk> {
        let pos = self
            .disks
            .iter()
            .position(|d| d.name == name)
            .ok_or_else(|| StoreError::DiskNotFound(name.to_string()))?;
        Ok(self.disks.remove(pos))
    }

    /// Resolve an ordered list of names to registered disks, keeping the caller's order.
    pub fn resolve(&self, names: &[String]) -> Result<Vec<Disk>> {
        names
            .iter()
            .map(|n| self.get(n).cloned().ok_or_else(|| StoreError::DiskNotFound(n.clone())))
            .collect()
    }
}

/// A disk name must be exactly one normal path component: not empty, not absolute,
/// no separators, no `.` or `..`. Disk directories share the root with the metadata
/// documents, so their names (and the temp files written beside them) are refused.
pub fn validate_disk_name(name: &str) -> Result<()> {
    let bad = || StoreError::InvalidDiskName(name.to_string());
    if name.is_empty() || name.contains('/') || name.contains('\\') || is_reserved(name) {
        return Err(bad());
    }
    let mut comps = Path::new(name).components();
    match (comps.next(), comps.next()) {
        (Some(Component::Normal(c)), None) if c == name => Ok(()),
        _ => Err(bad()),
    }
}

fn is_reserved(name: &str) -> bool {
    [REGISTRY_FILE, CATALOG_FILE].iter().any(|doc| {
        name.eq_ignore_ascii_case(doc) || name.eq_ignore_ascii_case(&format!("{doc}.tmp"))
    })
}
