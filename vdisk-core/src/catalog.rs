use crate::error::{Result, StoreError};
use crate::hash::ChunkHash;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// One disk per chunk, round-robin.
    Stripe,
    /// Every disk holds every chunk.
    Mirror,
}

impl FromStr for Method {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stripe" => Ok(Method::Stripe),
            "mirror" => Ok(Method::Mirror),
            _ => Err(StoreError::InvalidMethod(s.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Stripe => "stripe",
            Method::Mirror => "mirror",
        })
    }
}

/// One `(chunk_hash, disk_name)` assignment, persisted as a two-element array.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ChunkRef(pub ChunkHash, pub String);

impl ChunkRef {
    pub fn hash(&self) -> &ChunkHash {
        &self.0
    }

    pub fn disk(&self) -> &str {
        &self.1
    }
}

/// How one stored file maps onto disks.
///
/// `chunks` is in byte order: for stripe one entry per logical chunk, for mirror one run
/// of entries per logical chunk with one entry per hosting disk in `disks` order.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FileRecord {
    #[serde(default)]
    pub id: u64,
    pub name: String,
    pub chunks: Vec<ChunkRef>,
    pub disks: Vec<String>,
    pub method: Method,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub chunk_size: usize,
    #[serde(default)]
    pub chunk_count: u64,
    #[serde(default)]
    pub root_hex: String,
    #[serde(default)]
    pub created_utc: String,
}

/// A logical chunk of a record with the disks its copies were recorded on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogicalChunk<'a> {
    pub index: u64,
    pub hash: ChunkHash,
    pub replicas: Vec<&'a str>,
}

impl FileRecord {
    /// Number of logical chunks. Records written before `chunk_count` existed derive it
    /// from the entry list.
    pub fn logical_count(&self) -> u64 {
        if self.chunk_count > 0 || self.chunks.is_empty() {
            return self.chunk_count;
        }
        match self.method {
            Method::Stripe => self.chunks.len() as u64,
            Method::Mirror if !self.disks.is_empty() => {
                (self.chunks.len() / self.disks.len()).max(1) as u64
            }
            Method::Mirror => self.chunks.len() as u64,
        }
    }

    /// Group entries by logical chunk index, in byte order.
    pub fn logical_chunks(&self) -> Result<Vec<LogicalChunk<'_>>> {
        let count = self.logical_count() as usize;
        if count == 0 {
            if self.chunks.is_empty() {
                return Ok(Vec::new());
            }
            return Err(self.corrupt("entries present but chunk count is zero"));
        }
        let per = match self.method {
            Method::Stripe if self.chunks.len() == count => 1,
            Method::Stripe => {
                return Err(self.corrupt(format!(
                    "{} stripe entries for {} chunks",
                    self.chunks.len(),
                    count
                )))
            }
            Method::Mirror if !self.chunks.is_empty() && self.chunks.len() % count == 0 => {
                self.chunks.len() / count
            }
            Method::Mirror => {
                return Err(self.corrupt(format!(
                    "{} mirror entries not divisible into {} chunks",
                    self.chunks.len(),
                    count
                )))
            }
        };
        let mut out = Vec::with_capacity(count);
        for (index, group) in self.chunks.chunks(per).enumerate() {
            let hash = *group[0].hash();
            if group.iter().any(|c| c.hash() != &hash) {
                return Err(self.corrupt(format!("mixed hashes within chunk {index}")));
            }
            out.push(LogicalChunk {
                index: index as u64,
                hash,
                replicas: group.iter().map(|c| c.disk()).collect(),
            });
        }
        Ok(out)
    }

    pub fn references(&self, disk: &str) -> bool {
        self.disks.iter().any(|d| d == disk) || self.chunks.iter().any(|c| c.disk() == disk)
    }

    fn corrupt(&self, reason: impl Into<String>) -> StoreError {
        StoreError::CorruptRecord { id: self.id, name: self.name.clone(), reason: reason.into() }
    }
}

/// Every stored file, persisted as a JSON list of records.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct Catalog {
    pub records: Vec<FileRecord>,
}

impl Catalog {
    pub fn new(records: Vec<FileRecord>) -> Self {
        Catalog { records }
    }

    /// Identifier for the next appended record.
    pub fn next_id(&self) -> u64 {
        self.records.iter().map(|r| r.id).max().map_or(1, |m| m + 1)
    }

    pub fn get(&self, id: u64) -> Option<&FileRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// All records with this display name, oldest first.
    pub fn by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FileRecord> + 'a {
        self.records.iter().filter(move |r| r.name == name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Give legacy records (id 0) distinct identifiers, keeping existing ones.
    pub fn assign_missing_ids(&mut self) -> bool {
        let mut next = self.next_id();
        let mut changed = false;
        for r in self.records.iter_mut().filter(|r| r.id == 0) {
            r.id = next;
            next += 1;
            changed = true;
        }
        changed
    }
}
