use crate::catalog::{ChunkRef, Method};
use crate::disk::Disk;
use crate::error::{Result, StoreError};
use crate::hash::ChunkHash;

/// Chunk `index` of a file goes to `disk`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment {
    pub index: u64,
    pub hash: ChunkHash,
    pub disk: String,
}

impl From<&Assignment> for ChunkRef {
    fn from(a: &Assignment) -> Self {
        ChunkRef(a.hash, a.disk.clone())
    }
}

/// Assigns chunks to disks one logical index at a time.
///
/// Output order is the contract: ascending index, and within one index the order of
/// the disk list. A record built by appending these assignments is therefore in byte order.
#[derive(Clone, Debug)]
pub struct Placer {
    disks: Vec<String>,
    method: Method,
    next: u64,
}

impl Placer {
    pub fn new(disks: &[Disk], method: Method) -> Result<Self> {
        if disks.is_empty() {
            return Err(StoreError::NoDisksAvailable);
        }
        Ok(Self { disks: disks.iter().map(|d| d.name.clone()).collect(), method, next: 0 })
    }

    pub fn disks(&self) -> &[String] {
        &self.disks
    }

    /// Number of chunks assigned so far.
    pub fn chunk_count(&self) -> u64 {
        self.next
    }

    /// Assignments for the next logical chunk.
    pub fn assign(&mut self, hash: ChunkHash) -> Vec<Assignment> {
        let index = self.next;
        self.next += 1;
        match self.method {
            Method::Stripe => {
                let disk = &self.disks[(index % self.disks.len() as u64) as usize];
                vec![Assignment { index, hash, disk: disk.clone() }]
            }
            Method::Mirror => self
                .disks
                .iter()
                .map(|disk| Assignment { index, hash, disk: disk.clone() })
                .collect(),
        }
    }
}

/// Slice `data` into `chunk_size` pieces; the last may be shorter.
pub fn split(data: &[u8], chunk_size: usize) -> impl Iterator<Item = &[u8]> {
    data.chunks(chunk_size.max(1))
}

/// Assign every chunk in `chunks` to disks under `method`.
pub fn plan(chunks: &[&[u8]], disks: &[Disk], method: Method) -> Result<Vec<Assignment>> {
    let mut placer = Placer::new(disks, method)?;
    Ok(chunks.iter().flat_map(|c| placer.assign(ChunkHash::of(c))).collect())
}
