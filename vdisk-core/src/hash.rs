use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Digest of a chunk's bytes. Identity of the chunk and, as lowercase hex, its filename
/// on every disk that hosts it.
///
/// New chunks are hashed with BLAKE3. Catalogs written by the older tool name chunks by
/// their MD5 digest; those still load and are checked with MD5 on read.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkHash {
    Blake3(blake3::Hash),
    Md5([u8; 16]),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid chunk hash {0:?}: expected 64 (BLAKE3) or 32 (MD5) hex digits")]
pub struct InvalidHash(pub String);

impl ChunkHash {
    pub fn of(bytes: &[u8]) -> Self {
        ChunkHash::Blake3(blake3::hash(bytes))
    }

    /// Whether `bytes` hash to this digest under its own algorithm.
    pub fn matches(&self, bytes: &[u8]) -> bool {
        match self {
            ChunkHash::Blake3(h) => blake3::hash(bytes) == *h,
            ChunkHash::Md5(d) => md5::compute(bytes).0 == *d,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, ChunkHash::Md5(_))
    }

    pub fn to_hex(&self) -> String {
        match self {
            ChunkHash::Blake3(h) => h.to_hex().to_string(),
            ChunkHash::Md5(d) => format!("{:x}", md5::Digest(*d)),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ChunkHash::Blake3(h) => h.as_bytes(),
            ChunkHash::Md5(d) => d,
        }
    }

    /// First eight hex digits, for log lines.
    pub fn short(&self) -> String {
        self.to_hex()[..8].to_string()
    }

    fn merkle_leaf(&self) -> [u8; 32] {
        match self {
            ChunkHash::Blake3(h) => *h.as_bytes(),
            ChunkHash::Md5(d) => *blake3::hash(d).as_bytes(),
        }
    }
}

/// Hash one block of bytes.
pub fn hash(bytes: &[u8]) -> ChunkHash {
    ChunkHash::of(bytes)
}

impl From<blake3::Hash> for ChunkHash {
    fn from(h: blake3::Hash) -> Self {
        ChunkHash::Blake3(h)
    }
}

impl fmt::Display for ChunkHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ChunkHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkHash({})", self.short())
    }
}

impl FromStr for ChunkHash {
    type Err = InvalidHash;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || InvalidHash(s.to_string());
        match s.len() {
            64 => blake3::Hash::from_hex(s).map(ChunkHash::Blake3).map_err(|_| bad()),
            32 if s.bytes().all(|b| b.is_ascii_hexdigit()) => {
                let mut d = [0u8; 16];
                for (i, byte) in d.iter_mut().enumerate() {
                    let pair = s.get(2 * i..2 * i + 2).ok_or_else(bad)?;
                    *byte = u8::from_str_radix(pair, 16).map_err(|_| bad())?;
                }
                Ok(ChunkHash::Md5(d))
            }
            _ => Err(bad()),
        }
    }
}

impl Serialize for ChunkHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ChunkHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Binary Merkle root over chunk hashes, in logical chunk order.
/// Duplicates the last node when the layer is odd.
pub fn merkle_root(hashes: &[ChunkHash]) -> ChunkHash {
    if hashes.is_empty() {
        return ChunkHash::of(&[]);
    }
    let mut layer: Vec<[u8; 32]> = hashes.iter().map(ChunkHash::merkle_leaf).collect();
    while layer.len() > 1 {
        layer = layer
            .chunks(2)
            .map(|pair| {
                let b = pair.get(1).unwrap_or(&pair[0]);
                let mut h = blake3::Hasher::new();
                h.update(&pair[0]);
                h.update(b);
                *h.finalize().as_bytes()
            })
            .collect();
    }
    ChunkHash::Blake3(blake3::Hash::from(layer[0]))
}
