//! Chunk identity: SHA-256 digests and hex encoding.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

/// A chunk id: the SHA-256 digest of the chunk's bytes.
///
/// Equality of `ChunkId`s defines chunk identity; the canonical text form
/// is 64 lowercase hex characters, which is also the chunk's filename on a
/// storage node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkId([u8; 32]);

impl ChunkId {
    /// Compute the id of a chunk from its bytes.
    pub fn compute(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Create an incremental hasher for streamed chunk bodies.
    pub fn hasher() -> ChunkHasher {
        ChunkHasher(Sha256::new())
    }

    /// Get the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse from a 64-character hex string. Accepts either case.
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        if s.len() != 64 {
            return Err(crate::Error::InvalidChunkId(format!(
                "expected 64 hex chars, got {}",
                s.len()
            )));
        }
        let mut bytes = [0u8; 32];
        for (i, pair) in s.as_bytes().chunks(2).enumerate() {
            let digits = std::str::from_utf8(pair)
                .map_err(|e| crate::Error::InvalidChunkId(e.to_string()))?;
            bytes[i] = u8::from_str_radix(digits, 16)
                .map_err(|_| crate::Error::InvalidChunkId(format!("non-hex at byte {i}")))?;
        }
        Ok(Self(bytes))
    }

    /// Encode as lowercase hex.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Check that `data` actually hashes to this id.
    pub fn verify(&self, data: &[u8]) -> crate::Result<()> {
        let actual = Self::compute(data);
        if actual != *self {
            return Err(crate::Error::HashMismatch {
                expected: self.to_hex(),
                actual: actual.to_hex(),
            });
        }
        Ok(())
    }
}

impl fmt::Debug for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// Manifests are stored as JSON; ids serialize as their hex form so the
// stored documents stay greppable.
impl Serialize for ChunkId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ChunkId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ChunkId::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Incremental SHA-256 hasher producing a [`ChunkId`].
pub struct ChunkHasher(Sha256);

impl ChunkHasher {
    /// Update the hasher with data.
    pub fn update(&mut self, data: &[u8]) {
        self.0.update(data);
    }

    /// Finalize and return the chunk id.
    pub fn finalize(self) -> ChunkId {
        ChunkId(self.0.finalize().into())
    }
}

/// Check that a string has the shape of a chunk id (64 hex chars).
pub fn is_chunk_id_shaped(name: &str) -> bool {
    name.len() == 64 && name.bytes().all(|b| b.is_ascii_hexdigit())
}
