//! Chunk placement records.

use crate::hash::ChunkId;
use serde::{Deserialize, Serialize};

/// A claim that a copy of the named chunk lives on a node.
///
/// This is an assertion, not a proof of liveness: the read path verifies
/// the bytes it actually receives.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkInfo {
    /// The chunk's content hash.
    pub chunk_id: ChunkId,
    /// Base URL of the node expected to hold a copy.
    pub node_url: String,
}

impl ChunkInfo {
    pub fn new(chunk_id: ChunkId, node_url: impl Into<String>) -> Self {
        Self {
            chunk_id,
            node_url: node_url.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_roundtrip() {
        let info = ChunkInfo::new(ChunkId::compute(b"abc"), "http://node1:9000");
        let json = serde_json::to_string(&info).unwrap();
        let back: ChunkInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
    }
}
