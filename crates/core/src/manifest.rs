//! File manifests: the metadata record for one uploaded file.

use crate::chunk::ChunkInfo;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// The complete metadata record for one uploaded file.
///
/// `chunks` maps each chunk ordinal to an ordered replica list; element 0
/// is the primary placement. `complete` stays false until the upload
/// finishes, and an incomplete manifest is never served.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileManifest {
    /// Coordinator-generated file id, immutable after creation.
    pub file_id: Uuid,
    /// User-visible download name.
    pub filename: String,
    /// Number of chunk ordinals, i.e. one past the highest recorded index.
    pub total_chunks: u32,
    /// Ordinal -> replica list, in placement order.
    pub chunks: BTreeMap<u32, Vec<ChunkInfo>>,
    /// True once every chunk has been recorded and the upload finished.
    pub complete: bool,
}

impl FileManifest {
    /// Create an empty manifest for a fresh upload.
    pub fn new(file_id: Uuid, filename: impl Into<String>) -> Self {
        Self {
            file_id,
            filename: filename.into(),
            total_chunks: 0,
            chunks: BTreeMap::new(),
            complete: false,
        }
    }

    /// Record a replica for the given chunk ordinal.
    ///
    /// Appends unless the node is already listed for that ordinal, so a
    /// repeated write for the same index can never duplicate a record.
    /// Bumps `total_chunks` to cover the index.
    pub fn record_replica(&mut self, index: u32, info: ChunkInfo) {
        let replicas = self.chunks.entry(index).or_default();
        if !replicas.iter().any(|ci| ci.node_url == info.node_url) {
            replicas.push(info);
        }
        self.total_chunks = self.total_chunks.max(index + 1);
    }

    /// Replica list for a chunk ordinal, empty if none recorded.
    pub fn replicas(&self, index: u32) -> &[ChunkInfo] {
        self.chunks.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when every ordinal in `[0, total_chunks)` has at least one
    /// replica recorded.
    pub fn is_fully_populated(&self) -> bool {
        (0..self.total_chunks).all(|i| !self.replicas(i).is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::ChunkId;

    fn info(data: &[u8], node: &str) -> ChunkInfo {
        ChunkInfo::new(ChunkId::compute(data), node)
    }

    #[test]
    fn record_replica_appends_and_dedups_by_node() {
        let mut m = FileManifest::new(Uuid::new_v4(), "f.bin");
        m.record_replica(0, info(b"a", "http://n1"));
        m.record_replica(0, info(b"a", "http://n2"));
        m.record_replica(0, info(b"a", "http://n1"));
        assert_eq!(m.replicas(0).len(), 2);
        assert_eq!(m.replicas(0)[0].node_url, "http://n1");
        assert_eq!(m.total_chunks, 1);
    }

    #[test]
    fn total_chunks_covers_out_of_order_indices() {
        let mut m = FileManifest::new(Uuid::new_v4(), "f.bin");
        m.record_replica(4, info(b"a", "http://n1"));
        assert_eq!(m.total_chunks, 5);
        m.record_replica(1, info(b"b", "http://n1"));
        assert_eq!(m.total_chunks, 5);
        assert!(!m.is_fully_populated());
    }

    #[test]
    fn fully_populated_requires_every_index() {
        let mut m = FileManifest::new(Uuid::new_v4(), "f.bin");
        assert!(m.is_fully_populated()); // zero chunks is trivially complete
        m.record_replica(0, info(b"a", "http://n1"));
        m.record_replica(1, info(b"b", "http://n1"));
        assert!(m.is_fully_populated());
    }

    #[test]
    fn json_roundtrip() {
        let mut m = FileManifest::new(Uuid::new_v4(), "報告.pdf");
        m.record_replica(0, info(b"a", "http://n1"));
        m.complete = true;
        let json = serde_json::to_string(&m).unwrap();
        let back: FileManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.file_id, m.file_id);
        assert_eq!(back.filename, m.filename);
        assert_eq!(back.total_chunks, 1);
        assert!(back.complete);
        assert_eq!(back.replicas(0), m.replicas(0));
    }
}
