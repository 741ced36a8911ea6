//! Test fixtures: in-memory fakes for the metadata store and the chunk
//! transport, plus a coordinator builder.
//!
//! Note: each test file compiles common/ separately, so not every helper
//! is used everywhere.
#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use bytes::Bytes;
use silo_core::chunk::ChunkInfo;
use silo_core::config::CoordinatorConfig;
use silo_core::hash::ChunkId;
use silo_core::manifest::FileManifest;
use silo_metadata::{MetaStore, MetadataError, MetadataResult};
use silo_server::{create_router, AppState};
use silo_transport::{ChunkTransport, TransportError, TransportResult};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

/// In-memory metadata store.
#[derive(Default)]
pub struct MemoryMetaStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    files: HashMap<Uuid, FileManifest>,
    chunks: HashMap<String, String>,
}

#[async_trait]
impl MetaStore for MemoryMetaStore {
    async fn init_file(&self, file_id: Uuid, filename: &str, _size: u64) -> MetadataResult<()> {
        self.inner
            .lock()
            .unwrap()
            .files
            .insert(file_id, FileManifest::new(file_id, filename));
        Ok(())
    }

    async fn save_chunk(&self, file_id: Uuid, index: u32, info: ChunkInfo) -> MetadataResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let manifest = inner
            .files
            .get_mut(&file_id)
            .ok_or_else(|| MetadataError::NotFound(format!("file {file_id}")))?;
        manifest.record_replica(index, info);
        Ok(())
    }

    async fn save_chunk_hash(&self, chunk_id: &ChunkId, info: ChunkInfo) -> MetadataResult<()> {
        self.inner
            .lock()
            .unwrap()
            .chunks
            .insert(chunk_id.to_hex(), info.node_url);
        Ok(())
    }

    async fn has_chunk_by_hash(&self, chunk_id: &ChunkId) -> MetadataResult<Option<ChunkInfo>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .chunks
            .get(&chunk_id.to_hex())
            .map(|node| ChunkInfo::new(*chunk_id, node.clone())))
    }

    async fn get_file_meta(&self, file_id: Uuid) -> MetadataResult<FileManifest> {
        self.inner
            .lock()
            .unwrap()
            .files
            .get(&file_id)
            .cloned()
            .ok_or_else(|| MetadataError::NotFound(format!("file {file_id}")))
    }

    async fn mark_complete(&self, file_id: Uuid) -> MetadataResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let manifest = inner
            .files
            .get_mut(&file_id)
            .ok_or_else(|| MetadataError::NotFound(format!("file {file_id}")))?;
        if !manifest.is_fully_populated() {
            let missing = (0..manifest.total_chunks)
                .filter(|&i| manifest.replicas(i).is_empty())
                .count();
            return Err(MetadataError::MissingChunks { missing });
        }
        manifest.complete = true;
        Ok(())
    }

    async fn close(&self) {}
}

/// In-memory chunk transport that records every upload and can inject
/// failures per node.
#[derive(Default)]
pub struct RecordingTransport {
    inner: Mutex<TransportInner>,
}

#[derive(Default)]
struct TransportInner {
    objects: HashMap<(String, String), Bytes>,
    puts: Vec<(String, String)>,
    failing: HashSet<String>,
}

impl RecordingTransport {
    /// Make every request to the node fail from now on.
    pub fn fail_node(&self, node_url: &str) {
        self.inner
            .lock()
            .unwrap()
            .failing
            .insert(node_url.to_string());
    }

    /// Total uploads that reached a node.
    pub fn put_count(&self) -> usize {
        self.inner.lock().unwrap().puts.len()
    }

    /// Recorded `(node_url, chunk_hex)` uploads in order.
    pub fn puts(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().puts.clone()
    }

    pub fn has_object(&self, node_url: &str, id: &ChunkId) -> bool {
        self.inner
            .lock()
            .unwrap()
            .objects
            .contains_key(&(node_url.to_string(), id.to_hex()))
    }

    /// Simulate losing a chunk on one node.
    pub fn remove_object(&self, node_url: &str, id: &ChunkId) {
        self.inner
            .lock()
            .unwrap()
            .objects
            .remove(&(node_url.to_string(), id.to_hex()));
    }

    /// Simulate silent on-disk corruption on one node.
    pub fn corrupt_object(&self, node_url: &str, id: &ChunkId, bytes: &[u8]) {
        self.inner.lock().unwrap().objects.insert(
            (node_url.to_string(), id.to_hex()),
            Bytes::copy_from_slice(bytes),
        );
    }
}

#[async_trait]
impl ChunkTransport for RecordingTransport {
    async fn upload_chunk(
        &self,
        chunk_id: &ChunkId,
        node_url: &str,
        data: Bytes,
    ) -> TransportResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.failing.contains(node_url) {
            return Err(TransportError::Status {
                url: node_url.to_string(),
                status: 500,
                body: "injected failure".to_string(),
            });
        }
        inner
            .puts
            .push((node_url.to_string(), chunk_id.to_hex()));
        inner
            .objects
            .insert((node_url.to_string(), chunk_id.to_hex()), data);
        Ok(())
    }

    async fn download_chunk(&self, chunk_id: &ChunkId, node_url: &str) -> TransportResult<Bytes> {
        let inner = self.inner.lock().unwrap();
        if inner.failing.contains(node_url) {
            return Err(TransportError::Status {
                url: node_url.to_string(),
                status: 500,
                body: "injected failure".to_string(),
            });
        }
        inner
            .objects
            .get(&(node_url.to_string(), chunk_id.to_hex()))
            .cloned()
            .ok_or_else(|| TransportError::Status {
                url: node_url.to_string(),
                status: 404,
                body: "chunk not found".to_string(),
            })
    }
}

/// A coordinator wired to in-memory fakes.
pub struct TestCoordinator {
    pub router: axum::Router,
    pub store: Arc<MemoryMetaStore>,
    pub transport: Arc<RecordingTransport>,
    pub pool: Vec<String>,
}

/// Build a coordinator over `pool_size` fake nodes.
pub fn test_coordinator(pool_size: usize, default_chunk_size: u64) -> TestCoordinator {
    let pool: Vec<String> = (0..pool_size)
        .map(|i| format!("http://node{i}:9000"))
        .collect();
    let config = CoordinatorConfig {
        storage_pool: pool.join(","),
        default_chunk_size,
        ..Default::default()
    };
    let store = Arc::new(MemoryMetaStore::default());
    let transport = Arc::new(RecordingTransport::default());
    let state = AppState::new(config, store.clone(), transport.clone());
    TestCoordinator {
        router: create_router(state),
        store,
        transport,
        pool,
    }
}

/// POST /upload with optional headers; returns status and body text.
pub async fn upload(
    router: &axum::Router,
    body: impl Into<Body>,
    headers: &[(&str, &str)],
) -> (StatusCode, String) {
    let mut builder = Request::builder().method("POST").uri("/upload");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let response = router
        .clone()
        .oneshot(builder.body(body.into()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8_lossy(&bytes).trim().to_string())
}

/// GET a coordinator URI; returns status, body bytes, and headers.
pub async fn get(router: &axum::Router, uri: &str) -> (StatusCode, Vec<u8>, HeaderMap) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec(), headers)
}

/// Upload helper asserting success, returning the parsed file id.
pub async fn upload_ok(
    router: &axum::Router,
    body: impl Into<Body>,
    headers: &[(&str, &str)],
) -> Uuid {
    let (status, body) = upload(router, body, headers).await;
    assert_eq!(status, StatusCode::CREATED, "upload failed: {body}");
    Uuid::parse_str(&body).expect("upload response is a file id")
}
