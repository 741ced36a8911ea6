//! Node HTTP handlers.

use crate::error::NodeError;
use crate::store::{ChunkDir, PutOutcome};
use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use silo_core::hash::ChunkId;
use std::sync::Arc;

/// Shared node state.
#[derive(Clone)]
pub struct NodeState {
    /// Node identifier reported by `/status`.
    pub node_id: String,
    /// The chunk directory.
    pub store: Arc<ChunkDir>,
}

fn parse_chunk_id(raw: &str) -> Result<ChunkId, NodeError> {
    ChunkId::from_hex(raw).map_err(|e| NodeError::InvalidChunkId(e.to_string()))
}

/// PUT /chunks/{chunk_id} - store a chunk, verifying its hash.
#[tracing::instrument(skip(state, request), fields(node_id = %state.node_id))]
pub async fn put_chunk(
    State(state): State<NodeState>,
    Path(chunk_id): Path<String>,
    request: Request,
) -> Result<(StatusCode, &'static str), NodeError> {
    let id = parse_chunk_id(&chunk_id)?;
    let body = request.into_body().into_data_stream();

    match state.store.put(&id, body).await? {
        PutOutcome::Stored => {
            tracing::debug!(chunk_id = %id, "chunk stored");
            Ok((StatusCode::CREATED, "chunk saved\n"))
        }
        PutOutcome::AlreadyPresent => Ok((StatusCode::OK, "chunk already exists\n")),
    }
}

/// GET /chunks/{chunk_id} - stream a chunk's bytes.
#[tracing::instrument(skip(state), fields(node_id = %state.node_id))]
pub async fn get_chunk(
    State(state): State<NodeState>,
    Path(chunk_id): Path<String>,
) -> Result<Response, NodeError> {
    let id = parse_chunk_id(&chunk_id)?;
    let stream = state.store.get(&id).await?;

    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        Body::from_stream(stream),
    )
        .into_response())
}

/// DELETE /chunks/{chunk_id} - remove a chunk. Administrative.
#[tracing::instrument(skip(state), fields(node_id = %state.node_id))]
pub async fn delete_chunk(
    State(state): State<NodeState>,
    Path(chunk_id): Path<String>,
) -> Result<(StatusCode, &'static str), NodeError> {
    let id = parse_chunk_id(&chunk_id)?;
    state.store.delete(&id).await?;
    tracing::info!(chunk_id = %id, "chunk deleted");
    Ok((StatusCode::OK, "chunk deleted\n"))
}

/// Node status report.
#[derive(Debug, Serialize)]
pub struct NodeStatus {
    #[serde(rename = "nodeID")]
    pub node_id: String,
    pub status: &'static str,
    pub chunks: u64,
    #[serde(rename = "totalSize")]
    pub total_size: u64,
    #[serde(rename = "freeSpace")]
    pub free_space: u64,
}

/// GET /status - node identity and storage statistics.
#[tracing::instrument(skip(state), fields(node_id = %state.node_id))]
pub async fn status(State(state): State<NodeState>) -> Result<Json<NodeStatus>, NodeError> {
    let stats = state.store.stats().await?;
    Ok(Json(NodeStatus {
        node_id: state.node_id.clone(),
        status: "online",
        chunks: stats.chunks,
        total_size: stats.total_size,
        free_space: stats.free_space,
    }))
}
