//! Coordinator HTTP handlers: the ingest and reassembly pipelines.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Query, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use silo_core::chunk::ChunkInfo;
use silo_core::chunker::ChunkReader;
use silo_core::manifest::FileManifest;
use silo_core::placement::choose_nodes;
use uuid::Uuid;

/// Filename used when the client sends no `X-Filename` header.
const DEFAULT_FILENAME: &str = "uploaded.bin";

/// Chunk size requested by the client, or the server default.
///
/// An unparsable, zero, or oversized value falls back to the default.
fn requested_chunk_size(headers: &HeaderMap, default: u64) -> u64 {
    headers
        .get("x-chunk-size")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|&n| silo_core::validate_chunk_size(n).is_ok())
        .unwrap_or(default)
}

fn requested_filename(headers: &HeaderMap) -> String {
    headers
        .get("x-filename")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_FILENAME)
        .to_string()
}

/// POST /upload - ingest a file from the raw request body.
///
/// Chunks are processed strictly in order; chunk `i`'s metadata is durable
/// before chunk `i+1` is read. A failed primary write aborts the upload
/// and leaves the manifest incomplete; failed replica writes only lose
/// redundancy.
#[tracing::instrument(skip(state, request))]
pub async fn upload(
    State(state): State<AppState>,
    request: Request,
) -> ApiResult<(StatusCode, String)> {
    let file_id = Uuid::new_v4();
    let filename = requested_filename(request.headers());
    let chunk_size = requested_chunk_size(request.headers(), state.config.default_chunk_size);

    state.store.init_file(file_id, &filename, 0).await?;
    tracing::info!(file_id = %file_id, filename = %filename, chunk_size, "upload started");

    let body = request.into_body().into_data_stream();
    let mut reader = ChunkReader::new(body, chunk_size as usize);
    let mut index: u32 = 0;

    loop {
        let (data, chunk_id) = match reader.next_chunk().await {
            Ok(Some(pair)) => pair,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(file_id = %file_id, index, error = %e, "failed to read upload body");
                return Err(ApiError::Internal("reading failed".to_string()));
            }
        };

        // Dedup: a chunk seen in any earlier upload (or earlier in this
        // one) is only referenced, never re-sent.
        if let Some(existing) = state.store.has_chunk_by_hash(&chunk_id).await? {
            tracing::debug!(file_id = %file_id, index, chunk_id = %chunk_id, "dedup hit");
            state.store.save_chunk(file_id, index, existing).await?;
            index += 1;
            continue;
        }

        let nodes = choose_nodes(index as usize, &state.pool, state.config.replicas);
        let Some(primary) = nodes.first().cloned() else {
            return Err(ApiError::Internal("storage pool is empty".to_string()));
        };

        if let Err(e) = state
            .transport
            .upload_chunk(&chunk_id, &primary, data.clone())
            .await
        {
            tracing::error!(
                file_id = %file_id,
                index,
                node = %primary,
                error = %e,
                "primary chunk upload failed"
            );
            return Err(ApiError::BadGateway);
        }

        let info = ChunkInfo::new(chunk_id, primary.clone());
        state.store.save_chunk(file_id, index, info.clone()).await?;
        state.store.save_chunk_hash(&chunk_id, info).await?;

        // Replicas are best effort.
        for node in nodes.iter().skip(1) {
            match state
                .transport
                .upload_chunk(&chunk_id, node, data.clone())
                .await
            {
                Ok(()) => {
                    state
                        .store
                        .save_chunk(file_id, index, ChunkInfo::new(chunk_id, node.clone()))
                        .await?;
                }
                Err(e) => {
                    tracing::warn!(
                        file_id = %file_id,
                        index,
                        node = %node,
                        error = %e,
                        "replica upload failed"
                    );
                }
            }
        }

        index += 1;
    }

    state.store.mark_complete(file_id).await?;
    tracing::info!(file_id = %file_id, chunks = index, "upload complete");

    Ok((StatusCode::CREATED, format!("{file_id}\n")))
}

/// Query string carrying the file id.
#[derive(Debug, Deserialize)]
pub struct FileQuery {
    #[serde(rename = "fileID")]
    file_id: Option<String>,
}

fn parse_file_id(query: &FileQuery) -> ApiResult<Uuid> {
    let raw = query
        .file_id
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("missing fileID".to_string()))?;
    Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest("invalid fileID".to_string()))
}

/// Fetch one chunk, trying replicas in recorded order and verifying the
/// bytes actually hash to the chunk id.
async fn fetch_chunk(state: &AppState, meta: &FileManifest, index: u32) -> ApiResult<Bytes> {
    for replica in meta.replicas(index) {
        match state
            .transport
            .download_chunk(&replica.chunk_id, &replica.node_url)
            .await
        {
            Ok(data) => {
                if let Err(e) = replica.chunk_id.verify(&data) {
                    tracing::warn!(
                        file_id = %meta.file_id,
                        index,
                        node = %replica.node_url,
                        error = %e,
                        "chunk failed integrity check, trying next replica"
                    );
                    continue;
                }
                return Ok(data);
            }
            Err(e) => {
                tracing::warn!(
                    file_id = %meta.file_id,
                    index,
                    node = %replica.node_url,
                    error = %e,
                    "chunk download failed, trying next replica"
                );
            }
        }
    }

    tracing::error!(file_id = %meta.file_id, index, "all replicas unavailable");
    Err(ApiError::ChunkUnavailable(index))
}

/// GET /download?fileID= - stream the reassembled file.
///
/// The first chunk is resolved before the response starts, so a file with
/// nothing left to serve fails with a clean 500. A failure later in the
/// stream truncates the response.
#[tracing::instrument(skip(state))]
pub async fn download(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
) -> ApiResult<Response> {
    let file_id = parse_file_id(&query)?;
    let meta = state.store.get_file_meta(file_id).await?;

    if !meta.complete {
        return Err(ApiError::Incomplete);
    }

    let first = if meta.total_chunks > 0 {
        Some(fetch_chunk(&state, &meta, 0).await?)
    } else {
        None
    };

    // Quotes and control characters would corrupt the header.
    let safe_name: String = meta
        .filename
        .chars()
        .map(|c| if c == '"' || c.is_ascii_control() { '_' } else { c })
        .collect();
    let disposition = format!("attachment; filename=\"{safe_name}\"");

    let stream: std::pin::Pin<Box<dyn futures::Stream<Item = Result<Bytes, ApiError>> + Send>> =
        Box::pin(async_stream::try_stream! {
            if let Some(data) = first {
                yield data;
            }
            for index in 1..meta.total_chunks {
                let data = fetch_chunk(&state, &meta, index).await?;
                yield data;
            }
        });

    Ok((
        [
            (header::CONTENT_DISPOSITION, disposition),
            (
                header::CONTENT_TYPE,
                "application/octet-stream".to_string(),
            ),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

/// File metadata summary.
#[derive(Debug, Serialize)]
pub struct FileInfoResponse {
    #[serde(rename = "fileID")]
    pub file_id: String,
    pub filename: String,
    #[serde(rename = "totalChunks")]
    pub total_chunks: u32,
    pub complete: bool,
}

/// GET /info?fileID= - file metadata summary.
#[tracing::instrument(skip(state))]
pub async fn info(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
) -> ApiResult<Json<FileInfoResponse>> {
    let file_id = parse_file_id(&query)?;
    let meta = state.store.get_file_meta(file_id).await?;

    Ok(Json(FileInfoResponse {
        file_id: meta.file_id.to_string(),
        filename: meta.filename,
        total_chunks: meta.total_chunks,
        complete: meta.complete,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(name: &'static str, value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn chunk_size_header_parsing() {
        let default = 64;
        assert_eq!(requested_chunk_size(&HeaderMap::new(), default), 64);
        assert_eq!(
            requested_chunk_size(&headers_with("x-chunk-size", "128"), default),
            128
        );
        // Garbage, zero, and oversized values fall back to the default.
        assert_eq!(
            requested_chunk_size(&headers_with("x-chunk-size", "soon"), default),
            64
        );
        assert_eq!(
            requested_chunk_size(&headers_with("x-chunk-size", "0"), default),
            64
        );
        assert_eq!(
            requested_chunk_size(
                &headers_with("x-chunk-size", &(silo_core::MAX_CHUNK_SIZE + 1).to_string()),
                default
            ),
            64
        );
    }

    #[test]
    fn filename_header_parsing() {
        assert_eq!(requested_filename(&HeaderMap::new()), DEFAULT_FILENAME);
        assert_eq!(
            requested_filename(&headers_with("x-filename", "  report.pdf ")),
            "report.pdf"
        );
        assert_eq!(
            requested_filename(&headers_with("x-filename", "")),
            DEFAULT_FILENAME
        );
    }

    #[test]
    fn file_id_query_validation() {
        let missing = FileQuery { file_id: None };
        assert!(matches!(
            parse_file_id(&missing).unwrap_err(),
            ApiError::BadRequest(_)
        ));

        let invalid = FileQuery {
            file_id: Some("not-a-uuid".to_string()),
        };
        assert!(matches!(
            parse_file_id(&invalid).unwrap_err(),
            ApiError::BadRequest(_)
        ));

        let id = Uuid::new_v4();
        let valid = FileQuery {
            file_id: Some(id.to_string()),
        };
        assert_eq!(parse_file_id(&valid).unwrap(), id);
    }
}
