//! HTTP transport to chunk nodes.
//!
//! A thin capability mapping `(chunk_id, node_url)` to uploads and
//! downloads. Connection failures and protocol failures are distinct
//! variants so callers can log them apart, but the read-path fallback
//! treats both as "try the next replica".

use async_trait::async_trait;
use bytes::Bytes;
use silo_core::hash::ChunkId;
use std::time::Duration;
use thiserror::Error;

/// Longest body snippet carried inside a [`TransportError::Status`].
const BODY_SNIPPET_LEN: usize = 200;

/// Chunk transport error type.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request never produced an HTTP status (refused, reset, timed
    /// out, DNS failure).
    #[error("node {url} unreachable: {source}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The node answered with an unexpected status.
    #[error("node {url} returned {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
}

/// Result type alias for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Capability for moving chunk bytes to and from storage nodes.
#[async_trait]
pub trait ChunkTransport: Send + Sync {
    /// Store a chunk on a node. Success on 200 (already present) or 201.
    async fn upload_chunk(
        &self,
        chunk_id: &ChunkId,
        node_url: &str,
        data: Bytes,
    ) -> TransportResult<()>;

    /// Fetch a chunk's bytes from a node. Success on 200 only.
    async fn download_chunk(&self, chunk_id: &ChunkId, node_url: &str) -> TransportResult<Bytes>;
}

/// reqwest-backed transport.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a bounded connect timeout. Transfers are
    /// not bounded here; the coordinator's request deadline covers them.
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("default reqwest client");
        Self { http }
    }

    fn chunk_url(node_url: &str, chunk_id: &ChunkId) -> String {
        format!("{}/chunks/{}", node_url.trim_end_matches('/'), chunk_id)
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChunkTransport for HttpTransport {
    async fn upload_chunk(
        &self,
        chunk_id: &ChunkId,
        node_url: &str,
        data: Bytes,
    ) -> TransportResult<()> {
        let url = Self::chunk_url(node_url, chunk_id);
        let response = self
            .http
            .put(&url)
            .body(data)
            .send()
            .await
            .map_err(|source| TransportError::Connection {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status.as_u16() == 200 || status.as_u16() == 201 {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Status {
            url,
            status: status.as_u16(),
            body: snippet(&body),
        })
    }

    async fn download_chunk(&self, chunk_id: &ChunkId, node_url: &str) -> TransportResult<Bytes> {
        let url = Self::chunk_url(node_url, chunk_id);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| TransportError::Connection {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status.as_u16() != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                url,
                status: status.as_u16(),
                body: snippet(&body),
            });
        }

        response
            .bytes()
            .await
            .map_err(|source| TransportError::Connection { url, source })
    }
}

/// Truncate a response body for inclusion in an error message.
fn snippet(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.len() <= BODY_SNIPPET_LEN {
        return trimmed.to_string();
    }
    let mut end = BODY_SNIPPET_LEN;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_url_normalizes_trailing_slash() {
        let id = ChunkId::compute(b"x");
        let with = HttpTransport::chunk_url("http://node:9000/", &id);
        let without = HttpTransport::chunk_url("http://node:9000", &id);
        assert_eq!(with, without);
        assert_eq!(with, format!("http://node:9000/chunks/{}", id.to_hex()));
    }

    #[test]
    fn snippet_truncates_long_bodies() {
        let long = "e".repeat(500);
        let short = snippet(&long);
        assert!(short.ends_with("..."));
        assert_eq!(short.len(), BODY_SNIPPET_LEN + 3);

        assert_eq!(snippet("  disk full \n"), "disk full");
    }

    #[test]
    fn snippet_respects_utf8_boundaries() {
        let body = "é".repeat(150); // 300 bytes, boundary falls mid-char
        let short = snippet(&body);
        assert!(short.ends_with("..."));
        assert!(short.len() <= BODY_SNIPPET_LEN + 3);
    }
}
