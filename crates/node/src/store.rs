//! On-disk chunk storage.

use crate::error::NodeError;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use silo_core::hash::{is_chunk_id_shaped, ChunkHasher, ChunkId};
use std::fmt;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use uuid::Uuid;

/// Read granularity for streamed chunk downloads (64 KiB).
const STREAM_BUF_SIZE: usize = 64 * 1024;

/// A boxed stream of a chunk's bytes.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Outcome of a chunk Put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The chunk was written and renamed into place.
    Stored,
    /// The canonical file already existed; nothing was written.
    AlreadyPresent,
}

/// Aggregate statistics for the chunk directory.
#[derive(Debug, Clone)]
pub struct DirStats {
    /// Number of files whose names have the chunk-id shape.
    pub chunks: u64,
    /// Total bytes of all regular files in the directory.
    pub total_size: u64,
    /// Free bytes remaining on the backing filesystem.
    pub free_space: u64,
}

/// A directory of content-addressed chunk files.
///
/// Writes land in a uniquely-named temp file and are renamed into place
/// only after the streamed bytes hash to the requested id, so a partial or
/// corrupt write is never visible under a canonical name.
pub struct ChunkDir {
    root: PathBuf,
}

impl ChunkDir {
    /// Open the directory, creating it if needed.
    pub async fn open(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Directory this store owns.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Canonical path for a chunk.
    pub fn chunk_path(&self, id: &ChunkId) -> PathBuf {
        self.root.join(id.to_hex())
    }

    /// Store a chunk from a byte stream, verifying its hash.
    ///
    /// Idempotent: if the canonical file exists the body is not consumed
    /// further and the call succeeds. No temp file survives any failure.
    pub async fn put<S, E>(&self, id: &ChunkId, mut body: S) -> Result<PutOutcome, NodeError>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: fmt::Display,
    {
        let final_path = self.chunk_path(id);
        if fs::try_exists(&final_path).await? {
            return Ok(PutOutcome::AlreadyPresent);
        }

        let temp_path = self
            .root
            .join(format!("{}.tmp.{}", id.to_hex(), Uuid::new_v4()));
        let mut file = fs::File::create(&temp_path).await?;
        let mut hasher = ChunkId::hasher();

        let mut write_result = write_frames(&mut file, &mut hasher, &mut body).await;
        if write_result.is_ok() {
            write_result = file.sync_all().await.map_err(NodeError::from);
        }
        drop(file);

        if let Err(e) = write_result {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }

        let actual = hasher.finalize();
        if actual != *id {
            let _ = fs::remove_file(&temp_path).await;
            return Err(NodeError::HashMismatch {
                expected: id.to_hex(),
                actual: actual.to_hex(),
            });
        }

        if let Err(e) = fs::rename(&temp_path, &final_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(PutOutcome::Stored)
    }

    /// Stream a chunk's bytes.
    pub async fn get(&self, id: &ChunkId) -> Result<ByteStream, NodeError> {
        let path = self.chunk_path(id);
        let file = fs::File::open(&path).await.map_err(not_found_or_io)?;

        let stream = async_stream::try_stream! {
            let mut file = file;
            let mut buf = vec![0u8; STREAM_BUF_SIZE];
            loop {
                let n = file.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                yield Bytes::copy_from_slice(&buf[..n]);
            }
        };

        Ok(Box::pin(stream))
    }

    /// Remove a chunk.
    pub async fn delete(&self, id: &ChunkId) -> Result<(), NodeError> {
        fs::remove_file(self.chunk_path(id))
            .await
            .map_err(not_found_or_io)
    }

    /// Count chunks, total bytes, and free filesystem space.
    ///
    /// Only entries whose names have the chunk-id shape count as chunks;
    /// the byte total covers every regular file.
    pub async fn stats(&self) -> Result<DirStats, NodeError> {
        let mut chunks = 0u64;
        let mut total_size = 0u64;

        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            total_size += meta.len();
            if is_chunk_id_shaped(&entry.file_name().to_string_lossy()) {
                chunks += 1;
            }
        }

        let root = self.root.clone();
        let free_space = tokio::task::spawn_blocking(move || fs2::available_space(&root))
            .await
            .map_err(|e| std::io::Error::other(e.to_string()))??;

        Ok(DirStats {
            chunks,
            total_size,
            free_space,
        })
    }
}

async fn write_frames<S, E>(
    file: &mut fs::File,
    hasher: &mut ChunkHasher,
    body: &mut S,
) -> Result<(), NodeError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: fmt::Display,
{
    while let Some(frame) = body.next().await {
        let frame = frame.map_err(|e| std::io::Error::other(e.to_string()))?;
        hasher.update(&frame);
        file.write_all(&frame).await?;
    }
    Ok(())
}

fn not_found_or_io(e: std::io::Error) -> NodeError {
    if e.kind() == std::io::ErrorKind::NotFound {
        NodeError::NotFound
    } else {
        NodeError::Io(e)
    }
}
