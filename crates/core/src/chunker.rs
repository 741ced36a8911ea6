//! Streaming fixed-size chunker.

use crate::hash::ChunkId;
use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};

/// Cuts a stream of byte frames into fixed-size chunks and hashes each one.
///
/// Frames may arrive at any granularity; chunk boundaries never depend on
/// frame boundaries. Every emitted chunk is exactly `chunk_size` bytes
/// except the last, which may be shorter. At most one chunk is buffered at
/// a time.
pub struct ChunkReader<S> {
    inner: S,
    chunk_size: usize,
    buf: BytesMut,
    done: bool,
}

impl<S, E> ChunkReader<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    /// Wrap a byte stream. `chunk_size` must be positive.
    pub fn new(inner: S, chunk_size: usize) -> Self {
        debug_assert!(chunk_size > 0);
        Self {
            inner,
            chunk_size,
            buf: BytesMut::new(),
            done: false,
        }
    }

    /// Produce the next `(bytes, id)` pair, or `None` at end of stream.
    ///
    /// A stream error is terminal: the partial chunk accumulated so far is
    /// discarded and no further chunks are produced.
    pub async fn next_chunk(&mut self) -> Result<Option<(Bytes, ChunkId)>, E> {
        loop {
            if self.buf.len() >= self.chunk_size {
                return Ok(Some(self.cut(self.chunk_size)));
            }
            if self.done {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                let len = self.buf.len();
                return Ok(Some(self.cut(len)));
            }
            match self.inner.next().await {
                Some(Ok(frame)) => self.buf.extend_from_slice(&frame),
                Some(Err(e)) => {
                    self.done = true;
                    self.buf.clear();
                    return Err(e);
                }
                None => self.done = true,
            }
        }
    }

    fn cut(&mut self, len: usize) -> (Bytes, ChunkId) {
        let data = self.buf.split_to(len).freeze();
        let id = ChunkId::compute(&data);
        (data, id)
    }
}
