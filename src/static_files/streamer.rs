//! Chunked file streaming.
//!
//! Files are sent as a sequence of fixed-size chunks so memory use stays
//! bounded regardless of file size.
//!
//! # Chunk Lifecycle
//!
//! ```text
//!   open ──► length known (Content-Length) ──► read chunk ──► send ──┐
//!                                                  ▲                 │
//!                                                  └── full chunk ◄──┤
//!                                                                    │
//!                   length reached / early EOF / send failed ──► drop ◄┘
//! ```
//!
//! The next read only starts once the sink has accepted the previous chunk.
//! Each cursor owns one `BytesMut`; the allocation is reclaimed for the next
//! read as soon as the previous chunk has been written and dropped.

use std::io;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::{PathError, StreamError};

use super::resolver::ResolvedPath;

/// Default chunk size (128 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 128 * 1024;

// =============================================================================
// Chunk Sink
// =============================================================================

/// Destination for streamed chunks.
///
/// `send_chunk` must only return once the chunk has been accepted.
#[async_trait]
pub trait ChunkSink: Send {
    async fn send_chunk(&mut self, chunk: Bytes) -> Result<(), StreamError>;
}

/// Feeds an HTTP response body: the receiving half is wrapped into the body
/// stream, and a dropped receiver means the peer went away.
#[async_trait]
impl ChunkSink for mpsc::Sender<io::Result<Bytes>> {
    async fn send_chunk(&mut self, chunk: Bytes) -> Result<(), StreamError> {
        self.send(Ok(chunk))
            .await
            .map_err(|_| StreamError::WriteFailed)
    }
}

// =============================================================================
// Stream Cursor
// =============================================================================

/// An open file plus read offset, owned by exactly one in-flight response.
#[derive(Debug)]
pub struct StreamCursor {
    file: File,
    buffer: BytesMut,
    chunk_size: usize,
    len: u64,
    offset: u64,
    finished: bool,
}

impl StreamCursor {
    /// Total file length, known before any body bytes are read.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes read from the file so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read the next chunk.
    ///
    /// Every chunk but the last is exactly `chunk_size` bytes, and no more
    /// than `len` bytes are ever returned in total, so the body always
    /// matches the advertised Content-Length. Bytes appended after `open`
    /// are not sent; a file that shrinks below `len` fails with
    /// `UnexpectedEof`.
    pub async fn next_chunk(&mut self) -> io::Result<Option<Bytes>> {
        let remaining = self.len.saturating_sub(self.offset);
        if self.finished || remaining == 0 {
            self.finished = true;
            return Ok(None);
        }

        let target = remaining.min(self.chunk_size as u64) as usize;
        self.buffer.reserve(target);
        while self.buffer.len() < target {
            let want = (target - self.buffer.len()) as u64;
            let read = (&mut self.file)
                .take(want)
                .read_buf(&mut self.buffer)
                .await?;
            if read == 0 {
                break;
            }
        }

        let filled = self.buffer.len();
        if filled < target {
            self.finished = true;
            self.buffer.clear();
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "file shrank to {} of {} bytes",
                    self.offset + filled as u64,
                    self.len
                ),
            ));
        }

        self.offset += filled as u64;
        if self.offset == self.len {
            self.finished = true;
        }
        Ok(Some(self.buffer.split().freeze()))
    }
}

/// Outcome of a completed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    pub chunks: usize,
    pub bytes: u64,
}

// =============================================================================
// File Streamer
// =============================================================================

/// Opens resolved files and pumps them into a [`ChunkSink`].
#[derive(Debug, Clone, Copy)]
pub struct FileStreamer {
    chunk_size: usize,
}

impl Default for FileStreamer {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE)
    }
}

impl FileStreamer {
    /// Create a streamer with the given chunk size (minimum 1 byte).
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Open a resolved file for streaming.
    ///
    /// The length comes from file metadata; nothing is read yet.
    pub async fn open(&self, resolved: &ResolvedPath) -> Result<StreamCursor, PathError> {
        let not_readable = |e: io::Error| PathError::NotReadable {
            path: resolved.request_path().to_string(),
            reason: e.to_string(),
        };

        let file = File::open(resolved.as_path()).await.map_err(not_readable)?;
        let metadata = file.metadata().await.map_err(not_readable)?;
        if !metadata.is_file() {
            return Err(PathError::NotReadable {
                path: resolved.request_path().to_string(),
                reason: "not a regular file".to_string(),
            });
        }

        Ok(StreamCursor {
            file,
            buffer: BytesMut::with_capacity(self.chunk_size),
            chunk_size: self.chunk_size,
            len: metadata.len(),
            offset: 0,
            finished: false,
        })
    }

    /// Send every chunk of `cursor` into `sink`, one at a time.
    ///
    /// On any failure the cursor (and its file handle) is dropped and nothing
    /// is retried.
    pub async fn pump<K: ChunkSink>(
        mut cursor: StreamCursor,
        sink: &mut K,
    ) -> Result<StreamSummary, StreamError> {
        let mut summary = StreamSummary {
            chunks: 0,
            bytes: 0,
        };

        loop {
            let chunk = match cursor.next_chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => return Ok(summary),
                Err(e) => return Err(StreamError::ReadFailed(e.to_string())),
            };

            let len = chunk.len() as u64;
            sink.send_chunk(chunk).await?;
            summary.chunks += 1;
            summary.bytes += len;
        }
    }

    /// Stream `cursor` into a response body channel on a background task.
    pub fn spawn_into(cursor: StreamCursor, mut sender: mpsc::Sender<io::Result<Bytes>>) {
        tokio::spawn(async move {
            let total = cursor.len();
            match Self::pump(cursor, &mut sender).await {
                Ok(summary) => {
                    debug!(bytes = summary.bytes, chunks = summary.chunks, "Stream complete");
                }
                Err(StreamError::WriteFailed) => {
                    info!(total_bytes = total, "Connection interrupted");
                }
                Err(e @ StreamError::ReadFailed(_)) => {
                    info!(error = %e, "Aborting stream");
                    let _ = sender
                        .send(Err(io::Error::other(e.to_string())))
                        .await;
                }
            }
        });
    }
}

// =============================================================================
// Tests
// =============================================================================
