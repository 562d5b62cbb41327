//! Static file serving.
//!
//! Serves files from a single web root directory without ever leaving it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          Static File Handler            │
//! └────────────────────┬────────────────────┘
//!                      │  raw URL path
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │               WebRoot                   │
//! │  (decode → join → canonicalize →        │
//! │   component-wise containment check)     │
//! └────────────────────┬────────────────────┘
//!                      │  ResolvedPath
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │             FileStreamer                │
//! │  (length up front, fixed-size chunks,   │
//! │   one reusable buffer per stream)       │
//! └────────────────────┬────────────────────┘
//!                      │  ChunkSink
//!                      ▼
//!                 response body
//! ```
//!
//! # Components
//!
//! - [`WebRoot`]: canonical root plus path resolution
//! - [`ResolvedPath`]: a path proven to live under the root
//! - [`FileStreamer`]: opens resolved files and pumps chunks into a sink
//! - [`StreamCursor`]: open file handle and offset for one response
//! - [`ChunkSink`]: completion-driven chunk destination

mod resolver;
mod streamer;

pub use resolver::{ResolvedPath, WebRoot, DEFAULT_DOCUMENT};
pub use streamer::{ChunkSink, FileStreamer, StreamCursor, StreamSummary, DEFAULT_CHUNK_SIZE};
