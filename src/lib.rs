//! # Face Detection Service
//!
//! A small HTTP service that serves a directory of static files and answers
//! on-demand face detection requests against a local imaging device.
//!
//! ## Features
//!
//! - **Sandboxed static files**: every request path is canonicalized and must
//!   stay inside the web root
//! - **Chunked streaming**: files are streamed in fixed-size chunks, one chunk
//!   in flight per connection
//! - **On-demand detection**: `GET /getResult?type=json` returns rectangles,
//!   `type=image` writes an annotated JPEG into the web root
//! - **Exclusive device access**: concurrent detections queue for the device
//!
//! ## Architecture
//!
//! - [`static_files`] - Path resolution and chunked file streaming
//! - [`detect`] - Frame capture, detector, and result rendering
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//! - [`error`] - Error types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use face_detection_service::{
//!     create_router, DetectionService, ModelFileLoader, RouterConfig, StillImageSource, WebRoot,
//! };
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let web_root = WebRoot::new("web")?;
//!     let detection = DetectionService::new(
//!         Arc::new(StillImageSource::new("captures", 0)),
//!         Arc::new(ModelFileLoader::new("face_model.json")),
//!         web_root.path().join("image.jpg"),
//!     );
//!
//!     let router = create_router(web_root, detection, RouterConfig::new());
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, router).await
//! }
//! ```

pub mod config;
pub mod detect;
pub mod error;
pub mod server;
pub mod static_files;

// Re-export commonly used types
pub use config::{CheckConfig, Cli, Command, ServeConfig};
pub use detect::{
    DetectionOutcome, DetectionResult, DetectionService, Detector, DetectorLoader, FrameSource,
    ModelFileLoader, OutputKind, Rect, SkinToneDetector, SkinToneModel, StillImageSource,
};
pub use error::{
    DetectionError, DetectorError, DeviceError, PathError, PersistError, RequestError, StreamError,
};
pub use server::{create_router, AppState, HealthResponse, RouterConfig};
pub use static_files::{FileStreamer, ResolvedPath, WebRoot, DEFAULT_CHUNK_SIZE};
