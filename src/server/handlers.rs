//! HTTP request handlers for the face detection service.
//!
//! # Endpoints
//!
//! - `GET /getResult?type={json|image}` - Run a detection
//! - `GET /health` - Health check endpoint
//! - `GET /*` - Static files from the web root

use std::io;
use std::path::Path;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{RawQuery, State},
    response::{Html, IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use http::{header, Method, StatusCode, Uri};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, warn};

use crate::detect::{
    faces_json, image_fragment, message_fragment, usage_fragment, DetectionOutcome,
    DetectionService, OutputKind,
};
use crate::error::{PathError, RequestError};
use crate::static_files::{FileStreamer, WebRoot};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// This is passed to all handlers via Axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Sandboxed web root for static files
    pub web_root: Arc<WebRoot>,

    /// Chunked streamer for static files
    pub streamer: FileStreamer,

    /// Device and detector owner
    pub detection: Arc<DetectionService>,
}

impl AppState {
    /// Create application state with the default chunk size.
    pub fn new(web_root: WebRoot, detection: DetectionService) -> Self {
        Self {
            web_root: Arc::new(web_root),
            streamer: FileStreamer::default(),
            detection: Arc::new(detection),
        }
    }

    /// Use a custom chunk size for static files.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.streamer = FileStreamer::new(chunk_size);
        self
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Parsed `/getResult` query string.
///
/// Exactly one parameter, named `type`, with value `json` or `image`.
/// Repeated keys count as separate parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultQuery {
    pub kind: OutputKind,
}

impl ResultQuery {
    /// Parse a raw (percent-encoded) query string.
    pub fn parse(query: Option<&str>) -> Result<Self, RequestError> {
        let params: Vec<(String, String)> = url::form_urlencoded::parse(
            query.unwrap_or_default().as_bytes(),
        )
        .into_owned()
        .collect();

        let (name, value) = match params.as_slice() {
            [] => return Err(RequestError::MissingParam),
            [single] => single,
            _ => {
                return Err(RequestError::TooManyParams {
                    count: params.len(),
                })
            }
        };

        if name != "type" {
            return Err(RequestError::MissingParam);
        }

        OutputKind::from_type_value(value)
            .map(|kind| Self { kind })
            .ok_or_else(|| RequestError::UnknownValue {
                value: value.clone(),
            })
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert PathError to HTTP response.
///
/// Every resolution failure is a `400` with a plain-text cause. Escapes are
/// logged at WARN, missing files at DEBUG.
impl IntoResponse for PathError {
    fn into_response(self) -> Response {
        let message = format!("Could not open path {}: {}", self.path(), self);

        match &self {
            PathError::OutsideRoot { .. } => {
                warn!(path = self.path(), "Rejected path outside web root")
            }
            PathError::NotFound { .. } => debug!(path = self.path(), "{}", message),
            PathError::NotReadable { .. } => warn!(path = self.path(), "{}", message),
        }

        (
            StatusCode::BAD_REQUEST,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            message,
        )
            .into_response()
    }
}

/// Render a malformed `/getResult` query.
///
/// Status stays `200`; the body carries the explanation.
fn request_error_body(err: &RequestError) -> String {
    match err {
        RequestError::MissingParam | RequestError::TooManyParams { .. } => usage_fragment(),
        RequestError::UnknownValue { .. } => message_fragment(&err.to_string()),
    }
}

fn internal_error(err: impl std::fmt::Display) -> Response {
    error!("Failed to build response: {}", err);
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle static file requests.
///
/// # Endpoint
///
/// `GET /{path}` (catch-all)
///
/// # Response
///
/// - `200 OK`: file bytes, streamed in chunks, with `Content-Length`
/// - `400 Bad Request`: path outside the web root, missing, or unreadable
///
/// Directories serve their `index.html`.
pub async fn static_file_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
) -> Result<Response, PathError> {
    let resolved = state.web_root.resolve(uri.path()).await?;
    let cursor = state.streamer.open(&resolved).await?;
    let len = cursor.len();
    let content_type = content_type_for(resolved.as_path());

    let body = if method == Method::HEAD {
        Body::empty()
    } else {
        let (sender, receiver) = mpsc::channel::<io::Result<Bytes>>(1);
        FileStreamer::spawn_into(cursor, sender);
        Body::from_stream(ReceiverStream::new(receiver))
    };

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, len)
        .body(body)
        .unwrap_or_else(internal_error))
}

/// Handle detection requests.
///
/// # Endpoint
///
/// `GET /getResult?type={json|image}`
///
/// # Response
///
/// Always `200 OK`:
/// - `type=json`: `{"faces":[{"x":..,"y":..,"width":..,"height":..}]}`
/// - `type=image`: HTML fragment referencing the annotated image
/// - anything else: HTML usage or diagnostic message; the device is not touched
/// - device, model, or persist failures: HTML diagnostic message
pub async fn get_result_handler(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Response {
    let kind = match ResultQuery::parse(query.as_deref()) {
        Ok(parsed) => parsed.kind,
        Err(e) => {
            debug!(query = query.as_deref().unwrap_or(""), "Malformed query: {}", e);
            return Html(request_error_body(&e)).into_response();
        }
    };

    match state.detection.run(kind).await {
        Ok(DetectionOutcome::Faces(faces)) => match faces_json(&faces) {
            Ok(json) => ([(header::CONTENT_TYPE, "application/json")], json).into_response(),
            Err(e) => Html(message_fragment(&e.to_string())).into_response(),
        },
        Ok(DetectionOutcome::Annotated { url, .. }) => Html(image_fragment(&url)).into_response(),
        Err(e) => {
            warn!(kind = ?kind, "Detection failed: {}", e);
            Html(message_fragment(&e.to_string())).into_response()
        }
    }
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Guess a Content-Type from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}

// =============================================================================
// Tests
// =============================================================================
