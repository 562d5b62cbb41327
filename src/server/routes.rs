//! Router configuration for the face detection service.
//!
//! # Route Structure
//!
//! ```text
//! /health                        - Health check
//! /getResult?type={json|image}   - Run a detection
//! /                              - Web root index
//! /{*path}                       - Static files from the web root
//! ```
//!
//! # Example
//!
//! ```ignore
//! use face_detection_service::server::routes::{create_router, RouterConfig};
//! use face_detection_service::static_files::WebRoot;
//!
//! let web_root = WebRoot::new("web")?;
//! let router = create_router(web_root, detection_service, RouterConfig::new());
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{get_result_handler, health_handler, static_file_handler, AppState};
use crate::detect::DetectionService;
use crate::static_files::{WebRoot, DEFAULT_CHUNK_SIZE};

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Chunk size for streamed static files
    pub chunk_size: usize,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a new router configuration.
    ///
    /// By default:
    /// - Static files stream in 128 KiB chunks
    /// - Tracing is enabled
    pub fn new() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            enable_tracing: true,
        }
    }

    /// Set the static file chunk size in bytes.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// # Arguments
///
/// * `web_root` - Directory static files are served from
/// * `detection` - Service answering `/getResult`
/// * `config` - Router configuration
///
/// # Returns
///
/// A configured Axum router ready to be served.
pub fn create_router(
    web_root: WebRoot,
    detection: DetectionService,
    config: RouterConfig,
) -> Router {
    let app_state = AppState::new(web_root, detection).with_chunk_size(config.chunk_size);
    let router = build_router(app_state);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the routes over existing state.
///
/// `/getResult` and `/health` take precedence over the catch-all.
pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/getResult", get(get_result_handler))
        .route("/", get(static_file_handler))
        .route("/{*path}", get(static_file_handler))
        .with_state(app_state)
}

// =============================================================================
// Tests
// =============================================================================
