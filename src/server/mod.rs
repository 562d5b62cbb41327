//! HTTP server layer for the face detection service.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │          GET /getResult?type=...        GET /{*path}            │
//! │                                                                 │
//! │  ┌──────────────────────────────┐  ┌─────────────────────────┐  │
//! │  │          handlers            │  │        routes           │  │
//! │  │ (query parsing, responses)   │  │  (router config)        │  │
//! │  └──────────────────────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;

pub use handlers::{
    content_type_for, get_result_handler, health_handler, static_file_handler, AppState,
    HealthResponse, ResultQuery,
};
pub use routes::{build_router, create_router, RouterConfig};
