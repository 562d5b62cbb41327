//! Configuration management for the face detection service.
//!
//! This module provides the command-line interface:
//! - `serve` (default): run the HTTP server
//! - `check`: validate the web root, model asset, and device without binding
//!
//! # Example
//!
//! ```ignore
//! use face_detection_service::config::{Cli, Command};
//!
//! let cli = Cli::parse();
//! match cli.into_command() {
//!     Command::Serve(config) => println!("Listening on {}", config.bind_address()),
//!     Command::Check(config) => println!("Checking {}", config.serve.web_root.display()),
//! }
//! ```
//!
//! # Environment Variables
//!
//! All serve options can be set via environment variables with the `FDS_` prefix:
//!
//! - `FDS_HOST` - Server bind address (default: 0.0.0.0)
//! - `FDS_PORT` - Server port (default: 8080)
//! - `FDS_WEB_ROOT` - Directory served as static files (default: web)
//! - `FDS_MODEL` - Detector model asset (default: face_model.json)
//! - `FDS_DEVICE` - Imaging device index (default: 0)
//! - `FDS_CAPTURE_DIR` - Directory holding device frames (default: captures)
//! - `FDS_CHUNK_SIZE` - Static file chunk size in bytes (default: 131072)
//! - `FDS_DETECTION_TIMEOUT` - Detection timeout in seconds (default: 10)
//! - `FDS_ANNOTATED_IMAGE` - Annotated image file name in the web root (default: image.jpg)
//! - `FDS_JPEG_QUALITY` - Annotated image JPEG quality (default: 90)

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::detect::formatter::DEFAULT_ANNOTATED_QUALITY;
use crate::static_files::DEFAULT_CHUNK_SIZE;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default web root directory.
pub const DEFAULT_WEB_ROOT: &str = "web";

/// Default detector model asset.
pub const DEFAULT_MODEL: &str = "face_model.json";

/// Default capture directory.
pub const DEFAULT_CAPTURE_DIR: &str = "captures";

/// Default annotated image file name.
pub const DEFAULT_ANNOTATED_IMAGE: &str = "image.jpg";

/// Default detection timeout in seconds.
pub const DEFAULT_DETECTION_TIMEOUT_SECS: u64 = 10;

/// Smallest accepted chunk size (1 KiB).
pub const MIN_CHUNK_SIZE: usize = 1024;

/// Largest accepted chunk size (16 MiB).
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

// =============================================================================
// CLI
// =============================================================================

/// Face Detection Service - static files and on-demand face detection over HTTP.
#[derive(Parser, Debug, Clone)]
#[command(name = "face-detection-service")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Serve options, used when no subcommand is given.
    #[command(flatten)]
    pub serve: ServeConfig,
}

impl Cli {
    /// Resolve the command to run, defaulting to `serve`.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server (default).
    Serve(ServeConfig),

    /// Check the configuration without starting the server.
    Check(CheckConfig),
}

// =============================================================================
// Serve Configuration
// =============================================================================

/// Options of the `serve` command.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "FDS_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "FDS_PORT")]
    pub port: u16,

    // =========================================================================
    // Static Files
    // =========================================================================
    /// Directory served as static files. Nothing outside it is reachable.
    #[arg(long, default_value = DEFAULT_WEB_ROOT, env = "FDS_WEB_ROOT")]
    pub web_root: PathBuf,

    /// Chunk size in bytes for streamed files.
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE, env = "FDS_CHUNK_SIZE")]
    pub chunk_size: usize,

    // =========================================================================
    // Detection
    // =========================================================================
    /// Detector model asset (JSON).
    #[arg(long, default_value = DEFAULT_MODEL, env = "FDS_MODEL")]
    pub model: PathBuf,

    /// Imaging device index.
    #[arg(long, default_value_t = 0, env = "FDS_DEVICE")]
    pub device: u32,

    /// Directory holding device frames (`video<N>.jpg`).
    #[arg(long, default_value = DEFAULT_CAPTURE_DIR, env = "FDS_CAPTURE_DIR")]
    pub capture_dir: PathBuf,

    /// Upper bound in seconds on queueing, capture, and detection.
    #[arg(long, default_value_t = DEFAULT_DETECTION_TIMEOUT_SECS, env = "FDS_DETECTION_TIMEOUT")]
    pub detection_timeout: u64,

    /// File name of the annotated image, written into the web root.
    #[arg(long, default_value = DEFAULT_ANNOTATED_IMAGE, env = "FDS_ANNOTATED_IMAGE")]
    pub annotated_image: String,

    /// JPEG quality of the annotated image (1-100).
    #[arg(long, default_value_t = DEFAULT_ANNOTATED_QUALITY, env = "FDS_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    /// Refuse detection requests while the device is in use instead of queueing.
    #[arg(long, default_value_t = false, env = "FDS_FAIL_FAST")]
    pub fail_fast: bool,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("port must be greater than 0".to_string());
        }

        if self.chunk_size < MIN_CHUNK_SIZE || self.chunk_size > MAX_CHUNK_SIZE {
            return Err("chunk_size must be between 1KB and 16MB".to_string());
        }

        if self.detection_timeout == 0 {
            return Err("detection_timeout must be at least 1 second".to_string());
        }

        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err("jpeg_quality must be between 1 and 100".to_string());
        }

        if !is_plain_file_name(&self.annotated_image) {
            return Err(format!(
                "annotated_image must be a plain file name, got '{}'",
                self.annotated_image
            ));
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Detection timeout as a Duration.
    pub fn detection_timeout(&self) -> Duration {
        Duration::from_secs(self.detection_timeout)
    }
}

fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

// =============================================================================
// Check Configuration
// =============================================================================

/// Options of the `check` command.
#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    #[command(flatten)]
    pub serve: ServeConfig,

    /// Also capture one frame and run the detector on it.
    #[arg(long, default_value_t = false)]
    pub capture: bool,
}

// =============================================================================
// Tests
// =============================================================================
