//! Detection service.
//!
//! Owns the imaging device and the lazily loaded detector, and runs one
//! capture → detect (→ annotate → persist) sequence per request.
//!
//! # Device Access
//!
//! ```text
//!   request ─► detector (OnceCell, loaded on first use)
//!          ─► device guard (Mutex, requests queue here)
//!          ─► blocking pool: capture ─► detect ─► [annotate ─► persist]
//!          ─► guard released when the blocking work ends
//! ```
//!
//! The whole sequence, including time spent queueing for the device, is
//! bounded by the detection timeout. With fail-fast enabled a request that
//! finds the device held is refused with `DeviceError::Busy` instead of
//! queueing.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

use crate::error::{DetectionError, DeviceError};

use super::detector::{DetectionResult, Detector, DetectorLoader};
use super::formatter::{annotate_frame, persist_annotated, DEFAULT_ANNOTATED_QUALITY};
use super::frame::FrameSource;

/// Default bound on capture + detection.
pub const DEFAULT_DETECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// How the result of a detection is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Rectangles as JSON
    Json,
    /// Annotated frame written into the web root
    Image,
}

impl OutputKind {
    /// Parse the value of the `type` query parameter.
    pub fn from_type_value(value: &str) -> Option<Self> {
        match value {
            "json" => Some(OutputKind::Json),
            "image" => Some(OutputKind::Image),
            _ => None,
        }
    }
}

/// Result of a successful detection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionOutcome {
    /// Rectangles to serialize
    Faces(DetectionResult),
    /// The annotated image was written; `url` is its path under the web root
    Annotated { url: String, faces: DetectionResult },
}

/// Runs detections against one device.
pub struct DetectionService {
    frames: Arc<dyn FrameSource>,
    loader: Arc<dyn DetectorLoader>,
    detector: OnceCell<Arc<dyn Detector>>,
    device_guard: Arc<Mutex<()>>,
    timeout: Duration,
    annotated_path: PathBuf,
    annotated_url: String,
    jpeg_quality: u8,
    fail_fast: bool,
}

impl DetectionService {
    /// Create a service writing annotated images to `annotated_path`.
    ///
    /// The image URL defaults to the file name of `annotated_path`, which is
    /// correct when the file sits directly in the web root.
    pub fn new(
        frames: Arc<dyn FrameSource>,
        loader: Arc<dyn DetectorLoader>,
        annotated_path: impl Into<PathBuf>,
    ) -> Self {
        let annotated_path = annotated_path.into();
        let annotated_url = annotated_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            frames,
            loader,
            detector: OnceCell::new(),
            device_guard: Arc::new(Mutex::new(())),
            timeout: DEFAULT_DETECTION_TIMEOUT,
            annotated_path,
            annotated_url,
            jpeg_quality: DEFAULT_ANNOTATED_QUALITY,
            fail_fast: false,
        }
    }

    /// Set the bound on queueing + capture + detection.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the URL used in the image fragment.
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.annotated_url = url.into();
        self
    }

    /// Set the JPEG quality of the annotated image.
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    /// Refuse requests with `DeviceError::Busy` while the device is held.
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    pub fn annotated_path(&self) -> &Path {
        &self.annotated_path
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether the detector has been loaded yet.
    pub fn is_detector_loaded(&self) -> bool {
        self.detector.initialized()
    }

    /// Get the detector, loading it on first use.
    ///
    /// A failed load is not remembered; the next call tries again.
    pub async fn detector(&self) -> Result<Arc<dyn Detector>, DetectionError> {
        let detector = self
            .detector
            .get_or_try_init(|| async {
                let loader = Arc::clone(&self.loader);
                tokio::task::spawn_blocking(move || loader.load())
                    .await
                    .map_err(|e| DetectionError::Internal(e.to_string()))?
                    .map_err(DetectionError::from)
            })
            .await?;
        Ok(Arc::clone(detector))
    }

    /// Capture a frame and run detection on it.
    ///
    /// On timeout the blocking capture cannot be interrupted and keeps the
    /// device until it returns, but a timed-out image run never writes the
    /// annotated file.
    pub async fn run(&self, kind: OutputKind) -> Result<DetectionOutcome, DetectionError> {
        let detector = self.detector().await?;
        let frames = Arc::clone(&self.frames);
        let device = frames.device();
        let persist_to = match kind {
            OutputKind::Image => Some(self.annotated_path.clone()),
            OutputKind::Json => None,
        };
        let quality = self.jpeg_quality;
        let seconds = self.timeout.as_secs();
        let cancelled = Arc::new(AtomicBool::new(false));
        let abandoned = Arc::clone(&cancelled);

        let work = async {
            let guard = if self.fail_fast {
                Arc::clone(&self.device_guard)
                    .try_lock_owned()
                    .map_err(|_| DeviceError::Busy)?
            } else {
                Arc::clone(&self.device_guard).lock_owned().await
            };
            debug!(device, "Acquired device");

            let faces = tokio::task::spawn_blocking(move || {
                let _guard = guard;
                let frame = frames.capture()?;
                let faces = detector.detect(&frame);
                if let Some(path) = persist_to {
                    if abandoned.load(Ordering::SeqCst) {
                        debug!(device, "Request timed out; annotated image not written");
                        return Err(DetectionError::from(DeviceError::Timeout { seconds }));
                    }
                    let annotated = annotate_frame(&frame, &faces.faces);
                    persist_annotated(&annotated, &path, quality)?;
                }
                Ok::<_, DetectionError>(faces)
            })
            .await
            .map_err(|e| DetectionError::Internal(e.to_string()))??;
            Ok::<_, DetectionError>(faces)
        };

        let faces = match tokio::time::timeout(self.timeout, work).await {
            Ok(result) => result?,
            Err(_) => {
                cancelled.store(true, Ordering::SeqCst);
                return Err(DeviceError::Timeout { seconds }.into());
            }
        };

        info!(device, faces = faces.len(), kind = ?kind, "Detection complete");

        Ok(match kind {
            OutputKind::Json => DetectionOutcome::Faces(faces),
            OutputKind::Image => DetectionOutcome::Annotated {
                url: self.annotated_url.clone(),
                faces,
            },
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
