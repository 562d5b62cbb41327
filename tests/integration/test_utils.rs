//! Test utilities for integration tests.
//!
//! Provides:
//! - An on-disk web root in a temp directory
//! - Fake frame sources, detectors, and loaders with call counters
//! - Request helpers around `tower::ServiceExt::oneshot`

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use image::{Rgb, RgbImage};
use tempfile::TempDir;
use tower::ServiceExt;

use face_detection_service::{
    create_router, DetectionResult, DetectionService, Detector, DetectorError, DetectorLoader,
    DeviceError, FrameSource, Rect, RouterConfig, WebRoot,
};

// =============================================================================
// Web Root
// =============================================================================

/// A web root in a temp directory, plus a sibling directory outside it.
pub struct TestSite {
    dir: TempDir,
}

impl TestSite {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("web")).unwrap();
        std::fs::write(dir.path().join("secret.txt"), b"top secret").unwrap();
        Self { dir }
    }

    /// Add a file under the web root, creating parent directories.
    pub fn with_file(self, relative: &str, contents: impl AsRef<[u8]>) -> Self {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
        self
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().join("web")
    }

    pub fn outside(&self) -> &Path {
        self.dir.path()
    }

    pub fn web_root(&self) -> WebRoot {
        WebRoot::new(self.root()).unwrap()
    }
}

/// Deterministic file contents of `len` bytes.
pub fn patterned_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

// =============================================================================
// Fake Collaborators
// =============================================================================

/// Frame source returning a fixed gray frame.
pub struct FakeFrames {
    pub captures: AtomicUsize,
    pub fail: bool,
}

impl FakeFrames {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            captures: AtomicUsize::new(0),
            fail: false,
        })
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            captures: AtomicUsize::new(0),
            fail: true,
        })
    }

    pub fn capture_count(&self) -> usize {
        self.captures.load(Ordering::SeqCst)
    }
}

impl FrameSource for FakeFrames {
    fn device(&self) -> u32 {
        0
    }

    fn capture(&self) -> Result<RgbImage, DeviceError> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DeviceError::NotOpen {
                device: 0,
                reason: "no such device".to_string(),
            });
        }
        Ok(RgbImage::from_pixel(64, 48, Rgb([120, 120, 120])))
    }
}

/// Detector returning the same rectangles for every frame.
pub struct FakeDetector {
    faces: Vec<Rect>,
}

impl Detector for FakeDetector {
    fn detect(&self, _frame: &RgbImage) -> DetectionResult {
        DetectionResult::new(self.faces.clone())
    }
}

/// Loader producing a [`FakeDetector`], or failing.
pub struct FakeLoader {
    faces: Vec<Rect>,
    fail: bool,
    pub loads: AtomicUsize,
}

impl FakeLoader {
    pub fn with_faces(faces: Vec<Rect>) -> Arc<Self> {
        Arc::new(Self {
            faces,
            fail: false,
            loads: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            faces: Vec::new(),
            fail: true,
            loads: AtomicUsize::new(0),
        })
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl DetectorLoader for FakeLoader {
    fn load(&self) -> Result<Arc<dyn Detector>, DetectorError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DetectorError::ModelMissing {
                path: "face_model.json".to_string(),
                reason: "No such file or directory".to_string(),
            });
        }
        Ok(Arc::new(FakeDetector {
            faces: self.faces.clone(),
        }))
    }
}

// =============================================================================
// Router Helpers
// =============================================================================

/// Build a router over `site` with the given collaborators.
pub fn create_test_router(
    site: &TestSite,
    frames: Arc<FakeFrames>,
    loader: Arc<FakeLoader>,
    chunk_size: usize,
) -> Router {
    let web_root = site.web_root();
    let annotated = web_root.child("image.jpg").unwrap();
    let detection =
        DetectionService::new(frames, loader, annotated).with_timeout(Duration::from_secs(5));
    let config = RouterConfig::new()
        .with_chunk_size(chunk_size)
        .with_tracing(false);
    create_router(web_root, detection, config)
}

/// Send a GET and collect the whole response.
pub async fn get(router: Router, uri: &str) -> (StatusCode, HeaderMap, Bytes) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body)
}

/// Response body as UTF-8 text.
pub fn text(body: &Bytes) -> String {
    String::from_utf8(body.to_vec()).unwrap()
}
