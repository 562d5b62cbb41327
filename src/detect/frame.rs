//! Frame source collaborator.
//!
//! A [`FrameSource`] yields one still image from an imaging device on demand.
//! Captures are blocking and are always made while holding the device guard
//! owned by [`DetectionService`](super::DetectionService).

use std::path::{Path, PathBuf};

use image::{ImageReader, RgbImage};
use tracing::debug;

use crate::error::DeviceError;

/// Yields single frames from one imaging device.
pub trait FrameSource: Send + Sync {
    /// Device index this source reads from.
    fn device(&self) -> u32;

    /// Capture one frame.
    fn capture(&self) -> Result<RgbImage, DeviceError>;
}

/// Device backed by a still image on disk.
///
/// Device `N` is the JPEG file `video<N>.jpg` inside the capture directory,
/// kept current by whatever grabs frames from the camera.
#[derive(Debug, Clone)]
pub struct StillImageSource {
    capture_dir: PathBuf,
    device: u32,
}

impl StillImageSource {
    pub fn new(capture_dir: impl Into<PathBuf>, device: u32) -> Self {
        Self {
            capture_dir: capture_dir.into(),
            device,
        }
    }

    /// The file this device reads frames from.
    pub fn frame_path(&self) -> PathBuf {
        device_path(&self.capture_dir, self.device)
    }
}

/// Path of device `device`'s frame file inside `capture_dir`.
pub fn device_path(capture_dir: &Path, device: u32) -> PathBuf {
    capture_dir.join(format!("video{}.jpg", device))
}

impl FrameSource for StillImageSource {
    fn device(&self) -> u32 {
        self.device
    }

    fn capture(&self) -> Result<RgbImage, DeviceError> {
        let path = self.frame_path();

        let reader = ImageReader::open(&path).map_err(|e| DeviceError::NotOpen {
            device: self.device,
            reason: format!("{}: {}", path.display(), e),
        })?;

        let image = reader.decode().map_err(|e| DeviceError::ReadFailed {
            device: self.device,
            reason: e.to_string(),
        })?;

        debug!(
            device = self.device,
            width = image.width(),
            height = image.height(),
            "Captured frame"
        );

        Ok(image.to_rgb8())
    }
}

// =============================================================================
// Tests
// =============================================================================
