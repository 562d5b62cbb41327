//! Detector collaborator.
//!
//! A [`Detector`] takes a frame and returns the rectangles it found. It is
//! created by a [`DetectorLoader`] the first time a detection is requested.
//!
//! The bundled [`SkinToneDetector`] is a light-weight region detector: it
//! classifies pixels in YCbCr space, marks grid cells that are mostly skin,
//! and reports the bounding boxes of connected cell regions whose size and
//! aspect ratio look like a face. Its thresholds come from a JSON model asset:
//!
//! ```json
//! {
//!   "cell_size": 8,
//!   "cb_range": [77, 127],
//!   "cr_range": [133, 173],
//!   "cell_ratio": 0.6,
//!   "min_size": 24,
//!   "aspect_range": [0.5, 1.6],
//!   "max_faces": 16
//! }
//! ```

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::DetectorError;

// =============================================================================
// Detection Result
// =============================================================================

/// An axis-aligned rectangle in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Rectangles found in one frame, in detector output order.
///
/// Serializes as `{"faces":[...]}`; an empty result is `{"faces":[]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub faces: Vec<Rect>,
}

impl DetectionResult {
    pub fn new(faces: Vec<Rect>) -> Self {
        Self { faces }
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

// =============================================================================
// Traits
// =============================================================================

/// Finds faces in a frame.
///
/// Called from the blocking thread pool, one frame at a time.
pub trait Detector: Send + Sync {
    fn detect(&self, frame: &RgbImage) -> DetectionResult;
}

/// Builds a [`Detector`], typically by reading a model asset.
pub trait DetectorLoader: Send + Sync {
    fn load(&self) -> Result<Arc<dyn Detector>, DetectorError>;
}

// =============================================================================
// Skin Tone Detector
// =============================================================================

/// Thresholds for [`SkinToneDetector`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkinToneModel {
    /// Edge length of a grid cell in pixels
    pub cell_size: u32,

    /// Inclusive Cb range of skin pixels
    pub cb_range: [u8; 2],

    /// Inclusive Cr range of skin pixels
    pub cr_range: [u8; 2],

    /// Fraction of skin pixels for a cell to count as skin
    pub cell_ratio: f32,

    /// Minimum width and height of a reported region in pixels
    pub min_size: u32,

    /// Allowed width/height ratio of a reported region
    pub aspect_range: [f32; 2],

    /// Maximum number of regions reported per frame
    #[serde(default = "default_max_faces")]
    pub max_faces: usize,
}

fn default_max_faces() -> usize {
    16
}

impl Default for SkinToneModel {
    fn default() -> Self {
        Self {
            cell_size: 8,
            cb_range: [77, 127],
            cr_range: [133, 173],
            cell_ratio: 0.6,
            min_size: 24,
            aspect_range: [0.5, 1.6],
            max_faces: default_max_faces(),
        }
    }
}

impl SkinToneModel {
    /// Check that the thresholds describe a usable model.
    pub fn validate(&self) -> Result<(), String> {
        if self.cell_size == 0 {
            return Err("cell_size must be greater than 0".to_string());
        }
        if self.cb_range[0] > self.cb_range[1] || self.cr_range[0] > self.cr_range[1] {
            return Err("cb_range and cr_range must be [min, max]".to_string());
        }
        if !(self.cell_ratio > 0.0 && self.cell_ratio <= 1.0) {
            return Err("cell_ratio must be in (0, 1]".to_string());
        }
        if !(self.aspect_range[0] > 0.0 && self.aspect_range[0] <= self.aspect_range[1]) {
            return Err("aspect_range must be [min, max] with min > 0".to_string());
        }
        Ok(())
    }
}

/// Region detector driven by a [`SkinToneModel`].
#[derive(Debug, Clone)]
pub struct SkinToneDetector {
    model: SkinToneModel,
}

impl SkinToneDetector {
    pub fn new(model: SkinToneModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &SkinToneModel {
        &self.model
    }

    fn is_skin(&self, [r, g, b]: [u8; 3]) -> bool {
        let (r, g, b) = (r as f32, g as f32, b as f32);
        let cb = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
        let cr = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;
        let [cb_min, cb_max] = self.model.cb_range;
        let [cr_min, cr_max] = self.model.cr_range;
        (cb_min as f32..=cb_max as f32).contains(&cb) && (cr_min as f32..=cr_max as f32).contains(&cr)
    }

    /// Mark grid cells whose skin-pixel share reaches `cell_ratio`.
    fn skin_cells(&self, frame: &RgbImage) -> (Vec<bool>, u32, u32) {
        let cell = self.model.cell_size;
        let cols = frame.width().div_ceil(cell);
        let rows = frame.height().div_ceil(cell);
        let mut cells = vec![false; (cols * rows) as usize];

        for row in 0..rows {
            for col in 0..cols {
                let x0 = col * cell;
                let y0 = row * cell;
                let x1 = (x0 + cell).min(frame.width());
                let y1 = (y0 + cell).min(frame.height());

                let mut skin = 0u32;
                for y in y0..y1 {
                    for x in x0..x1 {
                        if self.is_skin(frame.get_pixel(x, y).0) {
                            skin += 1;
                        }
                    }
                }

                let total = (x1 - x0) * (y1 - y0);
                cells[(row * cols + col) as usize] =
                    skin as f32 >= self.model.cell_ratio * total as f32;
            }
        }

        (cells, cols, rows)
    }
}

impl Detector for SkinToneDetector {
    fn detect(&self, frame: &RgbImage) -> DetectionResult {
        let (cells, cols, rows) = self.skin_cells(frame);
        let cell = self.model.cell_size;
        let mut visited = vec![false; cells.len()];
        let mut faces = Vec::new();
        let mut queue = VecDeque::new();

        // row-major scan, so regions come out top-to-bottom, left-to-right
        for start in 0..cells.len() {
            if !cells[start] || visited[start] {
                continue;
            }

            let (mut min_c, mut min_r) = (u32::MAX, u32::MAX);
            let (mut max_c, mut max_r) = (0u32, 0u32);
            visited[start] = true;
            queue.push_back(start);

            while let Some(idx) = queue.pop_front() {
                let (c, r) = (idx as u32 % cols, idx as u32 / cols);
                min_c = min_c.min(c);
                max_c = max_c.max(c);
                min_r = min_r.min(r);
                max_r = max_r.max(r);

                let neighbours = [
                    (c > 0).then(|| idx - 1),
                    (c + 1 < cols).then(|| idx + 1),
                    (r > 0).then(|| idx - cols as usize),
                    (r + 1 < rows).then(|| idx + cols as usize),
                ];
                for next in neighbours.into_iter().flatten() {
                    if cells[next] && !visited[next] {
                        visited[next] = true;
                        queue.push_back(next);
                    }
                }
            }

            let x = min_c * cell;
            let y = min_r * cell;
            let width = ((max_c + 1) * cell).min(frame.width()) - x;
            let height = ((max_r + 1) * cell).min(frame.height()) - y;
            if width < self.model.min_size || height < self.model.min_size {
                continue;
            }

            let aspect = width as f32 / height as f32;
            let [min_aspect, max_aspect] = self.model.aspect_range;
            if aspect < min_aspect || aspect > max_aspect {
                continue;
            }

            faces.push(Rect::new(x as i32, y as i32, width as i32, height as i32));
            if faces.len() == self.model.max_faces {
                break;
            }
        }

        debug!(faces = faces.len(), cols, rows, "Skin tone detection finished");
        DetectionResult::new(faces)
    }
}

// =============================================================================
// Model File Loader
// =============================================================================

/// Loads a [`SkinToneModel`] from a JSON model asset.
#[derive(Debug, Clone)]
pub struct ModelFileLoader {
    path: PathBuf,
}

impl ModelFileLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and validate the model asset.
    pub fn read_model(&self) -> Result<SkinToneModel, DetectorError> {
        let display = self.path.display().to_string();
        let text = std::fs::read_to_string(&self.path).map_err(|e| DetectorError::ModelMissing {
            path: display.clone(),
            reason: e.to_string(),
        })?;

        let model: SkinToneModel =
            serde_json::from_str(&text).map_err(|e| DetectorError::ModelInvalid {
                path: display.clone(),
                reason: e.to_string(),
            })?;

        model
            .validate()
            .map_err(|reason| DetectorError::ModelInvalid {
                path: display,
                reason,
            })?;

        Ok(model)
    }
}

impl DetectorLoader for ModelFileLoader {
    fn load(&self) -> Result<Arc<dyn Detector>, DetectorError> {
        let model = self.read_model()?;
        info!(model = %self.path.display(), "Loaded face detection model");
        Ok(Arc::new(SkinToneDetector::new(model)))
    }
}

// =============================================================================
// Tests
// =============================================================================
