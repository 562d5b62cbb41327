//! Rendering of detection results.
//!
//! - JSON: `{"faces":[{"x":..,"y":..,"width":..,"height":..}, ...]}`
//! - Image: the frame with one outline per face, written as JPEG into the web
//!   root, plus an HTML fragment pointing at it
//! - HTML fragments for usage and diagnostic messages

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};

use crate::error::PersistError;

use super::detector::{DetectionResult, Rect};

/// Outline color for detected faces (magenta).
pub const OUTLINE_COLOR: Rgb<u8> = Rgb([255, 0, 255]);

/// Default JPEG quality of the annotated image.
pub const DEFAULT_ANNOTATED_QUALITY: u8 = 90;

/// Heading that starts every HTML response of the detection endpoint.
pub const HEADING: &str = "<h1>Face Detection Service</h1>";

/// Usage line for malformed queries.
pub const USAGE: &str = "Usage: ?type={ json | image }";

// =============================================================================
// JSON
// =============================================================================

/// Serialize a detection result, preserving detector order.
pub fn faces_json(result: &DetectionResult) -> serde_json::Result<String> {
    serde_json::to_string(result)
}

// =============================================================================
// Annotated Image
// =============================================================================

/// Copy `frame` and draw a 1px outline for every rectangle.
///
/// Rectangles are clipped to the frame; fully outside ones draw nothing.
pub fn annotate_frame(frame: &RgbImage, faces: &[Rect]) -> RgbImage {
    let mut annotated = frame.clone();
    for rect in faces {
        draw_outline(&mut annotated, rect, OUTLINE_COLOR);
    }
    annotated
}

fn draw_outline(img: &mut RgbImage, rect: &Rect, color: Rgb<u8>) {
    if rect.width <= 0 || rect.height <= 0 {
        return;
    }

    let (w, h) = (img.width() as i64, img.height() as i64);
    let left = rect.x as i64;
    let top = rect.y as i64;
    let right = left + rect.width as i64 - 1;
    let bottom = top + rect.height as i64 - 1;

    let mut put = |x: i64, y: i64| {
        if (0..w).contains(&x) && (0..h).contains(&y) {
            img.put_pixel(x as u32, y as u32, color);
        }
    };

    for x in left.max(0)..=right.min(w - 1) {
        put(x, top);
        put(x, bottom);
    }
    for y in top.max(0)..=bottom.min(h - 1) {
        put(left, y);
        put(right, y);
    }
}

/// Write `image` as JPEG to `path`.
///
/// The file is written next to the target and renamed over it, so readers
/// see either the previous image or the new one.
pub fn persist_annotated(image: &RgbImage, path: &Path, quality: u8) -> Result<(), PersistError> {
    let write_failed = |reason: String| PersistError::WriteFailed {
        path: path.display().to_string(),
        reason,
    };

    let mut tmp_name = path
        .file_name()
        .ok_or_else(|| write_failed("path has no file name".to_string()))?
        .to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let result = (|| {
        let file = File::create(&tmp_path).map_err(|e| write_failed(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100))
            .encode_image(image)
            .map_err(|e| write_failed(e.to_string()))?;
        writer.flush().map_err(|e| write_failed(e.to_string()))?;
        std::fs::rename(&tmp_path, path).map_err(|e| write_failed(e.to_string()))
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&tmp_path);
    }
    result
}

// =============================================================================
// HTML Fragments
// =============================================================================

/// Escape HTML special characters.
pub fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// Body for a query with the wrong number or name of parameters.
pub fn usage_fragment() -> String {
    format!("{HEADING}<p>Wrong parameter</p><p>{USAGE}</p>")
}

/// Body for a diagnostic message.
pub fn message_fragment(message: &str) -> String {
    format!("{HEADING}<p>{}</p>", html_escape(message))
}

/// Body embedding the freshly written annotated image.
pub fn image_fragment(image_url: &str) -> String {
    format!("{HEADING}<img src=\"{}\">", html_escape(image_url))
}

// =============================================================================
// Tests
// =============================================================================
