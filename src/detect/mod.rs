//! Face detection layer.
//!
//! Captures a frame from the imaging device, finds faces in it, and renders
//! the result as JSON or as an annotated image in the web root.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │          /getResult Handler             │
//! └────────────────────┬────────────────────┘
//!                      │  OutputKind
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           DetectionService              │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │ FrameSource  │  │    Detector     │  │
//! │  │ (device,     │  │ (loaded once by │  │
//! │  │  guarded)    │  │  DetectorLoader)│  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │  DetectionOutcome
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              formatter                  │
//! │   (JSON, annotated JPEG, HTML bodies)   │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`DetectionService`]: device guard, lazy detector, timeout
//! - [`FrameSource`] / [`StillImageSource`]: frame capture
//! - [`Detector`] / [`DetectorLoader`]: detection capability and its loader
//! - [`SkinToneDetector`] / [`ModelFileLoader`]: bundled detector and model asset loader
//! - [`formatter`]: result rendering

mod detector;
pub mod formatter;
mod frame;
mod service;

pub use detector::{
    DetectionResult, Detector, DetectorLoader, ModelFileLoader, Rect, SkinToneDetector,
    SkinToneModel,
};
pub use formatter::{
    annotate_frame, faces_json, image_fragment, message_fragment, persist_annotated,
    usage_fragment,
};
pub use frame::{device_path, FrameSource, StillImageSource};
pub use service::{DetectionOutcome, DetectionService, OutputKind, DEFAULT_DETECTION_TIMEOUT};
