//! Object detection backends.
//!
//! The pipeline only depends on the `Detector` trait, so inference engines
//! stay swappable (and tests can substitute a canned detector).

pub mod onnx;

use crate::error::MediaResult;
use crate::frames::RgbFrame;
use vmark_models::Detection;

pub use onnx::{DetectorConfig, OnnxDetector};

/// Per-frame object detection provider.
///
/// `detect` is synchronous and CPU/GPU bound; callers run it inside
/// `spawn_blocking` so the async pipeline is not stalled.
pub trait Detector: Send + Sync {
    /// Detect objects in one frame. Boxes come back in pixel coordinates,
    /// clamped to the frame.
    fn detect(&self, frame: &RgbFrame) -> MediaResult<Vec<Detection>>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}
