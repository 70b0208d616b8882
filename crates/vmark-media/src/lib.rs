//! Video annotation engine: FFmpeg frame I/O, ONNX object detection, and
//! overlay drawing.
//!
//! The high-level entry point is [`pipeline::annotate_video`], which wires a
//! decode pipe, a detector, the annotator, and an encode pipe into one
//! streaming pass over the input.

pub mod annotate;
pub mod detect;
pub mod error;
pub mod font;
pub mod frames;
pub mod pipeline;
pub mod probe;
pub mod workdir;

pub use annotate::annotate_frame;
pub use detect::{Detector, DetectorConfig, OnnxDetector};
pub use error::{MediaError, MediaResult};
pub use frames::{FrameDecoder, FrameEncoder, RgbFrame};
pub use pipeline::{annotate_video, PipelineOptions, RunOutcome};
pub use probe::{probe_video, VideoInfo};
pub use workdir::RunScratch;
