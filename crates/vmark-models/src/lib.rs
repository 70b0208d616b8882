//! Shared data models for the vmark annotation service.
//!
//! This crate provides Serde-serializable types for:
//! - Detections and bounding boxes
//! - Filter criteria (class allowlist + confidence threshold)
//! - Run identifiers and run metadata
//! - The COCO class table the detector predicts over

pub mod classes;
pub mod detection;
pub mod filter;
pub mod run;

// Re-export common types
pub use classes::{class_name, COCO_CLASSES};
pub use detection::{BoundingBox, Detection};
pub use filter::FilterCriteria;
pub use run::{RunId, RunSummary};
