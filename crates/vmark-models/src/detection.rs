//! Detections and bounding boxes.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::classes::class_name;

/// An axis-aligned bounding box in pixel coordinates of the source frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    /// X coordinate of the top-left corner.
    pub x: f32,
    /// Y coordinate of the top-left corner.
    pub y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Right edge (exclusive).
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Area in square pixels.
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Center point.
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Clamp the box to frame bounds, shrinking where it overflows.
    pub fn clamp(&self, frame_width: u32, frame_height: u32) -> Self {
        let x = self.x.max(0.0).min(frame_width as f32);
        let y = self.y.max(0.0).min(frame_height as f32);
        let width = self.width.min(frame_width as f32 - x).max(0.0);
        let height = self.height.min(frame_height as f32 - y).max(0.0);
        Self { x, y, width, height }
    }
}

/// One predicted object instance: bounding box + confidence + class.
///
/// Produced fresh per frame by the detector; lifetime is one frame
/// iteration, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Detection {
    /// Bounding box in pixel coordinates of the source frame.
    #[serde(rename = "box")]
    pub bbox: BoundingBox,
    /// Detection confidence in [0, 1].
    pub confidence: f32,
    /// COCO class id (0 = person, 2 = car, ...).
    pub class_id: usize,
}

impl Detection {
    /// Create a new detection.
    pub fn new(bbox: BoundingBox, confidence: f32, class_id: usize) -> Self {
        Self { bbox, confidence, class_id }
    }

    /// Human-readable class name for this detection.
    pub fn class_name(&self) -> &'static str {
        class_name(self.class_id)
    }

    /// Check if this is a person detection.
    pub fn is_person(&self) -> bool {
        self.class_id == 0
    }

    /// Label text drawn above the box: `"<class> <confidence>"` with the
    /// confidence rounded to two decimals and trailing zeros trimmed
    /// (0.9, not 0.90).
    pub fn label(&self) -> String {
        let rounded = (self.confidence * 100.0).round() / 100.0;
        format!("{} {}", self.class_name(), rounded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_geometry() {
        let bbox = BoundingBox::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(bbox.right(), 40.0);
        assert_eq!(bbox.bottom(), 60.0);
        assert_eq!(bbox.area(), 1200.0);
        assert_eq!(bbox.center(), (25.0, 40.0));
    }

    #[test]
    fn test_bbox_clamp() {
        let bbox = BoundingBox::new(-5.0, 90.0, 50.0, 50.0).clamp(100, 100);
        assert_eq!(bbox.x, 0.0);
        assert_eq!(bbox.y, 90.0);
        assert_eq!(bbox.width, 50.0);
        assert_eq!(bbox.height, 10.0);
    }

    #[test]
    fn test_detection_label() {
        let det = Detection::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0), 0.9, 0);
        assert_eq!(det.label(), "person 0.9");

        let det = Detection::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0), 0.857, 2);
        assert_eq!(det.label(), "car 0.86");
    }

    #[test]
    fn test_detection_class_name() {
        let det = Detection::new(BoundingBox::new(0.0, 0.0, 1.0, 1.0), 0.5, 2);
        assert!(!det.is_person());
        assert_eq!(det.class_name(), "car");
    }

    #[test]
    fn test_detection_serde_roundtrip() {
        let det = Detection::new(BoundingBox::new(1.0, 2.0, 3.0, 4.0), 0.75, 0);
        let json = serde_json::to_string(&det).unwrap();
        assert!(json.contains("\"box\""));
        let back: Detection = serde_json::from_str(&json).unwrap();
        assert_eq!(back.class_id, 0);
        assert_eq!(back.bbox, det.bbox);
    }
}
