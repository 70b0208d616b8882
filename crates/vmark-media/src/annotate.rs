//! Frame annotation: filtered boxes, per-box labels, and a summary line.

use image::{ImageBuffer, Rgb};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use vmark_models::{Detection, FilterCriteria};

use crate::font::{self, GLYPH_HEIGHT};
use crate::frames::RgbFrame;

/// Overlay color for boxes and text.
pub const OVERLAY_COLOR: [u8; 3] = [0, 255, 0];
const PLATE_COLOR: [u8; 3] = [0, 0, 0];
const BOX_THICKNESS: u32 = 2;

/// Draw every detection that passes the filter onto the frame, plus a
/// summary line in the top-left corner. Returns the number of boxes drawn.
///
/// Detections that fail the filter get no box or label, but the summary
/// still counts every detection on the frame. A frame whose detections
/// are all filtered out carries the summary overlay alone.
pub fn annotate_frame(
    frame: &mut RgbFrame,
    detections: &[Detection],
    criteria: &FilterCriteria,
) -> usize {
    let drawn: Vec<&Detection> = detections.iter().filter(|d| criteria.matches(d)).collect();

    if !drawn.is_empty() {
        draw_boxes(frame, &drawn);
        for detection in &drawn {
            draw_label(frame, detection);
        }
    }
    draw_summary(frame, &summary_line(detections));

    drawn.len()
}

/// Per-class counts in first-appearance order, e.g. "2 persons, 1 car".
pub fn summary_line(detections: &[Detection]) -> String {
    let mut counts: Vec<(&'static str, usize)> = Vec::new();
    for detection in detections {
        let name = detection.class_name();
        match counts.iter_mut().find(|(n, _)| *n == name) {
            Some((_, count)) => *count += 1,
            None => counts.push((name, 1)),
        }
    }

    counts
        .iter()
        .map(|(name, count)| {
            if *count > 1 {
                format!("{} {}s", count, name)
            } else {
                format!("{} {}", count, name)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn draw_boxes(frame: &mut RgbFrame, drawn: &[&Detection]) {
    let (width, height) = (frame.width, frame.height);
    let mut image: ImageBuffer<Rgb<u8>, Vec<u8>> =
        match ImageBuffer::from_raw(width, height, std::mem::take(&mut frame.data)) {
            Some(image) => image,
            None => return,
        };

    for detection in drawn {
        let b = &detection.bbox;
        let w = (b.width.round() as u32).max(1);
        let h = (b.height.round() as u32).max(1);
        let rect = Rect::at(b.x.round() as i32, b.y.round() as i32).of_size(w, h);
        // Nested rects give a 2px border without a filled draw
        for inset in 0..BOX_THICKNESS {
            if w > 2 * inset && h > 2 * inset {
                let inner = Rect::at(rect.left() + inset as i32, rect.top() + inset as i32)
                    .of_size(w - 2 * inset, h - 2 * inset);
                draw_hollow_rect_mut(&mut image, inner, Rgb(OVERLAY_COLOR));
            }
        }
    }

    frame.data = image.into_raw();
}

/// Label sits just above the box top-left, or just inside it near the top
/// edge of the frame.
fn draw_label(frame: &mut RgbFrame, detection: &Detection) {
    let label = detection.label();
    let x = detection.bbox.x.round() as i64;
    let y_above = detection.bbox.y.round() as i64 - (GLYPH_HEIGHT as i64 + 10);
    let y = if y_above >= 0 {
        y_above
    } else {
        detection.bbox.y.round() as i64 + BOX_THICKNESS as i64 + 1
    };

    font::fill_rect(frame, x - 1, y - 1, font::text_width(&label) + 2, GLYPH_HEIGHT + 2, PLATE_COLOR);
    font::draw_text(frame, &label, x, y, OVERLAY_COLOR);
}

fn draw_summary(frame: &mut RgbFrame, summary: &str) {
    if summary.is_empty() {
        return;
    }
    font::fill_rect(
        frame,
        9,
        9,
        font::text_width(summary) + 2,
        GLYPH_HEIGHT + 2,
        PLATE_COLOR,
    );
    font::draw_text(frame, summary, 10, 10, OVERLAY_COLOR);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use vmark_models::BoundingBox;

    fn det(class_id: usize, confidence: f32) -> Detection {
        Detection {
            bbox: BoundingBox::new(40.0, 40.0, 30.0, 30.0),
            confidence,
            class_id,
        }
    }

    fn criteria(classes: &[&str], min_confidence: f32) -> FilterCriteria {
        FilterCriteria {
            allowed_classes: classes.iter().map(|s| s.to_string()).collect::<HashSet<_>>(),
            min_confidence,
        }
    }

    #[test]
    fn test_annotate_draws_matching_detection() {
        let mut frame = RgbFrame::new(160, 120);
        let drawn = annotate_frame(&mut frame, &[det(0, 0.9)], &criteria(&["person"], 0.5));
        assert_eq!(drawn, 1);
        assert!(frame.data.iter().any(|b| *b != 0));
    }

    /// Byte offset of the first pixel row below the summary overlay. The
    /// test boxes sit at y=40, so anything drawn for them lands past here.
    fn below_summary(frame: &RgbFrame) -> usize {
        32 * frame.width as usize * 3
    }

    #[test]
    fn test_annotate_skips_unselected_class() {
        let mut frame = RgbFrame::new(160, 120);
        // class 2 is "car"
        let drawn = annotate_frame(&mut frame, &[det(2, 0.9)], &criteria(&["person"], 0.5));
        assert_eq!(drawn, 0);
        let cut = below_summary(&frame);
        // No box or label, but the summary still appears top-left
        assert!(frame.data[cut..].iter().all(|b| *b == 0));
        assert!(frame.data[..cut].iter().any(|b| *b != 0));
    }

    #[test]
    fn test_annotate_skips_confidence_at_threshold() {
        let mut frame = RgbFrame::new(160, 120);
        // Filter is strict: exactly-at-threshold must not draw a box
        let drawn = annotate_frame(&mut frame, &[det(0, 0.5)], &criteria(&["person"], 0.5));
        assert_eq!(drawn, 0);
        let cut = below_summary(&frame);
        assert!(frame.data[cut..].iter().all(|b| *b == 0));
        assert!(frame.data[..cut].iter().any(|b| *b != 0));
    }

    #[test]
    fn test_annotate_summary_only_when_all_filtered() {
        let mut frame = RgbFrame::new(160, 120);
        // A confident person against a car-only filter: zero boxes,
        // summary overlay still present
        let drawn = annotate_frame(&mut frame, &[det(0, 0.9)], &criteria(&["car"], 0.5));
        assert_eq!(drawn, 0);
        let cut = below_summary(&frame);
        assert!(frame.data[cut..].iter().all(|b| *b == 0));
        assert!(frame.data[..cut].iter().any(|b| *b != 0));
    }

    #[test]
    fn test_annotate_empty_detections_leaves_frame_blank() {
        let mut frame = RgbFrame::new(160, 120);
        let drawn = annotate_frame(&mut frame, &[], &criteria(&["person"], 0.5));
        assert_eq!(drawn, 0);
        assert!(frame.data.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_annotate_mixed_detections() {
        let mut frame = RgbFrame::new(160, 120);
        let detections = vec![det(0, 0.9), det(0, 0.3), det(2, 0.9)];
        let drawn = annotate_frame(&mut frame, &detections, &criteria(&["person", "car"], 0.5));
        assert_eq!(drawn, 2);
    }

    #[test]
    fn test_summary_line_counts_and_plurals() {
        let detections = vec![det(0, 0.9), det(0, 0.8), det(2, 0.7)];
        assert_eq!(summary_line(&detections), "2 persons, 1 car");
    }

    #[test]
    fn test_summary_line_empty() {
        assert_eq!(summary_line(&[]), "");
    }

    #[test]
    fn test_box_near_frame_edge_does_not_panic() {
        let mut frame = RgbFrame::new(64, 48);
        let detection = Detection {
            bbox: BoundingBox::new(0.0, 0.0, 64.0, 48.0),
            confidence: 0.9,
            class_id: 0,
        };
        let drawn = annotate_frame(&mut frame, &[detection], &criteria(&["person"], 0.0));
        assert_eq!(drawn, 1);
    }
}
