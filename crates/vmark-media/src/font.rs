//! Tiny built-in 8x12 bitmap font for overlay text.
//!
//! Overlays only ever render lowercase class names, digits, and a little
//! punctuation, so a fixed glyph table keeps the crate free of font assets
//! and rasterizer dependencies.

use crate::frames::RgbFrame;

pub const GLYPH_WIDTH: usize = 8;
pub const GLYPH_HEIGHT: usize = 12;

/// Pixel width of a rendered string.
pub fn text_width(text: &str) -> usize {
    text.chars().count() * GLYPH_WIDTH
}

/// Draw `text` with its top-left corner at (x, y). Pixels outside the frame
/// are clipped.
pub fn draw_text(frame: &mut RgbFrame, text: &str, x: i64, y: i64, color: [u8; 3]) {
    let width = frame.width as i64;
    let height = frame.height as i64;
    let mut cursor_x = x;

    for ch in text.chars() {
        if cursor_x >= width {
            break;
        }
        if let Some(rows) = glyph(ch) {
            for (row, bits) in rows.iter().enumerate() {
                let py = y + row as i64;
                if py < 0 || py >= height {
                    continue;
                }
                for col in 0..GLYPH_WIDTH {
                    if (bits >> (7 - col)) & 1 == 0 {
                        continue;
                    }
                    let px = cursor_x + col as i64;
                    if px < 0 || px >= width {
                        continue;
                    }
                    let idx = (py as usize * frame.width as usize + px as usize) * 3;
                    frame.data[idx..idx + 3].copy_from_slice(&color);
                }
            }
        }
        cursor_x += GLYPH_WIDTH as i64;
    }
}

/// Fill a solid rectangle, clipped to the frame. Used as a backing plate
/// behind text so it stays readable over busy frames.
pub fn fill_rect(frame: &mut RgbFrame, x: i64, y: i64, w: usize, h: usize, color: [u8; 3]) {
    let width = frame.width as i64;
    let height = frame.height as i64;
    for py in y..y + h as i64 {
        if py < 0 || py >= height {
            continue;
        }
        for px in x..x + w as i64 {
            if px < 0 || px >= width {
                continue;
            }
            let idx = (py as usize * frame.width as usize + px as usize) * 3;
            frame.data[idx..idx + 3].copy_from_slice(&color);
        }
    }
}

/// Glyph rows, one byte per row, MSB leftmost. Unknown characters render as
/// blank space.
fn glyph(ch: char) -> Option<&'static [u8; GLYPH_HEIGHT]> {
    let rows: &'static [u8; GLYPH_HEIGHT] = match ch {
        'a' => &[0x00, 0x00, 0x00, 0x3C, 0x02, 0x3E, 0x42, 0x42, 0x46, 0x3A, 0x00, 0x00],
        'b' => &[0x00, 0x40, 0x40, 0x5C, 0x62, 0x42, 0x42, 0x42, 0x62, 0x5C, 0x00, 0x00],
        'c' => &[0x00, 0x00, 0x00, 0x3C, 0x42, 0x40, 0x40, 0x40, 0x42, 0x3C, 0x00, 0x00],
        'd' => &[0x00, 0x02, 0x02, 0x3A, 0x46, 0x42, 0x42, 0x42, 0x46, 0x3A, 0x00, 0x00],
        'e' => &[0x00, 0x00, 0x00, 0x3C, 0x42, 0x7E, 0x40, 0x40, 0x42, 0x3C, 0x00, 0x00],
        'f' => &[0x00, 0x0C, 0x10, 0x10, 0x7C, 0x10, 0x10, 0x10, 0x10, 0x10, 0x00, 0x00],
        'g' => &[0x00, 0x00, 0x00, 0x3A, 0x46, 0x42, 0x46, 0x3A, 0x02, 0x3C, 0x00, 0x00],
        'h' => &[0x00, 0x40, 0x40, 0x5C, 0x62, 0x42, 0x42, 0x42, 0x42, 0x42, 0x00, 0x00],
        'i' => &[0x00, 0x08, 0x00, 0x18, 0x08, 0x08, 0x08, 0x08, 0x08, 0x3E, 0x00, 0x00],
        'j' => &[0x00, 0x04, 0x00, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x44, 0x38, 0x00, 0x00],
        'k' => &[0x00, 0x40, 0x40, 0x44, 0x48, 0x70, 0x48, 0x44, 0x42, 0x41, 0x00, 0x00],
        'l' => &[0x00, 0x18, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x3E, 0x00, 0x00],
        'm' => &[0x00, 0x00, 0x00, 0x76, 0x49, 0x49, 0x49, 0x49, 0x49, 0x49, 0x00, 0x00],
        'n' => &[0x00, 0x00, 0x00, 0x5C, 0x62, 0x42, 0x42, 0x42, 0x42, 0x42, 0x00, 0x00],
        'o' => &[0x00, 0x00, 0x00, 0x3C, 0x42, 0x42, 0x42, 0x42, 0x42, 0x3C, 0x00, 0x00],
        'p' => &[0x00, 0x00, 0x00, 0x5C, 0x62, 0x42, 0x62, 0x5C, 0x40, 0x40, 0x00, 0x00],
        'q' => &[0x00, 0x00, 0x00, 0x3A, 0x46, 0x42, 0x46, 0x3A, 0x02, 0x02, 0x00, 0x00],
        'r' => &[0x00, 0x00, 0x00, 0x5C, 0x62, 0x40, 0x40, 0x40, 0x40, 0x40, 0x00, 0x00],
        's' => &[0x00, 0x00, 0x00, 0x3E, 0x40, 0x3C, 0x02, 0x02, 0x42, 0x3C, 0x00, 0x00],
        't' => &[0x00, 0x10, 0x10, 0x7C, 0x10, 0x10, 0x10, 0x10, 0x10, 0x0C, 0x00, 0x00],
        'u' => &[0x00, 0x00, 0x00, 0x42, 0x42, 0x42, 0x42, 0x42, 0x46, 0x3A, 0x00, 0x00],
        'v' => &[0x00, 0x00, 0x00, 0x42, 0x42, 0x42, 0x24, 0x24, 0x18, 0x18, 0x00, 0x00],
        'w' => &[0x00, 0x00, 0x00, 0x42, 0x42, 0x42, 0x5A, 0x66, 0x42, 0x42, 0x00, 0x00],
        'x' => &[0x00, 0x00, 0x00, 0x42, 0x24, 0x18, 0x18, 0x24, 0x42, 0x42, 0x00, 0x00],
        'y' => &[0x00, 0x00, 0x00, 0x42, 0x42, 0x42, 0x26, 0x1A, 0x02, 0x3C, 0x00, 0x00],
        'z' => &[0x00, 0x00, 0x00, 0x7E, 0x04, 0x08, 0x10, 0x20, 0x40, 0x7E, 0x00, 0x00],
        '0' => &[0x00, 0x3C, 0x42, 0x46, 0x4A, 0x52, 0x62, 0x42, 0x42, 0x3C, 0x00, 0x00],
        '1' => &[0x00, 0x08, 0x18, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x3E, 0x00, 0x00],
        '2' => &[0x00, 0x3C, 0x42, 0x02, 0x04, 0x08, 0x10, 0x20, 0x40, 0x7E, 0x00, 0x00],
        '3' => &[0x00, 0x3C, 0x42, 0x02, 0x1C, 0x02, 0x02, 0x02, 0x42, 0x3C, 0x00, 0x00],
        '4' => &[0x00, 0x04, 0x0C, 0x14, 0x24, 0x44, 0x7E, 0x04, 0x04, 0x04, 0x00, 0x00],
        '5' => &[0x00, 0x7E, 0x40, 0x40, 0x7C, 0x02, 0x02, 0x02, 0x42, 0x3C, 0x00, 0x00],
        '6' => &[0x00, 0x1C, 0x20, 0x40, 0x7C, 0x42, 0x42, 0x42, 0x42, 0x3C, 0x00, 0x00],
        '7' => &[0x00, 0x7E, 0x02, 0x04, 0x08, 0x08, 0x10, 0x10, 0x20, 0x20, 0x00, 0x00],
        '8' => &[0x00, 0x3C, 0x42, 0x42, 0x3C, 0x42, 0x42, 0x42, 0x42, 0x3C, 0x00, 0x00],
        '9' => &[0x00, 0x3C, 0x42, 0x42, 0x42, 0x3E, 0x02, 0x04, 0x08, 0x70, 0x00, 0x00],
        '.' => &[0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x18, 0x18, 0x00, 0x00],
        ',' => &[0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x18, 0x18, 0x08, 0x10, 0x00],
        ' ' => &[0x00; GLYPH_HEIGHT],
        _ => return None,
    };
    Some(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_name_chars_covered() {
        for name in vmark_models::COCO_CLASSES {
            for ch in name.chars() {
                assert!(glyph(ch).is_some(), "missing glyph for {:?} in {}", ch, name);
            }
        }
    }

    #[test]
    fn test_label_chars_covered() {
        for ch in "0123456789., ".chars() {
            assert!(glyph(ch).is_some());
        }
    }

    #[test]
    fn test_draw_text_sets_pixels() {
        let mut frame = RgbFrame::new(64, 16);
        draw_text(&mut frame, "ok", 0, 0, [0, 255, 0]);
        assert!(frame.data.iter().any(|b| *b != 0));
    }

    #[test]
    fn test_draw_text_clips_outside_frame() {
        let mut frame = RgbFrame::new(8, 8);
        draw_text(&mut frame, "person", -4, -4, [255, 255, 255]);
        draw_text(&mut frame, "person", 100, 100, [255, 255, 255]);
        // No panic is the point; the frame stays the right size.
        assert_eq!(frame.data.len(), 8 * 8 * 3);
    }

    #[test]
    fn test_text_width() {
        assert_eq!(text_width("person"), 6 * GLYPH_WIDTH);
        assert_eq!(text_width(""), 0);
    }
}
