//! YOLOv8 object detection via ONNX Runtime.
//!
//! Execution provider selection is automatic:
//! - CUDA on Linux with NVIDIA GPU (when `cuda` feature enabled)
//! - CoreML on macOS
//! - CPU fallback on all platforms

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::{imageops::FilterType, ImageBuffer, Rgb};
use ndarray::Array;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};
use crate::frames::RgbFrame;
use vmark_models::{BoundingBox, Detection};

use super::Detector;

const NUM_CLASSES: usize = 80;
const NUM_CANDIDATES: usize = 8400;
const NUM_FEATURES: usize = 84; // 4 bbox + 80 class scores

/// Detector configuration.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Path to ONNX model file
    pub model_path: PathBuf,
    /// Candidates below this score are dropped before NMS. The user-facing
    /// confidence filter is applied later, during annotation.
    pub score_floor: f32,
    /// IoU threshold for NMS
    pub nms_threshold: f32,
    /// Model input size (square)
    pub input_size: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/yolov8n.onnx"),
            score_floor: 0.25,
            nms_threshold: 0.45,
            input_size: 640,
        }
    }
}

/// YOLOv8 detector holding a loaded ONNX Runtime session.
///
/// The session is behind a mutex because `ort` sessions require `&mut self`
/// to run; one detector instance is shared across runs.
pub struct OnnxDetector {
    session: Mutex<Session>,
    config: DetectorConfig,
}

impl OnnxDetector {
    /// Load the model and prepare a session.
    pub fn new(config: DetectorConfig) -> MediaResult<Self> {
        if !config.model_path.exists() {
            return Err(MediaError::model_not_found(
                config.model_path.display().to_string(),
            ));
        }

        let session = Mutex::new(create_session(&config.model_path)?);
        info!(
            model_path = %config.model_path.display(),
            input_size = config.input_size,
            "Object detector initialized"
        );

        Ok(Self { session, config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Resize to the model input, normalize to [0, 1], and lay out NCHW.
    fn preprocess(&self, frame: &RgbFrame) -> MediaResult<Value> {
        let size = self.config.input_size;

        let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_raw(frame.width, frame.height, frame.data.clone())
                .ok_or_else(|| MediaError::inference_failed("Frame buffer has wrong length"))?;
        let resized = image::imageops::resize(&buffer, size, size, FilterType::Triangle);

        let (w, h) = (size as usize, size as usize);
        let mut chw: Vec<f32> = Vec::with_capacity(3 * h * w);
        for c in 0..3 {
            for y in 0..h {
                for x in 0..w {
                    let pixel = resized.get_pixel(x as u32, y as u32);
                    chw.push(pixel[c] as f32 / 255.0);
                }
            }
        }

        let shape = vec![1usize, 3, h, w];
        Tensor::from_array((shape, chw.into_boxed_slice()))
            .map(Value::from)
            .map_err(|e| MediaError::inference_failed(format!("Failed to create tensor: {}", e)))
    }

    fn run_inference(&self, input: Value) -> MediaResult<Vec<f32>> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| MediaError::inference_failed("Session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![input])
            .map_err(|e| MediaError::inference_failed(format!("ONNX inference failed: {}", e)))?;

        // YOLOv8 output is [1, 84, 8400]
        let output = outputs
            .get("output0")
            .ok_or_else(|| MediaError::inference_failed("Missing output0 tensor"))?;

        let tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| MediaError::inference_failed(format!("Failed to extract tensor: {}", e)))?;

        Ok(tensor.1.iter().copied().collect())
    }

    /// Parse the raw output into pixel-space detections and apply NMS.
    fn postprocess(&self, outputs: &[f32], frame_w: u32, frame_h: u32) -> MediaResult<Vec<Detection>> {
        if outputs.len() != NUM_FEATURES * NUM_CANDIDATES {
            return Err(MediaError::inference_failed(format!(
                "Unexpected output size: expected {}, got {}",
                NUM_FEATURES * NUM_CANDIDATES,
                outputs.len()
            )));
        }

        // [1, 84, 8400] transposed to [8400, 84] so each row is one candidate
        let output_array = Array::from_shape_vec((NUM_FEATURES, NUM_CANDIDATES), outputs.to_vec())
            .map_err(|e| MediaError::inference_failed(format!("Failed to reshape output: {}", e)))?;
        let rows = output_array.t();

        let input_size = self.config.input_size as f32;
        let scale_w = frame_w as f32 / input_size;
        let scale_h = frame_h as f32 / input_size;

        let mut candidates: Vec<Detection> = Vec::new();
        for i in 0..NUM_CANDIDATES {
            let mut best_class = 0;
            let mut best_score = 0.0f32;
            for c in 0..NUM_CLASSES {
                let score = rows[[i, 4 + c]];
                if score > best_score {
                    best_score = score;
                    best_class = c;
                }
            }

            if best_score < self.config.score_floor {
                continue;
            }

            // Center format in model space, corner format in pixel space out
            let cx = rows[[i, 0]];
            let cy = rows[[i, 1]];
            let w = rows[[i, 2]];
            let h = rows[[i, 3]];

            let bbox = BoundingBox::new(
                (cx - w / 2.0) * scale_w,
                (cy - h / 2.0) * scale_h,
                w * scale_w,
                h * scale_h,
            )
            .clamp(frame_w, frame_h);

            candidates.push(Detection {
                bbox,
                confidence: best_score,
                class_id: best_class,
            });
        }

        Ok(non_maximum_suppression(candidates, self.config.nms_threshold))
    }
}

impl Detector for OnnxDetector {
    fn detect(&self, frame: &RgbFrame) -> MediaResult<Vec<Detection>> {
        let input = self.preprocess(frame)?;
        let outputs = self.run_inference(input)?;
        let detections = self.postprocess(&outputs, frame.width, frame.height)?;
        debug!(count = detections.len(), "Frame detection completed");
        Ok(detections)
    }

    fn name(&self) -> &'static str {
        "yolov8-onnx"
    }
}

/// Class-aware NMS: within a class, drop boxes that overlap a
/// higher-confidence box beyond the IoU threshold.
pub fn non_maximum_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    if detections.is_empty() {
        return detections;
    }

    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; detections.len()];

    for i in 0..detections.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(detections[i].clone());

        for j in (i + 1)..detections.len() {
            if suppressed[j] || detections[i].class_id != detections[j].class_id {
                continue;
            }
            if compute_iou(&detections[i].bbox, &detections[j].bbox) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}

/// Intersection over Union of two pixel-space boxes.
pub fn compute_iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = a.right().min(b.right());
    let y2 = a.bottom().min(b.bottom());

    let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.area() + b.area() - intersection;

    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Create ONNX Runtime session with automatic execution provider selection.
fn create_session(model_path: &Path) -> MediaResult<Session> {
    let model_bytes = std::fs::read(model_path)
        .map_err(|e| MediaError::inference_failed(format!("Failed to read model file: {}", e)))?;

    let mut builder = Session::builder()
        .map_err(|e| MediaError::inference_failed(format!("Failed to create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| MediaError::inference_failed(format!("Failed to set optimization level: {}", e)))?;

    #[cfg(all(target_os = "linux", feature = "cuda"))]
    {
        use ort::execution_providers::CUDAExecutionProvider;
        if let Ok(cuda_builder) = builder
            .clone()
            .with_execution_providers([CUDAExecutionProvider::default().build()])
        {
            if let Ok(session) = cuda_builder.commit_from_memory(&model_bytes) {
                info!("Using CUDA execution provider for object detection");
                return Ok(session);
            }
        }
        debug!("CUDA execution provider not available, trying alternatives");
    }

    #[cfg(target_os = "macos")]
    {
        use ort::execution_providers::CoreMLExecutionProvider;
        if let Ok(coreml_builder) = builder
            .clone()
            .with_execution_providers([CoreMLExecutionProvider::default().build()])
        {
            if let Ok(session) = coreml_builder.commit_from_memory(&model_bytes) {
                info!("Using CoreML execution provider for object detection");
                return Ok(session);
            }
        }
        debug!("CoreML execution provider not available, using CPU");
    }

    info!("Using CPU execution provider for object detection");
    builder
        .commit_from_memory(&model_bytes)
        .map_err(|e| MediaError::inference_failed(format!("Failed to load ONNX model: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x: f32, y: f32, w: f32, h: f32, class_id: usize, confidence: f32) -> Detection {
        Detection {
            bbox: BoundingBox::new(x, y, w, h),
            confidence,
            class_id,
        }
    }

    #[test]
    fn test_iou_identical_boxes() {
        let a = BoundingBox::new(10.0, 10.0, 50.0, 50.0);
        assert!((compute_iou(&a, &a) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_iou_disjoint_boxes() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(100.0, 100.0, 10.0, 10.0);
        assert_eq!(compute_iou(&a, &b), 0.0);
    }

    #[test]
    fn test_iou_half_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 0.0, 10.0, 10.0);
        // intersection 50, union 150
        assert!((compute_iou(&a, &b) - 1.0 / 3.0).abs() < 0.001);
    }

    #[test]
    fn test_nms_suppresses_same_class_overlap() {
        let detections = vec![
            det(0.0, 0.0, 10.0, 10.0, 0, 0.9),
            det(1.0, 1.0, 10.0, 10.0, 0, 0.6),
        ];
        let kept = non_maximum_suppression(detections, 0.45);
        assert_eq!(kept.len(), 1);
        assert!((kept[0].confidence - 0.9).abs() < 0.001);
    }

    #[test]
    fn test_nms_keeps_different_classes() {
        let detections = vec![
            det(0.0, 0.0, 10.0, 10.0, 0, 0.9),
            det(1.0, 1.0, 10.0, 10.0, 2, 0.6),
        ];
        let kept = non_maximum_suppression(detections, 0.45);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_nms_keeps_distant_same_class() {
        let detections = vec![
            det(0.0, 0.0, 10.0, 10.0, 0, 0.9),
            det(200.0, 200.0, 10.0, 10.0, 0, 0.6),
        ];
        let kept = non_maximum_suppression(detections, 0.45);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_config_default() {
        let config = DetectorConfig::default();
        assert_eq!(config.input_size, 640);
        assert!((config.score_floor - 0.25).abs() < 0.001);
        assert!((config.nms_threshold - 0.45).abs() < 0.001);
    }

    #[test]
    fn test_missing_model_errors() {
        let config = DetectorConfig {
            model_path: PathBuf::from("/nonexistent/model.onnx"),
            ..Default::default()
        };
        assert!(matches!(
            OnnxDetector::new(config),
            Err(MediaError::ModelNotFound(_))
        ));
    }
}
