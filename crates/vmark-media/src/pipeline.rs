//! The annotation pipeline: probe, decode, detect, draw, encode.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task;
use tracing::{debug, info};

use vmark_models::FilterCriteria;

use crate::annotate::annotate_frame;
use crate::detect::Detector;
use crate::error::{MediaError, MediaResult};
use crate::frames::{FrameDecoder, FrameEncoder};
use crate::probe::{probe_video, VideoInfo};

/// Pipeline tuning knobs.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Abort the run after this many seconds; 0 disables the limit.
    pub timeout_secs: u64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self { timeout_secs: 0 }
    }
}

/// What a completed run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Frames decoded and re-encoded.
    pub frames: u64,
    /// Boxes that passed the filter and were drawn, across all frames.
    pub detections_drawn: u64,
    /// Probe result for the input video.
    pub info: VideoInfo,
    /// Wall-clock processing time.
    pub elapsed: Duration,
}

/// Run the full pipeline: read `input`, annotate every frame, write a
/// browser-playable MP4 to `output`.
///
/// Inference runs on the blocking pool so the decoder/encoder pipes keep
/// draining. Frames are processed strictly in order; the output has exactly
/// as many frames as the input.
pub async fn annotate_video(
    input: &Path,
    output: &Path,
    detector: Arc<dyn Detector>,
    criteria: &FilterCriteria,
    options: &PipelineOptions,
) -> MediaResult<RunOutcome> {
    let started = Instant::now();
    let run = run_pipeline(input, output, detector, criteria);

    let mut outcome = if options.timeout_secs > 0 {
        tokio::time::timeout(Duration::from_secs(options.timeout_secs), run)
            .await
            .map_err(|_| MediaError::Timeout(options.timeout_secs))??
    } else {
        run.await?
    };
    outcome.elapsed = started.elapsed();

    info!(
        frames = outcome.frames,
        detections_drawn = outcome.detections_drawn,
        elapsed_ms = outcome.elapsed.as_millis() as u64,
        "Annotation pipeline completed"
    );

    Ok(outcome)
}

async fn run_pipeline(
    input: &Path,
    output: &Path,
    detector: Arc<dyn Detector>,
    criteria: &FilterCriteria,
) -> MediaResult<RunOutcome> {
    let info = probe_video(input).await?;
    debug!(
        width = info.width,
        height = info.height,
        fps = info.fps,
        duration = info.duration,
        backend = detector.name(),
        "Starting annotation pipeline"
    );

    let mut decoder = FrameDecoder::spawn(input, &info)?;
    let mut encoder = FrameEncoder::spawn(output, info.width, info.height, info.fps)?;

    let mut frames: u64 = 0;
    let mut detections_drawn: u64 = 0;

    while let Some(frame) = decoder.next_frame().await? {
        let backend = Arc::clone(&detector);
        let (mut frame, detections) = task::spawn_blocking(move || {
            let detections = backend.detect(&frame)?;
            Ok::<_, MediaError>((frame, detections))
        })
        .await
        .map_err(|e| MediaError::internal(format!("Inference task panicked: {}", e)))??;

        detections_drawn += annotate_frame(&mut frame, &detections, criteria) as u64;
        encoder.write_frame(&frame).await?;
        frames += 1;
    }

    decoder.finish().await?;
    encoder.finish().await?;

    if frames == 0 {
        return Err(MediaError::InvalidVideo(
            "Input produced no frames".to_string(),
        ));
    }

    Ok(RunOutcome {
        frames,
        detections_drawn,
        info,
        elapsed: Duration::ZERO,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::RgbFrame;
    use vmark_models::Detection;

    struct NullDetector;

    impl Detector for NullDetector {
        fn detect(&self, _frame: &RgbFrame) -> MediaResult<Vec<Detection>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &'static str {
            "null"
        }
    }

    #[tokio::test]
    async fn test_missing_input_fails_before_spawning() {
        let out = tempfile::tempdir().unwrap();
        let err = annotate_video(
            Path::new("/nonexistent/input.mp4"),
            &out.path().join("out.mp4"),
            Arc::new(NullDetector),
            &FilterCriteria::default(),
            &PipelineOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }

    #[tokio::test]
    async fn test_non_video_input_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.mp4");
        std::fs::write(&input, b"definitely not an mp4").unwrap();

        let err = annotate_video(
            &input,
            &dir.path().join("out.mp4"),
            Arc::new(NullDetector),
            &FilterCriteria::default(),
            &PipelineOptions::default(),
        )
        .await
        .unwrap_err();
        // ffprobe refuses the file before any FFmpeg process is spawned
        assert!(matches!(
            err,
            MediaError::FfprobeFailed { .. } | MediaError::InvalidVideo(_) | MediaError::FfprobeNotFound
        ));
    }
}
