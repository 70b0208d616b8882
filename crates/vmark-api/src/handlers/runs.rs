//! Annotation run handlers.

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};
use validator::Validate;

use vmark_media::{annotate_video, PipelineOptions, RunScratch};
use vmark_models::{FilterCriteria, RunId, RunSummary, COCO_CLASSES};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Response for a completed run.
#[derive(Serialize)]
pub struct CreateRunResponse {
    pub run_id: RunId,
    pub video_url: String,
    pub frames: u64,
    pub detections_drawn: u64,
}

/// Create and execute an annotation run.
///
/// POST /api/runs — multipart form with fields:
/// - `video`: the .mp4 upload
/// - `classes`: repeated, class names to draw
/// - `min_confidence`: threshold in [0, 1]
///
/// The request blocks until the run finishes and responds 201 with the
/// playback URL.
pub async fn create_run(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<CreateRunResponse>)> {
    let submission = parse_submission(multipart).await?;
    submission
        .criteria
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let run_id = RunId::generate();
    info!(
        run_id = %run_id,
        upload_bytes = submission.video.len(),
        classes = ?submission.criteria.allowed_classes,
        min_confidence = submission.criteria.min_confidence,
        "Starting annotation run"
    );

    // Scratch dir is removed when the guard drops, on every exit path
    let scratch = RunScratch::create(&state.config.scratch_dir, &run_id)
        .map_err(ApiError::Media)?;
    let input_path = scratch.input_path("mp4");
    tokio::fs::write(&input_path, &submission.video)
        .await
        .map_err(|e| ApiError::Media(e.into()))?;

    let detector: Arc<dyn vmark_media::Detector> = state.detector().await?;
    let output_path = state.config.output_path(&run_id);
    let options = PipelineOptions {
        timeout_secs: state.config.run_timeout_secs,
    };

    let outcome = match annotate_video(
        &input_path,
        &output_path,
        detector,
        &submission.criteria,
        &options,
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(run_id = %run_id, error = %e, "Annotation run failed");
            // A half-written output must not be served
            let _ = tokio::fs::remove_file(&output_path).await;
            metrics::record_run_failed(crate::error::failure_code(&e));
            return Err(e.into());
        }
    };
    drop(scratch);

    metrics::record_run_completed(
        outcome.frames,
        outcome.detections_drawn,
        outcome.elapsed.as_secs_f64(),
    );

    let summary = RunSummary {
        run_id: run_id.clone(),
        frames: outcome.frames,
        detections_drawn: outcome.detections_drawn,
        elapsed_ms: outcome.elapsed.as_millis() as u64,
        finished_at: Utc::now(),
    };
    state.runs.write().await.insert(run_id.clone(), summary);

    let response = CreateRunResponse {
        video_url: format!("/videos/{}", run_id),
        run_id,
        frames: outcome.frames,
        detections_drawn: outcome.detections_drawn,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

struct RunSubmission {
    video: Vec<u8>,
    criteria: FilterCriteria,
}

async fn parse_submission(mut multipart: Multipart) -> ApiResult<RunSubmission> {
    let mut video: Option<Vec<u8>> = None;
    let mut allowed_classes: HashSet<String> = HashSet::new();
    let mut min_confidence: f32 = 0.0;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "video" => {
                let filename = field.file_name().unwrap_or_default().to_lowercase();
                if !filename.ends_with(".mp4") {
                    return Err(ApiError::bad_request("Only .mp4 uploads are accepted"));
                }
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {}", e)))?;
                video = Some(bytes.to_vec());
            }
            "classes" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid classes field: {}", e)))?;
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    allowed_classes.insert(trimmed.to_string());
                }
            }
            "min_confidence" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid min_confidence field: {}", e)))?;
                min_confidence = value
                    .trim()
                    .parse()
                    .map_err(|_| ApiError::bad_request("min_confidence must be a number"))?;
            }
            other => {
                return Err(ApiError::bad_request(format!(
                    "Unexpected form field: {}",
                    other
                )));
            }
        }
    }

    let video = video.ok_or_else(|| ApiError::bad_request("Missing video upload"))?;
    if video.is_empty() {
        return Err(ApiError::bad_request("Uploaded video is empty"));
    }

    Ok(RunSubmission {
        video,
        criteria: FilterCriteria {
            allowed_classes,
            min_confidence,
        },
    })
}

/// Run metadata for a previously completed run.
#[derive(Serialize)]
pub struct RunMetadataResponse {
    #[serde(flatten)]
    pub summary: RunSummary,
    pub video_url: String,
    pub size_bytes: u64,
}

/// GET /api/runs/:run_id
pub async fn get_run(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
) -> ApiResult<Json<RunMetadataResponse>> {
    let run_id = RunId::parse(&run_id).ok_or_else(|| ApiError::bad_request("Invalid run id"))?;

    let summary = state
        .runs
        .read()
        .await
        .get(&run_id)
        .cloned()
        .ok_or_else(|| ApiError::not_found("Run not found"))?;

    let size_bytes = tokio::fs::metadata(state.config.output_path(&run_id))
        .await
        .map(|m| m.len())
        .map_err(|_| ApiError::not_found("Run output expired"))?;

    Ok(Json(RunMetadataResponse {
        video_url: format!("/videos/{}", summary.run_id),
        summary,
        size_bytes,
    }))
}

/// Detectable class names, in model output order.
#[derive(Serialize)]
pub struct ClassListResponse {
    pub classes: &'static [&'static str],
}

/// GET /api/classes
pub async fn list_classes() -> Json<ClassListResponse> {
    Json(ClassListResponse {
        classes: COCO_CLASSES,
    })
}
