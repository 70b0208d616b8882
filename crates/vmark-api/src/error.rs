//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use vmark_media::MediaError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Media error: {0}")]
    Media(#[from] MediaError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Media(media) => match media {
                // Bad upload: the client sent something FFmpeg rejects
                MediaError::DecodeFailed { .. }
                | MediaError::InvalidVideo(_)
                | MediaError::FfprobeFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                MediaError::FileNotFound(_) => StatusCode::NOT_FOUND,
                MediaError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                // Missing tools or model: the service is not usable yet
                MediaError::FfmpegNotFound
                | MediaError::FfprobeNotFound
                | MediaError::ModelNotFound(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Stable machine-readable code for media failures.
    fn code(&self) -> Option<&'static str> {
        let ApiError::Media(media) = self else {
            return None;
        };
        Some(failure_code(media))
    }
}

/// Stable machine-readable code for a media failure. Shared between error
/// responses and the failed-run metric label so the two cannot drift.
pub fn failure_code(media: &MediaError) -> &'static str {
    match media {
        MediaError::DecodeFailed { .. }
        | MediaError::InvalidVideo(_)
        | MediaError::FfprobeFailed { .. }
        | MediaError::FfmpegNotFound
        | MediaError::FfprobeNotFound => "decode-failure",
        MediaError::EncodeFailed { .. } => "encode-failure",
        MediaError::InferenceFailed(_) | MediaError::ModelNotFound(_) => "inference-failure",
        MediaError::Io(_) | MediaError::JsonParse(_) | MediaError::FileNotFound(_) => "io-failure",
        MediaError::Timeout(_) => "timeout",
        MediaError::Internal(_) => "internal",
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = match &self {
            ApiError::Internal(_) | ApiError::Media(_)
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production"
                    && status.is_server_error() =>
            {
                "An internal error occurred".to_string()
            }
            _ => self.to_string(),
        };

        let body = ErrorResponse {
            detail,
            code: self.code().map(|c| c.to_string()),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_failure_is_client_error() {
        let err = ApiError::Media(MediaError::decode_failed("broken upload", None, Some(1)));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code(), Some("decode-failure"));
    }

    #[test]
    fn test_encode_failure_is_server_error() {
        let err = ApiError::Media(MediaError::encode_failed("x264 exploded", None, Some(1)));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), Some("encode-failure"));
    }

    #[test]
    fn test_missing_model_is_unavailable() {
        let err = ApiError::Media(MediaError::model_not_found("models/yolov8n.onnx"));
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.code(), Some("inference-failure"));
    }

    #[test]
    fn test_timeout_maps_to_gateway_timeout() {
        let err = ApiError::Media(MediaError::Timeout(300));
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(err.code(), Some("timeout"));
    }

    #[test]
    fn test_failure_code_matches_response_code() {
        // The failed-run metric label and the response body code come from
        // the same mapping
        let media = MediaError::inference_failed("session run failed");
        let label = failure_code(&media);
        assert_eq!(ApiError::Media(media).code(), Some(label));
    }

    #[test]
    fn test_plain_errors_have_no_code() {
        assert_eq!(ApiError::bad_request("nope").code(), None);
        assert_eq!(ApiError::RateLimited.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }
}
