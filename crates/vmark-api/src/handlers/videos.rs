//! Annotated video playback.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::Response;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use vmark_models::RunId;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Stream an annotated output video, honoring byte-range requests so
/// browser `<video>` elements can seek.
///
/// GET /videos/:run_id
pub async fn stream_video(
    State(state): State<AppState>,
    Path(run_id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    // RunId::parse only accepts 8 hex chars, which rules out traversal
    let run_id = RunId::parse(&run_id).ok_or_else(|| ApiError::bad_request("Invalid run id"))?;
    let path = state.config.output_path(&run_id);

    let mut file = tokio::fs::File::open(&path)
        .await
        .map_err(|_| ApiError::not_found("Video not found"))?;
    let total_len = file
        .metadata()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to stat video: {}", e)))?
        .len();

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| parse_byte_range(v, total_len));

    let (status, start, end) = match range {
        Some((start, end)) => (StatusCode::PARTIAL_CONTENT, start, end),
        None => (StatusCode::OK, 0, total_len.saturating_sub(1)),
    };

    let read_len = if total_len == 0 { 0 } else { end - start + 1 };
    let mut bytes = vec![0u8; read_len as usize];
    if read_len > 0 {
        file.seek(std::io::SeekFrom::Start(start))
            .await
            .map_err(|e| ApiError::internal(format!("Failed to seek video: {}", e)))?;
        file.read_exact(&mut bytes)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to read video: {}", e)))?;
    }

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CACHE_CONTROL, "public, max-age=3600")
        .header(header::CONTENT_LENGTH, read_len);

    if status == StatusCode::PARTIAL_CONTENT {
        builder = builder.header(
            header::CONTENT_RANGE,
            format!("bytes {}-{}/{}", start, end, total_len),
        );
    }

    builder
        .body(Body::from(bytes))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {}", e)))
}

/// Parse a `bytes=start-end` header into an inclusive byte range clamped to
/// the file. Multi-range and suffix-only requests fall back to a full
/// response.
fn parse_byte_range(value: &str, total_len: u64) -> Option<(u64, u64)> {
    if total_len == 0 {
        return None;
    }
    let spec = value.strip_prefix("bytes=")?;
    if spec.contains(',') {
        return None;
    }
    let (start_str, end_str) = spec.split_once('-')?;
    let start: u64 = start_str.trim().parse().ok()?;
    if start >= total_len {
        return None;
    }
    let end = match end_str.trim() {
        "" => total_len - 1,
        s => s.parse::<u64>().ok()?.min(total_len - 1),
    };
    if end < start {
        return None;
    }
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_open_ended_range() {
        assert_eq!(parse_byte_range("bytes=0-", 100), Some((0, 99)));
        assert_eq!(parse_byte_range("bytes=50-", 100), Some((50, 99)));
    }

    #[test]
    fn test_parse_bounded_range() {
        assert_eq!(parse_byte_range("bytes=10-19", 100), Some((10, 19)));
        // End clamped to the file
        assert_eq!(parse_byte_range("bytes=90-500", 100), Some((90, 99)));
    }

    #[test]
    fn test_reject_invalid_ranges() {
        assert_eq!(parse_byte_range("bytes=200-", 100), None);
        assert_eq!(parse_byte_range("bytes=20-10", 100), None);
        assert_eq!(parse_byte_range("bytes=0-10,20-30", 100), None);
        assert_eq!(parse_byte_range("frames=0-10", 100), None);
        assert_eq!(parse_byte_range("bytes=0-", 0), None);
    }
}
