//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "vmark_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "vmark_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "vmark_http_requests_in_flight";

    // Run metrics
    pub const RUNS_COMPLETED_TOTAL: &str = "vmark_runs_completed_total";
    pub const RUNS_FAILED_TOTAL: &str = "vmark_runs_failed_total";
    pub const RUN_DURATION_SECONDS: &str = "vmark_run_duration_seconds";
    pub const FRAMES_PROCESSED_TOTAL: &str = "vmark_frames_processed_total";
    pub const DETECTIONS_DRAWN_TOTAL: &str = "vmark_detections_drawn_total";

    // Housekeeping metrics
    pub const OUTPUTS_SWEPT_TOTAL: &str = "vmark_outputs_swept_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "vmark_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a completed annotation run.
pub fn record_run_completed(frames: u64, detections_drawn: u64, duration_secs: f64) {
    counter!(names::RUNS_COMPLETED_TOTAL).increment(1);
    counter!(names::FRAMES_PROCESSED_TOTAL).increment(frames);
    counter!(names::DETECTIONS_DRAWN_TOTAL).increment(detections_drawn);
    histogram!(names::RUN_DURATION_SECONDS).record(duration_secs);
}

/// Record a failed annotation run.
pub fn record_run_failed(code: &str) {
    let labels = [("code", code.to_string())];
    counter!(names::RUNS_FAILED_TOTAL, &labels).increment(1);
}

/// Record outputs removed by the retention sweeper.
pub fn record_outputs_swept(count: u64) {
    counter!(names::OUTPUTS_SWEPT_TOTAL).increment(count);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Sanitize path for metrics labels (collapse run ids).
fn sanitize_path(path: &str) -> String {
    let path = regex_lite::Regex::new(r"/videos/[0-9a-f]{8}(/|$)")
        .unwrap()
        .replace_all(path, "/videos/:run_id$1");
    let path = regex_lite::Regex::new(r"/runs/[0-9a-f]{8}(/|$)")
        .unwrap()
        .replace_all(&path, "/runs/:run_id$1");
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(sanitize_path("/videos/0123abcd"), "/videos/:run_id");
        assert_eq!(sanitize_path("/api/runs/deadbeef"), "/api/runs/:run_id");
        assert_eq!(sanitize_path("/api/classes"), "/api/classes");
    }
}
