//! API configuration.

use std::path::PathBuf;

/// API server configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// CORS origins
    pub cors_origins: Vec<String>,
    /// Rate limit requests per second
    pub rate_limit_rps: u32,
    /// Max request body size (uploads are whole videos)
    pub max_body_size: usize,
    /// Directory holding annotated output videos
    pub output_dir: PathBuf,
    /// Directory for per-run scratch space
    pub scratch_dir: PathBuf,
    /// Path to the YOLOv8 ONNX model
    pub model_path: PathBuf,
    /// Seconds an output video is retained before the sweeper removes it
    pub output_ttl_secs: u64,
    /// Per-run processing timeout in seconds; 0 disables the limit
    pub run_timeout_secs: u64,
    /// Environment (development/production)
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec!["*".to_string()],
            rate_limit_rps: 10,
            max_body_size: 200 * 1024 * 1024, // 200MB
            output_dir: PathBuf::from("data/outputs"),
            scratch_dir: PathBuf::from("data/scratch"),
            model_path: PathBuf::from("models/yolov8n.onnx"),
            output_ttl_secs: 3600,
            run_timeout_secs: 0,
            environment: "development".to_string(),
        }
    }
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("API_HOST").unwrap_or(defaults.host),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| s.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            rate_limit_rps: std::env::var("RATE_LIMIT_RPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.rate_limit_rps),
            max_body_size: std::env::var("MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            output_dir: std::env::var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            scratch_dir: std::env::var("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.scratch_dir),
            model_path: std::env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            output_ttl_secs: std::env::var("OUTPUT_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.output_ttl_secs),
            run_timeout_secs: std::env::var("RUN_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.run_timeout_secs),
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        }
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }

    /// Path of the annotated output video for a run.
    pub fn output_path(&self, run_id: &vmark_models::RunId) -> PathBuf {
        self.output_dir.join(format!("{}.mp4", run_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmark_models::RunId;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.output_ttl_secs, 3600);
        assert_eq!(config.run_timeout_secs, 0);
        assert!(!config.is_production());
    }

    #[test]
    fn test_output_path() {
        let config = ApiConfig::default();
        let run_id = RunId::parse("cafe0123").unwrap();
        assert!(config.output_path(&run_id).ends_with("cafe0123.mp4"));
    }
}
