//! Application state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};
use tracing::info;

use vmark_media::{DetectorConfig, MediaError, MediaResult, OnnxDetector};
use vmark_models::{RunId, RunSummary};

use crate::config::ApiConfig;

/// Completed runs, keyed by run id. Cleared alongside output files by the
/// retention sweeper.
pub type RunRegistry = Arc<RwLock<HashMap<RunId, RunSummary>>>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub runs: RunRegistry,
    detector: Arc<OnceCell<Arc<OnnxDetector>>>,
}

impl AppState {
    /// Create new application state, preparing the working directories.
    pub fn new(config: ApiConfig) -> std::io::Result<Self> {
        std::fs::create_dir_all(&config.output_dir)?;
        std::fs::create_dir_all(&config.scratch_dir)?;

        Ok(Self {
            config,
            runs: Arc::new(RwLock::new(HashMap::new())),
            detector: Arc::new(OnceCell::new()),
        })
    }

    /// Get the shared detector, loading the model on first use.
    ///
    /// Model load is a blocking file read plus session construction, so it
    /// runs on the blocking pool. Every later call returns the cached handle.
    pub async fn detector(&self) -> MediaResult<Arc<OnnxDetector>> {
        self.detector
            .get_or_try_init(|| async {
                let detector_config = DetectorConfig {
                    model_path: self.config.model_path.clone(),
                    ..Default::default()
                };
                let detector = tokio::task::spawn_blocking(move || OnnxDetector::new(detector_config))
                    .await
                    .map_err(|e| MediaError::internal(format!("Detector load task panicked: {}", e)))??;
                info!("Detector loaded and cached");
                Ok::<_, MediaError>(Arc::new(detector))
            })
            .await
            .map(Arc::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_creates_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let config = ApiConfig {
            output_dir: tmp.path().join("out"),
            scratch_dir: tmp.path().join("scratch"),
            ..Default::default()
        };
        let state = AppState::new(config).unwrap();
        assert!(state.config.output_dir.is_dir());
        assert!(state.config.scratch_dir.is_dir());
    }

    #[tokio::test]
    async fn test_detector_load_fails_without_model() {
        let tmp = tempfile::tempdir().unwrap();
        let config = ApiConfig {
            output_dir: tmp.path().join("out"),
            scratch_dir: tmp.path().join("scratch"),
            model_path: tmp.path().join("missing.onnx"),
            ..Default::default()
        };
        let state = AppState::new(config).unwrap();
        assert!(matches!(
            state.detector().await,
            Err(MediaError::ModelNotFound(_))
        ));
    }
}
