//! Background removal of expired output videos.

use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, warn};
use vmark_models::RunId;

use crate::metrics;
use crate::state::{AppState, RunRegistry};

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Deletes annotated outputs older than the configured TTL, together with
/// their run registry entries.
pub struct RetentionSweeper {
    output_dir: PathBuf,
    ttl: Duration,
    runs: RunRegistry,
}

impl RetentionSweeper {
    pub fn new(state: &AppState) -> Self {
        Self {
            output_dir: state.config.output_dir.clone(),
            ttl: Duration::from_secs(state.config.output_ttl_secs),
            runs: state.runs.clone(),
        }
    }

    /// Run forever, sweeping once per interval.
    pub async fn run(self) {
        info!(ttl_secs = self.ttl.as_secs(), "Retention sweeper started");
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            match self.sweep().await {
                Ok(0) => {}
                Ok(removed) => {
                    info!(removed, "Swept expired output videos");
                    metrics::record_outputs_swept(removed as u64);
                }
                Err(e) => warn!(error = %e, "Output sweep failed"),
            }
        }
    }

    /// Remove expired outputs once; returns how many files were deleted.
    pub async fn sweep(&self) -> std::io::Result<usize> {
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.output_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("mp4") {
                continue;
            }

            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(t) => t,
                Err(_) => continue,
            };
            let age = modified.elapsed().unwrap_or_default();
            if age < self.ttl {
                continue;
            }

            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %e, "Failed to remove expired output");
                continue;
            }
            removed += 1;

            if let Some(run_id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(RunId::parse)
            {
                self.runs.write().await.remove(&run_id);
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    fn sweeper(dir: &std::path::Path, ttl_secs: u64) -> RetentionSweeper {
        RetentionSweeper {
            output_dir: dir.to_path_buf(),
            ttl: Duration::from_secs(ttl_secs),
            runs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    #[tokio::test]
    async fn test_fresh_outputs_are_kept() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("0123abcd.mp4"), b"video").unwrap();

        let removed = sweeper(tmp.path(), 3600).sweep().await.unwrap();
        assert_eq!(removed, 0);
        assert!(tmp.path().join("0123abcd.mp4").exists());
    }

    #[tokio::test]
    async fn test_zero_ttl_removes_outputs() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("0123abcd.mp4"), b"video").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"keep me").unwrap();

        let removed = sweeper(tmp.path(), 0).sweep().await.unwrap();
        assert_eq!(removed, 1);
        assert!(!tmp.path().join("0123abcd.mp4").exists());
        // Only .mp4 outputs are swept
        assert!(tmp.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn test_sweep_clears_registry_entry() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("0123abcd.mp4"), b"video").unwrap();

        let s = sweeper(tmp.path(), 0);
        let run_id = RunId::parse("0123abcd").unwrap();
        s.runs.write().await.insert(
            run_id.clone(),
            vmark_models::RunSummary {
                run_id: run_id.clone(),
                frames: 1,
                detections_drawn: 0,
                elapsed_ms: 5,
                finished_at: chrono::Utc::now(),
            },
        );

        s.sweep().await.unwrap();
        assert!(s.runs.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_new_reads_config() {
        let tmp = tempfile::tempdir().unwrap();
        let config = ApiConfig {
            output_dir: tmp.path().join("out"),
            scratch_dir: tmp.path().join("scratch"),
            output_ttl_secs: 120,
            ..Default::default()
        };
        let state = AppState::new(config).unwrap();
        let sweeper = RetentionSweeper::new(&state);
        assert_eq!(sweeper.ttl, Duration::from_secs(120));
    }
}
