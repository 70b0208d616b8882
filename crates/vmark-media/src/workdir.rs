//! Per-run scratch directories.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use vmark_models::RunId;

use crate::error::MediaResult;

/// Scratch directory for one run, removed on drop.
///
/// The uploaded input and any intermediate files live here; dropping the
/// guard cleans them up on success and failure alike. Only the final output
/// file, written elsewhere, outlives the run.
pub struct RunScratch {
    dir: PathBuf,
}

impl RunScratch {
    /// Create `base/<run_id>/`, including parents.
    pub fn create(base: &Path, run_id: &RunId) -> MediaResult<Self> {
        let dir = base.join(run_id.as_str());
        std::fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "Created run scratch directory");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Path for the uploaded input file inside the scratch dir.
    pub fn input_path(&self, extension: &str) -> PathBuf {
        self.dir.join(format!("input.{}", extension))
    }
}

impl Drop for RunScratch {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(dir = %self.dir.display(), error = %e, "Failed to remove run scratch directory");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_removed_on_drop() {
        let base = tempfile::tempdir().unwrap();
        let run_id = RunId::generate();

        let scratch = RunScratch::create(base.path(), &run_id).unwrap();
        let dir = scratch.path().to_path_buf();
        std::fs::write(scratch.input_path("mp4"), b"not a real video").unwrap();
        assert!(dir.exists());

        drop(scratch);
        assert!(!dir.exists());
    }

    #[test]
    fn test_drop_tolerates_already_removed() {
        let base = tempfile::tempdir().unwrap();
        let scratch = RunScratch::create(base.path(), &RunId::generate()).unwrap();
        std::fs::remove_dir_all(scratch.path()).unwrap();
        // Drop must not panic
        drop(scratch);
    }

    #[test]
    fn test_input_path_uses_extension() {
        let base = tempfile::tempdir().unwrap();
        let scratch = RunScratch::create(base.path(), &RunId::generate()).unwrap();
        assert!(scratch.input_path("mp4").ends_with("input.mp4"));
    }
}
