//! Per-submission temporary directory holding the raw image and audio.
//!
//! Call `dispose()` on every exit path so removal errors can be logged;
//! `Drop` removes the directory if a path was missed (panic, early return).

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub struct SubmissionArtifacts {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl SubmissionArtifacts {
    /// Create `claimcheck-<submission_id>-XXXX` under `root`, or the system
    /// temp dir when `root` is `None`.
    pub fn create(root: Option<&Path>, submission_id: &str) -> io::Result<Self> {
        let prefix = format!("claimcheck-{submission_id}-");
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        let path = dir.path().to_path_buf();
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one payload into the directory and return its path.
    pub fn write(&self, file_name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let target = self.path.join(file_name);
        std::fs::write(&target, bytes)?;
        Ok(target)
    }

    /// Remove the directory and everything in it.
    pub fn dispose(mut self) -> io::Result<()> {
        match self.dir.take() {
            Some(dir) => dir.close(),
            None => Ok(()),
        }
    }
}

impl Drop for SubmissionArtifacts {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove submission artifacts");
            }
        }
    }
}
