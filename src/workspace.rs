//! Per-request working directories
//!
//! Every pipeline run owns a uniquely named directory, so concurrent requests
//! never share the audio file path. The directory and anything left in it are
//! removed when the [`RequestWorkspace`] is dropped.

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug)]
pub struct RequestWorkspace {
    request_id: Uuid,
    dir: TempDir,
}

impl RequestWorkspace {
    /// Create a fresh work directory under `root`, or the system temp dir when unset
    pub fn acquire(root: Option<&Path>) -> std::io::Result<Self> {
        let request_id = Uuid::new_v4();
        let prefix = format!("course-{}-", request_id.simple());

        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                tempfile::Builder::new().prefix(&prefix).tempdir_in(root)?
            }
            None => tempfile::Builder::new().prefix(&prefix).tempdir()?,
        };

        debug!("📁 Acquired work directory {} for request {}", dir.path().display(), request_id);
        Ok(Self { request_id, dir })
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Delete one artifact now, logging instead of failing
    pub async fn discard(&self, artifact: &Path) {
        match tokio::fs::remove_file(artifact).await {
            Ok(()) => debug!("🧹 Removed {}", artifact.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove temporary file {}: {}", artifact.display(), e),
        }
    }

    /// Detach the directory from cleanup and return its path
    pub fn keep(self) -> PathBuf {
        self.dir.keep()
    }

    /// Remove the directory explicitly, reporting failure through the log
    pub fn release(self) {
        let path: PathBuf = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!("Failed to remove work directory {}: {}", path.display(), e);
        }
    }
}
