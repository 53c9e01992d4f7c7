use std::path::{Path, PathBuf};

/// Guarantees the build workspace is deleted on every exit path.
///
/// Held for the lifetime of one publish attempt; `Drop` covers fatal errors
/// and panics, `cleanup()` is the explicit success-path call. A workspace
/// that is already gone is not an error.
#[derive(Debug)]
pub struct WorkspaceJanitor {
    path: PathBuf,
    armed: bool,
}

impl WorkspaceJanitor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the workspace now instead of waiting for drop.
    pub fn cleanup(mut self) {
        self.remove();
        self.armed = false;
    }

    fn remove(&self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => {
                tracing::debug!(workspace = %self.path.display(), "workspace removed");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(workspace = %self.path.display(), error = %e, "workspace cleanup failed");
            }
        }
    }
}

impl Drop for WorkspaceJanitor {
    fn drop(&mut self) {
        if self.armed {
            self.remove();
        }
    }
}
