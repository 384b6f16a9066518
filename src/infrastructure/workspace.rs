use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::warn;

use crate::domain::errors::ThumbnailError;

const WORKSPACE_PREFIX: &str = "thumbservice-";

/// Hands out per-request scratch directories under a common root.
#[derive(Debug, Clone)]
pub struct WorkspaceFactory {
    root: PathBuf,
}

impl WorkspaceFactory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Workspaces under the system temporary directory.
    pub fn system() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn acquire(&self) -> Result<Workspace, ThumbnailError> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(&self.root)
            .map_err(|e| {
                warn!(root = %self.root.display(), error = %e, "failed to create workspace");
                ThumbnailError::StorageUnavailable("temporary workspace unavailable".to_string())
            })?;
        Ok(Workspace { dir })
    }
}

/// Scratch directory owned by a single pipeline run.
///
/// The directory and everything in it is deleted when the workspace is
/// released or dropped, including when the owning future is cancelled.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path for a file inside the workspace. `name` is reduced to a safe file name.
    pub fn file(&self, name: &str) -> PathBuf {
        let safe: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let safe = safe.trim_start_matches('.');
        let safe = if safe.is_empty() { "file" } else { safe };
        self.dir.path().join(safe)
    }

    /// Delete the workspace now, reporting any failure.
    pub fn release(self) -> io::Result<()> {
        self.dir.close()
    }
}
