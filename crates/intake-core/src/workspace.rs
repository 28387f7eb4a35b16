//! Per-run scratch directory for materializing requested actions.
//!
//! Every run gets its own uniquely named directory, so concurrent runs never
//! see each other's checkouts. Within a run the single checkout slot is
//! cleared before each validation attempt.

use crate::error::{IntakeError, Result};
use crate::paths;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Allocate a fresh `action-intake-XXXXXX` directory under `root`.
    pub fn create(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root).map_err(IntakeError::Workspace)?;
        let dir = tempfile::Builder::new()
            .prefix(paths::WORKSPACE_PREFIX)
            .tempdir_in(root)
            .map_err(IntakeError::Workspace)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the oracle materializes the requested ref. Absent until resolved.
    pub fn checkout_dir(&self) -> PathBuf {
        self.dir.path().join(paths::CHECKOUT_DIR)
    }

    /// Remove any checkout left by a previous request.
    pub fn reset(&self) -> Result<()> {
        let checkout = self.checkout_dir();
        if checkout.exists() {
            std::fs::remove_dir_all(&checkout).map_err(IntakeError::Workspace)?;
        }
        Ok(())
    }

    /// Drop version-control metadata from the checkout. Returns true if any was removed.
    pub fn strip_vcs_metadata(&self) -> Result<bool> {
        let meta = self.checkout_dir().join(paths::VCS_METADATA_DIR);
        if !meta.exists() {
            return Ok(false);
        }
        if meta.is_dir() {
            std::fs::remove_dir_all(&meta).map_err(IntakeError::Workspace)?;
        } else {
            // worktrees and submodules use a `.git` file
            std::fs::remove_file(&meta).map_err(IntakeError::Workspace)?;
        }
        Ok(true)
    }

    /// Remove the whole arena, surfacing the error instead of swallowing it on drop.
    pub fn close(self) -> std::io::Result<()> {
        self.dir.close()
    }
}
