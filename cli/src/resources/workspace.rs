//! Temporary workspace: scratch directory owned by one run.
use anyhow::{Context as _, Result};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{Applicable, ResourceChange};
use crate::operations::FileSystemOps;

/// Scratch directory created at run start and deleted wholesale at the end.
///
/// Unlike a [`TrackedFolder`](super::folder::TrackedFolder) it is removed
/// together with its contents whether or not it is empty. The session only
/// removes a workspace that [`apply`](Applicable::apply) actually created.
#[derive(Debug, Clone)]
pub struct Workspace {
    path: PathBuf,
    fs: Arc<dyn FileSystemOps>,
}

impl Workspace {
    /// Create a workspace resource for `path`.
    #[must_use]
    pub const fn new(path: PathBuf, fs: Arc<dyn FileSystemOps>) -> Self {
        Self { path, fs }
    }

    /// Workspace directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Applicable for Workspace {
    fn description(&self) -> String {
        format!("workspace {}", self.path.display())
    }

    fn apply(&self) -> Result<ResourceChange> {
        if self.fs.is_dir(&self.path) {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        self.fs
            .create_dir_all(&self.path)
            .with_context(|| format!("creating workspace {}", self.path.display()))?;
        Ok(ResourceChange::Applied)
    }

    fn remove(&self) -> Result<ResourceChange> {
        match self.fs.remove_dir_all(&self.path) {
            Ok(()) => Ok(ResourceChange::Applied),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ResourceChange::AlreadyCorrect),
            Err(e) => {
                Err(e).with_context(|| format!("removing workspace {}", self.path.display()))
            }
        }
    }
}
