//! Filesystem operation abstractions for dependency injection.
//!
//! Tracked folder bookkeeping and the temporary workspace go through
//! [`FileSystemOps`] so failure modes (permission errors, races with other
//! processes) can be injected in unit tests. Production code uses
//! [`SystemFileSystemOps`]; tests use the generated `MockFileSystemOps`.

use std::io;
use std::path::Path;

/// Abstraction over the directory operations used by cleanup tracking.
#[cfg_attr(test, mockall::automock)]
pub trait FileSystemOps: Send + Sync + std::fmt::Debug {
    /// Returns `true` if `path` currently is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Create `path` and any missing parents (`mkdir -p`).
    ///
    /// # Errors
    ///
    /// Returns an error if a component cannot be created.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Remove `path` if it is an empty directory.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` is missing, not empty, or not removable.
    fn remove_dir(&self, path: &Path) -> io::Result<()>;

    /// Remove `path` and everything below it.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` is missing or a part cannot be removed.
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
}

/// Production [`FileSystemOps`] implementation that delegates to [`std::fs`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFileSystemOps;

impl FileSystemOps for SystemFileSystemOps {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_dir(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_dir_all(path)
    }
}
