//! Tracked folder resource and prune-if-empty cleanup.
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::ResourceChange;
use crate::error::TrackingError;
use crate::operations::FileSystemOps;

/// A directory created on behalf of the run and removed again at teardown
/// if it is still empty.
#[derive(Debug, Clone)]
pub struct TrackedFolder {
    /// Directory path.
    pub path: PathBuf,
    fs: Arc<dyn FileSystemOps>,
}

impl TrackedFolder {
    /// Create a new tracked folder resource.
    #[must_use]
    pub const fn new(path: PathBuf, fs: Arc<dyn FileSystemOps>) -> Self {
        Self { path, fs }
    }

    /// Create the directory and any missing parents.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::Create`] if the directory cannot be created.
    pub fn create(&self) -> Result<ResourceChange, TrackingError> {
        if self.fs.is_dir(&self.path) {
            return Ok(ResourceChange::AlreadyCorrect);
        }
        self.fs
            .create_dir_all(&self.path)
            .map_err(|source| TrackingError::Create {
                path: self.path.clone(),
                source,
            })?;
        Ok(ResourceChange::Applied)
    }
}

/// Ordered, append-only record of tracked folder paths.
///
/// Duplicates are kept; pruning the same path twice is harmless.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FolderLedger {
    paths: Vec<PathBuf>,
}

impl FolderLedger {
    /// Append a path.
    pub fn record(&mut self, path: PathBuf) {
        self.paths.push(path);
    }

    /// Recorded paths in insertion order.
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Take every recorded path, leaving the ledger empty.
    pub fn drain(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.paths)
    }
}

/// Outcome of pruning one tracked path.
#[derive(Debug)]
pub struct PruneReport {
    /// Path the walk started from.
    pub path: PathBuf,
    /// The path was not a directory; nothing was attempted.
    pub absent: bool,
    /// Directories removed, innermost first.
    pub removed: Vec<PathBuf>,
    /// Directory where the upward walk stopped, with the reason.
    pub stopped_at: Option<(PathBuf, io::Error)>,
}

impl PruneReport {
    /// Whether the walk ended the ordinary way: at a non-empty directory,
    /// a directory that vanished, or the filesystem root.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        self.stopped_at.as_ref().is_none_or(|(_, e)| {
            matches!(
                e.kind(),
                io::ErrorKind::DirectoryNotEmpty | io::ErrorKind::NotFound
            )
        })
    }
}

impl fmt::Display for PruneReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absent {
            return write!(f, "{}: not a directory, nothing to prune", self.path.display());
        }
        write!(f, "{}: removed {}", self.path.display(), self.removed.len())?;
        if let Some((stop, err)) = &self.stopped_at {
            write!(f, ", kept {} ({err})", stop.display())?;
        }
        Ok(())
    }
}

/// Remove `path` if it is an empty directory, then each ancestor that has
/// become empty, stopping at the first directory that cannot be removed.
///
/// Never fails; the returned report says what happened.
pub fn prune_empty_dirs(fs: &dyn FileSystemOps, path: &Path) -> PruneReport {
    let mut report = PruneReport {
        path: path.to_path_buf(),
        absent: !fs.is_dir(path),
        removed: Vec::new(),
        stopped_at: None,
    };
    if report.absent {
        return report;
    }

    let mut current = Some(path);
    while let Some(dir) = current.filter(|d| !d.as_os_str().is_empty()) {
        if let Err(e) = fs.remove_dir(dir) {
            report.stopped_at = Some((dir.to_path_buf(), e));
            break;
        }
        report.removed.push(dir.to_path_buf());
        current = dir.parent();
    }
    report
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::operations::{MockFileSystemOps, SystemFileSystemOps};
    use std::fs;

    fn system() -> Arc<dyn FileSystemOps> {
        Arc::new(SystemFileSystemOps)
    }

    #[test]
    fn prune_removes_empty_chain_up_to_non_empty_parent() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("deploy");
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("keep.txt"), "x").unwrap();

        let report = prune_empty_dirs(&SystemFileSystemOps, &root.join("a/b"));

        assert_eq!(report.removed, vec![root.join("a/b"), root.join("a")]);
        assert!(!root.join("a").exists());
        assert!(root.exists(), "non-empty parent must survive");
        let (stop, _) = report.stopped_at.as_ref().unwrap();
        assert_eq!(stop, &root);
        assert!(report.is_expected());
    }

    #[test]
    fn prune_keeps_non_empty_leaf() {
        let tmp = tempfile::tempdir().unwrap();
        let leaf = tmp.path().join("a/b");
        fs::create_dir_all(&leaf).unwrap();
        fs::write(leaf.join("file"), "x").unwrap();

        let report = prune_empty_dirs(&SystemFileSystemOps, &leaf);

        assert!(report.removed.is_empty());
        assert!(leaf.join("file").exists());
        assert!(report.is_expected());
    }

    #[test]
    fn prune_missing_path_is_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let report = prune_empty_dirs(&SystemFileSystemOps, &tmp.path().join("nope"));
        assert!(report.absent);
        assert!(report.removed.is_empty());
        assert!(report.stopped_at.is_none());
        assert!(report.to_string().contains("nothing to prune"));
    }

    #[test]
    fn prune_stops_at_first_unexpected_failure() {
        let mut fs = MockFileSystemOps::new();
        fs.expect_is_dir().return_const(true);
        fs.expect_remove_dir()
            .withf(|p| p == Path::new("/srv/a/b"))
            .times(1)
            .returning(|_| Ok(()));
        fs.expect_remove_dir()
            .withf(|p| p == Path::new("/srv/a"))
            .times(1)
            .returning(|_| Err(io::Error::from(io::ErrorKind::PermissionDenied)));

        let report = prune_empty_dirs(&fs, Path::new("/srv/a/b"));

        assert_eq!(report.removed, vec![PathBuf::from("/srv/a/b")]);
        assert!(!report.is_expected());
        assert!(report.to_string().contains("kept /srv/a"));
    }

    #[test]
    fn prune_relative_path_stops_before_empty_parent() {
        let mut fs = MockFileSystemOps::new();
        fs.expect_is_dir().return_const(true);
        fs.expect_remove_dir()
            .withf(|p| p == Path::new("only"))
            .times(1)
            .returning(|_| Ok(()));

        let report = prune_empty_dirs(&fs, Path::new("only"));

        assert_eq!(report.removed, vec![PathBuf::from("only")]);
        assert!(report.stopped_at.is_none());
    }

    #[test]
    fn create_makes_parents_then_reports_in_place() {
        let tmp = tempfile::tempdir().unwrap();
        let folder = TrackedFolder::new(tmp.path().join("x/y"), system());
        assert_eq!(folder.create().unwrap(), ResourceChange::Applied);
        assert!(folder.path.is_dir());
        assert_eq!(folder.create().unwrap(), ResourceChange::AlreadyCorrect);
    }

    #[test]
    fn create_failure_names_the_path() {
        let mut fs = MockFileSystemOps::new();
        fs.expect_is_dir().return_const(false);
        fs.expect_create_dir_all()
            .returning(|_| Err(io::Error::from(io::ErrorKind::PermissionDenied)));
        let folder = TrackedFolder::new(PathBuf::from("/root/forbidden"), Arc::new(fs));
        let err = folder.create().unwrap_err();
        assert!(matches!(err, TrackingError::Create { .. }));
        assert!(err.to_string().contains("/root/forbidden"));
    }

    #[test]
    fn ledger_keeps_duplicates_in_order() {
        let mut ledger = FolderLedger::default();
        ledger.record(PathBuf::from("/a"));
        ledger.record(PathBuf::from("/b"));
        ledger.record(PathBuf::from("/a"));
        assert_eq!(ledger.paths().len(), 3);
        assert_eq!(ledger.paths()[2], PathBuf::from("/a"));

        let drained = ledger.drain();
        assert_eq!(drained.len(), 3);
        assert!(ledger.paths().is_empty());
    }
}
