//! Run session: tracked folders, the temporary workspace, and the one-shot
//! teardown that cleans both up on every way out of the process.
//!
//! A [`Session`] owns an [`Arc<Tracker>`]. Teardown is reachable from three
//! places: [`Session::finish`] on normal completion, [`Drop`] when a fatal
//! error or panic unwinds past the session, and the signal handler installed
//! by [`Session::install_signal_handlers`]. All of them call
//! [`Tracker::teardown`], which does the work only the first time.
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context as _, Result};

use crate::error::TrackingError;
use crate::exec::quote;
use crate::logging::Log;
use crate::operations::FileSystemOps;
use crate::resources::folder::{FolderLedger, TrackedFolder, prune_empty_dirs};
use crate::resources::workspace::Workspace;
use crate::resources::{Applicable as _, ResourceChange};
use crate::settings::ExecutionMode;

/// Exit status used when a termination signal ends the run.
pub const SIGNAL_EXIT_CODE: i32 = 130;

#[derive(Debug, Default)]
struct TrackerState {
    done: bool,
    ledger: FolderLedger,
    workspace: Option<Workspace>,
    /// The workspace did not exist before this run.
    owns_workspace: bool,
}

/// Bookkeeping for everything the run must clean up.
pub struct Tracker {
    mode: ExecutionMode,
    fs: Arc<dyn FileSystemOps>,
    log: Arc<dyn Log>,
    state: Mutex<TrackerState>,
}

impl std::fmt::Debug for Tracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tracker")
            .field("mode", &self.mode)
            .field("fs", &self.fs)
            .field("log", &"<dyn Log>")
            .field("state", &self.state)
            .finish()
    }
}

impl Tracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new(mode: ExecutionMode, fs: Arc<dyn FileSystemOps>, log: Arc<dyn Log>) -> Self {
        Self {
            mode,
            fs,
            log,
            state: Mutex::new(TrackerState::default()),
        }
    }

    /// Lock the state, recovering from a poisoned lock so teardown still runs
    /// after a panic.
    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create the temporary workspace and register it for removal.
    ///
    /// The workspace is created in dry-run mode too. A directory that already
    /// exists at `path` is used as is and kept at teardown.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create_workspace(&self, path: PathBuf) -> Result<()> {
        let workspace = Workspace::new(path, Arc::clone(&self.fs));
        let change = workspace.apply()?;
        let owned = change == ResourceChange::Applied;
        if owned {
            self.log.debug(&format!(
                "{}: {}",
                workspace.description(),
                describe_change(&change)
            ));
        } else {
            self.log.warn(&format!(
                "{} already exists and will be kept",
                workspace.description()
            ));
        }
        let mut state = self.state();
        state.workspace = Some(workspace);
        state.owns_workspace = owned;
        Ok(())
    }

    /// Path of the temporary workspace, if one was created.
    #[must_use]
    pub fn workspace(&self) -> Option<PathBuf> {
        self.state().workspace.as_ref().map(|w| w.path().to_path_buf())
    }

    /// Create each directory (`mkdir -p`) and record it for prune-if-empty
    /// cleanup.
    ///
    /// Every path is recorded, including ones that already existed; teardown
    /// only ever removes empty directories. In dry-run mode the creation is
    /// logged and nothing is created or recorded.
    ///
    /// # Errors
    ///
    /// Returns [`TrackingError::NoPaths`] when `paths` is empty (nothing is
    /// created), or [`TrackingError::Create`] for the first directory that
    /// cannot be created.
    pub fn create_tracked_folders(&self, paths: &[PathBuf]) -> Result<(), TrackingError> {
        if paths.is_empty() {
            return Err(TrackingError::NoPaths);
        }
        if self.mode.is_dry_run() {
            for path in paths {
                self.log
                    .dry_run(&format!("mkdir -p {}", quote(&path.to_string_lossy())));
            }
            return Ok(());
        }
        // Held across create and record so teardown never misses a folder.
        let mut state = self.state();
        for path in paths {
            let folder = TrackedFolder::new(path.clone(), Arc::clone(&self.fs));
            let change = folder.create()?;
            state.ledger.record(folder.path);
            self.log
                .debug(&format!("tracked {}: {}", path.display(), describe_change(&change)));
        }
        Ok(())
    }

    /// Paths recorded so far, in insertion order.
    #[must_use]
    pub fn tracked(&self) -> Vec<PathBuf> {
        self.state().ledger.paths().to_vec()
    }

    /// Whether teardown has already run.
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.state().done
    }

    /// Prune tracked folders, then remove the workspace if this run created
    /// it.
    ///
    /// Runs at most once; later calls return `false` without touching the
    /// filesystem. Never fails: every per-path outcome is logged at debug and
    /// discarded. The state lock is held throughout, so a concurrent caller
    /// returns only once the first teardown has finished.
    pub fn teardown(&self) -> bool {
        let mut state = self.state();
        if state.done {
            return false;
        }
        state.done = true;

        let paths = state.ledger.drain();
        if !paths.is_empty() {
            self.log
                .debug(&format!("pruning {} tracked folder(s)", paths.len()));
        }
        for path in &paths {
            let report = prune_empty_dirs(self.fs.as_ref(), path);
            if report.is_expected() {
                self.log.debug(&report.to_string());
            } else {
                self.log.debug(&format!("cleanup incomplete: {report}"));
            }
        }

        if let Some(workspace) = state.workspace.take() {
            let removal = if state.owns_workspace {
                workspace.remove()
            } else {
                Ok(ResourceChange::Skipped {
                    reason: "existed before the run".to_string(),
                })
            };
            match removal {
                Ok(change) => self.log.debug(&format!(
                    "{}: {}",
                    workspace.description(),
                    describe_change(&change)
                )),
                Err(e) => self.log.debug(&format!("cleanup incomplete: {e:#}")),
            }
        }
        true
    }
}

fn describe_change(change: &ResourceChange) -> String {
    match change {
        ResourceChange::Applied => "done".to_string(),
        ResourceChange::AlreadyCorrect => "already in place".to_string(),
        ResourceChange::Skipped { reason } => format!("skipped ({reason})"),
    }
}

/// RAII guard around a [`Tracker`] for the duration of one run.
#[derive(Debug)]
pub struct Session {
    tracker: Arc<Tracker>,
}

impl Session {
    /// Start a session: create the tracker and the temporary workspace.
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace cannot be created.
    pub fn start(
        mode: ExecutionMode,
        log: Arc<dyn Log>,
        fs: Arc<dyn FileSystemOps>,
        workspace: &Path,
    ) -> Result<Self> {
        let tracker = Arc::new(Tracker::new(mode, fs, log));
        tracker.create_workspace(workspace.to_path_buf())?;
        Ok(Self { tracker })
    }

    /// Shared handle to the tracker.
    #[must_use]
    pub const fn tracker(&self) -> &Arc<Tracker> {
        &self.tracker
    }

    /// Route SIGINT, SIGTERM and SIGHUP to teardown, then exit with
    /// [`SIGNAL_EXIT_CODE`].
    ///
    /// Can succeed only once per process.
    ///
    /// # Errors
    ///
    /// Returns an error if a handler is already installed or cannot be
    /// registered.
    pub fn install_signal_handlers(&self) -> Result<()> {
        let tracker = Arc::clone(&self.tracker);
        ctrlc::try_set_handler(move || {
            tracker.log.warn("interrupted, cleaning up");
            tracker.teardown();
            std::process::exit(SIGNAL_EXIT_CODE);
        })
        .context("installing signal handlers")
    }

    /// Tear down explicitly at the end of a run.
    ///
    /// Returns `false` if teardown had already happened.
    pub fn finish(self) -> bool {
        self.tracker.teardown()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.tracker.teardown();
    }
}
