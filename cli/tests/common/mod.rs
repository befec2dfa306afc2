// Shared helpers for integration tests.
//
// Provides a capturing logger, a temporary-directory-backed sandbox, and
// factories for trackers and task contexts wired to the real filesystem and
// executor, so each integration test can set up an isolated run without
// repeating boilerplate.
//
// Used by all integration test binaries that declare `mod common;`.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use deploy_cli::exec::{Executor, SystemExecutor};
use deploy_cli::logging::{Log, Severity, TaskEntry, TaskStatus};
use deploy_cli::operations::SystemFileSystemOps;
use deploy_cli::platform::Platform;
use deploy_cli::session::{Session, Tracker};
use deploy_cli::settings::{ExecutionMode, Settings};
use deploy_cli::tasks::Context;

/// [`Log`] implementation that keeps every entry in memory.
#[derive(Debug, Default)]
pub struct CaptureLog {
    entries: Mutex<Vec<(Severity, String)>>,
    tasks: Mutex<Vec<TaskEntry>>,
}

impl CaptureLog {
    /// All entries logged so far.
    pub fn entries(&self) -> Vec<(Severity, String)> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// All task outcomes recorded so far.
    pub fn tasks(&self) -> Vec<TaskEntry> {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether an entry of `severity` contains `needle`.
    pub fn contains(&self, severity: Severity, needle: &str) -> bool {
        self.entries()
            .iter()
            .any(|(s, m)| *s == severity && m.contains(needle))
    }
}

impl Log for CaptureLog {
    fn emit(&self, severity: Severity, msg: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((severity, msg.to_string()));
    }

    fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>) {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(TaskEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
    }
}

/// An isolated filesystem sandbox backed by a [`tempfile::TempDir`].
///
/// The directory is automatically deleted when dropped.
pub struct Sandbox {
    pub root: tempfile::TempDir,
    pub log: Arc<CaptureLog>,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().expect("create temp dir"),
            log: Arc::new(CaptureLog::default()),
        }
    }

    /// `rel` inside the sandbox.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.path().join(rel)
    }

    /// Write `content` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(&path, content).expect("write file");
        path
    }

    fn dyn_log(&self) -> Arc<dyn Log> {
        Arc::clone(&self.log) as Arc<dyn Log>
    }

    /// Tracker on the real filesystem, logging into [`Sandbox::log`].
    pub fn tracker(&self, mode: ExecutionMode) -> Tracker {
        Tracker::new(mode, Arc::new(SystemFileSystemOps), self.dyn_log())
    }

    /// Session with its workspace at `ws` inside the sandbox.
    pub fn session(&self, mode: ExecutionMode) -> Session {
        Session::start(
            mode,
            self.dyn_log(),
            Arc::new(SystemFileSystemOps),
            &self.path("ws"),
        )
        .expect("start session")
    }

    /// Task context bound to `session`, executing real commands as a
    /// non-root user with home at `home` inside the sandbox.
    pub fn context(&self, mode: ExecutionMode, session: &Session, log: Arc<dyn Log>) -> Context {
        let settings = Arc::new(Settings {
            mode,
            ..Settings::default()
        });
        let executor: Arc<dyn Executor> = Arc::new(SystemExecutor::new(false));
        Context::new(
            settings,
            Arc::new(Platform::default()),
            log,
            executor,
            Arc::clone(session.tracker()),
            self.path("home"),
        )
    }
}

/// Whether `path` is a directory with no entries.
pub fn is_empty_dir(path: &Path) -> bool {
    std::fs::read_dir(path).is_ok_and(|mut entries| entries.next().is_none())
}
