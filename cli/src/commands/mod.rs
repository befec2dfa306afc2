//! Subcommand entry points and the setup they share.
pub mod apply;
pub mod completions;
pub mod env;
pub mod run;
pub mod version;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use crate::exec::{Executor, SystemExecutor};
use crate::logging::{Log, Logger};
use crate::operations::SystemFileSystemOps;
use crate::platform::Platform;
use crate::session::Session;
use crate::settings::Settings;
use crate::tasks::{self, Context, Task};

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates platform detection and home resolution so that each command
/// does not have to repeat the boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// Immutable run settings.
    pub settings: Arc<Settings>,
    /// Detected platform.
    pub platform: Arc<Platform>,
    /// The user's home directory.
    pub home: PathBuf,
}

impl CommandSetup {
    /// Detect the platform and resolve the home directory.
    ///
    /// # Errors
    ///
    /// Returns an error if `HOME` is not set.
    pub fn init(settings: Arc<Settings>, log: &dyn Log) -> Result<Self> {
        let platform = Platform::detect();
        let home = tasks::home_dir()?;

        log.info(&format!("deploy {}", crate::version()));
        if settings.mode.is_dry_run() {
            log.dry_run("dry run: nothing will be changed");
        }
        log.debug(&format!("platform: {platform}"));
        log.debug(&format!("home: {}", home.display()));

        Ok(Self {
            settings,
            platform: Arc::new(platform),
            home,
        })
    }

    /// Start a session rooted at `workspace` and route termination signals
    /// to its teardown.
    ///
    /// # Errors
    ///
    /// Returns an error if the workspace cannot be created or the signal
    /// handlers cannot be installed.
    pub fn start_session(&self, log: Arc<dyn Log>, workspace: &Path) -> Result<Session> {
        let session = Session::start(
            self.settings.mode,
            Arc::clone(&log),
            Arc::new(SystemFileSystemOps),
            workspace,
        )?;
        session.install_signal_handlers()?;
        log.debug(&format!("workspace: {}", workspace.display()));
        Ok(session)
    }

    /// Build a task context bound to `session`, executing on the host.
    #[must_use]
    pub fn context(&self, log: Arc<dyn Log>, session: &Session) -> Context {
        let executor: Arc<dyn Executor> = Arc::new(SystemExecutor::new(self.platform.is_root));
        Context::new(
            Arc::clone(&self.settings),
            Arc::clone(&self.platform),
            log,
            executor,
            Arc::clone(session.tracker()),
            self.home.clone(),
        )
    }
}

/// Execute every task in order, print the summary, and bail if any task failed.
///
/// A fatal task error stops the run immediately and is returned as is.
///
/// # Errors
///
/// Returns an error if a task failed fatally or one or more tasks recorded a
/// failure.
pub fn run_tasks_to_completion<'a>(
    tasks: impl IntoIterator<Item = &'a dyn Task>,
    ctx: &Context,
    log: &Logger,
) -> Result<()> {
    for task in tasks {
        tasks::execute(task, ctx)?;
    }

    log.print_summary();

    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} step(s) failed");
    }
    Ok(())
}
