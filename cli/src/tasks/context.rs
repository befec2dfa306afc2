use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;

use crate::config::{Expander, Profile};
use crate::exec::{Executor, Runner};
use crate::logging::Log;
use crate::platform::Platform;
use crate::session::Tracker;
use crate::settings::Settings;

/// Shared context for task execution.
pub struct Context {
    /// Immutable run settings.
    pub settings: Arc<Settings>,
    /// Detected platform information.
    pub platform: Arc<Platform>,
    /// Logger for output and task recording.
    pub log: Arc<dyn Log>,
    /// Dry-run-aware command runner.
    pub runner: Runner,
    /// Tracked folders and workspace of the current session.
    pub tracker: Arc<Tracker>,
    /// User's home directory path.
    pub home: PathBuf,
    /// Selected install profile.
    pub profile: Profile,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("settings", &self.settings)
            .field("platform", &self.platform)
            .field("log", &"<dyn Log>")
            .field("runner", &self.runner)
            .field("tracker", &self.tracker)
            .field("home", &self.home)
            .field("profile", &self.profile)
            .finish()
    }
}

impl Context {
    /// Creates a new context for task execution.
    #[must_use]
    pub fn new(
        settings: Arc<Settings>,
        platform: Arc<Platform>,
        log: Arc<dyn Log>,
        executor: Arc<dyn Executor>,
        tracker: Arc<Tracker>,
        home: PathBuf,
    ) -> Self {
        let runner = Runner::new(settings.mode, executor, Arc::clone(&log));
        Self {
            settings,
            platform,
            log,
            runner,
            tracker,
            home,
            profile: Profile::Base,
        }
    }

    /// Select the install profile.
    #[must_use]
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    /// Whether mutating actions are only displayed.
    #[must_use]
    pub fn dry_run(&self) -> bool {
        self.settings.mode.is_dry_run()
    }

    /// Workspace of the running session.
    #[must_use]
    pub fn workspace(&self) -> PathBuf {
        self.tracker
            .workspace()
            .unwrap_or_else(|| self.settings.workspace_path(None))
    }

    /// Expander for `~` and `{workspace}` in plan strings.
    #[must_use]
    pub fn expander(&self) -> Expander {
        Expander::new(self.home.clone(), self.workspace())
    }
}

/// The user's home directory from `HOME`.
///
/// # Errors
///
/// Returns an error if `HOME` is unset or empty.
pub fn home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| anyhow::anyhow!("HOME environment variable is not set"))
}
