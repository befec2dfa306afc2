//! Immutable run settings, resolved once from the command line.
//!
//! Nothing here changes after [`Settings::from_cli`] returns; components get
//! the settings by reference (or a copied [`ExecutionMode`]) instead of
//! reading process-wide flags.
use std::fmt;
use std::path::{Path, PathBuf};

use tracing_subscriber::filter::LevelFilter;

use crate::cli::GlobalOpts;

/// Scratch directory used when neither the CLI nor the plan names one.
pub const DEFAULT_WORKSPACE: &str = "/tmp/deploy";

/// Whether mutating actions are performed or only displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Actions are executed.
    #[default]
    Normal,
    /// Actions are logged with a dry-run marker and never executed.
    DryRun,
}

impl ExecutionMode {
    /// Map the `--dry-run` flag onto a mode.
    #[must_use]
    pub const fn from_flag(dry_run: bool) -> Self {
        if dry_run { Self::DryRun } else { Self::Normal }
    }

    /// Returns `true` for [`ExecutionMode::DryRun`].
    #[must_use]
    pub const fn is_dry_run(self) -> bool {
        matches!(self, Self::DryRun)
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("normal"),
            Self::DryRun => f.write_str("dry run"),
        }
    }
}

/// Log file mirror configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    /// File receiving a copy of every entry.
    pub path: PathBuf,
    /// Append to an existing file instead of truncating it.
    pub append: bool,
}

/// Output configuration for the logging subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct LogSettings {
    /// Hide everything except failures on the console.
    pub quiet: bool,
    /// Apply ANSI styling on the console.
    pub color: bool,
    /// Show debug entries on the console.
    pub verbose: bool,
    /// Optional log file mirror.
    pub file: Option<LogFile>,
}

impl LogSettings {
    /// Console level filter; quiet takes precedence over verbose.
    #[must_use]
    pub const fn console_level(&self) -> LevelFilter {
        if self.quiet {
            LevelFilter::ERROR
        } else if self.verbose {
            LevelFilter::DEBUG
        } else {
            LevelFilter::INFO
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            quiet: false,
            color: true,
            verbose: false,
            file: None,
        }
    }
}

/// Everything a run needs to know about how to behave.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Settings {
    /// Execution mode, fixed for the process lifetime.
    pub mode: ExecutionMode,
    /// Logging configuration.
    pub log: LogSettings,
    /// Workspace override from the command line.
    pub workspace: Option<PathBuf>,
}

impl Settings {
    /// Build settings from parsed global options and the environment.
    ///
    /// A non-empty `NO_COLOR` environment variable disables colour.
    #[must_use]
    pub fn from_cli(global: &GlobalOpts) -> Self {
        let no_color_env = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        Self::from_opts(global, no_color_env)
    }

    /// Build settings from parsed global options.
    #[must_use]
    pub fn from_opts(global: &GlobalOpts, no_color_env: bool) -> Self {
        Self {
            mode: ExecutionMode::from_flag(global.dry_run),
            log: LogSettings {
                quiet: global.quiet,
                color: !global.no_color && !no_color_env,
                verbose: global.verbose,
                file: global.log_file.as_ref().map(|path| LogFile {
                    path: path.clone(),
                    append: global.append_log,
                }),
            },
            workspace: global.workspace.clone(),
        }
    }

    /// Resolve the workspace path: command line, then plan, then default.
    #[must_use]
    pub fn workspace_path(&self, from_plan: Option<&Path>) -> PathBuf {
        self.workspace
            .clone()
            .or_else(|| from_plan.map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKSPACE))
    }
}
