//! Core logging types: severities, task entries, and the [`Log`] trait.
use std::fmt;

/// `tracing` target used for [`Severity::Section`] events.
pub const SECTION_TARGET: &str = "deploy::section";
/// `tracing` target used for [`Severity::Success`] events.
pub const SUCCESS_TARGET: &str = "deploy::success";
/// `tracing` target used for [`Severity::Sudo`] events.
pub const SUDO_TARGET: &str = "deploy::sudo";
/// `tracing` target used for [`Severity::DryRun`] events.
pub const DRY_RUN_TARGET: &str = "deploy::dry_run";

/// Severity of a log entry.
///
/// Each severity maps to a `tracing` level plus an optional target so that
/// the console and file layers can recover it from the event metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Informational message.
    Log,
    /// An action completed successfully.
    Success,
    /// Something looks wrong but the run continues.
    Warning,
    /// Non-fatal failure; reported, then the run continues.
    Failure,
    /// Phase banner separating major sections of the run.
    Section,
    /// The action about to run needs elevated privileges.
    Sudo,
    /// What would have run under dry-run mode.
    DryRun,
    /// Diagnostic detail; console only when verbose, always in the log file.
    Debug,
}

impl Severity {
    /// All severities, in display order.
    pub const ALL: [Self; 8] = [
        Self::Section,
        Self::Log,
        Self::Success,
        Self::Warning,
        Self::Failure,
        Self::Sudo,
        Self::DryRun,
        Self::Debug,
    ];

    /// The `tracing` level this severity is emitted at.
    #[must_use]
    pub const fn level(self) -> tracing::Level {
        match self {
            Self::Failure => tracing::Level::ERROR,
            Self::Warning => tracing::Level::WARN,
            Self::Debug => tracing::Level::DEBUG,
            Self::Log | Self::Success | Self::Section | Self::Sudo | Self::DryRun => {
                tracing::Level::INFO
            }
        }
    }

    /// Recover a severity from `tracing` event metadata.
    ///
    /// Events from foreign targets map onto the plain level-based severities.
    #[must_use]
    pub fn from_event(level: tracing::Level, target: &str) -> Self {
        match (level, target) {
            (tracing::Level::ERROR, _) => Self::Failure,
            (tracing::Level::WARN, _) => Self::Warning,
            (tracing::Level::INFO, SECTION_TARGET) => Self::Section,
            (tracing::Level::INFO, SUCCESS_TARGET) => Self::Success,
            (tracing::Level::INFO, SUDO_TARGET) => Self::Sudo,
            (tracing::Level::INFO, DRY_RUN_TARGET) => Self::DryRun,
            (tracing::Level::INFO, _) => Self::Log,
            _ => Self::Debug,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Log => "log",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Failure => "failure",
            Self::Section => "section",
            Self::Sudo => "sudo",
            Self::DryRun => "dry-run",
            Self::Debug => "debug",
        };
        f.write_str(name)
    }
}

/// Task execution result for summary reporting.
#[derive(Debug, Clone)]
pub struct TaskEntry {
    /// Human-readable task name.
    pub name: String,
    /// Final status of the task.
    pub status: TaskStatus,
    /// Optional detail message (e.g., skip reason or error description).
    pub message: Option<String>,
}

/// Status of a completed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task completed successfully.
    Ok,
    /// Task does not apply to the current platform or profile.
    NotApplicable,
    /// Task was skipped (tool missing, already satisfied).
    Skipped,
    /// Task ran in dry-run mode; no changes were applied.
    DryRun,
    /// Task encountered an error and could not complete.
    Failed,
}

impl TaskStatus {
    /// Every status, in summary order.
    pub const ALL: [Self; 5] = [
        Self::Ok,
        Self::NotApplicable,
        Self::Skipped,
        Self::DryRun,
        Self::Failed,
    ];

    /// Summary icon and its ANSI colour.
    #[must_use]
    pub const fn marker(self) -> (&'static str, &'static str) {
        match self {
            Self::Ok => ("✓", "\x1b[32m"),
            Self::NotApplicable => ("·", "\x1b[2m"),
            Self::Skipped => ("○", "\x1b[33m"),
            Self::DryRun => ("~", "\x1b[37m"),
            Self::Failed => ("✗", "\x1b[31m"),
        }
    }

    /// Label used in the summary totals line.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::NotApplicable => "n/a",
            Self::Skipped => "skipped",
            Self::DryRun => "dry-run",
            Self::Failed => "failed",
        }
    }
}

/// Abstraction over logging backends.
///
/// [`Logger`](super::logger::Logger) routes entries through `tracing`; tests
/// plug in recording implementations. Only [`Log::emit`] and
/// [`Log::record_task`] are required, the per-severity helpers forward to
/// `emit`.
pub trait Log: Send + Sync {
    /// Write one entry at `severity`.
    fn emit(&self, severity: Severity, msg: &str);

    /// Record a task result for the summary.
    fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>);

    /// Log a section banner.
    fn section(&self, msg: &str) {
        self.emit(Severity::Section, msg);
    }

    /// Log an informational message.
    fn info(&self, msg: &str) {
        self.emit(Severity::Log, msg);
    }

    /// Log a success message.
    fn success(&self, msg: &str) {
        self.emit(Severity::Success, msg);
    }

    /// Log a warning message.
    fn warn(&self, msg: &str) {
        self.emit(Severity::Warning, msg);
    }

    /// Log a non-fatal failure.
    fn error(&self, msg: &str) {
        self.emit(Severity::Failure, msg);
    }

    /// Log an elevated-privilege notice.
    fn sudo(&self, msg: &str) {
        self.emit(Severity::Sudo, msg);
    }

    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str) {
        self.emit(Severity::DryRun, msg);
    }

    /// Log a debug message.
    fn debug(&self, msg: &str) {
        self.emit(Severity::Debug, msg);
    }

    /// Log `header` followed by `body` as a single composite entry.
    ///
    /// See [`compose_block`](super::format::compose_block).
    fn block(&self, header: &str, body: &str) {
        self.emit(Severity::Log, &super::format::compose_block(header, body));
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn severity_survives_event_roundtrip() {
        for severity in Severity::ALL {
            let target = match severity {
                Severity::Section => SECTION_TARGET,
                Severity::Success => SUCCESS_TARGET,
                Severity::Sudo => SUDO_TARGET,
                Severity::DryRun => DRY_RUN_TARGET,
                _ => "deploy_cli::exec",
            };
            assert_eq!(
                Severity::from_event(severity.level(), target),
                severity,
                "{severity} did not map back onto itself"
            );
        }
    }

    #[test]
    fn foreign_targets_use_level() {
        assert_eq!(
            Severity::from_event(tracing::Level::INFO, "hyper"),
            Severity::Log
        );
        assert_eq!(
            Severity::from_event(tracing::Level::TRACE, "hyper"),
            Severity::Debug
        );
    }

    #[test]
    fn failure_is_the_only_error_level() {
        let errors: Vec<Severity> = Severity::ALL
            .into_iter()
            .filter(|s| s.level() == tracing::Level::ERROR)
            .collect();
        assert_eq!(errors, vec![Severity::Failure]);
    }

    #[test]
    fn task_status_equality() {
        assert_eq!(TaskStatus::Ok, TaskStatus::Ok);
        assert_ne!(TaskStatus::Ok, TaskStatus::Failed);
        assert_ne!(TaskStatus::Skipped, TaskStatus::DryRun);
        assert_ne!(TaskStatus::NotApplicable, TaskStatus::Ok);
    }
}
