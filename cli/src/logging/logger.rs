//! Structured logger with dry-run awareness and summary collection.
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::types::{
    DRY_RUN_TARGET, Log, SECTION_TARGET, SUCCESS_TARGET, SUDO_TARGET, Severity, TaskEntry,
    TaskStatus,
};

const RESET: &str = "\x1b[0m";

/// `tracing`-backed [`Log`] implementation.
///
/// Entries become `tracing` events whose level and target encode the
/// [`Severity`]; the layers installed by
/// [`init_subscriber`](super::subscriber::init_subscriber) decide where they
/// end up. Task outcomes are collected for [`Logger::print_summary`].
#[derive(Debug, Default)]
pub struct Logger {
    tasks: Mutex<Vec<TaskEntry>>,
    log_file: Option<PathBuf>,
}

impl Logger {
    /// Create a new logger.
    ///
    /// `log_file` is only used to point at the mirror in the run summary; the
    /// file itself is owned by the subscriber's file layer.
    #[must_use]
    pub const fn new(log_file: Option<PathBuf>) -> Self {
        Self {
            tasks: Mutex::new(Vec::new()),
            log_file,
        }
    }

    /// Return the log file path, if available.
    #[cfg(test)]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Snapshot of the recorded task outcomes, in order.
    #[must_use]
    pub fn task_entries(&self) -> Vec<TaskEntry> {
        self.entries().clone()
    }

    /// Whether any step failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }

    /// Number of failed steps.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.entries()
            .iter()
            .filter(|t| t.status == TaskStatus::Failed)
            .count()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<TaskEntry>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Log one line per recorded step followed by per-status totals.
    ///
    /// Prints nothing when no step was recorded.
    pub fn print_summary(&self) {
        let tasks = self.task_entries();
        if tasks.is_empty() {
            return;
        }
        self.section("Summary");

        for task in &tasks {
            let (icon, color) = task.status.marker();
            let detail = task
                .message
                .as_deref()
                .map_or_else(String::new, |m| format!(" ({m})"));
            self.info(&format!("{color}{icon} {}{detail}{RESET}", task.name));
        }

        let totals: Vec<String> = TaskStatus::ALL
            .iter()
            .map(|status| {
                let count = tasks.iter().filter(|t| t.status == *status).count();
                let (_, color) = status.marker();
                format!("{color}{count} {}{RESET}", status.label())
            })
            .collect();
        self.info(&format!("{} steps: {}", tasks.len(), totals.join(", ")));

        if let Some(path) = &self.log_file {
            self.info(&format!("\x1b[2mlog: {}{RESET}", path.display()));
        }
    }
}

impl Log for Logger {
    fn emit(&self, severity: Severity, msg: &str) {
        match severity {
            Severity::Log => tracing::info!("{msg}"),
            Severity::Success => tracing::info!(target: SUCCESS_TARGET, "{msg}"),
            Severity::Section => tracing::info!(target: SECTION_TARGET, "{msg}"),
            Severity::Sudo => tracing::info!(target: SUDO_TARGET, "{msg}"),
            Severity::DryRun => tracing::info!(target: DRY_RUN_TARGET, "{msg}"),
            Severity::Warning => tracing::warn!("{msg}"),
            Severity::Failure => tracing::error!("{msg}"),
            Severity::Debug => tracing::debug!("{msg}"),
        }
    }

    fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>) {
        self.entries().push(TaskEntry {
            name: name.to_string(),
            status,
            message: message.map(String::from),
        });
    }
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::logging::isolated_logger;
    use std::fs;

    fn file_contents(log: &Logger) -> String {
        fs::read_to_string(log.log_path().expect("log path")).unwrap()
    }

    #[test]
    fn logger_new() {
        let (log, _tmp, _guard) = isolated_logger();
        assert!(log.task_entries().is_empty(), "expected empty task list");
    }

    #[test]
    fn record_task_with_message() {
        let (log, _tmp, _guard) = isolated_logger();
        log.record_task("packages", TaskStatus::Skipped, Some("dnf not found"));
        let tasks = log.task_entries();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].name, "packages");
        assert_eq!(tasks[0].message, Some("dnf not found".to_string()));
    }

    #[test]
    fn failure_count_returns_correct_count() {
        let (log, _tmp, _guard) = isolated_logger();
        assert!(!log.has_failures());
        log.record_task("a", TaskStatus::Ok, None);
        log.record_task("b", TaskStatus::Failed, Some("exit 1"));
        log.record_task("c", TaskStatus::Failed, Some("exit 2"));
        log.record_task("d", TaskStatus::DryRun, None);
        assert_eq!(log.failure_count(), 2);
        assert!(log.has_failures());
    }

    #[test]
    fn log_trait_delegates_to_logger() {
        let (log, _tmp, _guard) = isolated_logger();
        let log_ref: &dyn Log = &log;
        log_ref.record_task("via-trait", TaskStatus::Ok, None);
        assert_eq!(log.task_entries().len(), 1);
    }

    #[test]
    fn every_severity_reaches_the_file_with_its_tag() {
        let (log, _tmp, _guard) = isolated_logger();
        let cases = [
            (Severity::Section, "==> "),
            (Severity::Success, "[ok] "),
            (Severity::Warning, "[warn] "),
            (Severity::Failure, "[error] "),
            (Severity::Sudo, "[sudo] "),
            (Severity::DryRun, "[dry run] "),
            (Severity::Debug, "[debug] "),
        ];
        for (severity, tag) in cases {
            log.emit(severity, &format!("marker-{severity}"));
            let contents = file_contents(&log);
            let line = contents
                .lines()
                .find(|l| l.contains(&format!("marker-{severity}")))
                .unwrap_or_else(|| panic!("{severity} entry missing from log file"));
            assert!(line.contains(tag), "{severity} line lacks {tag:?}: {line}");
        }
    }

    #[test]
    fn block_is_written_as_one_entry() {
        let (log, _tmp, _guard) = isolated_logger();
        log.block("Detected environment", "os: Fedora Linux 41\narch: x86_64");
        let contents = file_contents(&log);
        let start = contents.find("Detected environment").unwrap();
        let tail = &contents[start..];
        assert!(tail.contains("\n"));
        assert!(tail.contains("  os: Fedora Linux 41"));
        assert!(tail.contains("  arch: x86_64"));
        assert_eq!(
            contents.matches("] ").count(),
            1,
            "block must carry a single timestamp"
        );
    }

    #[test]
    fn summary_lists_tasks_in_file() {
        let (log, _tmp, _guard) = isolated_logger();
        log.record_task("Install base packages", TaskStatus::Ok, None);
        log.record_task("Enable flathub", TaskStatus::Failed, Some("exit 1"));
        log.print_summary();
        let contents = file_contents(&log);
        assert!(contents.contains("==> Summary"));
        assert!(contents.contains("✓ Install base packages"));
        assert!(contents.contains("✗ Enable flathub (exit 1)"));
        assert!(contents.contains("2 steps: 1 ok, 0 n/a, 0 skipped, 0 dry-run, 1 failed"));
    }

    #[test]
    fn summary_is_silent_without_tasks() {
        let (log, _tmp, _guard) = isolated_logger();
        log.print_summary();
        assert!(!file_contents(&log).contains("Summary"));
    }
}
