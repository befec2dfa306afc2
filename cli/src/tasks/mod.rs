//! Named tasks: one per plan step, executed in order with recorded outcomes.
mod context;
pub mod step;

pub use context::{Context, home_dir};

use anyhow::Result;

use crate::error::{DeployError, StepError, TrackingError};
use crate::logging::TaskStatus;

/// Result of a task's `run` method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    /// Task completed successfully.
    Ok,
    /// Task was skipped with a reason.
    Skipped(String),
    /// Dry run: actions were displayed, not performed.
    DryRun,
}

/// A named, executable task.
pub trait Task: Send + Sync {
    /// Human-readable task name.
    fn name(&self) -> &str;

    /// Whether this task should run on the current platform/profile.
    fn should_run(&self, ctx: &Context) -> bool;

    /// Execute the task.
    ///
    /// # Errors
    ///
    /// Returns an error if an action fails under the step's failure policy,
    /// or a fatal error that must end the run.
    fn run(&self, ctx: &Context) -> Result<TaskResult>;
}

/// Whether `err` must stop the run rather than fail one task.
#[must_use]
pub fn is_fatal(err: &anyhow::Error) -> bool {
    err.downcast_ref::<DeployError>().is_some_and(DeployError::is_fatal)
        || err
            .downcast_ref::<TrackingError>()
            .is_some_and(|e| matches!(e, TrackingError::NoPaths))
        || err
            .downcast_ref::<StepError>()
            .is_some_and(|e| matches!(e, StepError::Aborted { .. }))
}

/// Execute a task, recording the result in the logger.
///
/// Ordinary failures are logged and recorded; only fatal errors are returned.
///
/// # Errors
///
/// Returns the task's error if [`is_fatal`] holds for it.
pub fn execute(task: &dyn Task, ctx: &Context) -> Result<()> {
    if !task.should_run(ctx) {
        ctx.log
            .debug(&format!("skipping task: {} (not applicable)", task.name()));
        ctx.log
            .record_task(task.name(), TaskStatus::NotApplicable, None);
        return Ok(());
    }

    ctx.log.section(task.name());

    match task.run(ctx) {
        Ok(TaskResult::Ok) => {
            ctx.log.success(task.name());
            ctx.log.record_task(task.name(), TaskStatus::Ok, None);
        }
        Ok(TaskResult::Skipped(reason)) => {
            ctx.log.info(&format!("skipped: {reason}"));
            ctx.log
                .record_task(task.name(), TaskStatus::Skipped, Some(&reason));
        }
        Ok(TaskResult::DryRun) => {
            ctx.log.record_task(task.name(), TaskStatus::DryRun, None);
        }
        Err(e) if is_fatal(&e) => {
            ctx.log
                .record_task(task.name(), TaskStatus::Failed, Some(&format!("{e:#}")));
            return Err(e);
        }
        Err(e) => {
            ctx.log.error(&format!("{}: {e:#}", task.name()));
            ctx.log
                .record_task(task.name(), TaskStatus::Failed, Some(&format!("{e:#}")));
        }
    }
    Ok(())
}
