//! Plan step task: gates, check probe, tracked folders, then actions.
use anyhow::Result;

use super::{Context, Task, TaskResult};
use crate::config::{Action, Expander, OnFailure, Step};
use crate::error::{DeployError, StepError};
use crate::exec::{self, Invocation, Pipeline, RunStatus};

/// A [`Step`] from the plan, executed as a task.
#[derive(Debug, Clone)]
pub struct PlanStep {
    step: Step,
}

impl PlanStep {
    /// Wrap a plan step.
    #[must_use]
    pub const fn new(step: Step) -> Self {
        Self { step }
    }

    /// Whether the step asks for elevation.
    #[must_use]
    pub const fn needs_sudo(&self) -> bool {
        self.step.sudo
    }

    /// Apply the step's working directory, environment, and elevation.
    fn decorate(&self, invocation: Invocation, ex: &Expander) -> Invocation {
        let mut invocation = invocation.elevated(self.step.sudo);
        if let Some(cwd) = &self.step.cwd {
            invocation = invocation.current_dir(ex.expand_path(cwd));
        }
        for (key, value) in &self.step.env {
            invocation = invocation.env(key.as_str(), ex.expand(value));
        }
        invocation
    }

    fn build(&self, argv: &[String], ex: &Expander) -> Result<Invocation, StepError> {
        Invocation::from_argv(&ex.expand_all(argv))
            .map(|inv| self.decorate(inv, ex))
            .ok_or_else(|| StepError::Spawn {
                command: String::new(),
                reason: "empty command".to_string(),
            })
    }

    /// Run one action; a non-zero status is an error.
    fn run_action(&self, action: &Action, ex: &Expander, ctx: &Context) -> Result<(), StepError> {
        let (command, outcome) = match action {
            Action::Run { run } => {
                let invocation = self.build(run, ex)?;
                (invocation.to_string(), ctx.runner.run(&invocation))
            }
            Action::Shell { shell } => {
                let invocation = self.decorate(Invocation::shell(ex.expand(shell)), ex);
                (invocation.to_string(), ctx.runner.run(&invocation))
            }
            Action::Pipe { from, into } => {
                let pipeline = Pipeline {
                    producer: self.build(from, ex)?,
                    consumer: self.build(into, ex)?,
                };
                (pipeline.to_string(), ctx.runner.run_pipeline(&pipeline))
            }
        };
        check_status(command, outcome)
    }

    /// Whether the read-only `check` probe reports the step as satisfied.
    fn already_satisfied(&self, ex: &Expander, ctx: &Context) -> bool {
        let Some(check) = &self.step.check else {
            return false;
        };
        let Ok(probe) = self.build(check, ex) else {
            return false;
        };
        match ctx.runner.probe(&probe) {
            Ok(result) => result.success,
            Err(e) => {
                ctx.log.debug(&format!("check could not run: {e:#}"));
                false
            }
        }
    }
}

fn check_status(command: String, outcome: Result<RunStatus>) -> Result<(), StepError> {
    match outcome {
        Ok(status) if status.success() => Ok(()),
        Ok(status) => Err(StepError::CommandFailed { command, status }),
        Err(e) => Err(StepError::Spawn {
            command,
            reason: format!("{e:#}"),
        }),
    }
}

impl Task for PlanStep {
    fn name(&self) -> &str {
        &self.step.name
    }

    fn should_run(&self, ctx: &Context) -> bool {
        self.step.profile.included_in(ctx.profile) && ctx.platform.matches_distro(&self.step.distros)
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        if let Some(missing) = self.step.requires.iter().find(|p| !exec::which(p)) {
            return Ok(TaskResult::Skipped(format!("{missing} not found")));
        }

        let ex = ctx.expander();
        if self.already_satisfied(&ex, ctx) {
            return Ok(TaskResult::Skipped("already satisfied".to_string()));
        }

        if self.step.sudo && !ctx.platform.is_root {
            ctx.log.sudo("commands in this step run through sudo");
        }

        if !self.step.folders.is_empty() {
            let folders: Vec<_> = self
                .step
                .folders
                .iter()
                .map(|f| ex.expand_path(f))
                .collect();
            ctx.tracker
                .create_tracked_folders(&folders)
                .map_err(DeployError::from)?;
        }

        for action in &self.step.actions {
            let Err(e) = self.run_action(action, &ex, ctx) else {
                continue;
            };
            match self.step.on_failure {
                OnFailure::Ignore => ctx.log.warn(&format!("ignored: {e}")),
                OnFailure::Fail => return Err(DeployError::from(e).into()),
                OnFailure::Abort => {
                    return Err(DeployError::from(StepError::Aborted {
                        step: self.step.name.clone(),
                        reason: e.to_string(),
                    })
                    .into());
                }
            }
        }

        if ctx.dry_run() {
            Ok(TaskResult::DryRun)
        } else {
            Ok(TaskResult::Ok)
        }
    }
}
