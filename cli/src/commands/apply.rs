//! Apply command: load a plan and run its steps.
use std::sync::Arc;

use anyhow::{Context as _, Result};

use super::{CommandSetup, run_tasks_to_completion};
use crate::cli::ApplyOpts;
use crate::config::{self, LoadedPlan, PLAN_ENV, Plan, Profile, ValidationWarning};
use crate::exec::Invocation;
use crate::logging::{Log, Logger};
use crate::settings::Settings;
use crate::tasks::step::PlanStep;
use crate::tasks::{Context, Task};

/// Run the apply command.
///
/// # Errors
///
/// Returns an error if the plan cannot be loaded, the session cannot start,
/// a step fails fatally, or any step failed.
pub fn run(settings: Arc<Settings>, opts: &ApplyOpts, log: &Arc<Logger>) -> Result<()> {
    let dyn_log = Arc::clone(log) as Arc<dyn Log>;
    let setup = CommandSetup::init(settings, dyn_log.as_ref())?;

    log.section("Loading plan");
    let path = config::resolve_plan_path(opts.plan.as_deref(), std::env::var_os(PLAN_ENV));
    let loaded = LoadedPlan::load(&path)?;
    log.info(&format!(
        "loaded {} step(s) from {}",
        loaded.plan.steps.len(),
        path.display()
    ));
    report_warnings(&loaded.warnings, dyn_log.as_ref());

    let workspace = setup
        .settings
        .workspace_path(loaded.workspace(&setup.home).as_deref());
    let session = setup.start_session(Arc::clone(&dyn_log), &workspace)?;
    let ctx = setup
        .context(dyn_log, &session)
        .with_profile(profile(opts));
    log.block("Environment", &setup.platform.describe());

    let result = apply_plan(&loaded.plan, opts, &ctx, log);
    session.finish();
    result
}

/// Select the plan's steps and run them as tasks.
///
/// # Errors
///
/// Returns an error if sudo credentials cannot be obtained, a step fails
/// fatally, or any step failed.
pub fn apply_plan(plan: &Plan, opts: &ApplyOpts, ctx: &Context, log: &Logger) -> Result<()> {
    let steps: Vec<PlanStep> = plan
        .steps
        .iter()
        .filter(|s| selected(&s.name, opts))
        .cloned()
        .map(PlanStep::new)
        .collect();

    if !ctx.platform.is_root && steps.iter().any(|s| s.needs_sudo() && s.should_run(ctx)) {
        authenticate_sudo(ctx)?;
    }

    run_tasks_to_completion(steps.iter().map(|s| s as &dyn Task), ctx, log)
}

/// Prime sudo credentials once up front.
fn authenticate_sudo(ctx: &Context) -> Result<()> {
    ctx.log.sudo("some steps need root; validating sudo credentials");
    let status = ctx
        .runner
        .run(&Invocation::new("sudo", ["-v"]))
        .context("running sudo")?;
    if !status.success() {
        anyhow::bail!("sudo authentication failed ({status})");
    }
    Ok(())
}

const fn profile(opts: &ApplyOpts) -> Profile {
    if opts.workstation {
        Profile::Workstation
    } else {
        Profile::Base
    }
}

/// Whether a step name passes `--only` and `--skip` (case-insensitive
/// substring match; `--only` wins when both are given).
fn selected(name: &str, opts: &ApplyOpts) -> bool {
    let name = name.to_lowercase();
    if !opts.only.is_empty() {
        return opts.only.iter().any(|o| name.contains(&o.to_lowercase()));
    }
    if !opts.skip.is_empty() {
        return !opts.skip.iter().any(|s| name.contains(&s.to_lowercase()));
    }
    true
}

fn report_warnings(warnings: &[ValidationWarning], log: &dyn Log) {
    if warnings.is_empty() {
        return;
    }
    log.warn(&format!("found {} plan warning(s):", warnings.len()));
    for warning in warnings {
        log.warn(&format!("  {warning}"));
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::{Action, Step};
    use crate::exec::RunStatus;
    use crate::logging::{Severity, TaskStatus};
    use crate::settings::ExecutionMode;
    use crate::tasks::test_helpers::{RecordingLog, make_context};

    fn opts(skip: &[&str], only: &[&str]) -> ApplyOpts {
        ApplyOpts {
            plan: None,
            workstation: false,
            skip: skip.iter().map(ToString::to_string).collect(),
            only: only.iter().map(ToString::to_string).collect(),
        }
    }

    fn step(name: &str, argv: &[&str]) -> Step {
        Step {
            name: name.to_string(),
            actions: vec![Action::Run {
                run: argv.iter().map(ToString::to_string).collect(),
            }],
            ..Step::default()
        }
    }

    #[test]
    fn selection_by_substring() {
        assert!(selected("Install Fonts", &opts(&[], &[])));
        assert!(selected("Install Fonts", &opts(&[], &["fonts"])));
        assert!(!selected("Install Fonts", &opts(&[], &["keys"])));
        assert!(!selected("Install Fonts", &opts(&["FONT"], &[])));
        assert!(selected("Install Fonts", &opts(&["keys"], &[])));
        assert!(selected("Install Fonts", &opts(&["fonts"], &["install"])));
    }

    #[test]
    fn workstation_flag_selects_profile() {
        let mut o = opts(&[], &[]);
        assert_eq!(profile(&o), Profile::Base);
        o.workstation = true;
        assert_eq!(profile(&o), Profile::Workstation);
    }

    #[test]
    fn warnings_are_listed() {
        let log = RecordingLog::default();
        report_warnings(&[ValidationWarning::new("a", "duplicate step name")], &log);
        assert!(log.contains(Severity::Warning, "1 plan warning"));
        assert!(log.contains(Severity::Warning, "[a]: duplicate step name"));
    }

    #[test]
    fn dry_run_plan_executes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut ctx, executor, _) = make_context(ExecutionMode::DryRun, tmp.path());
        let (logger, _dir, _guard) = crate::logging::isolated_logger();
        let logger = Arc::new(logger);
        ctx.log = Arc::clone(&logger) as Arc<dyn Log>;

        let plan = Plan {
            workspace: None,
            steps: vec![
                step("packages", &["dnf", "install", "-y", "git"]),
                step("fonts", &["fc-cache", "-f"]),
            ],
        };
        apply_plan(&plan, &opts(&["fonts"], &[]), &ctx, &logger).unwrap();

        assert!(executor.calls().is_empty());
        let entries = logger.task_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "packages");
        assert_eq!(entries[0].status, TaskStatus::DryRun);
    }

    #[test]
    fn sudo_is_validated_before_elevated_steps() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut ctx, executor, _) = make_context(ExecutionMode::Normal, tmp.path());
        let (logger, _dir, _guard) = crate::logging::isolated_logger();
        let logger = Arc::new(logger);
        ctx.log = Arc::clone(&logger) as Arc<dyn Log>;

        let mut elevated = step("packages", &["dnf", "install", "-y", "git"]);
        elevated.sudo = true;
        let plan = Plan {
            workspace: None,
            steps: vec![elevated],
        };
        apply_plan(&plan, &opts(&[], &[]), &ctx, &logger).unwrap();

        let calls = executor.calls();
        assert_eq!(calls[0], "sudo -v");
        assert_eq!(calls[1], "sudo dnf install -y git");
    }

    #[test]
    fn failed_sudo_stops_before_any_step() {
        let tmp = tempfile::tempdir().unwrap();
        let (mut ctx, executor, _) = make_context(ExecutionMode::Normal, tmp.path());
        let (logger, _dir, _guard) = crate::logging::isolated_logger();
        let logger = Arc::new(logger);
        ctx.log = Arc::clone(&logger) as Arc<dyn Log>;
        executor.push_status(RunStatus::exited(1));

        let mut elevated = step("packages", &["dnf", "install", "-y", "git"]);
        elevated.sudo = true;
        let plan = Plan {
            workspace: None,
            steps: vec![elevated],
        };
        let err = apply_plan(&plan, &opts(&[], &[]), &ctx, &logger).unwrap_err();

        assert!(err.to_string().contains("sudo authentication failed"));
        assert_eq!(executor.calls(), vec!["sudo -v"]);
        assert!(logger.task_entries().is_empty());
    }
}
