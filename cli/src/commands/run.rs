//! Run command: one invocation inside a tracked session.
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Result, anyhow};

use super::CommandSetup;
use crate::cli::RunOpts;
use crate::exec::{Invocation, RunStatus};
use crate::logging::{Log, Logger};
use crate::settings::Settings;
use crate::tasks::Context;

/// Run the run command.
///
/// The process exit code mirrors the command's; a dry run exits 0.
///
/// # Errors
///
/// Returns an error if the session cannot start, tracked folder creation
/// fails, or the command cannot be spawned.
pub fn run(settings: Arc<Settings>, opts: &RunOpts, log: &Arc<Logger>) -> Result<ExitCode> {
    let dyn_log = Arc::clone(log) as Arc<dyn Log>;
    let invocation = invocation(opts)?;
    let setup = CommandSetup::init(settings, dyn_log.as_ref())?;
    let workspace = setup.settings.workspace_path(None);
    let session = setup.start_session(Arc::clone(&dyn_log), &workspace)?;
    let ctx = setup.context(dyn_log, &session);

    let status = execute(&invocation, opts, &ctx);
    session.finish();
    Ok(exit_code(status?))
}

/// Build the invocation described by the options.
///
/// # Errors
///
/// Returns an error if neither a script nor a program was given.
pub fn invocation(opts: &RunOpts) -> Result<Invocation> {
    let invocation = match &opts.shell {
        Some(script) => Invocation::shell(script.as_str()),
        None => Invocation::from_argv(&opts.command).ok_or_else(|| anyhow!("no command given"))?,
    };
    let mut invocation = invocation.elevated(opts.sudo);
    if let Some(cwd) = &opts.cwd {
        invocation = invocation.current_dir(cwd.clone());
    }
    for (key, value) in &opts.env {
        invocation = invocation.env(key.as_str(), value.as_str());
    }
    Ok(invocation)
}

/// Create the tracked folders, then run `invocation` through the runner.
///
/// A non-zero status is reported as a failure but is not an error.
///
/// # Errors
///
/// Returns an error if tracked folder creation fails or the command cannot
/// be spawned.
pub fn execute(invocation: &Invocation, opts: &RunOpts, ctx: &Context) -> Result<RunStatus> {
    if !opts.track.is_empty() {
        ctx.tracker.create_tracked_folders(&opts.track)?;
    }
    if opts.sudo && !ctx.platform.is_root {
        ctx.log.sudo("running through sudo");
    }

    let status = ctx.runner.run(invocation)?;
    if !status.success() {
        ctx.log.error(&format!("`{invocation}` failed ({status})"));
    }
    Ok(status)
}

/// Map a command status to the process exit code.
#[must_use]
pub fn exit_code(status: RunStatus) -> ExitCode {
    if status.success() {
        return ExitCode::SUCCESS;
    }
    status
        .code
        .and_then(|code| u8::try_from(code).ok())
        .filter(|code| *code != 0)
        .map_or(ExitCode::FAILURE, ExitCode::from)
}
