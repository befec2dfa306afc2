//! Command execution: structured invocations, the [`Executor`] seam, and the
//! dry-run-aware [`Runner`] every mutating action goes through.
use std::fmt;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Output, Stdio};
use std::sync::Arc;

use anyhow::{Context as _, Result};

use crate::logging::Log;
use crate::settings::ExecutionMode;

/// Shell used for [`Program::Shell`] invocations.
const SHELL: &str = "sh";

/// What an [`Invocation`] executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Program {
    /// A program and its argument vector, executed without a shell.
    Argv {
        /// Program name or path.
        program: String,
        /// Arguments passed verbatim.
        args: Vec<String>,
    },
    /// A script executed with `sh -c`, for actions that need shell syntax.
    Shell(String),
}

/// A single command to run, with its working directory and environment.
///
/// Produced by callers and consumed by one [`Runner`] call. The
/// [`Display`](fmt::Display) form is the human-readable command line used
/// for logging and dry runs; it is never re-parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// What to execute.
    pub program: Program,
    /// Working directory; inherits the caller's when `None`.
    pub cwd: Option<PathBuf>,
    /// Environment overrides, applied on top of the inherited environment.
    pub env: Vec<(String, String)>,
    /// Run through `sudo` unless the process is already root.
    pub sudo: bool,
}

impl Invocation {
    /// Invocation of `program` with `args`.
    #[must_use]
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: Program::Argv {
                program: program.into(),
                args: args.into_iter().map(Into::into).collect(),
            },
            cwd: None,
            env: Vec::new(),
            sudo: false,
        }
    }

    /// Invocation from an argument vector whose first element is the program.
    ///
    /// Returns `None` for an empty vector.
    #[must_use]
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.iter().cloned()))
    }

    /// Invocation of a shell script.
    #[must_use]
    pub fn shell(script: impl Into<String>) -> Self {
        Self {
            program: Program::Shell(script.into()),
            cwd: None,
            env: Vec::new(),
            sudo: false,
        }
    }

    /// Set the working directory.
    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Add an environment override.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Request elevation through `sudo`.
    #[must_use]
    pub fn elevated(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }

    /// Build the [`Command`] for this invocation.
    ///
    /// `is_root` suppresses the `sudo` prefix when the process already has
    /// the privileges. Environment overrides are passed through `sudo` as
    /// leading `KEY=VALUE` arguments since `sudo` resets the environment.
    #[must_use]
    pub fn to_command(&self, is_root: bool) -> Command {
        let (program, mut args) = match &self.program {
            Program::Argv { program, args } => (program.clone(), args.clone()),
            Program::Shell(script) => (SHELL.to_string(), vec!["-c".to_string(), script.clone()]),
        };

        let mut cmd = if self.sudo && !is_root {
            let mut cmd = Command::new("sudo");
            cmd.args(self.env.iter().map(|(k, v)| format!("{k}={v}")));
            cmd.arg(program);
            cmd
        } else {
            let mut cmd = Command::new(program);
            cmd.envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            cmd
        };
        cmd.args(args.drain(..));
        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if self.sudo {
            parts.push("sudo".to_string());
        }
        parts.extend(self.env.iter().map(|(k, v)| format!("{k}={}", quote(v))));
        match &self.program {
            Program::Argv { program, args } => {
                parts.push(quote(program));
                parts.extend(args.iter().map(|a| quote(a)));
            }
            Program::Shell(script) if self.sudo || !self.env.is_empty() => {
                parts.push(format!("{SHELL} -c {}", quote(script)));
            }
            Program::Shell(script) => parts.push(script.clone()),
        }
        f.write_str(&parts.join(" "))?;
        if let Some(dir) = &self.cwd {
            write!(f, " (in {})", dir.display())?;
        }
        Ok(())
    }
}

/// Quote `arg` for display in a POSIX shell command line.
///
/// Arguments made only of characters that need no quoting are returned
/// unchanged; everything else is single-quoted.
#[must_use]
pub fn quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,~^".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Two invocations connected producer stdout → consumer stdin.
///
/// The one sanctioned shape of in-process plumbing (e.g. decrypting an
/// archive straight into the extractor without an intermediate file). It
/// has its own [`Runner::run_pipeline`] entry point so it still honours
/// dry-run mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    /// Command whose standard output feeds the consumer.
    pub producer: Invocation,
    /// Command reading the producer's output on standard input.
    pub consumer: Invocation,
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.producer, self.consumer)
    }
}

/// Outcome of a [`Runner`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStatus {
    /// Exit code; `None` when the process was killed by a signal.
    pub code: Option<i32>,
    /// `true` when nothing ran because of dry-run mode.
    pub simulated: bool,
}

impl RunStatus {
    /// Synthetic success returned in dry-run mode.
    pub const SIMULATED: Self = Self {
        code: Some(0),
        simulated: true,
    };

    /// Status for a real exit code.
    #[must_use]
    pub const fn exited(code: i32) -> Self {
        Self {
            code: Some(code),
            simulated: false,
        }
    }

    /// Whether the command (really or notionally) succeeded.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

impl From<ExitStatus> for RunStatus {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            simulated: false,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.simulated, self.code) {
            (true, _) => f.write_str("simulated"),
            (false, Some(code)) => write!(f, "exit {code}"),
            (false, None) => f.write_str("killed by signal"),
        }
    }
}

/// Captured result of a read-only probe.
#[derive(Debug)]
pub struct ExecResult {
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Exit code, if any.
    pub code: Option<i32>,
}

impl From<Output> for ExecResult {
    fn from(output: Output) -> Self {
        Self {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

/// Seam between the runner and the operating system.
///
/// [`SystemExecutor`] spawns real processes; tests substitute recording
/// implementations. Implementations never interpret exit codes.
pub trait Executor: Send + Sync + fmt::Debug {
    /// Run with inherited stdio and wait for the exit status.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    fn status(&self, invocation: &Invocation) -> Result<RunStatus>;

    /// Run with captured output.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    fn output(&self, invocation: &Invocation) -> Result<ExecResult>;

    /// Run a producer/consumer pair connected by a pipe.
    ///
    /// The result is the first failing status, consumer first
    /// (`pipefail` semantics).
    ///
    /// # Errors
    ///
    /// Returns an error if either process cannot be spawned.
    fn pipe(&self, pipeline: &Pipeline) -> Result<RunStatus>;
}

/// [`Executor`] backed by [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor {
    is_root: bool,
}

impl SystemExecutor {
    /// Executor for a process whose privileges are described by `is_root`.
    #[must_use]
    pub const fn new(is_root: bool) -> Self {
        Self { is_root }
    }
}

impl Executor for SystemExecutor {
    fn status(&self, invocation: &Invocation) -> Result<RunStatus> {
        let status = invocation
            .to_command(self.is_root)
            .status()
            .with_context(|| format!("failed to execute: {invocation}"))?;
        Ok(status.into())
    }

    fn output(&self, invocation: &Invocation) -> Result<ExecResult> {
        let output = invocation
            .to_command(self.is_root)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to execute: {invocation}"))?;
        Ok(output.into())
    }

    fn pipe(&self, pipeline: &Pipeline) -> Result<RunStatus> {
        let mut producer = pipeline
            .producer
            .to_command(self.is_root)
            .stdout(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to execute: {}", pipeline.producer))?;
        let Some(stdout) = producer.stdout.take() else {
            producer.kill().ok();
            producer.wait().ok();
            anyhow::bail!("no stdout handle for {}", pipeline.producer);
        };

        let consumer_status = match pipeline
            .consumer
            .to_command(self.is_root)
            .stdin(Stdio::from(stdout))
            .status()
        {
            Ok(status) => status,
            Err(e) => {
                producer.kill().ok();
                producer.wait().ok();
                return Err(e).with_context(|| format!("failed to execute: {}", pipeline.consumer));
            }
        };
        let producer_status = producer
            .wait()
            .with_context(|| format!("waiting for {}", pipeline.producer))?;

        let consumer_status = RunStatus::from(consumer_status);
        if consumer_status.success() {
            Ok(producer_status.into())
        } else {
            Ok(consumer_status)
        }
    }
}

/// Dry-run-aware command runner.
///
/// In [`ExecutionMode::Normal`] commands are handed to the [`Executor`] and
/// their real status returned; in [`ExecutionMode::DryRun`] the rendered
/// command is logged with the dry-run severity and a synthetic success is
/// returned without touching the executor. Exit codes are never interpreted
/// here.
#[derive(Clone)]
pub struct Runner {
    mode: ExecutionMode,
    executor: Arc<dyn Executor>,
    log: Arc<dyn Log>,
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("mode", &self.mode)
            .field("executor", &self.executor)
            .field("log", &"<dyn Log>")
            .finish()
    }
}

impl Runner {
    /// Create a runner.
    #[must_use]
    pub const fn new(mode: ExecutionMode, executor: Arc<dyn Executor>, log: Arc<dyn Log>) -> Self {
        Self {
            mode,
            executor,
            log,
        }
    }

    /// Mode this runner was created with.
    #[must_use]
    pub const fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Run one command, or describe it under dry-run.
    ///
    /// # Errors
    ///
    /// Returns an error only if the process cannot be spawned; non-zero exit
    /// codes are reported through the returned [`RunStatus`].
    pub fn run(&self, invocation: &Invocation) -> Result<RunStatus> {
        if self.mode.is_dry_run() {
            self.log.dry_run(&invocation.to_string());
            return Ok(RunStatus::SIMULATED);
        }
        self.log.debug(&format!("running: {invocation}"));
        let status = self.executor.status(invocation)?;
        self.log
            .debug(&format!("finished ({status}): {invocation}"));
        Ok(status)
    }

    /// Run a [`Pipeline`], or describe it under dry-run.
    ///
    /// # Errors
    ///
    /// Returns an error only if a process cannot be spawned.
    pub fn run_pipeline(&self, pipeline: &Pipeline) -> Result<RunStatus> {
        if self.mode.is_dry_run() {
            self.log.dry_run(&pipeline.to_string());
            return Ok(RunStatus::SIMULATED);
        }
        self.log.debug(&format!("running: {pipeline}"));
        let status = self.executor.pipe(pipeline)?;
        self.log.debug(&format!("finished ({status}): {pipeline}"));
        Ok(status)
    }

    /// Run a read-only query and capture its output, in every mode.
    ///
    /// Only for commands that change nothing (`rpm -q`, `test -d`, …);
    /// anything mutating must go through [`Runner::run`].
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    pub fn probe(&self, invocation: &Invocation) -> Result<ExecResult> {
        self.log.debug(&format!("probing: {invocation}"));
        self.executor.output(invocation)
    }
}

/// Check if a program is available on `PATH`.
#[must_use]
pub fn which(program: &str) -> bool {
    which::which(program).is_ok()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::Severity;
    use crate::tasks::test_helpers::{RecordingExecutor, RecordingLog};

    fn runner(mode: ExecutionMode) -> (Runner, Arc<RecordingExecutor>, Arc<RecordingLog>) {
        let executor = Arc::new(RecordingExecutor::default());
        let log = Arc::new(RecordingLog::default());
        let runner = Runner::new(
            mode,
            Arc::clone(&executor) as Arc<dyn Executor>,
            Arc::clone(&log) as Arc<dyn Log>,
        );
        (runner, executor, log)
    }

    #[test]
    fn quote_leaves_plain_words() {
        assert_eq!(quote("dnf"), "dnf");
        assert_eq!(quote("/usr/bin/env"), "/usr/bin/env");
        assert_eq!(quote("--repo=fedora"), "--repo=fedora");
    }

    #[test]
    fn quote_wraps_special_characters() {
        assert_eq!(quote("two words"), "'two words'");
        assert_eq!(quote(""), "''");
        assert_eq!(quote("it's"), r"'it'\''s'");
        assert_eq!(quote("$HOME"), "'$HOME'");
    }

    #[test]
    fn display_renders_sudo_env_and_cwd() {
        let inv = Invocation::new("dnf", ["install", "-y", "vim enhanced"])
            .env("LANG", "C")
            .current_dir("/tmp/deploy")
            .elevated(true);
        assert_eq!(
            inv.to_string(),
            "sudo LANG=C dnf install -y 'vim enhanced' (in /tmp/deploy)"
        );
    }

    #[test]
    fn shell_display_is_the_literal_script() {
        assert_eq!(
            Invocation::shell("rm -rf /important").to_string(),
            "rm -rf /important"
        );
        assert_eq!(
            Invocation::shell("echo $HOME").elevated(true).to_string(),
            "sudo sh -c 'echo $HOME'"
        );
    }

    #[test]
    fn pipeline_display_joins_with_bar() {
        let pipeline = Pipeline {
            producer: Invocation::new("openssl", ["enc", "-d", "-in", "keys.tar.enc"]),
            consumer: Invocation::new("tar", ["-x", "-C", "/home/me"]),
        };
        assert_eq!(
            pipeline.to_string(),
            "openssl enc -d -in keys.tar.enc | tar -x -C /home/me"
        );
    }

    #[test]
    fn from_argv_splits_program() {
        let argv = vec!["git".to_string(), "clone".to_string()];
        let inv = Invocation::from_argv(&argv).unwrap();
        assert_eq!(
            inv.program,
            Program::Argv {
                program: "git".to_string(),
                args: vec!["clone".to_string()],
            }
        );
        assert!(Invocation::from_argv(&[]).is_none());
    }

    #[test]
    fn to_command_prefixes_sudo_unless_root() {
        let inv = Invocation::new("dnf", ["upgrade"]).elevated(true);
        assert_eq!(inv.to_command(false).get_program(), "sudo");
        assert_eq!(inv.to_command(true).get_program(), "dnf");
    }

    #[test]
    fn dry_run_logs_and_never_executes() {
        let (runner, executor, log) = runner(ExecutionMode::DryRun);
        let status = runner.run(&Invocation::shell("rm -rf /important")).unwrap();
        assert_eq!(status, RunStatus::SIMULATED);
        assert!(status.success());
        assert!(executor.calls().is_empty(), "dry run reached the executor");
        assert!(log.contains(Severity::DryRun, "rm -rf /important"));
    }

    #[test]
    fn dry_run_pipeline_is_logged_not_executed() {
        let (runner, executor, log) = runner(ExecutionMode::DryRun);
        let pipeline = Pipeline {
            producer: Invocation::new("cat", ["secret"]),
            consumer: Invocation::new("tar", ["-x"]),
        };
        runner.run_pipeline(&pipeline).unwrap();
        assert!(executor.calls().is_empty());
        assert!(log.contains(Severity::DryRun, "cat secret | tar -x"));
    }

    #[test]
    fn normal_mode_returns_executor_status() {
        let (runner, executor, log) = runner(ExecutionMode::Normal);
        executor.push_status(RunStatus::exited(3));
        let status = runner.run(&Invocation::new("false", Vec::<String>::new())).unwrap();
        assert_eq!(status, RunStatus::exited(3));
        assert!(!status.success());
        assert_eq!(executor.calls(), vec!["false".to_string()]);
        assert!(!log.contains(Severity::DryRun, "false"));
    }

    #[test]
    fn probe_runs_even_in_dry_run() {
        let (runner, executor, _log) = runner(ExecutionMode::DryRun);
        let result = runner.probe(&Invocation::new("rpm", ["-q", "git"])).unwrap();
        assert!(result.success);
        assert_eq!(executor.calls(), vec!["rpm -q git".to_string()]);
    }

    #[test]
    fn run_status_display() {
        assert_eq!(RunStatus::exited(2).to_string(), "exit 2");
        assert_eq!(RunStatus::SIMULATED.to_string(), "simulated");
        let killed = RunStatus {
            code: None,
            simulated: false,
        };
        assert_eq!(killed.to_string(), "killed by signal");
        assert!(!killed.success());
    }

    #[cfg(unix)]
    #[test]
    fn system_executor_reports_real_exit_code() {
        let exec = SystemExecutor::new(false);
        let status = exec.status(&Invocation::shell("exit 7")).unwrap();
        assert_eq!(status, RunStatus::exited(7));
    }

    #[cfg(unix)]
    #[test]
    fn system_executor_applies_cwd_and_env() {
        let dir = tempfile::tempdir().unwrap();
        let exec = SystemExecutor::new(false);
        let result = exec
            .output(
                &Invocation::shell("printf '%s:%s' \"$DEPLOY_TEST\" \"$(pwd)\"")
                    .env("DEPLOY_TEST", "yes")
                    .current_dir(dir.path()),
            )
            .unwrap();
        assert!(result.success);
        let canonical = dir.path().canonicalize().unwrap();
        assert_eq!(result.stdout, format!("yes:{}", canonical.display()));
    }

    #[test]
    fn system_executor_missing_program_is_an_error() {
        let exec = SystemExecutor::new(false);
        let result = exec.status(&Invocation::new(
            "this-program-does-not-exist-12345",
            Vec::<String>::new(),
        ));
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn system_executor_pipes_producer_into_consumer() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        let exec = SystemExecutor::new(false);
        let status = exec
            .pipe(&Pipeline {
                producer: Invocation::new("printf", ["payload"]),
                consumer: Invocation::shell(format!("cat > '{}'", out.display())),
            })
            .unwrap();
        assert!(status.success());
        assert_eq!(std::fs::read_to_string(out).unwrap(), "payload");
    }

    #[cfg(unix)]
    #[test]
    fn system_executor_pipe_reports_producer_failure() {
        let exec = SystemExecutor::new(false);
        let status = exec
            .pipe(&Pipeline {
                producer: Invocation::shell("exit 4"),
                consumer: Invocation::new("cat", Vec::<String>::new()),
            })
            .unwrap();
        assert_eq!(status, RunStatus::exited(4));
    }

    #[test]
    fn which_missing_program() {
        assert!(!which("this-program-does-not-exist-12345"));
    }
}
