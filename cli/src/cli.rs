//! Command-line definitions.
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI entry point for the deploy engine.
#[derive(Parser, Debug)]
#[command(
    name = "deploy",
    about = "Dry-run-aware provisioning for Fedora base and workstation installs",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Flags accepted by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Args, Debug, Clone, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct GlobalOpts {
    /// Show what would be done without changing anything
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Only print failures
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable coloured output (also honours NO_COLOR)
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Print debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Mirror all output, including debug entries, to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Append to the log file instead of truncating it
    #[arg(long, global = true, requires = "log_file")]
    pub append_log: bool,

    /// Scratch directory for this run (default: plan setting, then /tmp/deploy)
    #[arg(long, global = true, value_name = "PATH")]
    pub workspace: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the steps of a plan
    Apply(ApplyOpts),
    /// Run a single command inside a tracked session
    Run(RunOpts),
    /// Print the detected environment
    Env,
    /// Generate shell completions
    Completions(CompletionsOpts),
    /// Print version information
    Version,
}

/// Options for the `apply` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ApplyOpts {
    /// Plan file (default: $DEPLOY_PLAN, then ./deploy.toml)
    pub plan: Option<PathBuf>,

    /// Include workstation steps
    #[arg(long)]
    pub workstation: bool,

    /// Skip steps whose name contains any of these
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Run only steps whose name contains any of these
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,
}

/// Options for the `run` subcommand.
#[derive(Args, Debug, Clone)]
pub struct RunOpts {
    /// Run through sudo unless already root
    #[arg(long)]
    pub sudo: bool,

    /// Working directory for the command
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Environment override (repeatable)
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Create this directory and prune it at exit if still empty (repeatable)
    #[arg(long, value_name = "DIR")]
    pub track: Vec<PathBuf>,

    /// Script to run with `sh -c`
    #[arg(long, value_name = "SCRIPT", conflicts_with = "command", required_unless_present = "command")]
    pub shell: Option<String>,

    /// Program and arguments, after `--`
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

/// Options for the `completions` subcommand.
#[derive(Args, Debug, Clone)]
pub struct CompletionsOpts {
    /// Target shell
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

fn parse_env_pair(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, val)) if !key.is_empty() => Ok((key.to_string(), val.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{value}'")),
    }
}
