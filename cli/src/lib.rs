//! Dry-run-aware provisioning engine.
//!
//! Runs the steps of a TOML plan on Fedora hosts: every mutating command goes
//! through one runner that either executes it or, in dry-run mode, only shows
//! it. Folders the run creates are tracked and pruned at exit if they are
//! still empty, and a scratch workspace is removed on every exit path,
//! signals included.
//!
//! The public API is organised into layers:
//!
//! - **[`settings`]**: immutable run configuration built from the command line
//! - **[`logging`]**: severity-tagged console and file output
//! - **[`exec`]**: the dry-run-aware [`Runner`](exec::Runner) and its OS seam
//! - **[`session`]**: tracked folders, the workspace, and once-only teardown
//! - **[`config`]**: plan parsing and validation
//! - **[`tasks`]**: plan steps executed as named tasks
//! - **[`commands`]**: top-level subcommand orchestration
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exec;
pub mod logging;
pub mod operations;
pub mod platform;
pub mod resources;
pub mod session;
pub mod settings;
pub mod tasks;

/// Version embedded by the build script, falling back to the crate version.
#[must_use]
pub fn version() -> &'static str {
    option_env!("DEPLOY_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"))
}
