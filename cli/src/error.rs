//! Domain-specific error types for the deploy engine.
//!
//! Internal modules return typed errors (e.g., [`ConfigError`],
//! [`TrackingError`]) while command handlers at the CLI boundary convert them
//! to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! DeployError
//! ├── Config(ConfigError)    : plan loading and parsing
//! ├── Step(StepError)        : command failures inside a step
//! └── Tracking(TrackingError): tracked folder bookkeeping
//! ```

use std::path::PathBuf;

use thiserror::Error;

use crate::exec::RunStatus;

/// Top-level error type for the deploy engine.
#[derive(Error, Debug)]
pub enum DeployError {
    /// Plan loading error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Step execution error.
    #[error("Step error: {0}")]
    Step(#[from] StepError),

    /// Tracked folder error.
    #[error("Tracking error: {0}")]
    Tracking(#[from] TrackingError),
}

impl DeployError {
    /// Whether the error must end the run instead of marking one step failed.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        match self {
            Self::Config(_) => true,
            Self::Step(e) => matches!(e, StepError::Aborted { .. }),
            Self::Tracking(e) => matches!(e, TrackingError::NoPaths),
        }
    }
}

/// Errors that arise from loading a plan file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The plan file does not exist.
    #[error("plan file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// An I/O error occurred while reading the plan.
    #[error("IO error reading plan file {}: {source}", path.display())]
    Io {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The plan is not valid TOML or does not match the plan schema.
    #[error("invalid plan {}: {message}", path.display())]
    Parse {
        /// Path to the offending file.
        path: PathBuf,
        /// Parser message, including the location.
        message: String,
    },
}

/// Errors that arise while running the actions of a step.
#[derive(Error, Debug)]
pub enum StepError {
    /// A command exited unsuccessfully.
    #[error("`{command}` failed ({status})")]
    CommandFailed {
        /// Rendered command line.
        command: String,
        /// Status reported by the runner.
        status: RunStatus,
    },

    /// A command could not be started at all.
    #[error("could not start `{command}`: {reason}")]
    Spawn {
        /// Rendered command line.
        command: String,
        /// Rendered cause chain.
        reason: String,
    },

    /// A step configured with `on_failure = "abort"` failed.
    #[error("step '{step}' aborted the run: {reason}")]
    Aborted {
        /// Name of the step.
        step: String,
        /// What went wrong.
        reason: String,
    },
}

/// Errors that arise from tracked folder bookkeeping.
#[derive(Error, Debug)]
pub enum TrackingError {
    /// Folder creation was requested without any path.
    #[error("tracked folder creation requested without any path")]
    NoPaths,

    /// A directory could not be created.
    #[error("creating {}: {source}", path.display())]
    Create {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
