//! Plan loading: TOML file → typed [`Plan`] plus non-fatal warnings.
pub mod plan;
pub mod toml_loader;
pub mod validation;

pub use plan::{Action, Expander, OnFailure, Plan, Profile, Step};
pub use validation::ValidationWarning;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Environment variable naming the default plan file.
pub const PLAN_ENV: &str = "DEPLOY_PLAN";

/// Plan file used when neither the command line nor [`PLAN_ENV`] names one.
pub const DEFAULT_PLAN: &str = "deploy.toml";

/// A plan together with the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedPlan {
    /// Source file.
    pub path: PathBuf,
    /// Parsed plan.
    pub plan: Plan,
    /// Validation findings.
    pub warnings: Vec<ValidationWarning>,
}

impl LoadedPlan {
    /// Load and validate the plan at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, or invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let plan: Plan = toml_loader::load_config(path)?;
        let warnings = validation::validate(&plan);
        Ok(Self {
            path: path.to_path_buf(),
            plan,
            warnings,
        })
    }

    /// Workspace requested by the plan, with `~` expanded.
    #[must_use]
    pub fn workspace(&self, home: &Path) -> Option<PathBuf> {
        self.plan
            .workspace
            .as_deref()
            .map(|w| PathBuf::from(plan::expand_home(w, home)))
    }
}

/// Resolve which plan file to load: explicit argument, then the
/// [`PLAN_ENV`] value, then [`DEFAULT_PLAN`] in the current directory.
#[must_use]
pub fn resolve_plan_path(arg: Option<&Path>, env: Option<OsString>) -> PathBuf {
    arg.map(Path::to_path_buf)
        .or_else(|| env.filter(|v| !v.is_empty()).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PLAN))
}
