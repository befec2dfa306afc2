//! Plan schema: the ordered list of steps `deploy apply` executes.
//!
//! ```toml
//! workspace = "/tmp/deploy"
//!
//! [[steps]]
//! name = "Install base packages"
//! distros = ["fedora"]
//! sudo = true
//! actions = [{ run = ["dnf", "install", "-y", "git", "vim"] }]
//!
//! [[steps]]
//! name = "Restore keys"
//! profile = "workstation"
//! folders = ["~/.ssh"]
//! actions = [
//!   { from = ["openssl", "enc", "-d", "-in", "{workspace}/keys.enc"], into = ["tar", "-x", "-C", "~"] },
//! ]
//! ```
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Placeholder replaced by the workspace path.
pub const WORKSPACE_PLACEHOLDER: &str = "{workspace}";

/// A complete plan file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Plan {
    /// Workspace directory; `~` is expanded.
    #[serde(default)]
    pub workspace: Option<String>,
    /// Steps in execution order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Which install profile a step belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Always applied.
    #[default]
    Base,
    /// Applied only with `--workstation`.
    Workstation,
}

impl Profile {
    /// Whether a step of this profile runs when `selected` was requested.
    #[must_use]
    pub const fn included_in(self, selected: Self) -> bool {
        matches!((self, selected), (Self::Base, _) | (Self::Workstation, Self::Workstation))
    }
}

/// What to do when an action of a step fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnFailure {
    /// Report a warning and continue with the next action.
    Ignore,
    /// Mark the step failed and continue with the next step.
    #[default]
    Fail,
    /// Stop the whole run.
    Abort,
}

/// One opaque action.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged, deny_unknown_fields)]
pub enum Action {
    /// Program and arguments, executed without a shell.
    Run {
        /// Argument vector.
        run: Vec<String>,
    },
    /// Script for `sh -c`.
    Shell {
        /// Script text.
        shell: String,
    },
    /// Producer piped into consumer.
    Pipe {
        /// Producer argument vector.
        from: Vec<String>,
        /// Consumer argument vector.
        into: Vec<String>,
    },
}

/// A named, gated group of actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    /// Display name; also matched by `--skip`/`--only`.
    pub name: String,
    /// Install profile.
    #[serde(default)]
    pub profile: Profile,
    /// `os-release` IDs this step applies to; empty means all.
    #[serde(default)]
    pub distros: Vec<String>,
    /// Programs that must be on `PATH`; the step is skipped otherwise.
    #[serde(default)]
    pub requires: Vec<String>,
    /// Read-only probe; exit status 0 means the step is already satisfied.
    #[serde(default)]
    pub check: Option<Vec<String>>,
    /// Run every action through `sudo`.
    #[serde(default)]
    pub sudo: bool,
    /// Failure policy.
    #[serde(default)]
    pub on_failure: OnFailure,
    /// Directories created (and tracked) before the actions run.
    #[serde(default)]
    pub folders: Vec<String>,
    /// Working directory for every action.
    #[serde(default)]
    pub cwd: Option<String>,
    /// Environment overrides for every action.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Actions in order.
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// Expands `~` and [`WORKSPACE_PLACEHOLDER`] in plan strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expander {
    home: PathBuf,
    workspace: PathBuf,
}

impl Expander {
    /// Create an expander.
    #[must_use]
    pub const fn new(home: PathBuf, workspace: PathBuf) -> Self {
        Self { home, workspace }
    }

    /// Expand a leading `~` (alone or followed by `/`) and every workspace
    /// placeholder.
    #[must_use]
    pub fn expand(&self, value: &str) -> String {
        let value = value.replace(
            WORKSPACE_PLACEHOLDER,
            &self.workspace.display().to_string(),
        );
        expand_home(&value, &self.home)
    }

    /// Expand every element of an argument vector.
    #[must_use]
    pub fn expand_all(&self, values: &[String]) -> Vec<String> {
        values.iter().map(|v| self.expand(v)).collect()
    }

    /// Expand a path-valued string.
    #[must_use]
    pub fn expand_path(&self, value: &str) -> PathBuf {
        PathBuf::from(self.expand(value))
    }
}

/// Expand a leading `~` in `value` to `home`.
#[must_use]
pub fn expand_home(value: &str, home: &Path) -> String {
    if value == "~" {
        home.display().to_string()
    } else if let Some(rest) = value.strip_prefix("~/") {
        home.join(rest).display().to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::toml_loader::parse_config;

    fn parse(text: &str) -> Plan {
        parse_config(text, Path::new("deploy.toml")).unwrap()
    }

    #[test]
    fn parse_full_step() {
        let plan = parse(
            r#"
workspace = "~/scratch"

[[steps]]
name = "Clone dotfiles"
profile = "workstation"
distros = ["fedora"]
requires = ["git"]
check = ["test", "-d", "~/dotfiles"]
on_failure = "abort"
folders = ["~/src"]
cwd = "{workspace}"
env = { GIT_TERMINAL_PROMPT = "0" }
actions = [
  { run = ["git", "clone", "https://example.invalid/dotfiles.git"] },
  { shell = "ls | wc -l" },
  { from = ["cat", "a"], into = ["tar", "-x"] },
]
"#,
        );
        assert_eq!(plan.workspace.as_deref(), Some("~/scratch"));
        let step = &plan.steps[0];
        assert_eq!(step.profile, Profile::Workstation);
        assert_eq!(step.on_failure, OnFailure::Abort);
        assert!(!step.sudo);
        assert_eq!(step.env["GIT_TERMINAL_PROMPT"], "0");
        assert!(matches!(step.actions[0], Action::Run { .. }));
        assert!(matches!(step.actions[1], Action::Shell { .. }));
        assert!(matches!(step.actions[2], Action::Pipe { .. }));
    }

    #[test]
    fn defaults_apply() {
        let plan = parse("[[steps]]\nname = \"x\"\n");
        let step = &plan.steps[0];
        assert_eq!(step.profile, Profile::Base);
        assert_eq!(step.on_failure, OnFailure::Fail);
        assert!(step.actions.is_empty());
        assert!(plan.workspace.is_none());
    }

    #[test]
    fn unknown_step_key_is_rejected() {
        let err = parse_config::<Plan>(
            "[[steps]]\nname = \"x\"\nretries = 3\n",
            Path::new("deploy.toml"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("retries"));
    }

    #[test]
    fn bad_on_failure_is_rejected() {
        assert!(
            parse_config::<Plan>(
                "[[steps]]\nname = \"x\"\non_failure = \"retry\"\n",
                Path::new("deploy.toml"),
            )
            .is_err()
        );
    }

    #[test]
    fn profile_inclusion() {
        assert!(Profile::Base.included_in(Profile::Base));
        assert!(Profile::Base.included_in(Profile::Workstation));
        assert!(!Profile::Workstation.included_in(Profile::Base));
        assert!(Profile::Workstation.included_in(Profile::Workstation));
    }

    #[test]
    fn expander_handles_home_and_workspace() {
        let ex = Expander::new(PathBuf::from("/home/me"), PathBuf::from("/tmp/deploy"));
        assert_eq!(ex.expand("~"), "/home/me");
        assert_eq!(ex.expand("~/.ssh"), "/home/me/.ssh");
        assert_eq!(ex.expand("~other/x"), "~other/x");
        assert_eq!(ex.expand("{workspace}/keys.enc"), "/tmp/deploy/keys.enc");
        assert_eq!(ex.expand("--dir={workspace}"), "--dir=/tmp/deploy");
        assert_eq!(ex.expand("plain"), "plain");
        assert_eq!(
            ex.expand_path("~/a"),
            PathBuf::from("/home/me/a")
        );
    }
}
