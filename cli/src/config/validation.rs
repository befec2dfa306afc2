//! Non-fatal plan checks reported after loading.
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use super::plan::{Action, Plan, Step, WORKSPACE_PLACEHOLDER};

/// A validation warning detected while loading a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// Step that triggered the warning.
    pub step: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    /// Create a warning attached to `step`.
    #[must_use]
    pub fn new(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]: {}", self.step, self.message)
    }
}

/// Check a plan for mistakes that do not stop it from loading.
#[must_use]
pub fn validate(plan: &Plan) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();
    let mut seen = HashSet::new();

    for step in &plan.steps {
        if step.name.trim().is_empty() {
            warnings.push(ValidationWarning::new("<unnamed>", "step has an empty name"));
        } else if !seen.insert(step.name.as_str()) {
            warnings.push(ValidationWarning::new(&step.name, "duplicate step name"));
        }
        validate_step(step, &mut warnings);
    }
    warnings
}

fn validate_step(step: &Step, warnings: &mut Vec<ValidationWarning>) {
    if step.actions.is_empty() && step.folders.is_empty() {
        warnings.push(ValidationWarning::new(
            &step.name,
            "step has neither actions nor folders",
        ));
    }

    if step.check.as_ref().is_some_and(|argv| is_empty_argv(argv)) {
        warnings.push(ValidationWarning::new(&step.name, "check has an empty argv"));
    }

    for (index, action) in step.actions.iter().enumerate() {
        let empty = match action {
            Action::Run { run } => is_empty_argv(run),
            Action::Shell { shell } => shell.trim().is_empty(),
            Action::Pipe { from, into } => is_empty_argv(from) || is_empty_argv(into),
        };
        if empty {
            warnings.push(ValidationWarning::new(
                &step.name,
                format!("action {} has nothing to run", index + 1),
            ));
        }
    }

    for folder in &step.folders {
        if !is_anchored(folder) {
            warnings.push(ValidationWarning::new(
                &step.name,
                format!("folder '{folder}' is relative to the current directory"),
            ));
        }
    }
}

fn is_empty_argv(argv: &[String]) -> bool {
    argv.first().is_none_or(|program| program.trim().is_empty())
}

/// Whether a folder entry resolves independently of the working directory.
fn is_anchored(folder: &str) -> bool {
    folder == "~"
        || folder.starts_with("~/")
        || folder.starts_with(WORKSPACE_PLACEHOLDER)
        || Path::new(folder).is_absolute()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn step(name: &str) -> Step {
        Step {
            name: name.to_string(),
            actions: vec![Action::Run {
                run: vec!["true".to_string()],
            }],
            ..Step::default()
        }
    }

    #[test]
    fn clean_plan_has_no_warnings() {
        let mut s = step("a");
        s.folders = vec!["~/x".to_string(), "/opt/y".to_string(), "{workspace}/z".to_string()];
        let plan = Plan {
            workspace: None,
            steps: vec![s, step("b")],
        };
        assert!(validate(&plan).is_empty());
    }

    #[test]
    fn duplicate_names_are_reported_once() {
        let plan = Plan {
            workspace: None,
            steps: vec![step("a"), step("a"), step("b")],
        };
        let warnings = validate(&plan);
        assert_eq!(warnings, vec![ValidationWarning::new("a", "duplicate step name")]);
    }

    #[test]
    fn empty_step_and_empty_argv() {
        let mut s = step("bad");
        s.actions = vec![
            Action::Run { run: vec![] },
            Action::Shell {
                shell: "  ".to_string(),
            },
            Action::Pipe {
                from: vec!["cat".to_string()],
                into: vec![String::new()],
            },
        ];
        s.check = Some(vec![]);
        let warnings = validate(&Plan {
            workspace: None,
            steps: vec![s, Step {
                name: "empty".to_string(),
                ..Step::default()
            }],
        });
        let messages: Vec<String> = warnings.iter().map(ToString::to_string).collect();
        assert!(messages.contains(&"[bad]: check has an empty argv".to_string()));
        assert!(messages.contains(&"[bad]: action 1 has nothing to run".to_string()));
        assert!(messages.contains(&"[bad]: action 2 has nothing to run".to_string()));
        assert!(messages.contains(&"[bad]: action 3 has nothing to run".to_string()));
        assert!(messages.contains(&"[empty]: step has neither actions nor folders".to_string()));
    }

    #[test]
    fn relative_folder_is_reported() {
        let mut s = step("rel");
        s.folders = vec!["build/out".to_string()];
        let warnings = validate(&Plan {
            workspace: None,
            steps: vec![s],
        });
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("build/out"));
    }
}
