//! Host detection: distribution, privileges, and session type.
use std::fmt;
use std::path::Path;

/// Default location of the os-release file.
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Fields of interest from `os-release(5)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    /// Lower-case distribution identifier (`fedora`, `arch`, ...).
    pub id: String,
    /// Distributions this one derives from.
    pub id_like: Vec<String>,
    /// Version identifier, if any (rolling releases have none).
    pub version_id: Option<String>,
    /// Human-readable name.
    pub pretty_name: Option<String>,
}

impl OsRelease {
    /// Parse the contents of an os-release file.
    ///
    /// Unknown keys, comments and malformed lines are ignored. Values may be
    /// single- or double-quoted.
    #[must_use]
    pub fn parse(contents: &str) -> Self {
        let mut release = Self::default();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, raw)) = line.split_once('=') else {
                continue;
            };
            let value = unquote(raw.trim());
            match key.trim() {
                "ID" => release.id = value.to_ascii_lowercase(),
                "ID_LIKE" => {
                    release.id_like = value
                        .split_whitespace()
                        .map(str::to_ascii_lowercase)
                        .collect();
                }
                "VERSION_ID" => release.version_id = Some(value.to_string()),
                "PRETTY_NAME" => release.pretty_name = Some(value.to_string()),
                _ => {}
            }
        }
        release
    }

    /// Read and parse an os-release file; missing or unreadable files yield
    /// an empty release.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        std::fs::read_to_string(path).map_or_else(|_| Self::default(), |c| Self::parse(&c))
    }
}

fn unquote(value: &str) -> &str {
    ['"', '\'']
        .iter()
        .find_map(|q| value.strip_prefix(*q).and_then(|v| v.strip_suffix(*q)))
        .unwrap_or(value)
}

/// Platform information for the current system.
#[derive(Debug, Clone, Default)]
pub struct Platform {
    /// Parsed os-release data.
    pub os_release: OsRelease,
    /// Whether the process runs with an effective uid of 0.
    pub is_root: bool,
    /// Whether a graphical session is available.
    pub graphical: bool,
    /// CPU architecture.
    pub arch: &'static str,
}

impl Platform {
    /// Detect the current platform.
    #[must_use]
    pub fn detect() -> Self {
        Self {
            os_release: OsRelease::load(Path::new(OS_RELEASE_PATH)),
            is_root: detect_root(),
            graphical: ["WAYLAND_DISPLAY", "DISPLAY"]
                .iter()
                .any(|v| std::env::var_os(v).is_some_and(|s| !s.is_empty())),
            arch: std::env::consts::ARCH,
        }
    }

    /// Create a platform with explicit values (for testing).
    #[cfg(test)]
    #[must_use]
    pub fn new(id: &str, is_root: bool) -> Self {
        Self {
            os_release: OsRelease {
                id: id.to_string(),
                ..OsRelease::default()
            },
            is_root,
            graphical: false,
            arch: "x86_64",
        }
    }

    /// Whether the host is one of `distros`, directly or through `ID_LIKE`.
    ///
    /// An empty list matches every host.
    #[must_use]
    pub fn matches_distro(&self, distros: &[String]) -> bool {
        distros.is_empty()
            || distros.iter().any(|d| {
                d.eq_ignore_ascii_case(&self.os_release.id)
                    || self
                        .os_release
                        .id_like
                        .iter()
                        .any(|like| d.eq_ignore_ascii_case(like))
            })
    }

    /// Multi-line `key: value` description for the environment report.
    #[must_use]
    pub fn describe(&self) -> String {
        let name = self
            .os_release
            .pretty_name
            .clone()
            .unwrap_or_else(|| self.os_release.id.clone());
        let mut lines = vec![format!("os: {}", if name.is_empty() { "unknown" } else { name.as_str() })];
        if let Some(version) = &self.os_release.version_id {
            lines.push(format!("version: {version}"));
        }
        lines.push(format!("arch: {}", self.arch));
        lines.push(format!("root: {}", yes_no(self.is_root)));
        lines.push(format!("graphical: {}", yes_no(self.graphical)));
        lines.join("\n")
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = if self.os_release.id.is_empty() {
            "unknown"
        } else {
            self.os_release.id.as_str()
        };
        match &self.os_release.version_id {
            Some(version) => write!(f, "{id} {version} ({})", self.arch),
            None => write!(f, "{id} ({})", self.arch),
        }
    }
}

const fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

#[cfg(unix)]
fn detect_root() -> bool {
    nix::unistd::Uid::effective().is_root()
}

#[cfg(not(unix))]
const fn detect_root() -> bool {
    false
}
