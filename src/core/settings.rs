//! Build settings - the configuration axes a build runs under.
//!
//! A `SettingsModel` is an ordered `axis -> value` mapping captured once per
//! build invocation. It is never mutated in place: `with` and `project`
//! return modified copies, so filtering for identity computation can never
//! leak back into the caller's model.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::util::process::{find_c_compiler, ProcessBuilder};

/// Operating system axis.
pub const OS: &str = "os";
/// CPU architecture axis.
pub const ARCH: &str = "arch";
/// Compiler family axis.
pub const COMPILER: &str = "compiler";
/// Compiler version axis.
pub const COMPILER_VERSION: &str = "compiler.version";
/// Build type axis (Debug, Release, ...).
pub const BUILD_TYPE: &str = "build_type";
/// Prefix for custom option axes, forwarded to the build tool.
pub const OPTIONS_PREFIX: &str = "options.";

/// A single `axis=value` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SettingsAxis {
    pub name: String,
    pub value: String,
}

impl SettingsAxis {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        SettingsAxis {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl FromStr for SettingsAxis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, value) = s
            .split_once('=')
            .ok_or_else(|| format!("invalid setting `{}`; expected `axis=value`", s))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(format!("invalid setting `{}`; axis name is empty", s));
        }
        Ok(SettingsAxis::new(name, value.trim()))
    }
}

impl fmt::Display for SettingsAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

/// Build configuration axes, kept in canonical (lexicographic) order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SettingsModel {
    axes: BTreeMap<String, String>,
}

impl SettingsModel {
    /// Create an empty settings model.
    pub fn new() -> Self {
        SettingsModel::default()
    }

    /// Look up an axis. Unknown axes are `None`, never an error.
    pub fn get(&self, axis: &str) -> Option<&str> {
        self.axes.get(axis).map(String::as_str)
    }

    /// Return a copy with `axis` set to `value`.
    pub fn with(&self, axis: impl Into<String>, value: impl Into<String>) -> Self {
        let mut axes = self.axes.clone();
        axes.insert(axis.into(), value.into());
        SettingsModel { axes }
    }

    /// Return a copy with every axis of `other` applied on top of this one.
    pub fn overlay(&self, other: &SettingsModel) -> Self {
        let mut axes = self.axes.clone();
        axes.extend(other.axes.iter().map(|(k, v)| (k.clone(), v.clone())));
        SettingsModel { axes }
    }

    /// Return a copy holding only the given axes, in canonical order.
    ///
    /// Requested axes that are not set are simply absent from the result.
    pub fn project(&self, axes: &BTreeSet<String>) -> Self {
        let axes = self
            .axes
            .iter()
            .filter(|(name, _)| axes.contains(name.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        SettingsModel { axes }
    }

    /// All axis names.
    pub fn axis_names(&self) -> BTreeSet<String> {
        self.axes.keys().cloned().collect()
    }

    /// Iterate `(axis, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.axes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Custom option axes (`options.<key>`) with the prefix stripped.
    pub fn options(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter()
            .filter_map(|(k, v)| k.strip_prefix(OPTIONS_PREFIX).map(|key| (key, v)))
    }

    pub fn len(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    /// Detect settings from the host build environment.
    ///
    /// Detection is best-effort: axes that cannot be determined are left out.
    pub fn detect_host() -> Self {
        let mut settings = SettingsModel::new()
            .with(OS, std::env::consts::OS)
            .with(ARCH, std::env::consts::ARCH)
            .with(BUILD_TYPE, "Release");

        if let Some(cc) = find_c_compiler() {
            let family = compiler_family(&cc.to_string_lossy());
            settings = settings.with(COMPILER, family);

            match ProcessBuilder::new(&cc).arg("--version").exec() {
                Ok(output) => {
                    let text = String::from_utf8_lossy(&output.stdout);
                    if let Some(version) = parse_compiler_version(&text) {
                        settings = settings.with(COMPILER_VERSION, version);
                    }
                }
                Err(e) => tracing::debug!("could not query {} version: {}", cc.display(), e),
            }
        } else {
            tracing::debug!("no C compiler found on PATH; `compiler` axis left unset");
        }

        settings
    }
}

impl FromIterator<SettingsAxis> for SettingsModel {
    fn from_iter<I: IntoIterator<Item = SettingsAxis>>(iter: I) -> Self {
        SettingsModel {
            axes: iter.into_iter().map(|a| (a.name, a.value)).collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SettingsModel {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        SettingsModel {
            axes: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl fmt::Display for SettingsModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// Map a compiler executable path to its family name.
fn compiler_family(program: &str) -> &'static str {
    let name = program
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(program)
        .to_ascii_lowercase();

    if name.contains("clang") {
        "clang"
    } else if name == "cl" || name == "cl.exe" {
        "msvc"
    } else {
        "gcc"
    }
}

/// Pull the first dotted version number out of `--version` output.
fn parse_compiler_version(text: &str) -> Option<String> {
    let first_line = text.lines().next()?;
    first_line
        .split_whitespace()
        .map(|tok| tok.trim_matches(|c: char| !c.is_ascii_digit()))
        .find(|tok| {
            tok.contains('.')
                && tok
                    .split('.')
                    .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
        })
        .map(str::to_string)
}
