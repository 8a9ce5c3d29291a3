//! Recipe descriptor - the identity-relevant metadata of one package.
//!
//! A `RecipeDescriptor` is validated once at construction and read-only
//! afterwards. It carries exactly what the identity engine consumes: name,
//! version, the ordered dependency list, and the sensitivity policy.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::reference::PackageReference;
use crate::core::settings::SettingsModel;

/// Error constructing a recipe descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecipeError {
    #[error("recipe name must not be empty")]
    EmptyName,

    #[error("recipe `{name}` has an empty version")]
    EmptyVersion { name: String },

    #[error("recipe `{name}` depends on itself")]
    SelfDependency { name: String },

    #[error("recipe `{name}` declares dependency `{dependency}` more than once")]
    DuplicateDependency { name: String, dependency: String },
}

/// Which settings axes affect a package's binary output.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Sensitivity {
    /// Every axis of the active settings matters.
    #[default]
    #[serde(rename = "sensitive")]
    ConfigSensitive,

    /// No axis matters (e.g. header-only libraries).
    #[serde(rename = "invariant", alias = "header-only")]
    ConfigInvariant,

    /// Only the listed axes matter.
    #[serde(rename = "axes")]
    Axes(BTreeSet<String>),
}

impl Sensitivity {
    /// Build an axis-restricted policy.
    pub fn axes<I, S>(axes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Sensitivity::Axes(axes.into_iter().map(Into::into).collect())
    }
}

/// A declared dependency on another package.
///
/// The reference says what was asked for; the resolved identity is supplied
/// separately, keyed by `name()`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyRef {
    reference: PackageReference,
}

impl DependencyRef {
    pub fn new(reference: PackageReference) -> Self {
        DependencyRef { reference }
    }

    pub fn name(&self) -> &str {
        self.reference.name()
    }

    pub fn reference(&self) -> &PackageReference {
        &self.reference
    }
}

impl From<PackageReference> for DependencyRef {
    fn from(reference: PackageReference) -> Self {
        DependencyRef::new(reference)
    }
}

/// Identity-relevant description of one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeDescriptor {
    name: String,
    version: String,
    dependencies: Vec<DependencyRef>,
    sensitivity: Sensitivity,
}

impl RecipeDescriptor {
    /// Create a validated descriptor.
    ///
    /// Only the direct self-reference is checked here; cycles through other
    /// recipes are the caller's concern (see `ops::identify_graph`).
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        dependencies: Vec<DependencyRef>,
        sensitivity: Sensitivity,
    ) -> Result<Self, RecipeError> {
        let name = name.into();
        let version = version.into();

        if name.trim().is_empty() {
            return Err(RecipeError::EmptyName);
        }
        if version.trim().is_empty() {
            return Err(RecipeError::EmptyVersion { name });
        }

        let mut seen = HashSet::new();
        for dep in &dependencies {
            if dep.name() == name {
                return Err(RecipeError::SelfDependency { name });
            }
            if !seen.insert(dep.name()) {
                return Err(RecipeError::DuplicateDependency {
                    dependency: dep.name().to_string(),
                    name,
                });
            }
        }

        Ok(RecipeDescriptor {
            name,
            version,
            dependencies,
            sensitivity,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn dependencies(&self) -> &[DependencyRef] {
        &self.dependencies
    }

    pub fn sensitivity(&self) -> &Sensitivity {
        &self.sensitivity
    }

    /// Axes of `settings` that affect this package's output.
    pub fn relevant_axes(&self, settings: &SettingsModel) -> BTreeSet<String> {
        match &self.sensitivity {
            Sensitivity::ConfigSensitive => settings.axis_names(),
            Sensitivity::ConfigInvariant => BTreeSet::new(),
            Sensitivity::Axes(axes) => axes.clone(),
        }
    }

    /// Display name like "celaeno/0.1".
    pub fn display_name(&self) -> String {
        format!("{}/{}", self.name, self.version)
    }
}
