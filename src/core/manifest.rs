//! Recipe.toml parsing.
//!
//! A recipe file describes one package: its identity-relevant descriptor,
//! where its sources come from, how to build them and which files to keep.
//!
//! ```toml
//! [package]
//! name = "celaeno"
//! version = "0.1"
//! license = "MIT"
//! sensitivity = "header-only"
//! requires = ["range-v3/0.10.0@ericniebler/stable"]
//!
//! [source]
//! git = "https://gitlab.com/formigoni/celaeno.git"
//! tag = "v0.1"
//!
//! [[source.patch]]
//! file = "CMakeLists.txt"
//! search = "add_subdirectory(test)"
//!
//! [build]
//! system = "none"
//!
//! [[install]]
//! pattern = "*.hpp"
//! src = "include"
//! dst = "include"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::builder::{BuildTool, CMakeBuilder, NoopBuilder};
use crate::core::recipe::{DependencyRef, RecipeDescriptor, Sensitivity};
use crate::sources::{GitReference, SourcePatch, SourceRef};
use crate::store::{InstallError, InstallRule, Installer};
use crate::util::config::BuildSettings;
use crate::util::fs::read_to_string;

/// File name of a recipe.
pub const RECIPE_NAME: &str = "Recipe.toml";

/// Build system used by a recipe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildSystem {
    #[default]
    Cmake,
    /// Install straight from the source tree
    None,
}

/// Descriptive metadata from the `[package]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    #[serde(default)]
    pub description: Option<String>,

    /// License identifier
    #[serde(default)]
    pub license: Option<String>,

    /// Project homepage or repository
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub author: Option<String>,

    /// Keywords for discovery
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Build settings from the `[build]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeBuild {
    #[serde(default)]
    pub system: BuildSystem,

    /// Extra arguments for the build tool's configure step
    #[serde(default)]
    pub args: Vec<String>,
}

/// A parsed Recipe.toml.
#[derive(Debug, Clone)]
pub struct Recipe {
    descriptor: RecipeDescriptor,

    pub metadata: PackageMetadata,

    /// Where the sources come from; without one the recipe directory is used
    pub source: Option<SourceRef>,

    /// Applied in order after every fresh fetch
    pub patches: Vec<SourcePatch>,

    pub build: RecipeBuild,

    pub install: Vec<InstallRule>,

    /// The directory containing this recipe
    pub recipe_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRecipe {
    package: RawPackage,
    #[serde(default)]
    source: Option<RawSource>,
    #[serde(default)]
    build: RecipeBuild,
    #[serde(default)]
    install: Vec<InstallRule>,
}

#[derive(Debug, Deserialize)]
struct RawPackage {
    name: String,
    version: String,
    #[serde(default)]
    sensitivity: Sensitivity,
    #[serde(default)]
    requires: Vec<DependencyRef>,
    #[serde(flatten)]
    metadata: PackageMetadata,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSource {
    git: Option<String>,
    branch: Option<String>,
    tag: Option<String>,
    rev: Option<String>,
    path: Option<PathBuf>,
    #[serde(default)]
    patch: Vec<SourcePatch>,
}

impl RawSource {
    fn into_parts(self, recipe_dir: &Path) -> Result<(Option<SourceRef>, Vec<SourcePatch>)> {
        let source = match (self.git, self.path) {
            (Some(_), Some(_)) => bail!("[source] cannot specify both `git` and `path`"),
            (Some(git), None) => {
                let url = Url::parse(&git).with_context(|| format!("invalid git url: {}", git))?;
                let reference = match (self.branch, self.tag, self.rev) {
                    (None, None, None) => GitReference::DefaultBranch,
                    (Some(b), None, None) => GitReference::Branch(b),
                    (None, Some(t), None) => GitReference::Tag(t),
                    (None, None, Some(r)) => GitReference::Rev(r),
                    _ => bail!("[source] accepts only one of `branch`, `tag` or `rev`"),
                };
                Some(SourceRef::git(url, reference))
            }
            (None, Some(path)) => {
                if self.branch.is_some() || self.tag.is_some() || self.rev.is_some() {
                    bail!("`branch`, `tag` and `rev` only apply to git sources");
                }
                Some(SourceRef::path(recipe_dir.join(path)))
            }
            (None, None) => None,
        };

        if source.is_none() && !self.patch.is_empty() {
            bail!("[[source.patch]] requires a `git` or `path` source");
        }

        Ok((source, self.patch))
    }
}

impl Recipe {
    /// Load a recipe from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = read_to_string(path)?;

        Self::parse(&content, path)
    }

    /// Parse recipe content. Relative paths resolve against `path`'s directory.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let raw: RawRecipe = toml::from_str(content)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        let recipe_dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();

        let descriptor = RecipeDescriptor::new(
            raw.package.name,
            raw.package.version,
            raw.package.requires,
            raw.package.sensitivity,
        )
        .with_context(|| format!("invalid recipe {}", path.display()))?;

        let (source, patches) = match raw.source {
            Some(source) => source.into_parts(&recipe_dir)?,
            None => (None, Vec::new()),
        };

        let recipe = Recipe {
            descriptor,
            metadata: raw.package.metadata,
            source,
            patches,
            build: raw.build,
            install: raw.install,
            recipe_dir,
        };

        // Surface bad patterns at load time rather than after a build
        recipe.installer().with_context(|| {
            format!("invalid [[install]] rule in recipe `{}`", recipe.name())
        })?;

        Ok(recipe)
    }

    /// The identity-relevant part of the recipe.
    pub fn descriptor(&self) -> &RecipeDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn version(&self) -> &str {
        self.descriptor.version()
    }

    /// The build tool for this recipe, configured from `build` defaults.
    pub fn builder(&self, defaults: &BuildSettings) -> Box<dyn BuildTool> {
        match self.build.system {
            BuildSystem::Cmake => Box::new(
                CMakeBuilder::new()
                    .generator(defaults.generator.clone())
                    .jobs(defaults.jobs)
                    .args(defaults.cmake_args.iter().cloned())
                    .args(self.build.args.iter().cloned()),
            ),
            BuildSystem::None => Box::new(NoopBuilder),
        }
    }

    /// The installer for this recipe's install rules.
    pub fn installer(&self) -> Result<Installer, InstallError> {
        Installer::new(self.install.iter().cloned())
    }

    /// The source tree to build when the recipe has no `[source]`.
    pub fn local_source_dir(&self) -> &Path {
        &self.recipe_dir
    }
}

/// Find the recipe file for a path argument: either the file itself or a
/// directory containing Recipe.toml.
pub fn find_recipe(path: &Path) -> Result<PathBuf> {
    if path.is_dir() {
        let candidate = path.join(RECIPE_NAME);
        if candidate.is_file() {
            return Ok(candidate);
        }
        bail!("no {} found in {}", RECIPE_NAME, path.display());
    }

    if path.is_file() {
        return Ok(path.to_path_buf());
    }

    bail!("recipe not found: {}", path.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(content: &str) -> Result<Recipe> {
        Recipe::parse(content, Path::new("/recipes/celaeno/Recipe.toml"))
    }

    #[test]
    fn test_parse_header_only_recipe() {
        let recipe = parse(
            r#"
[package]
name = "celaeno"
version = "0.1"
license = "MIT"
url = "https://gitlab.com/formigoni/celaeno"
topics = ["graph", "header-only"]
sensitivity = "header-only"
requires = ["range-v3/0.10.0@ericniebler/stable"]

[source]
git = "https://gitlab.com/formigoni/celaeno.git"
tag = "v0.1"

[[source.patch]]
file = "CMakeLists.txt"
search = "add_subdirectory(test)"

[build]
system = "none"

[[install]]
pattern = "*.hpp"
src = "include"
dst = "include"

[[install]]
pattern = "LICENSE"
dst = "licenses"
"#,
        )
        .unwrap();

        assert_eq!(recipe.name(), "celaeno");
        assert_eq!(recipe.version(), "0.1");
        assert_eq!(
            recipe.descriptor().sensitivity(),
            &Sensitivity::ConfigInvariant
        );
        assert_eq!(recipe.descriptor().dependencies()[0].name(), "range-v3");
        assert_eq!(recipe.metadata.license.as_deref(), Some("MIT"));
        assert_eq!(recipe.metadata.topics.len(), 2);
        assert!(matches!(
            recipe.source,
            Some(SourceRef::Git {
                reference: GitReference::Tag(ref t),
                ..
            }) if t == "v0.1"
        ));
        assert_eq!(recipe.patches.len(), 1);
        assert!(recipe.patches[0].strict);
        assert_eq!(recipe.build.system, BuildSystem::None);
        assert_eq!(recipe.install.len(), 2);
        assert!(recipe.install[0].keep_path);
        assert!(recipe.installer().is_ok());
    }

    #[test]
    fn test_defaults_to_sensitive_cmake() {
        let recipe = parse(
            r#"
[package]
name = "zlib"
version = "1.3.1"

[source]
git = "https://github.com/madler/zlib.git"
"#,
        )
        .unwrap();

        assert_eq!(
            recipe.descriptor().sensitivity(),
            &Sensitivity::ConfigSensitive
        );
        assert_eq!(recipe.build.system, BuildSystem::Cmake);
        assert!(matches!(
            recipe.source,
            Some(SourceRef::Git {
                reference: GitReference::DefaultBranch,
                ..
            })
        ));
    }

    #[test]
    fn test_axes_sensitivity() {
        let recipe = parse(
            r#"
[package]
name = "fmt"
version = "10.2.1"
sensitivity = { axes = ["build_type", "compiler"] }

[source]
path = "src"
"#,
        )
        .unwrap();

        assert_eq!(
            recipe.descriptor().sensitivity(),
            &Sensitivity::axes(["build_type", "compiler"])
        );
    }

    #[test]
    fn test_path_source_relative_to_recipe() {
        let recipe = parse(
            r#"
[package]
name = "celaeno"
version = "0.1"

[source]
path = "../vendor/celaeno"
"#,
        )
        .unwrap();

        assert_eq!(
            recipe.source,
            Some(SourceRef::path("/recipes/celaeno/../vendor/celaeno"))
        );
    }

    #[test]
    fn test_rejects_invalid_recipes() {
        let cases = [
            // empty version
            "[package]\nname = \"a\"\nversion = \"\"\n[build]\nsystem = \"none\"\n",
            // self dependency
            "[package]\nname = \"a\"\nversion = \"1\"\nrequires = [\"a/1\"]\n[build]\nsystem = \"none\"\n",
            // git and path
            "[package]\nname = \"a\"\nversion = \"1\"\n[source]\ngit = \"https://x/a.git\"\npath = \"a\"\n",
            // two git references
            "[package]\nname = \"a\"\nversion = \"1\"\n[source]\ngit = \"https://x/a.git\"\ntag = \"v1\"\nbranch = \"main\"\n",
            // patches without sources
            "[package]\nname = \"a\"\nversion = \"1\"\n[[source.patch]]\nfile = \"a\"\nsearch = \"b\"\n",
            // bad glob
            "[package]\nname = \"a\"\nversion = \"1\"\n[build]\nsystem = \"none\"\n[[install]]\npattern = \"[\"\n",
            // unknown section
            "[package]\nname = \"a\"\nversion = \"1\"\n[bogus]\n",
        ];

        for case in cases {
            assert!(parse(case).is_err(), "accepted: {}", case);
        }
    }

    #[test]
    fn test_load_and_find_recipe() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(RECIPE_NAME);
        std::fs::write(
            &path,
            "[package]\nname = \"celaeno\"\nversion = \"0.1\"\n[build]\nsystem = \"none\"\n",
        )
        .unwrap();

        assert_eq!(find_recipe(tmp.path()).unwrap(), path);
        assert_eq!(find_recipe(&path).unwrap(), path);
        assert!(find_recipe(&tmp.path().join("missing")).is_err());

        let recipe = Recipe::load(&path).unwrap();
        assert_eq!(recipe.recipe_dir, tmp.path());
        assert!(recipe.source.is_none());
    }
}
