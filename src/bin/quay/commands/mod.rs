//! Command implementations

pub mod completions;
pub mod create;
pub mod graph;
pub mod id;
pub mod settings;
pub mod store;

use std::path::Path;

use anyhow::Result;

use crate::cli::{DependencyFlags, SettingsFlags};
use quay::core::{find_recipe, DependencyIdentities, Recipe, SettingsModel};
use quay::util::GlobalContext;

/// Load the recipe named by a path argument, relative to the working directory.
pub fn load_recipe(ctx: &GlobalContext, path: &Path) -> Result<Recipe> {
    let path = find_recipe(&ctx.cwd().join(path))?;
    Recipe::load(&path)
}

/// Effective settings for this invocation.
pub fn settings(ctx: &GlobalContext, flags: &SettingsFlags) -> SettingsModel {
    ctx.settings(!flags.no_detect, &flags.settings)
}

/// Dependency identities given with `--dep`. A later flag for the same
/// name wins.
pub fn dependencies(flags: &DependencyFlags) -> DependencyIdentities {
    flags.deps.iter().cloned().collect()
}
