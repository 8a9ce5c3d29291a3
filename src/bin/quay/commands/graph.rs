//! `quay graph` command
//!
//! Identifies every recipe under a directory, dependencies first.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use super::{dependencies, settings};
use crate::cli::GraphArgs;
use quay::core::{Recipe, RECIPE_NAME};
use quay::ops::{identify_graph, PackageError};
use quay::util::GlobalContext;

pub fn execute(args: GraphArgs) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let dir = ctx.cwd().join(&args.dir);

    let recipes = discover_recipes(&dir)?
        .iter()
        .map(|path| Recipe::load(path))
        .collect::<Result<Vec<_>>>()?;
    if recipes.is_empty() {
        bail!("no {} found in {} or its subdirectories", RECIPE_NAME, dir.display());
    }

    let descriptors: Vec<_> = recipes.iter().map(|r| r.descriptor().clone()).collect();
    let settings = settings(&ctx, &args.settings);
    let external = dependencies(&args.deps);

    let identified =
        identify_graph(&descriptors, &settings, &external).map_err(PackageError::from)?;

    for (recipe, result) in identified {
        println!("{} {}", recipe.display_name(), result.identity);
    }

    Ok(())
}

/// `<dir>/Recipe.toml` and every `<dir>/*/Recipe.toml`, in path order.
fn discover_recipes(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();

    let top = dir.join(RECIPE_NAME);
    if top.is_file() {
        found.push(top);
    }

    let pattern = dir.join("*").join(RECIPE_NAME);
    let pattern = pattern.to_string_lossy();
    let matches = glob::glob(&pattern)
        .with_context(|| format!("invalid recipe pattern: {}", pattern))?;
    let mut nested: Vec<PathBuf> = matches.filter_map(|entry| entry.ok()).collect();
    nested.sort();
    found.extend(nested);

    Ok(found)
}
