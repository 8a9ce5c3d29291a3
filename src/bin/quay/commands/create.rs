//! `quay create` command

use std::io::IsTerminal;
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use super::{dependencies, load_recipe, settings};
use crate::cli::CreateArgs;
use quay::ops::{create_package, CreateOptions};
use quay::util::diagnostic::emit;
use quay::util::GlobalContext;

pub fn execute(args: CreateArgs, verbose: bool, color: bool) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let recipe = load_recipe(&ctx, &args.recipe)?;
    let settings = settings(&ctx, &args.settings);
    let deps = dependencies(&args.deps);
    let opts = CreateOptions { force: args.force };

    let name = recipe.descriptor().display_name();

    // Verbose runs print every step instead
    let spinner = if !verbose && std::io::stderr().is_terminal() {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("Creating {}", name));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let result = create_package(&recipe, &settings, &deps, &ctx, &opts);
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let result = result?;

    for warning in &result.warnings {
        emit(warning, color);
    }

    let status = if result.cached {
        "Cached"
    } else if result.fresh {
        "Created"
    } else {
        "Verified"
    };
    eprintln!("{:>12} {} ({})", status, name, result.identity.short());
    println!("{}", result.artifact.path.display());

    Ok(())
}
