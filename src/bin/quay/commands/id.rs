//! `quay id` command

use anyhow::Result;

use super::{dependencies, load_recipe, settings};
use crate::cli::IdArgs;
use quay::ops::{identify, PackageError};
use quay::util::GlobalContext;

pub fn execute(args: IdArgs) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let recipe = load_recipe(&ctx, &args.recipe)?;
    let settings = settings(&ctx, &args.settings);
    let deps = dependencies(&args.deps);

    let identified =
        identify(recipe.descriptor(), &settings, &deps).map_err(PackageError::from)?;

    if args.json {
        let out = serde_json::json!({
            "identity": identified.identity,
            "inputs": identified.inputs,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{}", identified.identity);
    }

    Ok(())
}
