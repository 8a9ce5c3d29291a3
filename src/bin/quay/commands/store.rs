//! `quay store` command

use anyhow::{bail, Result};

use crate::cli::{StoreArgs, StoreCommands};
use quay::util::GlobalContext;

pub fn execute(args: StoreArgs) -> Result<()> {
    let ctx = GlobalContext::new()?;

    match args.command {
        StoreCommands::Path => {
            println!("{}", ctx.store_root().display());
        }
        StoreCommands::List => {
            let store = ctx.open_store()?;
            let artifacts = store.list()?;
            if artifacts.is_empty() {
                eprintln!("No packages in {}", store.root().display());
            }
            for artifact in artifacts {
                println!(
                    "{}/{} {}",
                    artifact.manifest.name, artifact.manifest.version, artifact.identity
                );
            }
        }
        StoreCommands::Show { identity } => {
            let store = ctx.open_store()?;
            let Some(artifact) = store.lookup(&identity)? else {
                bail!("{} is not in the store", identity);
            };
            println!("{}", artifact.path.display());
            println!("{}", serde_json::to_string_pretty(&artifact.manifest)?);
        }
        StoreCommands::Sweep => {
            let store = ctx.open_store()?;
            let removed = store.sweep_staging()?;
            eprintln!(
                "     Removed {} staging director{}",
                removed,
                if removed == 1 { "y" } else { "ies" }
            );
        }
    }

    Ok(())
}
