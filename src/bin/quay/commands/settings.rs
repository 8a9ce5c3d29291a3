//! `quay settings` command

use anyhow::Result;

use crate::cli::SettingsArgs;
use quay::util::GlobalContext;

pub fn execute(args: SettingsArgs) -> Result<()> {
    let ctx = GlobalContext::new()?;
    let settings = super::settings(&ctx, &args.settings);

    for (axis, value) in settings.iter() {
        println!("{}={}", axis, value);
    }

    Ok(())
}
