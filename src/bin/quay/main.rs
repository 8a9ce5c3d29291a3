//! Quay CLI - package identities and a content-addressed store

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use quay::ops::PackageError;
use quay::util::diagnostic::emit;

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    if let Err(e) = run(cli, color) {
        match e.downcast_ref::<PackageError>() {
            Some(err) => emit(&err.to_diagnostic(), color),
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli, color: bool) -> Result<()> {
    // Set up logging; RUST_LOG wins when set
    let default = if cli.verbose { "quay=debug" } else { "quay=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Id(args) => commands::id::execute(args),
        Commands::Create(args) => commands::create::execute(args, cli.verbose, color),
        Commands::Graph(args) => commands::graph::execute(args),
        Commands::Settings(args) => commands::settings::execute(args),
        Commands::Store(args) => commands::store::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
