//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use quay::core::identity::parse_dependency_identity;
use quay::core::{Identity, SettingsAxis};

/// Quay - package identities and a content-addressed store for C and C++
#[derive(Parser)]
#[command(name = "quay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute the package identity of a recipe
    Id(IdArgs),

    /// Fetch, build and install a recipe into the store
    Create(CreateArgs),

    /// Compute identities for a directory of recipes, dependencies first
    Graph(GraphArgs),

    /// Show the settings this invocation would use
    Settings(SettingsArgs),

    /// Inspect and maintain the package store
    Store(StoreArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Settings flags shared by every command that computes identities.
#[derive(Args, Clone, Default)]
pub struct SettingsFlags {
    /// Set a settings axis (e.g. `-s compiler=gcc`, `-s options.shared=ON`)
    #[arg(short = 's', long = "setting", value_name = "AXIS=VALUE")]
    pub settings: Vec<SettingsAxis>,

    /// Do not detect os, arch and compiler from the host
    #[arg(long)]
    pub no_detect: bool,
}

/// Dependency identities supplied by the caller.
#[derive(Args, Clone, Default)]
pub struct DependencyFlags {
    /// Identity of a dependency (e.g. `--dep range-v3=<identity>`)
    #[arg(long = "dep", value_name = "NAME=IDENTITY", value_parser = parse_dependency_identity)]
    pub deps: Vec<(String, Identity)>,
}

#[derive(Args)]
pub struct IdArgs {
    /// Recipe file or directory containing Recipe.toml
    #[arg(default_value = ".")]
    pub recipe: PathBuf,

    #[command(flatten)]
    pub settings: SettingsFlags,

    #[command(flatten)]
    pub deps: DependencyFlags,

    /// Print the identity and its inputs as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CreateArgs {
    /// Recipe file or directory containing Recipe.toml
    #[arg(default_value = ".")]
    pub recipe: PathBuf,

    #[command(flatten)]
    pub settings: SettingsFlags,

    #[command(flatten)]
    pub deps: DependencyFlags,

    /// Rebuild even if the store already holds this identity
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct GraphArgs {
    /// Directory holding recipe subdirectories
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    #[command(flatten)]
    pub settings: SettingsFlags,

    #[command(flatten)]
    pub deps: DependencyFlags,
}

#[derive(Args)]
pub struct SettingsArgs {
    #[command(flatten)]
    pub settings: SettingsFlags,
}

#[derive(Args)]
pub struct StoreArgs {
    #[command(subcommand)]
    pub command: StoreCommands,
}

#[derive(Subcommand)]
pub enum StoreCommands {
    /// Print the store root
    Path,

    /// List stored artifacts
    List,

    /// Show the manifest of a stored artifact
    Show {
        /// Full identity of the artifact
        identity: Identity,
    },

    /// Remove abandoned staging directories
    Sweep,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
