//! Implementation of `quay create`.
//!
//! The package pipeline for one recipe: compute the identity, return the
//! stored artifact on a hit, otherwise fetch, build and install.

use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::builder::fingerprint::{canonical_inputs, IdentityError};
use crate::builder::tool::BuildError;
use crate::core::{DependencyIdentities, Identity, Recipe, SettingsModel};
use crate::ops::identify::GraphError;
use crate::sources::SourceError;
use crate::store::{InstallError, PackageArtifact, PackageStore};
use crate::util::diagnostic::{suggestions, Diagnostic};
use crate::util::GlobalContext;

/// Number of build log lines shown in a diagnostic.
const LOG_TAIL_LINES: usize = 20;

/// Error raised by the package pipeline.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Install(#[from] InstallError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("failed to prepare build directory {}", path.display())]
    WorkDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PackageError {
    /// Render this error for the terminal.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            PackageError::Identity(IdentityError::InvalidDependencyIdentity {
                package,
                dependency,
            }) => Diagnostic::error(format!("cannot compute identity of `{}`", package))
                .with_context(format!(
                    "dependency `{}` has no resolved identity",
                    dependency
                ))
                .with_suggestion(suggestions::MISSING_DEPENDENCY)
                .with_suggestion(suggestions::IDENTIFY_GRAPH),

            PackageError::Graph(GraphError::Identity(err)) => {
                PackageError::Identity(err.clone()).to_diagnostic()
            }

            PackageError::Source(SourceError::SourceUnavailable { reference, source }) => {
                Diagnostic::error(format!("source unavailable: {}", reference))
                    .with_context(source.to_string())
                    .with_suggestion(suggestions::FETCH_FAILED)
            }

            PackageError::Source(SourceError::PatchFailed { file, search }) => {
                Diagnostic::error("source patch did not apply")
                    .with_location(file)
                    .with_context(format!("`{}` not found", search))
                    .with_suggestion(suggestions::PATCH_FAILED)
            }

            PackageError::Build(err) => {
                let mut diag = Diagnostic::error(err.to_string());
                for line in err.log_tail(LOG_TAIL_LINES) {
                    diag = diag.with_context(line);
                }
                diag.with_suggestion(suggestions::BUILD_FAILED)
            }

            // Never retried
            PackageError::Install(InstallError::InstallConflict {
                identity,
                existing,
                new,
                collision,
            }) => Diagnostic::error(format!("install conflict for {}", identity))
                .with_context(format!("stored artifact content digest: {}", existing))
                .with_context(format!("this build's content digest:    {}", new))
                .with_context(if *collision {
                    "the stored artifact was built from different identity inputs; two identities collided"
                } else {
                    "the stored artifact has the same identity inputs; the build is not reproducible"
                })
                .with_context("the stored artifact was left untouched"),

            other => {
                let mut diag = Diagnostic::error(other.to_string());
                let mut cause = std::error::Error::source(other);
                while let Some(err) = cause {
                    diag = diag.with_context(err.to_string());
                    cause = err.source();
                }
                diag
            }
        }
    }
}

/// Options for creating a package.
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// Rebuild even when the store already holds this identity
    pub force: bool,
}

/// Outcome of creating a package.
#[derive(Debug, Clone)]
pub struct CreateResult {
    pub identity: Identity,
    pub artifact: PackageArtifact,
    /// True when nothing was built because the store already had the artifact
    pub cached: bool,
    /// True when this run published the artifact
    pub fresh: bool,
    /// Problems worth reporting that did not stop the package
    pub warnings: Vec<Diagnostic>,
}

/// Create the package for `recipe` under `settings`.
pub fn create_package(
    recipe: &Recipe,
    settings: &SettingsModel,
    dependencies: &DependencyIdentities,
    ctx: &GlobalContext,
    opts: &CreateOptions,
) -> Result<CreateResult, PackageError> {
    let inputs = canonical_inputs(recipe.descriptor(), settings, dependencies)?;
    let identity = inputs.identity();
    tracing::info!(
        "{} has identity {}",
        recipe.descriptor().display_name(),
        identity.short()
    );

    let store = PackageStore::open(ctx.store_root())?;
    if !opts.force {
        if let Some(artifact) = store.lookup(&identity)? {
            tracing::info!("Using stored artifact {}", artifact.path.display());
            return Ok(CreateResult {
                identity,
                artifact,
                cached: true,
                fresh: false,
                warnings: Vec::new(),
            });
        }
    }

    // Held until the install finishes
    let checkout = match &recipe.source {
        Some(source) => {
            tracing::info!("Fetching {}", source);
            Some(ctx.source_cache().fetch(source, &recipe.patches)?)
        }
        None => None,
    };
    let source_tree = match &checkout {
        Some(checkout) => checkout.path(),
        None => recipe.local_source_dir(),
    };

    let work_root = ctx.work_dir();
    fs::create_dir_all(&work_root).map_err(|source| PackageError::WorkDir {
        path: work_root.clone(),
        source,
    })?;
    let work = tempfile::Builder::new()
        .prefix(&format!("{}-", recipe.name()))
        .tempdir_in(&work_root)
        .map_err(|source| PackageError::WorkDir {
            path: work_root.clone(),
            source,
        })?;

    let builder = recipe.builder(&ctx.config().build);
    tracing::info!("Building {} with {}", recipe.name(), builder.name());
    let output = builder.build(source_tree, settings, work.path())?;

    let outcome = recipe.installer()?.install(&store, &output, &inputs)?;

    let mut warnings = Vec::new();
    if outcome.artifact.manifest.files.is_empty() {
        tracing::debug!("{} installed no files", recipe.name());
        warnings.push(
            Diagnostic::warning(format!("package `{}` is empty", recipe.name()))
                .with_context("no built file matched the install rules")
                .with_suggestion(suggestions::EMPTY_ARTIFACT),
        );
    }

    Ok(CreateResult {
        identity,
        artifact: outcome.artifact,
        cached: false,
        fresh: outcome.fresh,
        warnings,
    })
}
