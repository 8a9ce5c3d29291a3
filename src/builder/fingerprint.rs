//! Package identity computation.
//!
//! The identity of a package variant is a SHA-256 digest over a canonical,
//! length-prefixed encoding of:
//!
//! 1. the scheme tag (so future encodings can never collide with this one)
//! 2. package name and version
//! 3. the settings axes the recipe is sensitive to, in lexicographic order
//! 4. the resolved identities of its dependencies, in declaration order
//!
//! Axes outside the recipe's sensitivity never reach the hash, which is what
//! lets a header-only package built under gcc/Release be reused as-is by a
//! clang/Debug consumer. Dependency order is deliberately not normalized: a
//! reordered dependency list is a different recipe.
//!
//! Distinct inputs are assumed to produce distinct identities. SHA-256
//! collisions are treated as negligible, not impossible; the installer's
//! content check is what catches one if it ever happens.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::identity::{DependencyIdentities, Identity};
use crate::core::recipe::RecipeDescriptor;
use crate::core::settings::SettingsModel;
use crate::util::hash::Fingerprint;

/// Tag mixed into every identity digest.
const IDENTITY_SCHEME: &str = "quay-identity/1";

/// Error computing a package identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error(
        "cannot compute identity of `{package}`: dependency `{dependency}` has no resolved identity"
    )]
    InvalidDependencyIdentity { package: String, dependency: String },
}

/// A resolved dependency as it contributes to an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDependency {
    pub name: String,
    pub identity: Identity,
}

/// The canonical inputs of one identity computation.
///
/// This is what gets hashed, and it is also recorded in the artifact
/// manifest so the contributing inputs of a stored package can be inspected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityInputs {
    pub name: String,
    pub version: String,
    /// Only the settings axes the recipe is sensitive to.
    pub settings: SettingsModel,
    /// In the recipe's declaration order.
    pub dependencies: Vec<ResolvedDependency>,
}

impl IdentityInputs {
    /// Digest these inputs into an identity.
    pub fn identity(&self) -> Identity {
        let mut fp = Fingerprint::new();

        fp.update_str(IDENTITY_SCHEME)
            .update_str(&self.name)
            .update_str(&self.version);

        fp.update_len(self.settings.len());
        for (axis, value) in self.settings.iter() {
            fp.update_str(axis).update_str(value);
        }

        fp.update_len(self.dependencies.len());
        for dep in &self.dependencies {
            fp.update_str(&dep.name).update_str(dep.identity.as_str());
        }

        Identity::from_digest(fp.finish())
    }
}

/// Collect the canonical identity inputs for a recipe.
///
/// Every declared dependency must have an entry in `dependencies`; extra
/// entries are ignored.
pub fn canonical_inputs(
    recipe: &RecipeDescriptor,
    settings: &SettingsModel,
    dependencies: &DependencyIdentities,
) -> Result<IdentityInputs, IdentityError> {
    let relevant = recipe.relevant_axes(settings);
    let settings = settings.project(&relevant);

    let dependencies = recipe
        .dependencies()
        .iter()
        .map(|dep| {
            dependencies
                .get(dep.name())
                .map(|identity| ResolvedDependency {
                    name: dep.name().to_string(),
                    identity: identity.clone(),
                })
                .ok_or_else(|| IdentityError::InvalidDependencyIdentity {
                    package: recipe.name().to_string(),
                    dependency: dep.name().to_string(),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(IdentityInputs {
        name: recipe.name().to_string(),
        version: recipe.version().to_string(),
        settings,
        dependencies,
    })
}

/// Compute the identity of `recipe` under `settings`.
pub fn compute_identity(
    recipe: &RecipeDescriptor,
    settings: &SettingsModel,
    dependencies: &DependencyIdentities,
) -> Result<Identity, IdentityError> {
    let inputs = canonical_inputs(recipe, settings, dependencies)?;
    let identity = inputs.identity();
    tracing::debug!(
        package = %recipe.display_name(),
        settings = %inputs.settings,
        dependencies = inputs.dependencies.len(),
        identity = %identity,
        "computed identity"
    );
    Ok(identity)
}
