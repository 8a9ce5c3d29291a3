//! Quay - a recipe engine for C and C++ packages
//!
//! This crate provides the core library functionality for Quay: computing
//! stable package identities from recipes and build settings, and the
//! fetch, build and install pipeline that fills a content-addressed
//! package store.

pub mod builder;
pub mod core;
pub mod ops;
pub mod sources;
pub mod store;
pub mod util;

/// Test utilities for Quay unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests.
#[cfg(test)]
pub mod test_support;

pub use builder::{compute_identity, BuildTool, IdentityInputs};
pub use core::{
    DependencyIdentities, DependencyRef, Identity, PackageReference, Recipe, RecipeDescriptor,
    Sensitivity, SettingsModel,
};
pub use store::{PackageArtifact, PackageStore};
pub use util::context::GlobalContext;
