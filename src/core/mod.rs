//! Core data structures for Quay.
//!
//! This module contains the foundational types used throughout Quay:
//! - Build settings (the axes a package may be sensitive to)
//! - Recipe descriptors, package references and Recipe.toml parsing
//! - Package identities

pub mod identity;
pub mod manifest;
pub mod recipe;
pub mod reference;
pub mod settings;

pub use identity::{DependencyIdentities, Identity};
pub use manifest::{find_recipe, Recipe, RECIPE_NAME};
pub use recipe::{DependencyRef, RecipeDescriptor, RecipeError, Sensitivity};
pub use reference::PackageReference;
pub use settings::{SettingsAxis, SettingsModel};
