//! Build orchestration and package identity.
//!
//! This module holds the identity engine that decides whether a build can be
//! reused, and the adapters that invoke external build tools on a cache miss.

pub mod cmake;
pub mod fingerprint;
pub mod tool;

pub use cmake::CMakeBuilder;
pub use fingerprint::{
    canonical_inputs, compute_identity, IdentityError, IdentityInputs, ResolvedDependency,
};
pub use tool::{BuildError, BuildOutput, BuildTool, NoopBuilder};
