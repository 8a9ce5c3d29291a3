//! High-level operations.
//!
//! This module contains the implementation of Quay commands.

pub mod create;
pub mod identify;

pub use create::{create_package, CreateOptions, CreateResult, PackageError};
pub use identify::{identify, identify_graph, GraphError, Identified};
