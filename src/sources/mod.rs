//! Recipe sources.
//!
//! Sources are responsible for materializing a recipe's source tree from
//! its declared location (a git repository or a local directory) into the
//! source cache, with any recipe patches applied.

pub mod cache;
pub mod git;
pub mod patch;
pub mod path;
pub mod source;

pub use cache::SourceCache;
pub use git::{GitReference, GitSource};
pub use patch::SourcePatch;
pub use path::PathSource;
pub use source::{Source, SourceError, SourceRef};
