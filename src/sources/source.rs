//! Source trait - common interface for all recipe sources.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

use crate::sources::git::GitReference;

/// Boxed cause of a failed fetch.
pub type FetchCause = Box<dyn std::error::Error + Send + Sync>;

/// Error acquiring a source tree.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source could not be reached or read. Retrying is up to the caller.
    #[error("source unavailable: {reference}")]
    SourceUnavailable {
        reference: String,
        #[source]
        source: FetchCause,
    },

    /// A strict patch did not find the text it was meant to replace.
    #[error("patch failed: `{search}` not found in {}", file.display())]
    PatchFailed { file: PathBuf, search: String },
}

impl SourceError {
    pub(crate) fn unavailable(reference: impl fmt::Display, cause: impl Into<FetchCause>) -> Self {
        SourceError::SourceUnavailable {
            reference: reference.to_string(),
            source: cause.into(),
        }
    }
}

/// Where a recipe's source tree comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    /// A git repository at a given reference.
    Git { url: Url, reference: GitReference },
    /// A local directory.
    Path { path: PathBuf },
}

impl SourceRef {
    pub fn git(url: Url, reference: GitReference) -> Self {
        SourceRef::Git { url, reference }
    }

    pub fn path(path: impl Into<PathBuf>) -> Self {
        SourceRef::Path { path: path.into() }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceRef::Git { url, reference } => write!(f, "git+{}{}", url, reference),
            SourceRef::Path { path } => write!(f, "path+{}", path.display()),
        }
    }
}

/// A source of recipe trees.
pub trait Source {
    /// Get the source kind for display and cache layout.
    fn kind(&self) -> &'static str;

    /// Stable key for this source's checkout in the cache.
    fn cache_key(&self) -> String;

    /// Whether an existing checkout can be reused as-is.
    ///
    /// Remote checkouts pinned by reference are reusable; local directories
    /// may have changed since the last copy and are fetched again.
    fn reusable(&self) -> bool;

    /// Populate `dest` (which does not exist yet) with the source tree.
    fn materialize(&self, dest: &Path) -> Result<(), SourceError>;
}
