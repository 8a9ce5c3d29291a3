//! Post-fetch source patches.
//!
//! Recipes sometimes need to tweak a vendored tree before building it, for
//! example dropping `add_subdirectory(test)` from a top-level CMakeLists.txt.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::sources::source::SourceError;

/// A textual search-and-replace applied to one file of the source tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourcePatch {
    /// File path relative to the source root
    pub file: String,

    /// Text to search for
    pub search: String,

    /// Replacement text
    #[serde(default)]
    pub replace: String,

    /// Fail if the search text does not occur
    #[serde(default = "default_strict")]
    pub strict: bool,
}

fn default_strict() -> bool {
    true
}

impl SourcePatch {
    /// Apply the patch to a tree rooted at `root`.
    ///
    /// Returns whether the file was modified.
    pub fn apply(&self, root: &Path) -> Result<bool, SourceError> {
        let path = root.join(&self.file);
        let unavailable = |e: std::io::Error| {
            SourceError::unavailable(format!("patch target {}", path.display()), e)
        };

        let contents = fs::read_to_string(&path).map_err(unavailable)?;
        if !contents.contains(&self.search) {
            if self.strict {
                return Err(SourceError::PatchFailed {
                    file: path.clone(),
                    search: self.search.clone(),
                });
            }
            tracing::debug!("patch for {} did not match; skipping", self.file);
            return Ok(false);
        }

        let patched = contents.replace(&self.search, &self.replace);
        fs::write(&path, patched).map_err(unavailable)?;
        Ok(true)
    }
}
