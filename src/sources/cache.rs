//! Source cache management.
//!
//! Shared checkouts live under `<cache>/<kind>/<key>`. A shared checkout is
//! assembled in a private staging directory (fetched, then patched) and
//! renamed into place, so other processes only ever observe complete, patched
//! trees. Local directories are copied into `<cache>/path/<key>-XXXX/tree`
//! for each fetch and removed once the caller drops the [`Checkout`].

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::sources::patch::SourcePatch;
use crate::sources::source::{Source, SourceError, SourceRef};
use crate::sources::{GitSource, PathSource};
use crate::util::fs::is_populated_dir;
use crate::util::hash::Fingerprint;

/// A fetched source tree.
///
/// Shared checkouts stay in the cache. Private copies are removed when the
/// `Checkout` is dropped.
#[derive(Debug)]
pub struct Checkout {
    path: PathBuf,
    scratch: Option<TempDir>,
}

impl Checkout {
    /// Root of the source tree.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this checkout is shared with other fetches.
    pub fn is_shared(&self) -> bool {
        self.scratch.is_none()
    }
}

/// Fetches recipe sources into a local cache directory.
pub struct SourceCache {
    /// Cache directory for fetched sources
    cache_dir: PathBuf,
}

impl SourceCache {
    /// Create a new source cache.
    pub fn new(cache_dir: PathBuf) -> Self {
        SourceCache { cache_dir }
    }

    /// Create a source for the given reference.
    fn create_source(&self, source: &SourceRef) -> Box<dyn Source> {
        match source {
            SourceRef::Git { url, reference } => {
                Box::new(GitSource::new(url.clone(), reference.clone()))
            }
            SourceRef::Path { path } => Box::new(PathSource::new(path.clone())),
        }
    }

    /// Fetch a source tree and apply `patches` to it.
    ///
    /// A reusable source is checked out once per reference and patch list and
    /// shared from then on. Any other source is copied into a private
    /// directory for this fetch alone, so a concurrent fetch of the same
    /// source never replaces a tree that is still being built from.
    pub fn fetch(
        &self,
        source_ref: &SourceRef,
        patches: &[SourcePatch],
    ) -> Result<Checkout, SourceError> {
        let source = self.create_source(source_ref);
        let io_err = |e: std::io::Error| SourceError::unavailable(source_ref, e);

        if !source.reusable() {
            let dir = self.cache_dir.join(source.kind());
            fs::create_dir_all(&dir).map_err(io_err)?;
            let scratch = tempfile::Builder::new()
                .prefix(&format!("{}-", self.checkout_key(source.as_ref(), patches)))
                .tempdir_in(&dir)
                .map_err(io_err)?;
            let tree = scratch.path().join("tree");
            prepare(source.as_ref(), patches, &tree)?;
            return Ok(Checkout {
                path: tree,
                scratch: Some(scratch),
            });
        }

        let target = self
            .cache_dir
            .join(source.kind())
            .join(self.checkout_key(source.as_ref(), patches));
        let shared = |path: PathBuf| Checkout {
            path,
            scratch: None,
        };

        if is_populated_dir(&target) {
            tracing::debug!("reusing checkout {}", target.display());
            return Ok(shared(target));
        }

        let tmp_root = self.cache_dir.join("tmp");
        fs::create_dir_all(&tmp_root).map_err(io_err)?;
        let staging = tempfile::Builder::new()
            .prefix("fetch-")
            .tempdir_in(&tmp_root)
            .map_err(io_err)?;
        let tree = staging.path().join("tree");
        prepare(source.as_ref(), patches, &tree)?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        match fs::rename(&tree, &target) {
            Ok(()) => Ok(shared(target)),
            // Another process finished the same checkout first
            Err(_) if is_populated_dir(&target) => {
                tracing::debug!("checkout {} appeared concurrently", target.display());
                Ok(shared(target))
            }
            Err(e) => Err(io_err(e)),
        }
    }

    /// Directory name for a source and patch list.
    fn checkout_key(&self, source: &dyn Source, patches: &[SourcePatch]) -> String {
        let mut key = source.cache_key();
        if !patches.is_empty() {
            let mut fp = Fingerprint::new();
            fp.update_len(patches.len());
            for patch in patches {
                fp.update_strs([
                    patch.file.as_str(),
                    patch.search.as_str(),
                    patch.replace.as_str(),
                ]);
            }
            key.push('-');
            key.push_str(&fp.finish_short());
        }
        key
    }

    /// Get the cache directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}

/// Materialize `source` at `tree` and apply `patches` in order.
fn prepare(source: &dyn Source, patches: &[SourcePatch], tree: &Path) -> Result<(), SourceError> {
    source.materialize(tree)?;
    for patch in patches {
        patch.apply(tree)?;
    }
    Ok(())
}
