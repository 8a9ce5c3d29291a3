//! The package store.
//!
//! Installed artifacts are keyed by identity and never modified after they
//! are published.
//!
//! # Layout
//!
//! ```text
//! <root>/
//! ├── p/                      # Published artifacts (write-once)
//! │   └── <identity>/
//! │       ├── quaymanifest.json
//! │       └── ...
//! └── tmp/                    # Staging for in-flight installs
//! ```

pub mod installer;
pub mod manifest;

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::identity::Identity;
use crate::util::fs::is_populated_dir;

pub use installer::{InstallError, InstallOutcome, InstallRule, Installer};
pub use manifest::{ArtifactManifest, MANIFEST_FILE};

/// An artifact stored under its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageArtifact {
    pub identity: Identity,
    pub path: PathBuf,
    pub manifest: ArtifactManifest,
}

/// Handle to a package store rooted at a directory.
#[derive(Debug, Clone)]
pub struct PackageStore {
    root: PathBuf,
}

impl PackageStore {
    /// Open a store, creating its directories if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, InstallError> {
        let store = PackageStore { root: root.into() };
        for dir in [store.packages_dir(), store.tmp_dir()] {
            fs::create_dir_all(&dir).map_err(|e| InstallError::io(&dir, e))?;
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding published artifacts.
    pub fn packages_dir(&self) -> PathBuf {
        self.root.join("p")
    }

    /// Staging directory for installs in progress.
    pub fn tmp_dir(&self) -> PathBuf {
        self.root.join("tmp")
    }

    /// Where the artifact for `identity` lives, whether or not it exists.
    pub fn path_for(&self, identity: &Identity) -> PathBuf {
        self.packages_dir().join(identity.as_str())
    }

    /// Look up a published artifact.
    ///
    /// An absent or empty directory is a miss. A populated directory without
    /// a readable manifest is an error rather than a miss.
    pub fn lookup(&self, identity: &Identity) -> Result<Option<PackageArtifact>, InstallError> {
        let path = self.path_for(identity);
        if !is_populated_dir(&path) {
            return Ok(None);
        }

        let manifest = ArtifactManifest::read(&path)?;
        Ok(Some(PackageArtifact {
            identity: identity.clone(),
            path,
            manifest,
        }))
    }

    /// All published artifacts, ordered by name, version and identity.
    ///
    /// Entries that are not valid artifacts are skipped with a warning.
    pub fn list(&self) -> Result<Vec<PackageArtifact>, InstallError> {
        let dir = self.packages_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(InstallError::io(&dir, e)),
        };

        let mut artifacts = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| InstallError::io(&dir, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let Ok(identity) = Identity::parse(&name) else {
                tracing::warn!("ignoring unexpected store entry {}", entry.path().display());
                continue;
            };
            match self.lookup(&identity) {
                Ok(Some(artifact)) => artifacts.push(artifact),
                Ok(None) => {}
                Err(e) => tracing::warn!("skipping {}: {}", identity.short(), e),
            }
        }

        artifacts.sort_by(|a, b| {
            (&a.manifest.name, &a.manifest.version, &a.identity).cmp(&(
                &b.manifest.name,
                &b.manifest.version,
                &b.identity,
            ))
        });
        Ok(artifacts)
    }

    /// Remove staging directories left behind by interrupted installs.
    ///
    /// Must not run while another process is installing into this store.
    pub fn sweep_staging(&self) -> Result<usize, InstallError> {
        let dir = self.tmp_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(InstallError::io(&dir, e)),
        };

        let mut removed = 0;
        for entry in entries {
            let path = entry.map_err(|e| InstallError::io(&dir, e))?.path();
            let result = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            result.map_err(|e| InstallError::io(&path, e))?;
            tracing::debug!("removed {}", path.display());
            removed += 1;
        }
        Ok(removed)
    }
}
