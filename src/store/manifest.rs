//! The manifest written at the root of every stored artifact.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::builder::fingerprint::{IdentityInputs, ResolvedDependency};
use crate::core::identity::Identity;
use crate::core::settings::SettingsModel;
use crate::store::installer::InstallError;
use crate::util::hash::Fingerprint;

/// File name of the manifest inside an artifact directory.
pub const MANIFEST_FILE: &str = "quaymanifest.json";

/// Current manifest schema.
pub const MANIFEST_SCHEMA: u32 = 1;

/// Metadata recorded alongside an installed artifact.
///
/// The manifest itself is not part of the content digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub schema: u32,
    pub identity: Identity,
    pub name: String,
    pub version: String,
    /// Settings axes that contributed to the identity
    pub settings: SettingsModel,
    /// Dependency identities, in declaration order
    pub dependencies: Vec<ResolvedDependency>,
    pub content_digest: String,
    /// Artifact-relative paths with `/` separators, sorted
    pub files: Vec<String>,
}

impl ArtifactManifest {
    /// Build a manifest for `inputs` with the given per-file hashes.
    pub fn new(inputs: &IdentityInputs, file_hashes: &BTreeMap<String, String>) -> Self {
        ArtifactManifest {
            schema: MANIFEST_SCHEMA,
            identity: inputs.identity(),
            name: inputs.name.clone(),
            version: inputs.version.clone(),
            settings: inputs.settings.clone(),
            dependencies: inputs.dependencies.clone(),
            content_digest: content_digest(file_hashes),
            files: file_hashes.keys().cloned().collect(),
        }
    }

    /// The identity inputs this artifact was installed under.
    pub fn inputs(&self) -> IdentityInputs {
        IdentityInputs {
            name: self.name.clone(),
            version: self.version.clone(),
            settings: self.settings.clone(),
            dependencies: self.dependencies.clone(),
        }
    }

    /// Read the manifest of the artifact at `dir`.
    pub fn read(dir: &Path) -> Result<Self, InstallError> {
        let path = dir.join(MANIFEST_FILE);
        let content = fs::read_to_string(&path).map_err(|e| InstallError::io(&path, e))?;
        serde_json::from_str(&content).map_err(|source| InstallError::CorruptManifest { path, source })
    }

    /// Write the manifest into `dir`.
    pub fn write(&self, dir: &Path) -> Result<(), InstallError> {
        let path = dir.join(MANIFEST_FILE);
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| InstallError::io(&path, io::Error::other(e)))?;
        fs::write(&path, content).map_err(|e| InstallError::io(&path, e))
    }
}

/// Digest of an artifact's contents from its `(relative path, file hash)` pairs.
///
/// Paths must use `/` separators; the map keeps them sorted.
pub fn content_digest(file_hashes: &BTreeMap<String, String>) -> String {
    let mut fp = Fingerprint::new();
    fp.update_len(file_hashes.len());
    for (path, hash) in file_hashes {
        fp.update_str(path).update_str(hash);
    }
    fp.finish()
}
