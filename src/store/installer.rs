//! Installation of build output into the package store.
//!
//! The installer selects files from a [`BuildOutput`], hashes them, and
//! publishes them under the package identity. Publication is a single
//! directory rename out of the store's staging area, so concurrent installs
//! of the same identity never observe or produce a half-written artifact.
//! Whoever loses the rename race compares its content digest against the
//! winner's instead of overwriting it.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use glob::{MatchOptions, Pattern, PatternError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use walkdir::WalkDir;

use crate::builder::fingerprint::IdentityInputs;
use crate::builder::tool::BuildOutput;
use crate::core::identity::Identity;
use crate::store::manifest::{ArtifactManifest, MANIFEST_FILE};
use crate::store::{PackageArtifact, PackageStore};
use crate::util::fs::{copy_symlink, relative_path, to_slash};
use crate::util::hash::sha256_file;

/// Error installing into, or reading from, the package store.
#[derive(Debug, Error)]
pub enum InstallError {
    /// An artifact with the same identity but different contents exists.
    ///
    /// Either the identity inputs collided or the build is not reproducible.
    /// This is never retried.
    #[error(
        "install conflict for {identity}: stored content digest {existing} differs from this build's {new}"
    )]
    InstallConflict {
        identity: Identity,
        existing: String,
        new: String,
        /// The stored artifact was built from different identity inputs
        collision: bool,
    },

    /// A selected symlink would point outside the artifact.
    #[error("symlink {} points outside the artifact: {}", path.display(), target.display())]
    EscapingSymlink { path: PathBuf, target: PathBuf },

    #[error("I/O error at {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid install pattern `{pattern}`")]
    Pattern {
        pattern: String,
        #[source]
        source: PatternError,
    },

    #[error("corrupt artifact manifest {}", path.display())]
    CorruptManifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl InstallError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        InstallError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn default_true() -> bool {
    true
}

/// A file selection rule: which files of a build output go where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRule {
    /// Glob matched against paths relative to `src`; `*` crosses directories
    pub pattern: String,

    /// Directory under each search root to select from
    #[serde(default)]
    pub src: String,

    /// Directory inside the artifact to copy into
    #[serde(default)]
    pub dst: String,

    /// Keep the path relative to `src`, or flatten to the file name
    #[serde(default = "default_true")]
    pub keep_path: bool,

    #[serde(default)]
    pub ignore_case: bool,
}

impl InstallRule {
    /// Rule selecting `pattern` from the root into the artifact root.
    pub fn new(pattern: impl Into<String>) -> Self {
        InstallRule {
            pattern: pattern.into(),
            src: String::new(),
            dst: String::new(),
            keep_path: true,
            ignore_case: false,
        }
    }

    pub fn src(mut self, src: impl Into<String>) -> Self {
        self.src = src.into();
        self
    }

    pub fn dst(mut self, dst: impl Into<String>) -> Self {
        self.dst = dst.into();
        self
    }

    pub fn keep_path(mut self, keep_path: bool) -> Self {
        self.keep_path = keep_path;
        self
    }

    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    fn compile(&self) -> Result<Pattern, InstallError> {
        Pattern::new(&self.pattern).map_err(|source| InstallError::Pattern {
            pattern: self.pattern.clone(),
            source,
        })
    }

    fn match_options(&self) -> MatchOptions {
        MatchOptions {
            case_sensitive: !self.ignore_case,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        }
    }
}

/// Result of an install.
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub artifact: PackageArtifact,
    /// False when an identical artifact was already stored
    pub fresh: bool,
}

/// Selects files from build output and publishes them into a store.
#[derive(Debug, Clone)]
pub struct Installer {
    rules: Vec<(InstallRule, Pattern)>,
}

impl Installer {
    /// Create an installer, validating every rule's pattern.
    pub fn new(rules: impl IntoIterator<Item = InstallRule>) -> Result<Self, InstallError> {
        let rules = rules
            .into_iter()
            .map(|rule| {
                let pattern = rule.compile()?;
                Ok((rule, pattern))
            })
            .collect::<Result<Vec<_>, InstallError>>()?;
        Ok(Installer { rules })
    }

    /// Map of artifact-relative destination to source file or symlink.
    ///
    /// The tool's install directory is taken whole, then each rule is applied
    /// to every search root in order. The first file selected for a
    /// destination wins.
    pub fn select(
        &self,
        output: &BuildOutput,
    ) -> Result<BTreeMap<String, PathBuf>, InstallError> {
        let mut selected = BTreeMap::new();

        if let Some(install_dir) = &output.install_dir {
            for file in walk_files(install_dir)? {
                let rel = relative_path(install_dir, &file);
                selected.entry(to_slash(&rel)).or_insert(file);
            }
        }

        for (rule, pattern) in &self.rules {
            let options = rule.match_options();
            for root in &output.search_roots {
                let base = root.join(&rule.src);
                if !base.is_dir() {
                    continue;
                }
                for file in walk_files(&base)? {
                    let rel = relative_path(&base, &file);
                    if !pattern.matches_with(&to_slash(&rel), options) {
                        continue;
                    }
                    let dest = if rule.keep_path {
                        Path::new(&rule.dst).join(&rel)
                    } else {
                        match rel.file_name() {
                            Some(name) => Path::new(&rule.dst).join(name),
                            None => continue,
                        }
                    };
                    selected.entry(to_slash(&dest)).or_insert(file);
                }
            }
        }

        // The manifest name is reserved
        selected.remove(MANIFEST_FILE);
        Ok(selected)
    }

    /// Install `output` into `store` under the identity of `inputs`.
    pub fn install(
        &self,
        store: &PackageStore,
        output: &BuildOutput,
        inputs: &IdentityInputs,
    ) -> Result<InstallOutcome, InstallError> {
        let identity = inputs.identity();
        let selected = self.select(output)?;
        if selected.is_empty() {
            tracing::debug!("no files selected for {}/{}", inputs.name, inputs.version);
        }

        let mut hashes = BTreeMap::new();
        for (dest, src) in &selected {
            hashes.insert(dest.clone(), entry_hash(dest, src)?);
        }
        let manifest = ArtifactManifest::new(inputs, &hashes);

        if let Some(existing) = store.lookup(&identity)? {
            return reuse(existing, &manifest);
        }

        let staging = tempfile::Builder::new()
            .prefix("install-")
            .tempdir_in(store.tmp_dir())
            .map_err(|e| InstallError::io(&store.tmp_dir(), e))?;
        let tree = staging.path().join("artifact");

        for (dest, src) in &selected {
            let to = tree.join(dest);
            if let Some(parent) = to.parent() {
                fs::create_dir_all(parent).map_err(|e| InstallError::io(parent, e))?;
            }
            if is_symlink(src)? {
                copy_symlink(src, &to).map_err(|e| InstallError::io(&to, e))?;
            } else {
                fs::copy(src, &to).map_err(|e| InstallError::io(&to, e))?;
            }
        }
        fs::create_dir_all(&tree).map_err(|e| InstallError::io(&tree, e))?;
        manifest.write(&tree)?;

        let target = store.path_for(&identity);
        match fs::rename(&tree, &target) {
            Ok(()) => {
                tracing::info!(
                    "Installed {}/{} ({})",
                    inputs.name,
                    inputs.version,
                    identity.short()
                );
                Ok(InstallOutcome {
                    artifact: PackageArtifact {
                        identity,
                        path: target,
                        manifest,
                    },
                    fresh: true,
                })
            }
            Err(e) => match store.lookup(&identity)? {
                // Another install of this identity got there first
                Some(existing) => reuse(existing, &manifest),
                None => Err(InstallError::io(&target, e)),
            },
        }
    }
}

/// Accept an already stored artifact if its contents match.
fn reuse(
    existing: PackageArtifact,
    manifest: &ArtifactManifest,
) -> Result<InstallOutcome, InstallError> {
    if existing.manifest.content_digest != manifest.content_digest {
        return Err(InstallError::InstallConflict {
            collision: existing.manifest.inputs() != manifest.inputs(),
            identity: existing.identity,
            existing: existing.manifest.content_digest,
            new: manifest.content_digest.clone(),
        });
    }

    tracing::debug!("artifact {} already installed", existing.identity);
    Ok(InstallOutcome {
        artifact: existing,
        fresh: false,
    })
}

fn walk_files(root: &Path) -> Result<Vec<PathBuf>, InstallError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            InstallError::io(&path, e.into())
        })?;
        // Links are kept as links, never followed
        let ty = entry.file_type();
        if ty.is_file() || ty.is_symlink() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn is_symlink(path: &Path) -> Result<bool, InstallError> {
    fs::symlink_metadata(path)
        .map(|meta| meta.file_type().is_symlink())
        .map_err(|e| InstallError::io(path, e))
}

/// Digest entry for one selected path.
///
/// A symlink contributes its target rather than the content it points to,
/// and must resolve inside the artifact.
fn entry_hash(dest: &str, src: &Path) -> Result<String, InstallError> {
    if !is_symlink(src)? {
        return sha256_file(src).map_err(|e| InstallError::io(src, e));
    }

    let target = fs::read_link(src).map_err(|e| InstallError::io(src, e))?;
    if !link_stays_inside(dest, &target) {
        return Err(InstallError::EscapingSymlink {
            path: src.to_path_buf(),
            target,
        });
    }
    Ok(format!("symlink:{}", to_slash(&target)))
}

/// Whether `target`, read from a link installed at `dest`, resolves inside
/// the artifact root.
fn link_stays_inside(dest: &str, target: &Path) -> bool {
    let mut depth = dest.split('/').count() as isize - 1;
    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::SettingsModel;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn inputs() -> IdentityInputs {
        IdentityInputs {
            name: "celaeno".into(),
            version: "0.1".into(),
            settings: SettingsModel::new(),
            dependencies: Vec::new(),
        }
    }

    fn source_tree(root: &Path) -> PathBuf {
        let src = root.join("src");
        fs::create_dir_all(src.join("include/celaeno")).unwrap();
        fs::write(src.join("include/celaeno/bfs.hpp"), "// bfs\n").unwrap();
        fs::write(src.join("include/celaeno/dfs.HPP"), "// dfs\n").unwrap();
        fs::write(src.join("include/celaeno/notes.txt"), "notes\n").unwrap();
        fs::write(src.join("LICENSE"), "MIT\n").unwrap();
        src
    }

    fn header_installer() -> Installer {
        Installer::new([
            InstallRule::new("*.hpp").src("include").dst("include"),
            InstallRule::new("LICENSE").dst("licenses"),
        ])
        .unwrap()
    }

    #[test]
    fn test_select_headers_and_license() {
        let tmp = TempDir::new().unwrap();
        let src = source_tree(tmp.path());

        let selected = header_installer()
            .select(&BuildOutput::source_only(&src))
            .unwrap();
        let dests: Vec<&str> = selected.keys().map(String::as_str).collect();

        assert_eq!(dests, vec!["include/celaeno/bfs.hpp", "licenses/LICENSE"]);
    }

    #[test]
    fn test_select_ignore_case_and_flatten() {
        let tmp = TempDir::new().unwrap();
        let src = source_tree(tmp.path());

        let installer = Installer::new([InstallRule::new("*.hpp")
            .src("include")
            .dst("inc")
            .keep_path(false)
            .ignore_case(true)])
        .unwrap();
        let selected = installer.select(&BuildOutput::source_only(&src)).unwrap();
        let dests: Vec<&str> = selected.keys().map(String::as_str).collect();

        assert_eq!(dests, vec!["inc/bfs.hpp", "inc/dfs.HPP"]);
    }

    #[test]
    fn test_first_root_wins() {
        let tmp = TempDir::new().unwrap();
        let build = tmp.path().join("build");
        fs::create_dir_all(&build).unwrap();
        fs::write(build.join("LICENSE"), "generated\n").unwrap();
        let src = source_tree(tmp.path());

        let output = BuildOutput {
            install_dir: None,
            search_roots: vec![build.clone(), src],
        };
        let selected = Installer::new([InstallRule::new("LICENSE")])
            .unwrap()
            .select(&output)
            .unwrap();

        assert_eq!(selected["LICENSE"], build.join("LICENSE"));
    }

    #[test]
    fn test_install_dir_copied_whole() {
        let tmp = TempDir::new().unwrap();
        let prefix = tmp.path().join("install");
        fs::create_dir_all(prefix.join("lib")).unwrap();
        fs::write(prefix.join("lib/libcelaeno.a"), "archive").unwrap();

        let output = BuildOutput {
            install_dir: Some(prefix),
            search_roots: Vec::new(),
        };
        let selected = Installer::new(Vec::new()).unwrap().select(&output).unwrap();

        assert!(selected.contains_key("lib/libcelaeno.a"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = Installer::new([InstallRule::new("include/[")]).unwrap_err();
        assert!(matches!(err, InstallError::Pattern { .. }));
    }

    #[test]
    fn test_install_then_reinstall_is_noop() {
        let tmp = TempDir::new().unwrap();
        let src = source_tree(tmp.path());
        let store = PackageStore::open(tmp.path().join("store")).unwrap();
        let output = BuildOutput::source_only(&src);

        let first = header_installer().install(&store, &output, &inputs()).unwrap();
        assert!(first.fresh);
        assert_eq!(first.artifact.path, store.path_for(&inputs().identity()));
        assert!(first.artifact.path.join("include/celaeno/bfs.hpp").exists());
        assert!(first.artifact.path.join(MANIFEST_FILE).exists());

        let second = header_installer().install(&store, &output, &inputs()).unwrap();
        assert!(!second.fresh);
        assert_eq!(second.artifact.path, first.artifact.path);
        assert_eq!(second.artifact.manifest, first.artifact.manifest);
    }

    #[test]
    fn test_different_content_conflicts() {
        let tmp = TempDir::new().unwrap();
        let src = source_tree(tmp.path());
        let store = PackageStore::open(tmp.path().join("store")).unwrap();
        let output = BuildOutput::source_only(&src);

        header_installer().install(&store, &output, &inputs()).unwrap();

        fs::write(src.join("include/celaeno/bfs.hpp"), "// changed\n").unwrap();
        let err = header_installer()
            .install(&store, &output, &inputs())
            .unwrap_err();

        assert!(matches!(
            err,
            InstallError::InstallConflict {
                collision: false,
                ..
            }
        ));
        // The stored artifact is untouched
        let stored = fs::read_to_string(
            store
                .path_for(&inputs().identity())
                .join("include/celaeno/bfs.hpp"),
        )
        .unwrap();
        assert_eq!(stored, "// bfs\n");
    }

    #[test]
    fn test_concurrent_installs_of_one_identity() {
        let tmp = TempDir::new().unwrap();
        let src = source_tree(tmp.path());
        let store = Arc::new(PackageStore::open(tmp.path().join("store")).unwrap());
        let output = Arc::new(BuildOutput::source_only(&src));

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let store = Arc::clone(&store);
                let output = Arc::clone(&output);
                std::thread::spawn(move || {
                    header_installer()
                        .install(&store, &output, &inputs())
                        .unwrap()
                })
            })
            .collect();
        let outcomes: Vec<InstallOutcome> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(outcomes.iter().filter(|o| o.fresh).count(), 1);
        assert_eq!(outcomes[0].artifact.path, outcomes[1].artifact.path);
        assert_eq!(store.list().unwrap().len(), 1);
        assert_eq!(fs::read_dir(store.tmp_dir()).unwrap().count(), 0);
    }

    #[test]
    fn test_conflict_with_other_inputs_is_collision() {
        let tmp = TempDir::new().unwrap();
        let src = source_tree(tmp.path());
        let store = PackageStore::open(tmp.path().join("store")).unwrap();
        let output = BuildOutput::source_only(&src);

        let first = header_installer().install(&store, &output, &inputs()).unwrap();

        // Same identity, recorded as coming from another version
        let mut manifest = first.artifact.manifest.clone();
        manifest.version = "0.2".into();
        manifest.write(&first.artifact.path).unwrap();

        fs::write(src.join("include/celaeno/bfs.hpp"), "// changed\n").unwrap();
        let err = header_installer()
            .install(&store, &output, &inputs())
            .unwrap_err();
        assert!(matches!(
            err,
            InstallError::InstallConflict {
                collision: true,
                ..
            }
        ));
    }

    #[cfg(unix)]
    fn shared_library_prefix(root: &Path) -> PathBuf {
        use std::os::unix::fs::symlink;

        let prefix = root.join("install");
        fs::create_dir_all(prefix.join("lib")).unwrap();
        fs::write(prefix.join("lib/libcelaeno.so.1.2.3"), "ELF").unwrap();
        symlink("libcelaeno.so.1.2.3", prefix.join("lib/libcelaeno.so.1")).unwrap();
        symlink("libcelaeno.so.1", prefix.join("lib/libcelaeno.so")).unwrap();
        prefix
    }

    #[cfg(unix)]
    #[test]
    fn test_install_keeps_library_links() {
        let tmp = TempDir::new().unwrap();
        let output = BuildOutput {
            install_dir: Some(shared_library_prefix(tmp.path())),
            search_roots: Vec::new(),
        };
        let store = PackageStore::open(tmp.path().join("store")).unwrap();
        let installer = Installer::new(Vec::new()).unwrap();

        let dests: Vec<String> = installer.select(&output).unwrap().into_keys().collect();
        assert_eq!(
            dests,
            vec![
                "lib/libcelaeno.so",
                "lib/libcelaeno.so.1",
                "lib/libcelaeno.so.1.2.3"
            ]
        );

        let outcome = installer.install(&store, &output, &inputs()).unwrap();
        let lib = outcome.artifact.path.join("lib");
        assert_eq!(
            fs::read_link(lib.join("libcelaeno.so")).unwrap(),
            Path::new("libcelaeno.so.1")
        );
        assert_eq!(
            fs::read_link(lib.join("libcelaeno.so.1")).unwrap(),
            Path::new("libcelaeno.so.1.2.3")
        );
        assert_eq!(fs::read_to_string(lib.join("libcelaeno.so")).unwrap(), "ELF");
        assert_eq!(outcome.artifact.manifest.files.len(), 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_link_target_is_part_of_digest() {
        let tmp = TempDir::new().unwrap();
        let prefix = shared_library_prefix(tmp.path());
        let output = BuildOutput {
            install_dir: Some(prefix.clone()),
            search_roots: Vec::new(),
        };
        let store = PackageStore::open(tmp.path().join("store")).unwrap();
        let installer = Installer::new(Vec::new()).unwrap();
        installer.install(&store, &output, &inputs()).unwrap();

        // Same bytes everywhere, but the link name now points elsewhere
        fs::write(prefix.join("lib/libcelaeno.so.2"), "ELF").unwrap();
        fs::remove_file(prefix.join("lib/libcelaeno.so")).unwrap();
        std::os::unix::fs::symlink("libcelaeno.so.2", prefix.join("lib/libcelaeno.so")).unwrap();
        fs::remove_file(prefix.join("lib/libcelaeno.so.2")).unwrap();

        let err = installer.install(&store, &output, &inputs()).unwrap_err();
        assert!(matches!(err, InstallError::InstallConflict { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_escaping_link_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let prefix = tmp.path().join("install");
        fs::create_dir_all(prefix.join("lib")).unwrap();
        std::os::unix::fs::symlink("/usr/lib/libz.so", prefix.join("lib/libz.so")).unwrap();
        std::os::unix::fs::symlink("../../libz.so", prefix.join("lib/libz.so.1")).unwrap();

        let output = BuildOutput {
            install_dir: Some(prefix),
            search_roots: Vec::new(),
        };
        let store = PackageStore::open(tmp.path().join("store")).unwrap();
        let err = Installer::new(Vec::new())
            .unwrap()
            .install(&store, &output, &inputs())
            .unwrap_err();

        assert!(matches!(err, InstallError::EscapingSymlink { .. }));
        assert!(store.lookup(&inputs().identity()).unwrap().is_none());
    }

    #[test]
    fn test_link_stays_inside() {
        assert!(link_stays_inside("lib/libcelaeno.so", Path::new("libcelaeno.so.1")));
        assert!(link_stays_inside("lib/a/b.h", Path::new("../../include/b.h")));
        assert!(!link_stays_inside("lib/b.h", Path::new("../../b.h")));
        assert!(!link_stays_inside("b.h", Path::new("/usr/include/b.h")));
    }
}
