//! Path source - recipe sources from the local filesystem.

use std::io;
use std::path::{Path, PathBuf};

use crate::sources::source::{Source, SourceError};
use crate::util::fs::copy_dir_all;
use crate::util::hash::sha256_str;

/// A source for local directories.
pub struct PathSource {
    /// The root path
    path: PathBuf,
}

impl PathSource {
    /// Create a new path source.
    pub fn new(path: PathBuf) -> Self {
        PathSource { path }
    }

    fn describe(&self) -> String {
        format!("path+{}", self.path.display())
    }
}

impl Source for PathSource {
    fn kind(&self) -> &'static str {
        "path"
    }

    fn cache_key(&self) -> String {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "root".to_string());
        format!("{}-{}", name, &sha256_str(&self.describe())[..12])
    }

    fn reusable(&self) -> bool {
        false
    }

    fn materialize(&self, dest: &Path) -> Result<(), SourceError> {
        if !self.path.is_dir() {
            return Err(SourceError::unavailable(
                self.describe(),
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("directory does not exist: {}", self.path.display()),
                ),
            ));
        }

        tracing::info!("Copying {}", self.path.display());
        copy_dir_all(&self.path, dest).map_err(|e| SourceError::unavailable(self.describe(), e))
    }
}
