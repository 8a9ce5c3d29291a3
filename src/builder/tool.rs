//! The build tool boundary.
//!
//! A build tool takes an acquired source tree and the current settings and
//! produces something the installer can select files from. Quay does not
//! interpret the build beyond its exit status and captured log.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::SettingsModel;

/// Error reported by a build tool.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The build did not complete. Nothing from this attempt is installed.
    #[error("build failed{}", exit_code.map(|c| format!(" with exit code {}", c)).unwrap_or_default())]
    BuildFailed {
        /// Exit code of the failing step, if the tool ran at all
        exit_code: Option<i32>,
        /// Captured stdout and stderr
        log: String,
    },
}

impl BuildError {
    /// Tail of the build log, for display.
    pub fn log_tail(&self, lines: usize) -> Vec<&str> {
        let BuildError::BuildFailed { log, .. } = self;
        let all: Vec<&str> = log.lines().collect();
        let start = all.len().saturating_sub(lines);
        all[start..].to_vec()
    }
}

/// What a build produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutput {
    /// Install prefix populated by the tool, copied wholesale into the artifact
    pub install_dir: Option<PathBuf>,

    /// Roots that install rules select files from, in priority order
    pub search_roots: Vec<PathBuf>,
}

impl BuildOutput {
    /// Output of a package that needs no build step.
    pub fn source_only(source: impl Into<PathBuf>) -> Self {
        BuildOutput {
            install_dir: None,
            search_roots: vec![source.into()],
        }
    }
}

/// An external build tool.
pub trait BuildTool {
    /// Name of the tool for logging.
    fn name(&self) -> &'static str;

    /// Build `source` under `settings`, using `work_dir` for build output.
    ///
    /// `work_dir` is private to this build attempt.
    fn build(
        &self,
        source: &Path,
        settings: &SettingsModel,
        work_dir: &Path,
    ) -> Result<BuildOutput, BuildError>;
}

/// Build tool for packages that are installed straight from source,
/// such as header-only libraries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBuilder;

impl BuildTool for NoopBuilder {
    fn name(&self) -> &'static str {
        "none"
    }

    fn build(
        &self,
        source: &Path,
        _settings: &SettingsModel,
        _work_dir: &Path,
    ) -> Result<BuildOutput, BuildError> {
        tracing::debug!("no build step for {}", source.display());
        Ok(BuildOutput::source_only(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_builder_searches_source() {
        let output = NoopBuilder
            .build(
                Path::new("/src/celaeno"),
                &SettingsModel::new(),
                Path::new("/work"),
            )
            .unwrap();

        assert_eq!(output.install_dir, None);
        assert_eq!(output.search_roots, vec![PathBuf::from("/src/celaeno")]);
    }

    #[test]
    fn test_build_failed_display() {
        let err = BuildError::BuildFailed {
            exit_code: Some(2),
            log: String::new(),
        };
        assert_eq!(err.to_string(), "build failed with exit code 2");

        let err = BuildError::BuildFailed {
            exit_code: None,
            log: String::new(),
        };
        assert_eq!(err.to_string(), "build failed");
    }

    #[test]
    fn test_log_tail() {
        let err = BuildError::BuildFailed {
            exit_code: Some(1),
            log: "one\ntwo\nthree\n".into(),
        };
        assert_eq!(err.log_tail(2), vec!["two", "three"]);
        assert_eq!(err.log_tail(10).len(), 3);
    }
}
