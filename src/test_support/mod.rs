//! Test utilities for Quay unit tests.
//!
//! Fixtures for recipes and source trees, and stand-in build tools for
//! exercising pipeline failure paths without a real toolchain.

pub mod fixtures;

use std::path::Path;

use crate::builder::tool::{BuildError, BuildOutput, BuildTool};
use crate::core::SettingsModel;

// Re-export fixtures for convenience
pub use fixtures::*;

/// A build tool that always fails with a linker-style log.
#[derive(Debug, Clone, Copy)]
pub struct FailingBuilder {
    pub exit_code: i32,
}

impl BuildTool for FailingBuilder {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn build(
        &self,
        _source: &Path,
        _settings: &SettingsModel,
        _work_dir: &Path,
    ) -> Result<BuildOutput, BuildError> {
        Err(BuildError::BuildFailed {
            exit_code: Some(self.exit_code),
            log: "[ 50%] Linking CXX executable bfs_test\n\
                  bfs_test.cpp:(.text+0x1d): undefined reference to `celaeno::bfs'\n"
                .to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_header_only_fixture_loads() {
        let tmp = TempDir::new().unwrap();
        let recipe = header_only_recipe(tmp.path());

        assert_eq!(recipe.name(), "celaeno");
        assert!(tmp.path().join("celaeno/include/celaeno/bfs.hpp").exists());
    }
}
