//! Global context for Quay operations.
//!
//! Provides centralized access to configuration, paths, and environment.
//!
//! ```text
//! ~/.quay/                    # QUAY_HOME
//! ├── config.toml
//! ├── cache/                  # Fetched source trees
//! ├── work/                   # Per-build scratch directories
//! └── store/                  # Package store (QUAY_STORE, [store] path)
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::BaseDirs;

use crate::core::{SettingsAxis, SettingsModel};
use crate::sources::SourceCache;
use crate::store::PackageStore;
use crate::util::config::{load_config, project_config_path, Config};

/// Environment variable overriding the Quay home directory.
pub const HOME_ENV: &str = "QUAY_HOME";

/// Environment variable overriding the package store root.
pub const STORE_ENV: &str = "QUAY_STORE";

/// Global context for Quay operations.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Quay home directory (~/.quay)
    home: PathBuf,

    /// Store root from the environment, if set
    store_override: Option<PathBuf>,

    /// Merged global and project configuration
    config: Config,
}

impl GlobalContext {
    /// Create a new GlobalContext from the environment and config files.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;

        let home = match std::env::var_os(HOME_ENV) {
            Some(home) => PathBuf::from(home),
            None => BaseDirs::new()
                .map(|dirs| dirs.home_dir().join(".quay"))
                .unwrap_or_else(|| PathBuf::from(".quay")),
        };

        let mut ctx = Self::with_paths(cwd, home);
        ctx.store_override = std::env::var_os(STORE_ENV).map(PathBuf::from);
        ctx.config = load_config(&ctx.config_path(), &project_config_path(&ctx.cwd));
        Ok(ctx)
    }

    /// Create a GlobalContext with explicit directories and default config.
    pub fn with_paths(cwd: PathBuf, home: PathBuf) -> Self {
        GlobalContext {
            cwd,
            home,
            store_override: None,
            config: Config::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the Quay home directory (~/.quay/).
    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Get the cache directory for fetched sources.
    pub fn cache_dir(&self) -> PathBuf {
        self.home.join("cache")
    }

    /// Get the scratch directory for builds.
    pub fn work_dir(&self) -> PathBuf {
        self.home.join("work")
    }

    /// Get the package store root.
    ///
    /// `QUAY_STORE` wins over `[store] path`, which wins over `~/.quay/store`.
    pub fn store_root(&self) -> PathBuf {
        if let Some(root) = &self.store_override {
            return root.clone();
        }
        match &self.config.store.path {
            Some(path) => self.cwd.join(path),
            None => self.home.join("store"),
        }
    }

    /// Open the package store.
    pub fn open_store(&self) -> Result<PackageStore> {
        let root = self.store_root();
        PackageStore::open(&root)
            .with_context(|| format!("failed to open package store at {}", root.display()))
    }

    /// The source cache.
    pub fn source_cache(&self) -> SourceCache {
        SourceCache::new(self.cache_dir())
    }

    /// Settings for this invocation.
    ///
    /// Host detection (unless disabled), then config `[settings]`, then
    /// axes given on the command line.
    pub fn settings(&self, detect: bool, overrides: &[SettingsAxis]) -> SettingsModel {
        let base = if detect {
            SettingsModel::detect_host()
        } else {
            SettingsModel::new()
        };

        base.overlay(&self.config.settings)
            .overlay(&overrides.iter().cloned().collect())
    }
}
