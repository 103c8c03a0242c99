//! core::config::store
//!
//! Persistence for the per-workspace [`RepositoryConfig`] record.
//!
//! The record is always read whole and written whole; there is no partial
//! update path. File writes are atomic (temp file + rename), so a crash
//! mid-write leaves the previous record intact.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use sha2::{Digest, Sha256};

use super::schema::RepositoryConfig;
use super::{write_config_atomic, Config, ConfigError};

/// Storage for the workspace record.
///
/// Implementations must be thread-safe so a workspace can be shared with
/// background tasks.
pub trait ConfigStore: Send + Sync {
    /// Read the full record. A missing record yields the default
    /// (disconnected) record.
    fn load(&self) -> Result<RepositoryConfig, ConfigError>;

    /// Replace the full record.
    fn save(&self, config: &RepositoryConfig) -> Result<(), ConfigError>;
}

/// Location of the state file for a working directory.
///
/// The file lives under `~/.vaultgate/workspaces/` and is keyed by the
/// first 16 hex digits of the SHA-256 of the canonical workspace path, so
/// it never appears as an untracked file inside the vault.
pub fn workspace_state_path(workdir: &Path) -> Result<PathBuf, ConfigError> {
    let canonical = fs::canonicalize(workdir).unwrap_or_else(|_| workdir.to_path_buf());
    let digest = Sha256::digest(canonical.to_string_lossy().as_bytes());
    let key = &hex::encode(digest)[..16];
    Ok(Config::home_dir()?
        .join("workspaces")
        .join(format!("{}.toml", key)))
}

/// File-backed workspace record.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    /// Store for the given working directory at its default location.
    pub fn for_workspace(workdir: &Path) -> Result<Self, ConfigError> {
        Ok(Self {
            path: workspace_state_path(workdir)?,
        })
    }

    /// Store at an explicit path.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the path to the state file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Result<RepositoryConfig, ConfigError> {
        if !self.path.exists() {
            return Ok(RepositoryConfig::default());
        }

        let contents = fs::read_to_string(&self.path).map_err(|e| ConfigError::ReadError {
            path: self.path.clone(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    fn save(&self, config: &RepositoryConfig) -> Result<(), ConfigError> {
        write_config_atomic(&self.path, config)
    }
}

/// In-memory workspace record for tests.
///
/// Clones share state, so a test can keep a handle and inspect what the
/// engine persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    config: Option<RepositoryConfig>,
    saves: usize,
    fail_writes: bool,
}

impl MemoryConfigStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with a record.
    pub fn with_config(config: RepositoryConfig) -> Self {
        let store = Self::new();
        store.inner.lock().unwrap().config = Some(config);
        store
    }

    /// Number of successful `save` calls.
    pub fn saves(&self) -> usize {
        self.inner.lock().unwrap().saves
    }

    /// The currently stored record, if any was written.
    pub fn snapshot(&self) -> Option<RepositoryConfig> {
        self.inner.lock().unwrap().config.clone()
    }

    /// Make subsequent writes fail.
    pub fn fail_writes(&self, fail: bool) {
        self.inner.lock().unwrap().fail_writes = fail;
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> Result<RepositoryConfig, ConfigError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .config
            .clone()
            .unwrap_or_default())
    }

    fn save(&self, config: &RepositoryConfig) -> Result<(), ConfigError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_writes {
            return Err(ConfigError::InvalidValue("memory store is read-only".into()));
        }
        inner.config = Some(config.clone());
        inner.saves += 1;
        Ok(())
    }
}
