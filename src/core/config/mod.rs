//! core::config
//!
//! Configuration schema, loading, and the workspace state store.
//!
//! # Overview
//!
//! vaultgate has two configuration scopes:
//! - **Global**: User-level preferences ([`GlobalConfig`])
//! - **Workspace**: The persisted [`RepositoryConfig`] record for one
//!   working directory, behind the [`ConfigStore`] trait
//!
//! # Global Config Locations
//!
//! Searched in order:
//! 1. `$VAULTGATE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/vaultgate/config.toml`
//! 3. `~/.vaultgate/config.toml` (canonical write location)
//!
//! # Example
//!
//! ```no_run
//! use vaultgate::core::config::Config;
//!
//! let config = Config::load().unwrap();
//! println!("Default main: {}", config.default_main_branch());
//! println!("Post-merge delay: {:?}", config.post_merge_delay());
//! ```

pub mod schema;
mod store;

pub use schema::{GlobalConfig, IdentityConfig, RepositoryConfig, SecretsConfig};
pub use store::{workspace_state_path, ConfigStore, FileConfigStore, MemoryConfigStore};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Loaded global configuration with defaulting accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Global configuration
    pub global: GlobalConfig,
    /// Path to the global config file (if loaded)
    global_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed or
    /// fails validation. A missing file is not an error.
    pub fn load() -> Result<Self, ConfigError> {
        let (global, global_path) = Self::load_global()?;
        global.validate()?;
        Ok(Self {
            global,
            global_path,
        })
    }

    /// Build a config from an already-parsed global section.
    pub fn from_global(global: GlobalConfig) -> Self {
        Self {
            global,
            global_path: None,
        }
    }

    fn load_global() -> Result<(GlobalConfig, Option<PathBuf>), ConfigError> {
        if let Ok(path) = std::env::var("VAULTGATE_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                let config = Self::read_global_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("vaultgate/config.toml");
            if path.exists() {
                let config = Self::read_global_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        if let Some(home) = dirs::home_dir() {
            let path = home.join(".vaultgate/config.toml");
            if path.exists() {
                let config = Self::read_global_config(&path)?;
                return Ok((config, Some(path)));
            }
        }

        Ok((GlobalConfig::default(), None))
    }

    fn read_global_config(path: &Path) -> Result<GlobalConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Root directory for all vaultgate files: `~/.vaultgate`.
    pub fn home_dir() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".vaultgate"))
    }

    /// Get the canonical path for global config.
    pub fn global_config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::home_dir()?.join("config.toml"))
    }

    /// Write global config atomically.
    pub fn write_global(config: &GlobalConfig) -> Result<PathBuf, ConfigError> {
        let path = Self::global_config_path()?;
        write_config_atomic(&path, config)?;
        Ok(path)
    }

    // =========================================================================
    // Accessor methods with defaults
    // =========================================================================

    /// Main branch for freshly initialized repositories.
    ///
    /// Defaults to "main".
    pub fn default_main_branch(&self) -> &str {
        self.global
            .default_main_branch
            .as_deref()
            .unwrap_or(schema::DEFAULT_MAIN_BRANCH)
    }

    /// Delay between a successful merge and the local main pull.
    pub fn post_merge_delay(&self) -> Duration {
        Duration::from_millis(
            self.global
                .post_merge_delay_ms
                .unwrap_or(schema::DEFAULT_POST_MERGE_DELAY_MS),
        )
    }

    /// API base override, if configured.
    pub fn api_base(&self) -> Option<&str> {
        self.global.api_base.as_deref()
    }

    /// Whether to check for remote updates after startup.
    ///
    /// Defaults to `true`.
    pub fn check_updates_on_start(&self) -> bool {
        self.global.check_updates_on_start.unwrap_or(true)
    }

    /// Commit identity, if configured.
    pub fn identity(&self) -> Option<&IdentityConfig> {
        self.global.identity.as_ref()
    }

    /// Get the secrets provider.
    ///
    /// Defaults to "file".
    pub fn secrets_provider(&self) -> &str {
        self.global
            .secrets
            .as_ref()
            .and_then(|s| s.provider.as_deref())
            .unwrap_or("file")
    }

    /// Get the path to the loaded global config file.
    pub fn global_config_loaded_from(&self) -> Option<&Path> {
        self.global_path.as_deref()
    }
}

/// Write a TOML file atomically (temp file + rename).
pub(crate) fn write_config_atomic<T: serde::Serialize>(
    path: &Path,
    config: &T,
) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let contents =
        toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

    let temp_path = path.with_extension("toml.tmp");
    let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
        path: temp_path.clone(),
        source: e,
    })?;

    file.write_all(contents.as_bytes())
        .map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

    file.sync_all().map_err(|e| ConfigError::WriteError {
        path: temp_path.clone(),
        source: e,
    })?;

    fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_file() {
        let config = Config::default();
        assert_eq!(config.default_main_branch(), "main");
        assert_eq!(config.post_merge_delay(), Duration::from_millis(2000));
        assert!(config.api_base().is_none());
        assert!(config.check_updates_on_start());
        assert!(config.identity().is_none());
        assert_eq!(config.secrets_provider(), "file");
    }

    #[test]
    fn load_global_from_env() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.toml");

        fs::write(
            &config_path,
            r#"
            default_main_branch = "trunk"
            post_merge_delay_ms = 10
            "#,
        )
        .unwrap();

        std::env::set_var("VAULTGATE_CONFIG", config_path.to_str().unwrap());
        let config = Config::load().unwrap();
        std::env::remove_var("VAULTGATE_CONFIG");

        assert_eq!(config.default_main_branch(), "trunk");
        assert_eq!(config.post_merge_delay(), Duration::from_millis(10));
        assert_eq!(config.global_config_loaded_from(), Some(config_path.as_path()));
    }

    #[test]
    fn write_config_atomic_roundtrip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested/config.toml");

        let global = GlobalConfig {
            default_main_branch: Some("develop".into()),
            ..Default::default()
        };
        write_config_atomic(&path, &global).unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        let parsed: GlobalConfig = toml::from_str(&contents).unwrap();
        assert_eq!(parsed, global);
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn from_global_applies_accessors() {
        let config = Config::from_global(GlobalConfig {
            check_updates_on_start: Some(false),
            api_base: Some("https://ghe.example.com/api/v3".into()),
            ..Default::default()
        });
        assert!(!config.check_updates_on_start());
        assert_eq!(config.api_base(), Some("https://ghe.example.com/api/v3"));
    }
}
