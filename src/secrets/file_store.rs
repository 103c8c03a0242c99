//! secrets::file_store
//!
//! File-based secret storage at `~/.vaultgate/secrets.toml`.
//!
//! # Security
//!
//! - File permissions are set to 0600 on Unix before any content is written
//! - The file is read whole and rewritten whole (temp file + rename)
//! - Secret values never appear in errors or logs
//!
//! # Layout
//!
//! ```toml
//! [tokens]
//! "token:github.com/owner/vault" = "ghp_..."
//! ```

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{SecretError, SecretStore};
use crate::core::config::Config;

/// On-disk shape of the secrets file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SecretsFile {
    #[serde(default)]
    tokens: BTreeMap<String, String>,
}

/// File-based secret storage.
#[derive(Debug)]
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    /// Store at the default location, `~/.vaultgate/secrets.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self, SecretError> {
        let home = Config::home_dir().map_err(|e| SecretError::ReadError(e.to_string()))?;
        Ok(Self {
            path: home.join("secrets.toml"),
        })
    }

    /// Store at a custom path.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the path to the secrets file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<SecretsFile, SecretError> {
        if !self.path.exists() {
            return Ok(SecretsFile::default());
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| SecretError::ReadError(format!("cannot read secrets file: {}", e)))?;

        // toml errors quote the offending line, which may hold a token
        toml::from_str(&content).map_err(|_| {
            SecretError::ReadError(format!(
                "cannot parse secrets file {}",
                self.path.display()
            ))
        })
    }

    fn write(&self, secrets: &SecretsFile) -> Result<(), SecretError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SecretError::WriteError(format!("cannot create directory: {}", e)))?;
        }

        let content = toml::to_string_pretty(secrets)
            .map_err(|_| SecretError::WriteError("cannot serialize secrets".into()))?;

        let temp_path = self.path.with_extension("toml.tmp");
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .map_err(|e| SecretError::WriteError(format!("cannot create temp file: {}", e)))?;

            #[cfg(unix)]
            file.set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(|e| SecretError::WriteError(format!("cannot set permissions: {}", e)))?;

            file.write_all(content.as_bytes())
                .map_err(|e| SecretError::WriteError(format!("cannot write secrets: {}", e)))?;
            file.sync_all()
                .map_err(|e| SecretError::WriteError(format!("cannot sync to disk: {}", e)))?;
        }

        fs::rename(&temp_path, &self.path)
            .map_err(|e| SecretError::WriteError(format!("cannot rename temp file: {}", e)))?;

        debug!(path = %self.path.display(), entries = secrets.tokens.len(), "secrets file written");
        Ok(())
    }

    /// Whether the file is owner-only (0600). A missing file passes.
    #[cfg(unix)]
    pub fn verify_permissions(&self) -> Result<bool, SecretError> {
        if !self.path.exists() {
            return Ok(true);
        }
        let metadata = fs::metadata(&self.path)
            .map_err(|e| SecretError::ReadError(format!("cannot read file metadata: {}", e)))?;
        Ok(metadata.permissions().mode() & 0o777 == 0o600)
    }

    #[cfg(not(unix))]
    pub fn verify_permissions(&self) -> Result<bool, SecretError> {
        Ok(true)
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, SecretError> {
        Ok(self.read()?.tokens.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SecretError> {
        let mut secrets = self.read()?;
        secrets.tokens.insert(key.to_string(), value.to_string());
        self.write(&secrets)
    }

    fn delete(&self, key: &str) -> Result<(), SecretError> {
        let mut secrets = self.read()?;
        if secrets.tokens.remove(key).is_none() {
            return Ok(());
        }
        self.write(&secrets)
    }
}
