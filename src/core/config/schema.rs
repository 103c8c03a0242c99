//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Global Config
//!
//! Located at (in order of precedence):
//! 1. `$VAULTGATE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/vaultgate/config.toml`
//! 3. `~/.vaultgate/config.toml` (canonical write location)
//!
//! # Workspace State
//!
//! One flat [`RepositoryConfig`] record per workspace, stored outside the
//! working tree at `~/.vaultgate/workspaces/<key>.toml`.
//!
//! # Validation
//!
//! Config values are validated after parsing to ensure they conform to
//! expected formats (e.g., the default main branch must be a valid branch
//! name).

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::BranchName;

/// Default name of the read-only branch.
pub const DEFAULT_MAIN_BRANCH: &str = "main";

/// Default wait between a successful merge and the local main pull.
pub const DEFAULT_POST_MERGE_DELAY_MS: u64 = 2000;

/// Global configuration (user scope).
///
/// # Example
///
/// ```toml
/// default_main_branch = "main"
/// post_merge_delay_ms = 2000
/// check_updates_on_start = true
///
/// [identity]
/// name = "Ada"
/// email = "ada@example.com"
///
/// [secrets]
/// provider = "file"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    /// Main branch used when a repository is initialized from scratch
    pub default_main_branch: Option<String>,

    /// Milliseconds to wait after a merge before pulling main
    pub post_merge_delay_ms: Option<u64>,

    /// API base override (GitHub Enterprise)
    pub api_base: Option<String>,

    /// Run the remote update check after startup validation
    pub check_updates_on_start: Option<bool>,

    /// Commit identity applied on init/clone
    pub identity: Option<IdentityConfig>,

    /// Secret storage settings
    pub secrets: Option<SecretsConfig>,
}

impl GlobalConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(main) = &self.default_main_branch {
            BranchName::new(main.as_str()).map_err(|e| {
                ConfigError::InvalidValue(format!("invalid default main branch: {}", e))
            })?;
        }

        if let Some(api_base) = &self.api_base {
            if !api_base.starts_with("https://") && !api_base.starts_with("http://") {
                return Err(ConfigError::InvalidValue(format!(
                    "api_base must be an http(s) URL, got '{}'",
                    api_base
                )));
            }
        }

        if let Some(identity) = &self.identity {
            identity.validate()?;
        }

        if let Some(secrets) = &self.secrets {
            secrets.validate()?;
        }

        Ok(())
    }
}

/// Commit identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct IdentityConfig {
    /// Value for `git config user.name`
    pub name: Option<String>,
    /// Value for `git config user.email`
    pub email: Option<String>,
}

impl IdentityConfig {
    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err(ConfigError::InvalidValue(format!(
                    "identity email '{}' is not an email address",
                    email
                )));
            }
        }
        Ok(())
    }
}

/// Secret storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SecretsConfig {
    /// Provider name: "file" or "keychain"
    pub provider: Option<String>,
}

impl SecretsConfig {
    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(provider) = &self.provider {
            let valid = ["file", "keychain"];
            if !valid.contains(&provider.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid secrets provider '{}', must be one of: {}",
                    provider,
                    valid.join(", ")
                )));
            }
        }
        Ok(())
    }
}

/// Persisted per-workspace repository record.
///
/// This is the single flat record that is read entirely when a workspace is
/// opened and rewritten entirely after every mutation. When
/// `is_repository_connected` is false the branch fields are advisory only.
///
/// # Example
///
/// ```toml
/// repository_url = "https://github.com/owner/vault.git"
/// is_repository_connected = true
/// main_branch = "main"
/// current_branch = "main"
/// available_branches = ["feature/x", "main"]
/// last_working_branch = "feature/x"
/// read_only_mode = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Remote URL as entered by the user
    pub repository_url: String,

    /// Whether a repository is attached to this workspace
    pub is_repository_connected: bool,

    /// The read-only branch
    pub main_branch: String,

    /// Last known checked-out branch
    pub current_branch: String,

    /// Known local and remote branch names
    pub available_branches: BTreeSet<String>,

    /// Most recent branch edit mode was entered on
    pub last_working_branch: String,

    /// Declared mode; true ⟺ `current_branch == main_branch`
    pub read_only_mode: bool,

    /// Time of the last successful main pull
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            repository_url: String::new(),
            is_repository_connected: false,
            main_branch: DEFAULT_MAIN_BRANCH.to_string(),
            current_branch: DEFAULT_MAIN_BRANCH.to_string(),
            available_branches: BTreeSet::new(),
            last_working_branch: String::new(),
            read_only_mode: true,
            last_synced_at: None,
        }
    }
}

impl RepositoryConfig {
    /// Whether the declared mode agrees with the recorded branch.
    pub fn is_consistent(&self) -> bool {
        self.read_only_mode == (self.current_branch == self.main_branch)
    }

    /// Reset to the disconnected state.
    ///
    /// The record itself survives; only its contents go back to defaults.
    pub fn disconnect(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_config_parse_full() {
        let toml = r#"
            default_main_branch = "trunk"
            post_merge_delay_ms = 500
            api_base = "https://git.example.com/api/v3"
            check_updates_on_start = false

            [identity]
            name = "Ada"
            email = "ada@example.com"

            [secrets]
            provider = "file"
        "#;

        let config: GlobalConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.default_main_branch.as_deref(), Some("trunk"));
        assert_eq!(config.post_merge_delay_ms, Some(500));
        assert_eq!(config.check_updates_on_start, Some(false));
        assert_eq!(
            config.identity.as_ref().and_then(|i| i.name.as_deref()),
            Some("Ada")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn global_config_rejects_unknown_fields() {
        let result: Result<GlobalConfig, _> = toml::from_str("unknown = 1");
        assert!(result.is_err());
    }

    #[test]
    fn invalid_main_branch_rejected() {
        let config = GlobalConfig {
            default_main_branch: Some("bad..name".into()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_api_base_rejected() {
        let config = GlobalConfig {
            api_base: Some("ftp://example.com".into()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_secrets_provider_rejected() {
        let config = GlobalConfig {
            secrets: Some(SecretsConfig {
                provider: Some("vault".into()),
            }),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("vault"));
    }

    #[test]
    fn invalid_email_rejected() {
        let identity = IdentityConfig {
            name: None,
            email: Some("nobody".into()),
        };
        assert!(identity.validate().is_err());
    }

    #[test]
    fn repository_config_defaults_are_consistent() {
        let config = RepositoryConfig::default();
        assert!(!config.is_repository_connected);
        assert!(config.read_only_mode);
        assert!(config.is_consistent());
    }

    #[test]
    fn repository_config_partial_record_fills_defaults() {
        let config: RepositoryConfig = toml::from_str(
            r#"
            repository_url = "https://github.com/o/r"
            is_repository_connected = true
            current_branch = "feature/x"
            read_only_mode = false
            "#,
        )
        .unwrap();
        assert_eq!(config.main_branch, "main");
        assert!(config.available_branches.is_empty());
        assert!(config.is_consistent());
    }

    #[test]
    fn inconsistent_record_detected() {
        let config = RepositoryConfig {
            current_branch: "feature/x".into(),
            read_only_mode: true,
            ..Default::default()
        };
        assert!(!config.is_consistent());
    }

    #[test]
    fn disconnect_resets_fields() {
        let mut config = RepositoryConfig {
            repository_url: "https://github.com/o/r".into(),
            is_repository_connected: true,
            current_branch: "feature/x".into(),
            last_working_branch: "feature/x".into(),
            read_only_mode: false,
            ..Default::default()
        };
        config.available_branches.insert("feature/x".into());

        config.disconnect();
        assert_eq!(config, RepositoryConfig::default());
    }
}
