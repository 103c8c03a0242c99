//! secrets::keychain_store
//!
//! OS keychain storage via `keyring` (macOS Keychain, Windows Credential
//! Manager, Linux Secret Service). Compiled only with the `keychain` feature.
//!
//! Every entry lives under one service name; the account is the opaque key
//! handed down by [`Credentials`](crate::credentials::Credentials).

use keyring::Entry;
use tracing::debug;

use super::traits::{SecretError, SecretStore};

/// Service name shared by all vaultgate keychain entries.
pub const KEYCHAIN_SERVICE: &str = "vaultgate";

/// Keychain-based secret storage.
#[derive(Debug)]
pub struct KeychainSecretStore {
    service: String,
}

impl KeychainSecretStore {
    /// Store under the [`KEYCHAIN_SERVICE`] service.
    pub fn new() -> Result<Self, SecretError> {
        Ok(Self::with_service(KEYCHAIN_SERVICE))
    }

    /// Store under a custom service name.
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Get the service name.
    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, key: &str) -> Result<Entry, SecretError> {
        Entry::new(&self.service, key)
            .map_err(|e| SecretError::ReadError(format!("cannot create keyring entry: {}", e)))
    }
}

impl SecretStore for KeychainSecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, SecretError> {
        debug!(service = %self.service, key, "keychain lookup");
        match self.entry(key)?.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(keyring::Error::Ambiguous(_)) => {
                Err(SecretError::ReadError("ambiguous keychain entry".into()))
            }
            Err(e) => Err(SecretError::ReadError(format!(
                "cannot read from keychain: {}",
                e
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SecretError> {
        self.entry(key)?
            .set_password(value)
            .map_err(|e| SecretError::WriteError(format!("cannot write to keychain: {}", e)))
    }

    fn delete(&self, key: &str) -> Result<(), SecretError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(SecretError::DeleteError(format!(
                "cannot delete from keychain: {}",
                e
            ))),
        }
    }
}
