//! secrets
//!
//! Secret storage abstraction for access tokens.
//!
//! # Architecture
//!
//! Secrets are stored through the [`SecretStore`] trait:
//!
//! - [`FileSecretStore`]: `~/.vaultgate/secrets.toml` (default)
//! - `KeychainSecretStore`: OS keychain (feature `keychain`)
//! - [`MemorySecretStore`]: process-local, for tests
//!
//! Nothing outside [`credentials`](crate::credentials) reads or writes a
//! store directly; credentials own the key scheme.
//!
//! # Security
//!
//! - Secrets are **never** logged or included in error messages
//! - File store uses 0600 permissions on Unix (owner read/write only)
//! - All file writes are atomic (temp file + rename)

mod file_store;
#[cfg(feature = "keychain")]
mod keychain_store;
mod memory_store;
mod traits;

pub use file_store::FileSecretStore;
#[cfg(feature = "keychain")]
pub use keychain_store::{KeychainSecretStore, KEYCHAIN_SERVICE};
pub use memory_store::MemorySecretStore;
pub use traits::{SecretError, SecretStore};

/// The default secret store provider name.
pub const DEFAULT_PROVIDER: &str = "file";

/// Create a secret store based on the provider name (`file` or `keychain`).
///
/// # Errors
///
/// - Unknown provider name
/// - Keychain provider without the `keychain` feature enabled
/// - Initialization errors from the store
pub fn create_store(provider: &str) -> Result<Box<dyn SecretStore>, SecretError> {
    match provider {
        "file" => Ok(Box::new(FileSecretStore::new()?)),
        #[cfg(feature = "keychain")]
        "keychain" => Ok(Box::new(KeychainSecretStore::new()?)),
        #[cfg(not(feature = "keychain"))]
        "keychain" => Err(SecretError::ProviderNotAvailable(
            "keychain support not enabled (compile with --features keychain)".into(),
        )),
        other => Err(SecretError::ProviderNotAvailable(format!(
            "unknown secret provider: '{}' (valid: file, keychain)",
            other
        ))),
    }
}
