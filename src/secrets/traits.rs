//! secrets::traits
//!
//! The key-value port every token lookup goes through.
//!
//! Keys are opaque to the store. [`Credentials`](crate::credentials::Credentials)
//! derives them from a normalized repository identity, so a store never
//! sees raw URLs.
//!
//! # Security
//!
//! Implementations MUST:
//! - Never log, print, or include secret values in error messages
//! - Be thread-safe (Send + Sync)

use thiserror::Error;

/// Errors from secret storage operations.
///
/// Messages carry keys and causes, never values.
#[derive(Debug, Error)]
pub enum SecretError {
    /// Failed to read from secret storage.
    #[error("failed to read secret: {0}")]
    ReadError(String),

    /// Failed to write to secret storage.
    #[error("failed to write secret: {0}")]
    WriteError(String),

    /// Failed to delete from secret storage.
    #[error("failed to delete secret: {0}")]
    DeleteError(String),

    /// Provider not available or not configured.
    #[error("secret provider not available: {0}")]
    ProviderNotAvailable(String),
}

/// Trait for secret storage providers.
pub trait SecretStore: Send + Sync {
    /// Get a secret by key; `Ok(None)` when absent.
    ///
    /// The returned value is the raw secret. Do not log it.
    fn get(&self, key: &str) -> Result<Option<String>, SecretError>;

    /// Set a secret, overwriting any existing value.
    fn set(&self, key: &str, value: &str) -> Result<(), SecretError>;

    /// Delete a secret. Deleting a missing key succeeds.
    fn delete(&self, key: &str) -> Result<(), SecretError>;

    /// Check if a secret exists.
    fn exists(&self, key: &str) -> Result<bool, SecretError> {
        Ok(self.get(key)?.is_some())
    }
}
