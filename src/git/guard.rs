//! git::guard
//!
//! Scoped marker for bulk git mutations (pull, clone, checkout during pull).
//!
//! While a [`BulkMutationGuard`] is alive, files appearing in the working
//! tree come from git, not from the user. The host's file-creation watcher
//! asks [`MutationFlag::is_active`] and skips its untracked-file cleanup
//! while it returns `true`.
//!
//! # Invariants
//!
//! - The flag is cleared when the guard drops, on every exit path
//!   (early `?` return, error, panic unwind)
//! - At most one guard per flag exists at a time; a second
//!   [`MutationFlag::begin`] fails with [`GitError::MutationInProgress`]
//!
//! # Example
//!
//! ```
//! use vaultgate::git::MutationFlag;
//!
//! let flag = MutationFlag::new();
//! let watcher_view = flag.clone();
//! {
//!     let _guard = flag.begin().unwrap();
//!     assert!(watcher_view.is_active());
//!     assert!(flag.begin().is_err());
//! }
//! assert!(!watcher_view.is_active());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use super::GitError;

/// Shared "bulk mutation active" flag.
///
/// Clones observe the same flag; hand one to the file watcher.
#[derive(Debug, Clone, Default)]
pub struct MutationFlag {
    active: Arc<AtomicBool>,
}

impl MutationFlag {
    /// Create an inactive flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a bulk mutation as started.
    ///
    /// # Errors
    ///
    /// Returns [`GitError::MutationInProgress`] if a guard is already held.
    pub fn begin(&self) -> Result<BulkMutationGuard, GitError> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| GitError::MutationInProgress)?;
        debug!("bulk git mutation started");
        Ok(BulkMutationGuard {
            active: Arc::clone(&self.active),
        })
    }

    /// Whether a bulk mutation is running right now.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// RAII guard returned by [`MutationFlag::begin`].
#[derive(Debug)]
#[must_use = "the mutation is only marked while the guard is alive"]
pub struct BulkMutationGuard {
    active: Arc<AtomicBool>,
}

impl Drop for BulkMutationGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
        debug!("bulk git mutation finished");
    }
}
