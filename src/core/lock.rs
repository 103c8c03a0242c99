//! core::lock
//!
//! Exclusive per-workspace lock held by mutating commands.
//!
//! # Architecture
//!
//! Within one process, transitions are serialized by `&mut Workspace`.
//! Across processes (two `vg` invocations against the same vault) this lock
//! ensures only one git-mutating sequence runs at a time. It sits next to
//! the workspace state file so both are keyed by the same workspace path.
//!
//! # Invariants
//!
//! - Lock is held for the entire command, including config persistence
//! - Lock is automatically released on drop (RAII pattern)
//! - Lock acquisition is non-blocking (fails fast if locked)
//!
//! # Example
//!
//! ```ignore
//! use vaultgate::core::lock::WorkspaceLock;
//!
//! let lock = WorkspaceLock::for_workspace(Path::new("/vault"))?;
//! // ... run the transition ...
//! drop(lock);
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use crate::core::config::workspace_state_path;

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process already holds the lock.
    #[error("workspace is locked by another vaultgate process")]
    AlreadyLocked,

    /// Failed to create lock file or directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),
}

/// An exclusive lock on one workspace.
#[derive(Debug)]
pub struct WorkspaceLock {
    path: PathBuf,
    file: Option<File>,
}

impl WorkspaceLock {
    /// Acquire the lock for a working directory at its default location.
    pub fn for_workspace(workdir: &Path) -> Result<Self, LockError> {
        let state = workspace_state_path(workdir)
            .map_err(|e| LockError::CreateFailed(e.to_string()))?;
        Self::acquire(&state.with_extension("lock"))
    }

    /// Acquire the lock at an explicit path.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if another process holds the lock
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock cannot be acquired
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                LockError::CreateFailed(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path: path.to_path_buf(),
                file: Some(file),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(LockError::AlreadyLocked),
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    /// Check if the lock is currently held.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}
