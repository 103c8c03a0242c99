//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. The engine reads and writes
//! the working tree exclusively through the [`Repository`] trait; the
//! production implementation [`GitCli`] shells out to the `git` binary with
//! the working directory as cwd, one synchronous invocation per call.
//!
//! The adapter carries no policy. Whether a checkout is allowed is decided by
//! `engine`; this module only reports what git said.
//!
//! # Responsibilities
//!
//! - Branch queries (current, local/remote listing, remote default)
//! - Working tree status and commits
//! - Remote synchronization (fetch, pull, push, divergence counts)
//! - Repository setup (clone, init, identity, origin)
//! - The bulk-mutation guard observed by the host file watcher
//!
//! # Example
//!
//! ```ignore
//! use vaultgate::git::{GitCli, Repository};
//! use std::path::Path;
//!
//! let git = GitCli::new(Path::new("/vault"));
//! let branch = git.current_branch()?;
//! let dirty = git.has_uncommitted_changes()?;
//! ```

mod cli;
mod guard;
mod interface;
pub mod mock;

pub use cli::GitCli;
pub use guard::{BulkMutationGuard, MutationFlag};
pub use interface::{
    parse_branch_listing, parse_porcelain, BranchListing, GitError, Repository, StatusEntry,
    REMOTE,
};
