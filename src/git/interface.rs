//! git::interface
//!
//! The repository port: every git read and write the engine performs.
//!
//! # Architecture
//!
//! [`Repository`] is the only way the engine touches a working tree. The
//! production implementation is [`GitCli`](super::GitCli), which shells out
//! to the `git` binary; tests use [`MockRepository`](super::mock::MockRepository).
//! The trait carries no policy: it never decides whether a checkout is
//! allowed, it only reports what git said.
//!
//! # Error Handling
//!
//! Git failures are categorized into typed variants:
//! - [`GitError::GitNotFound`]: the `git` binary is missing
//! - [`GitError::NotARepo`]: the working directory has no repository
//! - [`GitError::CommandFailed`]: git exited non-zero; carries stderr
//! - [`GitError::MutationInProgress`]: a bulk mutation guard is already held

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Name of the only remote vaultgate works with.
pub const REMOTE: &str = "origin";

/// Errors from git operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GitError {
    /// The git executable could not be started.
    #[error("git executable not found; install git and make sure it is on PATH")]
    GitNotFound,

    /// No repository in the working directory.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The directory that was checked
        path: PathBuf,
    },

    /// git exited with a non-zero status.
    #[error("`{command}` failed: {message}")]
    CommandFailed {
        /// The command line, without the `git` prefix
        command: String,
        /// stderr (or stdout when stderr was empty)
        message: String,
    },

    /// Another bulk mutation is already running in this process.
    #[error("another git operation is already in progress")]
    MutationInProgress,

    /// Output from git could not be interpreted.
    #[error("unexpected output from `{command}`: {output}")]
    UnexpectedOutput {
        /// The command line
        command: String,
        /// The raw output
        output: String,
    },

    /// Filesystem error around a git invocation.
    #[error("i/o error: {0}")]
    Io(String),
}

/// One line of `git status --porcelain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// Two-letter XY status code (e.g. `" M"`, `"??"`)
    pub code: String,
    /// Path relative to the working directory (destination for renames)
    pub path: String,
}

impl StatusEntry {
    /// Whether git does not track this path yet.
    pub fn is_untracked(&self) -> bool {
        self.code == "??"
    }
}

/// Branches reported by `git branch -a`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchListing {
    /// Local branch names
    pub local: BTreeSet<String>,
    /// Remote branch names with the `origin/` prefix removed
    pub remote: BTreeSet<String>,
    /// Target of `origin/HEAD`, if the remote advertises one
    pub remote_head: Option<String>,
}

impl BranchListing {
    /// Union of local and remote names.
    pub fn all(&self) -> BTreeSet<String> {
        self.local.union(&self.remote).cloned().collect()
    }

    /// Whether a branch exists locally or on the remote.
    pub fn contains(&self, name: &str) -> bool {
        self.local.contains(name) || self.remote.contains(name)
    }
}

/// Synchronous repository operations against one working directory.
///
/// Every call is one (or, for the provided combinators, a short fixed
/// sequence of) git invocations with the working directory as cwd.
pub trait Repository: Send + Sync {
    /// The working directory this repository operates on.
    fn workdir(&self) -> &Path;

    /// Whether the working directory holds a repository.
    fn is_repository(&self) -> bool;

    /// `branch --show-current`; `None` when HEAD is detached.
    fn current_branch(&self) -> Result<Option<String>, GitError>;

    /// `status --porcelain`.
    fn status(&self) -> Result<Vec<StatusEntry>, GitError>;

    /// `add .`
    fn add_all(&self) -> Result<(), GitError>;

    /// `commit -m <message>`
    fn commit(&self, message: &str) -> Result<(), GitError>;

    /// `push origin <branch>`
    fn push(&self, branch: &str) -> Result<(), GitError>;

    /// `pull origin <branch>`
    fn pull(&self, branch: &str) -> Result<(), GitError>;

    /// `fetch origin`
    fn fetch(&self) -> Result<(), GitError>;

    /// `rev-list --count HEAD..origin/<branch>`: commits the remote has
    /// that the local HEAD lacks.
    fn behind_count(&self, branch: &str) -> Result<u32, GitError>;

    /// `checkout <branch>`
    fn checkout(&self, branch: &str) -> Result<(), GitError>;

    /// `checkout -b <branch>` from the current HEAD.
    fn checkout_new(&self, branch: &str) -> Result<(), GitError>;

    /// `branch -a`
    fn list_branches(&self) -> Result<BranchListing, GitError>;

    /// `branch -r`, reduced to the target of `origin/HEAD`.
    fn remote_default_branch(&self) -> Result<Option<String>, GitError>;

    /// `branch -M <new_name>`: rename the current branch.
    fn rename_current_branch(&self, new_name: &str) -> Result<(), GitError>;

    /// `branch -d <branch>`
    fn delete_branch(&self, branch: &str) -> Result<(), GitError>;

    /// `ls-remote --exit-code origin <branch>`.
    ///
    /// Exit status 2 (no matching ref) is the one failure that is not an
    /// error: it means `Ok(false)`.
    fn remote_branch_exists(&self, branch: &str) -> Result<bool, GitError>;

    /// `ls-remote origin <branch>`: commit id the remote branch points at.
    fn remote_head(&self, branch: &str) -> Result<Option<String>, GitError>;

    /// `rev-parse --verify --quiet <branch>`: local commit id, if any.
    fn local_head(&self, branch: &str) -> Result<Option<String>, GitError>;

    /// `clone <url> <workdir>`
    fn clone_from(&self, url: &str) -> Result<(), GitError>;

    /// `init`
    fn init(&self) -> Result<(), GitError>;

    /// `config user.name <name>` / `config user.email <email>`
    fn set_identity(&self, name: Option<&str>, email: Option<&str>) -> Result<(), GitError>;

    /// `remote add origin <url>`
    fn add_remote(&self, url: &str) -> Result<(), GitError>;

    /// `remote get-url origin`; `None` when no origin is configured.
    fn remote_url(&self) -> Result<Option<String>, GitError>;

    /// Whether `status --porcelain` reports anything.
    fn has_uncommitted_changes(&self) -> Result<bool, GitError> {
        Ok(!self.status()?.is_empty())
    }

    /// `add .` followed by `commit -m <message>`.
    fn commit_all(&self, message: &str) -> Result<(), GitError> {
        self.add_all()?;
        self.commit(message)
    }
}

/// Parse `git status --porcelain` output.
pub fn parse_porcelain(output: &str) -> Vec<StatusEntry> {
    output
        .lines()
        .filter(|line| line.len() > 3)
        .map(|line| {
            let code = line[..2].to_string();
            let rest = &line[3..];
            let path = match rest.split_once(" -> ") {
                Some((_, to)) => to,
                None => rest,
            };
            StatusEntry {
                code,
                path: path.trim_matches('"').to_string(),
            }
        })
        .collect()
}

/// Parse `git branch -a` (or `-r`) output.
pub fn parse_branch_listing(output: &str) -> BranchListing {
    let mut listing = BranchListing::default();
    let remote_prefix = format!("{}/", REMOTE);

    for raw in output.lines() {
        let line = raw.trim_start_matches(['*', '+']).trim();
        if line.is_empty() || line.starts_with('(') {
            // "(HEAD detached at ...)"
            continue;
        }

        let is_remote = line.starts_with("remotes/") || raw.starts_with("  origin/");
        let name = line.strip_prefix("remotes/").unwrap_or(line);

        if let Some((head, target)) = name.split_once(" -> ") {
            if head.ends_with("/HEAD") {
                let target = target.strip_prefix(&remote_prefix).unwrap_or(target);
                listing.remote_head = Some(target.to_string());
            }
            continue;
        }

        if is_remote {
            if let Some(branch) = name.strip_prefix(&remote_prefix) {
                listing.remote.insert(branch.to_string());
            }
        } else {
            listing.local.insert(name.to_string());
        }
    }

    listing
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn porcelain_modified_and_untracked() {
        let entries = parse_porcelain(" M notes/a.md\n?? new.md\nA  staged.md\n");
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].code, " M");
        assert_eq!(entries[0].path, "notes/a.md");
        assert!(entries[1].is_untracked());
        assert_eq!(entries[2].code, "A ");
    }

    #[test]
    fn porcelain_rename_uses_destination() {
        let entries = parse_porcelain("R  old.md -> new.md\n");
        assert_eq!(entries[0].path, "new.md");
    }

    #[test]
    fn porcelain_quoted_path() {
        let entries = parse_porcelain("?? \"with space.md\"\n");
        assert_eq!(entries[0].path, "with space.md");
    }

    #[test]
    fn porcelain_empty() {
        assert!(parse_porcelain("").is_empty());
        assert!(parse_porcelain("\n").is_empty());
    }

    #[test]
    fn branch_listing_all() {
        let output = "\
* main
  feature/x
  remotes/origin/HEAD -> origin/main
  remotes/origin/main
  remotes/origin/review
";
        let listing = parse_branch_listing(output);
        assert_eq!(
            listing.local,
            ["feature/x", "main"].iter().map(|s| s.to_string()).collect()
        );
        assert_eq!(
            listing.remote,
            ["main", "review"].iter().map(|s| s.to_string()).collect()
        );
        assert_eq!(listing.remote_head.as_deref(), Some("main"));
        assert!(listing.contains("review"));
        assert_eq!(listing.all().len(), 3);
    }

    #[test]
    fn branch_listing_remote_only() {
        let output = "  origin/HEAD -> origin/trunk\n  origin/trunk\n  origin/notes\n";
        let listing = parse_branch_listing(output);
        assert!(listing.local.is_empty());
        assert_eq!(listing.remote.len(), 2);
        assert_eq!(listing.remote_head.as_deref(), Some("trunk"));
    }

    #[test]
    fn branch_listing_skips_detached_head() {
        let output = "* (HEAD detached at 1a2b3c4)\n  main\n";
        let listing = parse_branch_listing(output);
        assert_eq!(listing.local.len(), 1);
        assert!(listing.local.contains("main"));
    }

    #[test]
    fn branch_listing_worktree_marker() {
        let listing = parse_branch_listing("+ other-worktree\n* main\n");
        assert!(listing.local.contains("other-worktree"));
    }
}
