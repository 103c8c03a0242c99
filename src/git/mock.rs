//! git::mock
//!
//! In-memory repository for deterministic engine tests.
//!
//! # Design
//!
//! [`MockRepository`] simulates the small slice of git state the engine
//! depends on: the checked-out branch, local and remote branch sets, a dirty
//! working tree, and how far each branch is behind its remote. Every trait
//! call is recorded so tests can assert on the exact adapter traffic (for
//! example "zero adapter calls" or "pull happened before push"), and any
//! operation can be made to fail with [`FailOn`].
//!
//! # Example
//!
//! ```
//! use vaultgate::git::mock::{FailOn, MockOperation, MockRepository};
//! use vaultgate::git::{GitError, Repository};
//!
//! let repo = MockRepository::new("/vault")
//!     .with_remote_branches(&["main", "feature/x"])
//!     .fail_on(FailOn::Push(GitError::Io("offline".into())));
//!
//! repo.checkout("feature/x").unwrap();
//! assert_eq!(repo.current().as_deref(), Some("feature/x"));
//! assert!(repo.push("feature/x").is_err());
//! assert!(matches!(repo.operations()[0], MockOperation::Checkout { .. }));
//! ```

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::guard::MutationFlag;
use super::interface::{BranchListing, GitError, Repository, StatusEntry};

/// Mock repository for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockRepository {
    workdir: PathBuf,
    inner: Arc<Mutex<MockRepositoryInner>>,
}

#[derive(Debug)]
struct MockRepositoryInner {
    is_repository: bool,
    current: Option<String>,
    local: BTreeSet<String>,
    remote: BTreeSet<String>,
    remote_default: Option<String>,
    status: Vec<StatusEntry>,
    behind: HashMap<String, u32>,
    heads: HashMap<String, String>,
    remote_heads: HashMap<String, String>,
    remote_url: Option<String>,
    fail_on: Vec<FailOn>,
    operations: Vec<MockOperation>,
    watched_flag: Option<MutationFlag>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail `current_branch`.
    CurrentBranch(GitError),
    /// Fail `status`.
    Status(GitError),
    /// Fail `commit`.
    Commit(GitError),
    /// Fail `push`.
    Push(GitError),
    /// Fail `pull`.
    Pull(GitError),
    /// Fail `fetch`.
    Fetch(GitError),
    /// Fail `checkout` for a specific branch, or any branch when `None`.
    Checkout(Option<String>, GitError),
    /// Fail `checkout -b`.
    CheckoutNew(GitError),
    /// Fail `branch -a`.
    ListBranches(GitError),
    /// Fail `ls-remote --exit-code`.
    RemoteBranchExists(GitError),
    /// Fail `clone`.
    Clone(GitError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    CurrentBranch,
    Status,
    AddAll,
    Commit {
        message: String,
    },
    Push {
        branch: String,
    },
    /// `guarded` is whether the watched [`MutationFlag`] was active.
    Pull {
        branch: String,
        guarded: bool,
    },
    Fetch,
    BehindCount {
        branch: String,
    },
    Checkout {
        branch: String,
    },
    CheckoutNew {
        branch: String,
    },
    ListBranches,
    RemoteDefaultBranch,
    RenameCurrentBranch {
        new_name: String,
    },
    DeleteBranch {
        branch: String,
    },
    RemoteBranchExists {
        branch: String,
    },
    RemoteHead {
        branch: String,
    },
    LocalHead {
        branch: String,
    },
    Clone {
        url: String,
        guarded: bool,
    },
    Init,
    SetIdentity {
        name: Option<String>,
        email: Option<String>,
    },
    AddRemote {
        url: String,
    },
    RemoteUrl,
}

impl MockOperation {
    /// Whether this operation changes repository state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            MockOperation::AddAll
                | MockOperation::Commit { .. }
                | MockOperation::Push { .. }
                | MockOperation::Pull { .. }
                | MockOperation::Checkout { .. }
                | MockOperation::CheckoutNew { .. }
                | MockOperation::RenameCurrentBranch { .. }
                | MockOperation::DeleteBranch { .. }
                | MockOperation::Clone { .. }
                | MockOperation::Init
                | MockOperation::SetIdentity { .. }
                | MockOperation::AddRemote { .. }
        )
    }
}

fn failed(command: &str, message: &str) -> GitError {
    GitError::CommandFailed {
        command: command.to_string(),
        message: message.to_string(),
    }
}

impl MockRepository {
    /// A cloned repository on `main`, with `main` on both sides and
    /// `origin/HEAD -> main`.
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        let main: BTreeSet<String> = ["main".to_string()].into_iter().collect();
        Self {
            workdir: workdir.into(),
            inner: Arc::new(Mutex::new(MockRepositoryInner {
                is_repository: true,
                current: Some("main".into()),
                local: main.clone(),
                remote: main,
                remote_default: Some("main".into()),
                status: Vec::new(),
                behind: HashMap::new(),
                heads: HashMap::new(),
                remote_heads: HashMap::new(),
                remote_url: Some("https://github.com/owner/vault.git".into()),
                fail_on: Vec::new(),
                operations: Vec::new(),
                watched_flag: None,
            })),
        }
    }

    /// A directory with no repository at all.
    pub fn empty(workdir: impl Into<PathBuf>) -> Self {
        let repo = Self::new(workdir);
        {
            let mut inner = repo.inner.lock().unwrap();
            inner.is_repository = false;
            inner.current = None;
            inner.local.clear();
            inner.remote.clear();
            inner.remote_default = None;
            inner.remote_url = None;
        }
        repo
    }

    /// Add local branches.
    pub fn with_local_branches(self, names: &[&str]) -> Self {
        self.inner
            .lock()
            .unwrap()
            .local
            .extend(names.iter().map(|n| n.to_string()));
        self
    }

    /// Add remote branches.
    pub fn with_remote_branches(self, names: &[&str]) -> Self {
        self.inner
            .lock()
            .unwrap()
            .remote
            .extend(names.iter().map(|n| n.to_string()));
        self
    }

    /// Start checked out on `branch` (created locally if missing).
    pub fn on_branch(self, branch: &str) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.local.insert(branch.to_string());
            inner.current = Some(branch.to_string());
        }
        self
    }

    /// Start with a detached HEAD.
    pub fn detached(self) -> Self {
        self.inner.lock().unwrap().current = None;
        self
    }

    /// Set the `origin/HEAD` target.
    pub fn with_remote_default(self, branch: Option<&str>) -> Self {
        self.inner.lock().unwrap().remote_default = branch.map(str::to_string);
        self
    }

    /// Set the configured origin URL.
    pub fn with_remote_url(self, url: Option<&str>) -> Self {
        self.inner.lock().unwrap().remote_url = url.map(str::to_string);
        self
    }

    /// Start with modified files in the working tree.
    pub fn with_changes(self, paths: &[&str]) -> Self {
        self.add_changes(paths);
        self
    }

    /// Report `branch` as `count` commits behind its remote.
    pub fn with_behind(self, branch: &str, count: u32) -> Self {
        self.inner
            .lock()
            .unwrap()
            .behind
            .insert(branch.to_string(), count);
        self
    }

    /// Set the commit id of the remote copy of `branch`.
    pub fn with_remote_head(self, branch: &str, oid: &str) -> Self {
        self.inner
            .lock()
            .unwrap()
            .remote_heads
            .insert(branch.to_string(), oid.to_string());
        self
    }

    /// Set the commit id of the local copy of `branch`.
    pub fn with_local_head(self, branch: &str, oid: &str) -> Self {
        self.inner
            .lock()
            .unwrap()
            .heads
            .insert(branch.to_string(), oid.to_string());
        self
    }

    /// Record whether `flag` is active during pulls and clones.
    pub fn watch(self, flag: &MutationFlag) -> Self {
        self.inner.lock().unwrap().watched_flag = Some(flag.clone());
        self
    }

    /// Configure the mock to fail on a specific operation.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.set_fail_on(fail_on);
        self
    }

    /// Add a failure after construction.
    pub fn set_fail_on(&self, fail_on: FailOn) {
        self.inner.lock().unwrap().fail_on.push(fail_on);
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.inner.lock().unwrap().fail_on.clear();
    }

    /// Simulate the user editing files.
    pub fn add_changes(&self, paths: &[&str]) {
        self.inner
            .lock()
            .unwrap()
            .status
            .extend(paths.iter().map(|p| StatusEntry {
                code: " M".into(),
                path: p.to_string(),
            }));
    }

    /// Simulate a checkout performed outside vaultgate.
    pub fn external_checkout(&self, branch: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.local.insert(branch.to_string());
        inner.current = Some(branch.to_string());
    }

    /// Currently checked-out branch.
    pub fn current(&self) -> Option<String> {
        self.inner.lock().unwrap().current.clone()
    }

    /// Local branch names.
    pub fn local_branches(&self) -> BTreeSet<String> {
        self.inner.lock().unwrap().local.clone()
    }

    /// Remote branch names.
    pub fn remote_branches(&self) -> BTreeSet<String> {
        self.inner.lock().unwrap().remote.clone()
    }

    /// Whether the simulated working tree has changes.
    pub fn is_dirty(&self) -> bool {
        !self.inner.lock().unwrap().status.is_empty()
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.inner.lock().unwrap().operations.clone()
    }

    /// Recorded operations that change repository state.
    pub fn mutations(&self) -> Vec<MockOperation> {
        self.operations()
            .into_iter()
            .filter(MockOperation::is_mutation)
            .collect()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        self.inner.lock().unwrap().operations.clear();
    }

    fn record(&self, op: MockOperation) {
        self.inner.lock().unwrap().operations.push(op);
    }

    fn is_guarded(&self) -> bool {
        self.inner
            .lock()
            .unwrap()
            .watched_flag
            .as_ref()
            .is_some_and(MutationFlag::is_active)
    }

    fn check_fail(&self, matcher: impl Fn(&FailOn) -> Option<GitError>) -> Result<(), GitError> {
        let inner = self.inner.lock().unwrap();
        match inner.fail_on.iter().find_map(matcher) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn require_repository(&self) -> Result<(), GitError> {
        if self.inner.lock().unwrap().is_repository {
            Ok(())
        } else {
            Err(GitError::NotARepo {
                path: self.workdir.clone(),
            })
        }
    }
}

impl Repository for MockRepository {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn is_repository(&self) -> bool {
        self.inner.lock().unwrap().is_repository
    }

    fn current_branch(&self) -> Result<Option<String>, GitError> {
        self.record(MockOperation::CurrentBranch);
        self.check_fail(|f| match f {
            FailOn::CurrentBranch(e) => Some(e.clone()),
            _ => None,
        })?;
        self.require_repository()?;
        Ok(self.current())
    }

    fn status(&self) -> Result<Vec<StatusEntry>, GitError> {
        self.record(MockOperation::Status);
        self.check_fail(|f| match f {
            FailOn::Status(e) => Some(e.clone()),
            _ => None,
        })?;
        self.require_repository()?;
        Ok(self.inner.lock().unwrap().status.clone())
    }

    fn add_all(&self) -> Result<(), GitError> {
        self.record(MockOperation::AddAll);
        self.require_repository()
    }

    fn commit(&self, message: &str) -> Result<(), GitError> {
        self.record(MockOperation::Commit {
            message: message.to_string(),
        });
        self.check_fail(|f| match f {
            FailOn::Commit(e) => Some(e.clone()),
            _ => None,
        })?;
        let mut inner = self.inner.lock().unwrap();
        if inner.status.is_empty() {
            return Err(failed("commit", "nothing to commit, working tree clean"));
        }
        inner.status.clear();
        if let Some(branch) = inner.current.clone() {
            let next = format!("{}-{}", branch, inner.operations.len());
            inner.heads.insert(branch, next);
        }
        Ok(())
    }

    fn push(&self, branch: &str) -> Result<(), GitError> {
        self.record(MockOperation::Push {
            branch: branch.to_string(),
        });
        self.check_fail(|f| match f {
            FailOn::Push(e) => Some(e.clone()),
            _ => None,
        })?;
        let mut inner = self.inner.lock().unwrap();
        if inner.behind.get(branch).copied().unwrap_or(0) > 0 {
            return Err(failed(
                &format!("push origin {}", branch),
                "! [rejected] (non-fast-forward)",
            ));
        }
        inner.remote.insert(branch.to_string());
        if let Some(head) = inner.heads.get(branch).cloned() {
            inner.remote_heads.insert(branch.to_string(), head);
        }
        Ok(())
    }

    fn pull(&self, branch: &str) -> Result<(), GitError> {
        let guarded = self.is_guarded();
        self.record(MockOperation::Pull {
            branch: branch.to_string(),
            guarded,
        });
        self.check_fail(|f| match f {
            FailOn::Pull(e) => Some(e.clone()),
            _ => None,
        })?;
        let mut inner = self.inner.lock().unwrap();
        if !inner.remote.contains(branch) {
            return Err(failed(
                &format!("pull origin {}", branch),
                &format!("couldn't find remote ref {}", branch),
            ));
        }
        inner.behind.remove(branch);
        if let Some(head) = inner.remote_heads.get(branch).cloned() {
            inner.heads.insert(branch.to_string(), head);
        }
        Ok(())
    }

    fn fetch(&self) -> Result<(), GitError> {
        self.record(MockOperation::Fetch);
        self.check_fail(|f| match f {
            FailOn::Fetch(e) => Some(e.clone()),
            _ => None,
        })
    }

    fn behind_count(&self, branch: &str) -> Result<u32, GitError> {
        self.record(MockOperation::BehindCount {
            branch: branch.to_string(),
        });
        Ok(self
            .inner
            .lock()
            .unwrap()
            .behind
            .get(branch)
            .copied()
            .unwrap_or(0))
    }

    fn checkout(&self, branch: &str) -> Result<(), GitError> {
        self.record(MockOperation::Checkout {
            branch: branch.to_string(),
        });
        self.check_fail(|f| match f {
            FailOn::Checkout(None, e) => Some(e.clone()),
            FailOn::Checkout(Some(b), e) if b == branch => Some(e.clone()),
            _ => None,
        })?;
        let mut inner = self.inner.lock().unwrap();
        if !inner.local.contains(branch) && !inner.remote.contains(branch) {
            return Err(failed(
                &format!("checkout {}", branch),
                &format!(
                    "error: pathspec '{}' did not match any file(s) known to git",
                    branch
                ),
            ));
        }
        inner.local.insert(branch.to_string());
        inner.current = Some(branch.to_string());
        Ok(())
    }

    fn checkout_new(&self, branch: &str) -> Result<(), GitError> {
        self.record(MockOperation::CheckoutNew {
            branch: branch.to_string(),
        });
        self.check_fail(|f| match f {
            FailOn::CheckoutNew(e) => Some(e.clone()),
            _ => None,
        })?;
        let mut inner = self.inner.lock().unwrap();
        if inner.local.contains(branch) {
            return Err(failed(
                &format!("checkout -b {}", branch),
                &format!("fatal: a branch named '{}' already exists", branch),
            ));
        }
        inner.local.insert(branch.to_string());
        inner.current = Some(branch.to_string());
        Ok(())
    }

    fn list_branches(&self) -> Result<BranchListing, GitError> {
        self.record(MockOperation::ListBranches);
        self.check_fail(|f| match f {
            FailOn::ListBranches(e) => Some(e.clone()),
            _ => None,
        })?;
        let inner = self.inner.lock().unwrap();
        Ok(BranchListing {
            local: inner.local.clone(),
            remote: inner.remote.clone(),
            remote_head: inner.remote_default.clone(),
        })
    }

    fn remote_default_branch(&self) -> Result<Option<String>, GitError> {
        self.record(MockOperation::RemoteDefaultBranch);
        Ok(self.inner.lock().unwrap().remote_default.clone())
    }

    fn rename_current_branch(&self, new_name: &str) -> Result<(), GitError> {
        self.record(MockOperation::RenameCurrentBranch {
            new_name: new_name.to_string(),
        });
        let mut inner = self.inner.lock().unwrap();
        let current = inner
            .current
            .clone()
            .ok_or_else(|| failed("branch -M", "fatal: not on a branch"))?;
        inner.local.remove(&current);
        inner.local.insert(new_name.to_string());
        inner.current = Some(new_name.to_string());
        Ok(())
    }

    fn delete_branch(&self, branch: &str) -> Result<(), GitError> {
        self.record(MockOperation::DeleteBranch {
            branch: branch.to_string(),
        });
        let mut inner = self.inner.lock().unwrap();
        if inner.current.as_deref() == Some(branch) {
            return Err(failed(
                &format!("branch -d {}", branch),
                &format!("error: cannot delete branch '{}' used by worktree", branch),
            ));
        }
        if !inner.local.remove(branch) {
            return Err(failed(
                &format!("branch -d {}", branch),
                &format!("error: branch '{}' not found", branch),
            ));
        }
        Ok(())
    }

    fn remote_branch_exists(&self, branch: &str) -> Result<bool, GitError> {
        self.record(MockOperation::RemoteBranchExists {
            branch: branch.to_string(),
        });
        self.check_fail(|f| match f {
            FailOn::RemoteBranchExists(e) => Some(e.clone()),
            _ => None,
        })?;
        Ok(self.inner.lock().unwrap().remote.contains(branch))
    }

    fn remote_head(&self, branch: &str) -> Result<Option<String>, GitError> {
        self.record(MockOperation::RemoteHead {
            branch: branch.to_string(),
        });
        let inner = self.inner.lock().unwrap();
        if !inner.remote.contains(branch) {
            return Ok(None);
        }
        Ok(Some(
            inner
                .remote_heads
                .get(branch)
                .cloned()
                .unwrap_or_else(|| "base".into()),
        ))
    }

    fn local_head(&self, branch: &str) -> Result<Option<String>, GitError> {
        self.record(MockOperation::LocalHead {
            branch: branch.to_string(),
        });
        let inner = self.inner.lock().unwrap();
        if !inner.local.contains(branch) {
            return Ok(None);
        }
        Ok(Some(
            inner
                .heads
                .get(branch)
                .cloned()
                .unwrap_or_else(|| "base".into()),
        ))
    }

    fn clone_from(&self, url: &str) -> Result<(), GitError> {
        let guarded = self.is_guarded();
        self.record(MockOperation::Clone {
            url: url.to_string(),
            guarded,
        });
        self.check_fail(|f| match f {
            FailOn::Clone(e) => Some(e.clone()),
            _ => None,
        })?;
        let mut inner = self.inner.lock().unwrap();
        if inner.is_repository {
            return Err(failed(
                "clone",
                "fatal: destination path already exists and is not an empty directory",
            ));
        }
        let default = inner.remote_default.clone().unwrap_or_else(|| "main".into());
        inner.is_repository = true;
        inner.remote.insert(default.clone());
        inner.local.insert(default.clone());
        inner.current = Some(default);
        inner.remote_url = Some(url.to_string());
        Ok(())
    }

    fn init(&self) -> Result<(), GitError> {
        self.record(MockOperation::Init);
        let mut inner = self.inner.lock().unwrap();
        inner.is_repository = true;
        if inner.current.is_none() {
            inner.current = Some("main".into());
        }
        Ok(())
    }

    fn set_identity(&self, name: Option<&str>, email: Option<&str>) -> Result<(), GitError> {
        self.record(MockOperation::SetIdentity {
            name: name.map(str::to_string),
            email: email.map(str::to_string),
        });
        self.require_repository()
    }

    fn add_remote(&self, url: &str) -> Result<(), GitError> {
        self.record(MockOperation::AddRemote {
            url: url.to_string(),
        });
        let mut inner = self.inner.lock().unwrap();
        if inner.remote_url.is_some() {
            return Err(failed(
                "remote add origin",
                "error: remote origin already exists.",
            ));
        }
        inner.remote_url = Some(url.to_string());
        Ok(())
    }

    fn remote_url(&self) -> Result<Option<String>, GitError> {
        self.record(MockOperation::RemoteUrl);
        self.require_repository()?;
        Ok(self.inner.lock().unwrap().remote_url.clone())
    }
}
