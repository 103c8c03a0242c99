//! engine::machine
//!
//! The branch-mode state machine.
//!
//! # Architecture
//!
//! [`Workspace`] is the only writer of the workspace record. Each
//! transition follows the same shape:
//!
//! ```text
//! policy check → adapter call(s) → record update → persist → validate
//! ```
//!
//! A policy rejection happens before the first adapter call. An adapter
//! failure returns before the record is touched. The validator then
//! reconciles the record with what git actually reports.
//!
//! # Example
//!
//! ```
//! use vaultgate::core::config::{MemoryConfigStore, RepositoryConfig};
//! use vaultgate::engine::{Mode, Transition, Workspace};
//! use vaultgate::git::mock::MockRepository;
//!
//! let record = RepositoryConfig {
//!     repository_url: "https://github.com/owner/vault.git".into(),
//!     is_repository_connected: true,
//!     ..RepositoryConfig::default()
//! };
//! let mut ws = Workspace::open(
//!     Box::new(MockRepository::new("/vault")),
//!     Box::new(MemoryConfigStore::with_config(record)),
//! );
//!
//! assert_eq!(ws.enter_edit_mode(Some("notes/today")).unwrap(), Transition::Applied);
//! assert_eq!(ws.mode(), Mode::EditingOnBranch("notes/today".into()));
//! ```

use std::fmt;
use std::path::Path;

use tracing::{debug, info, warn};

use super::{EngineError, InputRequest, Mode, Notice, PolicyViolation, Transition};
use crate::core::config::{ConfigStore, RepositoryConfig};
use crate::core::types::BranchName;
use crate::git::{MutationFlag, Repository};

/// One working directory under branch-mode control.
pub struct Workspace {
    pub(super) repo: Box<dyn Repository>,
    pub(super) store: Box<dyn ConfigStore>,
    pub(super) config: RepositoryConfig,
    pub(super) flag: MutationFlag,
    pub(super) notices: Vec<Notice>,
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("workdir", &self.repo.workdir())
            .field("config", &self.config)
            .field("mutating", &self.flag.is_active())
            .finish()
    }
}

impl Workspace {
    /// Load the record without validating it.
    ///
    /// An unreadable record degrades to the disconnected default and leaves
    /// a warning notice.
    pub fn new(repo: Box<dyn Repository>, store: Box<dyn ConfigStore>) -> Self {
        let mut notices = Vec::new();
        let config = match store.load() {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "workspace state unreadable, starting disconnected");
                notices.push(Notice::warning(format!(
                    "Workspace state could not be read ({}); starting disconnected.",
                    e
                )));
                RepositoryConfig::default()
            }
        };

        Self {
            repo,
            store,
            config,
            flag: MutationFlag::new(),
            notices,
        }
    }

    /// Load the record and run startup validation.
    ///
    /// A validation failure is reported as a notice; the workspace is
    /// still returned so the caller can show status or disconnect.
    pub fn open(repo: Box<dyn Repository>, store: Box<dyn ConfigStore>) -> Self {
        let mut ws = Self::new(repo, store);
        if ws.is_connected() {
            if let Err(e) = ws.validate_and_enforce_branch_rules() {
                warn!(error = %e, "startup validation failed");
                ws.notices.push(e.notice());
            }
        }
        ws
    }

    /// Share `flag` with an external observer instead of a private one.
    pub fn with_mutation_flag(mut self, flag: MutationFlag) -> Self {
        self.flag = flag;
        self
    }

    /// The current record.
    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// The mode the record declares.
    pub fn mode(&self) -> Mode {
        if self.config.read_only_mode {
            Mode::ReadOnlyOnMain
        } else {
            Mode::EditingOnBranch(self.config.current_branch.clone())
        }
    }

    pub fn is_connected(&self) -> bool {
        self.config.is_repository_connected
    }

    /// Drain the notices produced since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Handle to the bulk-mutation flag, for file watchers.
    pub fn mutation_flag(&self) -> MutationFlag {
        self.flag.clone()
    }

    pub fn repository(&self) -> &dyn Repository {
        self.repo.as_ref()
    }

    pub fn workdir(&self) -> &Path {
        self.repo.workdir()
    }

    pub(crate) fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    pub(super) fn persist(&self) -> Result<(), EngineError> {
        self.store.save(&self.config)?;
        debug!(
            current = %self.config.current_branch,
            read_only = self.config.read_only_mode,
            "workspace state saved"
        );
        Ok(())
    }

    pub(super) fn require_connected(&self) -> Result<(), EngineError> {
        if self.config.is_repository_connected {
            Ok(())
        } else {
            Err(EngineError::NotConnected)
        }
    }

    fn main_branch(&self) -> String {
        self.config.main_branch.clone()
    }

    /// Known branches other than main, sorted.
    pub fn working_branches(&self) -> Vec<String> {
        self.config
            .available_branches
            .iter()
            .filter(|b| **b != self.config.main_branch)
            .cloned()
            .collect()
    }

    /// Leave read-only mode for a working branch.
    ///
    /// With no branch, nothing runs and the caller gets the branch choices
    /// back. A branch that exists nowhere is created from the current HEAD.
    ///
    /// # Errors
    ///
    /// - `NotConnected` without an attached repository
    /// - `Policy(EditMain)` when `branch` is main; no git call is made
    /// - `Git` when the checkout fails; the record is unchanged
    pub fn enter_edit_mode(&mut self, branch: Option<&str>) -> Result<Transition, EngineError> {
        self.require_connected()?;

        let Some(branch) = branch else {
            return Ok(Transition::NeedsInput(InputRequest::BranchSelection {
                branches: self.working_branches(),
            }));
        };

        let target = BranchName::new(branch)?;
        let main = self.main_branch();
        if target.as_str() == main {
            return Err(PolicyViolation::EditMain { main }.into());
        }

        let listing = self.repo.list_branches()?;
        if listing.contains(target.as_str()) {
            self.repo.checkout(target.as_str())?;
        } else {
            self.repo.checkout_new(target.as_str())?;
        }

        let name = target.as_str().to_string();
        self.config.current_branch = name.clone();
        self.config.last_working_branch = name.clone();
        self.config.read_only_mode = false;
        self.config.available_branches.insert(name.clone());
        self.persist()?;
        info!(branch = %name, "entered edit mode");

        self.validate_and_enforce_branch_rules()?;
        Ok(Transition::Applied)
    }

    /// Return to main.
    ///
    /// With `with_save_check`, uncommitted work on a working branch stops
    /// the transition and asks what to do with it; see
    /// [`resume_save`](Self::resume_save).
    pub fn enter_read_only_mode(
        &mut self,
        with_save_check: bool,
    ) -> Result<Transition, EngineError> {
        self.require_connected()?;

        let on_main = self.config.current_branch == self.config.main_branch;
        if with_save_check && !on_main {
            let changed = self.repo.status()?;
            if !changed.is_empty() {
                return Ok(Transition::NeedsInput(InputRequest::SaveDecision {
                    branch: self.config.current_branch.clone(),
                    changed_files: changed.into_iter().map(|e| e.path).collect(),
                }));
            }
        }

        self.force_enable_read_only_mode()?;
        Ok(Transition::Applied)
    }

    /// Check out main and declare read-only mode, without asking.
    ///
    /// If the checkout fails the declared mode is rolled back, so the
    /// record never claims read-only while off main.
    pub fn force_enable_read_only_mode(&mut self) -> Result<(), EngineError> {
        self.require_connected()?;

        let prior = self.config.read_only_mode;
        let main = self.main_branch();
        self.config.read_only_mode = true;
        if let Err(e) = self.repo.checkout(&main) {
            self.config.read_only_mode = prior;
            warn!(error = %e, "checkout of main failed, mode unchanged");
            return Err(e.into());
        }

        self.config.current_branch = main.clone();
        self.persist()?;
        info!(branch = %main, "entered read-only mode");

        self.validate_and_enforce_branch_rules()
    }

    /// Check out another branch within the current mode.
    ///
    /// Read-only mode only allows main; edit mode never allows it.
    pub fn switch_to_branch(&mut self, name: &str) -> Result<Transition, EngineError> {
        self.require_connected()?;

        let target = BranchName::new(name)?;
        let main = self.main_branch();
        let to_main = target.as_str() == main;

        if self.config.read_only_mode && !to_main {
            return Err(PolicyViolation::SwitchOffMain {
                branch: target.into(),
                main,
            }
            .into());
        }
        if !self.config.read_only_mode && to_main {
            return Err(PolicyViolation::SwitchToMain { main }.into());
        }

        self.repo.checkout(target.as_str())?;

        let name = target.as_str().to_string();
        self.config.current_branch = name.clone();
        if !self.config.read_only_mode {
            self.config.last_working_branch = name.clone();
        }
        self.config.available_branches.insert(name.clone());
        self.persist()?;
        info!(branch = %name, "switched branch");

        self.validate_and_enforce_branch_rules()?;
        Ok(Transition::Applied)
    }

    /// Create a working branch from the current HEAD and check it out.
    ///
    /// Only allowed while editing; from read-only mode use
    /// [`enter_edit_mode`](Self::enter_edit_mode) with the new name.
    pub fn create_new_branch(&mut self, name: &str) -> Result<(), EngineError> {
        self.require_connected()?;
        if self.config.read_only_mode {
            return Err(PolicyViolation::NotEditing {
                action: "create a branch",
            }
            .into());
        }

        let branch = BranchName::new(name)?;
        let main = self.main_branch();
        if branch.as_str() == main {
            return Err(PolicyViolation::EditMain { main }.into());
        }

        self.repo.checkout_new(branch.as_str())?;

        let name: String = branch.into();
        self.config.current_branch = name.clone();
        self.config.last_working_branch = name.clone();
        self.config.available_branches.insert(name.clone());
        self.persist()?;
        info!(branch = %name, "created branch");

        self.validate_and_enforce_branch_rules()
    }

    /// Re-read local and remote branch names into the record.
    pub fn refresh_branches(&mut self) -> Result<Vec<String>, EngineError> {
        self.require_connected()?;
        let listing = self.repo.list_branches()?;
        self.config.available_branches = listing.all();
        self.persist()?;
        Ok(self.config.available_branches.iter().cloned().collect())
    }

    /// Delete a local branch other than main and the checked-out one.
    pub fn delete_branch(&mut self, name: &str) -> Result<(), EngineError> {
        self.require_connected()?;

        let main = self.main_branch();
        if name == main {
            return Err(PolicyViolation::DeleteMain { main }.into());
        }
        if name == self.config.current_branch {
            return Err(PolicyViolation::DeleteCurrent {
                branch: name.to_string(),
            }
            .into());
        }

        self.repo.delete_branch(name)?;
        info!(branch = %name, "deleted branch");

        // A remote copy keeps the name available.
        let listing = self.repo.list_branches()?;
        self.config.available_branches = listing.all();
        if self.config.last_working_branch == name && !listing.contains(name) {
            self.config.last_working_branch.clear();
        }
        self.persist()
    }

    /// Rename the checked-out working branch.
    pub fn rename_branch(&mut self, from: &str, to: &str) -> Result<(), EngineError> {
        self.require_connected()?;
        if self.config.read_only_mode {
            return Err(PolicyViolation::NotEditing {
                action: "rename a branch",
            }
            .into());
        }
        if from != self.config.current_branch {
            return Err(PolicyViolation::RenameNotCurrent {
                current: self.config.current_branch.clone(),
            }
            .into());
        }

        let new_name = BranchName::new(to)?;
        let main = self.main_branch();
        if new_name.as_str() == main {
            return Err(PolicyViolation::EditMain { main }.into());
        }

        self.repo.rename_current_branch(new_name.as_str())?;

        let name: String = new_name.into();
        self.config.available_branches.remove(from);
        self.config.available_branches.insert(name.clone());
        self.config.current_branch = name.clone();
        self.config.last_working_branch = name.clone();
        self.persist()?;
        info!(from = %from, to = %name, "renamed branch");

        self.validate_and_enforce_branch_rules()
    }

    /// Bring main up to date with the remote.
    ///
    /// Runs under the bulk-mutation guard, so file watchers can ignore the
    /// burst of changes.
    pub fn pull_main(&mut self) -> Result<(), EngineError> {
        self.require_connected()?;
        if !self.config.read_only_mode {
            return Err(PolicyViolation::NotReadOnly {
                action: "update main",
            }
            .into());
        }

        let main = self.main_branch();
        {
            let _guard = self.flag.begin()?;
            self.repo.pull(&main)?;
        }

        self.config.last_synced_at = Some(chrono::Utc::now());
        self.persist()?;
        info!(branch = %main, "pulled main");

        self.validate_and_enforce_branch_rules()
    }
}
