//! engine::publish
//!
//! Saving work from a working branch: as a local draft commit, or pushed
//! to the remote. Both end in read-only mode on main, and both skip the
//! commit when the tree is clean.
//!
//! # Push safety
//!
//! ```text
//! commit (if dirty) → ls-remote (new?) → fetch → [pull if behind] → push → read-only
//! ```
//!
//! A branch that is behind its remote copy is pulled first under the bulk
//! mutation guard. If that pull fails nothing is pushed and the user stays
//! on the branch to resolve it.

use tracing::{info, warn};

use super::{EngineError, Notice, PolicyViolation, SaveDecision, Workspace};

/// Result of a successful push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOutcome {
    /// The branch that was pushed
    pub pushed_branch: String,
    /// The branch did not exist on the remote before, so a pull request
    /// is worth offering
    pub offer_pull_request: bool,
    /// Whether a commit was made before pushing
    pub committed: bool,
}

/// Result of [`Workspace::resume_save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Drafted,
    Published(PublishOutcome),
}

impl Workspace {
    fn working_branch_for_save(&self) -> Result<String, EngineError> {
        self.require_connected()?;
        let branch = self.config.current_branch.clone();
        if branch == self.config.main_branch {
            return Err(PolicyViolation::SaveOnMain {
                main: self.config.main_branch.clone(),
            }
            .into());
        }
        Ok(branch)
    }

    /// Commit everything locally, then return to main.
    ///
    /// A clean tree skips the commit and only returns to main. If the
    /// commit fails nothing else happens.
    pub fn save_as_draft(&mut self, message: &str) -> Result<(), EngineError> {
        let branch = self.working_branch_for_save()?;

        if self.repo.has_uncommitted_changes()? {
            self.repo.commit_all(require_message(message)?)?;
            info!(branch = %branch, "saved draft");
            self.notices
                .push(Notice::info(format!("Saved a draft on '{}'.", branch)));
        } else {
            info!(branch = %branch, "nothing to commit for draft");
            self.notices
                .push(Notice::info(format!("Nothing to save on '{}'.", branch)));
        }

        self.force_enable_read_only_mode()
    }

    /// Commit (when there is anything to commit), push, then return to main.
    ///
    /// # Errors
    ///
    /// - `Policy(SaveOnMain)` on main
    /// - `PushConflict` when the branch is behind and pulling it fails;
    ///   no push is attempted
    /// - `Git` when the push itself fails; the workspace stays on the branch
    pub fn save_and_push(&mut self, message: &str) -> Result<PublishOutcome, EngineError> {
        let branch = self.working_branch_for_save()?;

        let committed = if self.repo.has_uncommitted_changes()? {
            self.repo.commit_all(require_message(message)?)?;
            true
        } else {
            false
        };

        let is_new_branch = !self.repo.remote_branch_exists(&branch)?;
        self.repo.fetch()?;

        if !is_new_branch {
            let behind = self.repo.behind_count(&branch)?;
            if behind > 0 {
                info!(branch = %branch, behind, "branch behind remote, pulling before push");
                let _guard = self.flag.begin()?;
                self.repo
                    .pull(&branch)
                    .map_err(|e| EngineError::PushConflict {
                        branch: branch.clone(),
                        message: e.to_string(),
                    })?;
            }
        }

        self.repo.push(&branch)?;
        info!(branch = %branch, new = is_new_branch, "pushed branch");
        self.notices
            .push(Notice::info(format!("Pushed '{}'.", branch)));

        let outcome = PublishOutcome {
            pushed_branch: branch,
            offer_pull_request: is_new_branch,
            committed,
        };

        // The push already happened; a failed checkout of main is reported
        // without losing the outcome.
        if let Err(e) = self.force_enable_read_only_mode() {
            warn!(error = %e, "could not return to main after push");
            self.notices.push(e.notice());
        }

        Ok(outcome)
    }

    /// Finish a read-only transition that stopped for a save decision.
    pub fn resume_save(&mut self, decision: SaveDecision) -> Result<SaveOutcome, EngineError> {
        match decision {
            SaveDecision::Draft(message) => {
                self.save_as_draft(&message)?;
                Ok(SaveOutcome::Drafted)
            }
            SaveDecision::Push(message) => self.save_and_push(&message).map(SaveOutcome::Published),
        }
    }
}

fn require_message(message: &str) -> Result<&str, EngineError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(EngineError::InvalidInput(
            "a commit message is required".into(),
        ));
    }
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{MemoryConfigStore, RepositoryConfig};
    use crate::engine::{InputRequest, Mode, Transition};
    use crate::git::mock::{FailOn, MockOperation, MockRepository};
    use crate::git::GitError;

    fn on_branch(repo: MockRepository, branch: &str) -> (Workspace, MockRepository) {
        let config = RepositoryConfig {
            repository_url: "https://github.com/owner/vault.git".into(),
            is_repository_connected: true,
            current_branch: branch.into(),
            last_working_branch: branch.into(),
            read_only_mode: false,
            ..RepositoryConfig::default()
        };
        let repo = repo.on_branch(branch);
        let ws = Workspace::open(
            Box::new(repo.clone()),
            Box::new(MemoryConfigStore::with_config(config)),
        );
        let repo = repo.watch(&ws.mutation_flag());
        repo.clear_operations();
        (ws, repo)
    }

    fn position(ops: &[MockOperation], pred: impl Fn(&MockOperation) -> bool) -> Option<usize> {
        ops.iter().position(pred)
    }

    #[test]
    fn draft_commits_then_goes_read_only() {
        let (mut ws, repo) = on_branch(
            MockRepository::new("/vault").with_changes(&["a.md"]),
            "feature/x",
        );

        ws.save_as_draft("wip").unwrap();

        assert!(!repo.is_dirty());
        assert_eq!(ws.mode(), Mode::ReadOnlyOnMain);
        assert!(repo
            .operations()
            .contains(&MockOperation::Commit { message: "wip".into() }));
    }

    #[test]
    fn draft_commit_failure_keeps_branch() {
        let (mut ws, repo) = on_branch(
            MockRepository::new("/vault")
                .with_changes(&["a.md"])
                .fail_on(FailOn::Commit(GitError::Io("disk full".into()))),
            "feature/x",
        );

        assert!(ws.save_as_draft("wip").is_err());
        assert_eq!(ws.mode(), Mode::EditingOnBranch("feature/x".into()));
        assert_eq!(repo.current().as_deref(), Some("feature/x"));
    }

    #[test]
    fn draft_on_clean_tree_skips_commit() {
        let (mut ws, repo) = on_branch(MockRepository::new("/vault"), "feature/x");
        ws.take_notices();

        ws.save_as_draft("").unwrap();

        assert_eq!(ws.mode(), Mode::ReadOnlyOnMain);
        assert_eq!(repo.current().as_deref(), Some("main"));
        assert!(!repo
            .operations()
            .iter()
            .any(|op| matches!(op, MockOperation::Commit { .. })));
        assert!(ws
            .take_notices()
            .iter()
            .any(|n| n.message == "Nothing to save on 'feature/x'."));
    }

    #[test]
    fn save_on_main_rejected() {
        let config = RepositoryConfig {
            is_repository_connected: true,
            ..RepositoryConfig::default()
        };
        let repo = MockRepository::new("/vault").with_changes(&["a.md"]);
        let mut ws = Workspace::open(
            Box::new(repo.clone()),
            Box::new(MemoryConfigStore::with_config(config)),
        );
        repo.clear_operations();

        assert!(matches!(
            ws.save_as_draft("x"),
            Err(EngineError::Policy(PolicyViolation::SaveOnMain { .. }))
        ));
        assert!(matches!(
            ws.save_and_push("x"),
            Err(EngineError::Policy(PolicyViolation::SaveOnMain { .. }))
        ));
        assert!(repo.operations().is_empty());
    }

    #[test]
    fn empty_message_rejected_before_commit() {
        let (mut ws, repo) = on_branch(
            MockRepository::new("/vault").with_changes(&["a.md"]),
            "feature/x",
        );
        assert!(matches!(
            ws.save_as_draft("  "),
            Err(EngineError::InvalidInput(_))
        ));
        assert!(repo.mutations().is_empty());
    }

    #[test]
    fn push_new_branch_offers_pull_request() {
        let (mut ws, repo) = on_branch(
            MockRepository::new("/vault").with_changes(&["a.md"]),
            "feature/x",
        );

        let outcome = ws.save_and_push("add notes").unwrap();

        assert_eq!(outcome.pushed_branch, "feature/x");
        assert!(outcome.offer_pull_request);
        assert!(outcome.committed);
        assert!(repo.remote_branches().contains("feature/x"));
        assert_eq!(ws.mode(), Mode::ReadOnlyOnMain);
    }

    #[test]
    fn push_clean_tree_skips_commit() {
        let (mut ws, repo) = on_branch(
            MockRepository::new("/vault").with_remote_branches(&["feature/x"]),
            "feature/x",
        );

        let outcome = ws.save_and_push("").unwrap();

        assert!(!outcome.committed);
        assert!(!outcome.offer_pull_request);
        assert!(!repo
            .operations()
            .iter()
            .any(|op| matches!(op, MockOperation::Commit { .. })));
    }

    #[test]
    fn behind_branch_pulled_before_push() {
        let (mut ws, repo) = on_branch(
            MockRepository::new("/vault")
                .with_remote_branches(&["feature/x"])
                .with_behind("feature/x", 2)
                .with_changes(&["a.md"]),
            "feature/x",
        );

        ws.save_and_push("sync").unwrap();

        let ops = repo.operations();
        let pull = position(&ops, |op| {
            *op == MockOperation::Pull {
                branch: "feature/x".into(),
                guarded: true,
            }
        })
        .expect("pull recorded");
        let push = position(&ops, |op| matches!(op, MockOperation::Push { .. })).expect("push");
        assert!(pull < push);
        assert!(!ws.mutation_flag().is_active());
    }

    #[test]
    fn failed_safety_pull_blocks_push() {
        let (mut ws, repo) = on_branch(
            MockRepository::new("/vault")
                .with_remote_branches(&["feature/x"])
                .with_behind("feature/x", 1)
                .fail_on(FailOn::Pull(GitError::CommandFailed {
                    command: "pull origin feature/x".into(),
                    message: "CONFLICT (content): Merge conflict in a.md".into(),
                })),
            "feature/x",
        );

        let err = ws.save_and_push("sync").unwrap_err();

        assert!(matches!(err, EngineError::PushConflict { ref branch, .. } if branch == "feature/x"));
        assert!(!repo
            .operations()
            .iter()
            .any(|op| matches!(op, MockOperation::Push { .. })));
        assert_eq!(ws.mode(), Mode::EditingOnBranch("feature/x".into()));
        assert!(!ws.mutation_flag().is_active());
    }

    #[test]
    fn push_failure_stays_on_branch() {
        let (mut ws, repo) = on_branch(
            MockRepository::new("/vault")
                .fail_on(FailOn::Push(GitError::Io("network unreachable".into()))),
            "feature/x",
        );

        assert!(matches!(ws.save_and_push("x"), Err(EngineError::Git(_))));
        assert_eq!(repo.current().as_deref(), Some("feature/x"));
        assert_eq!(ws.mode(), Mode::EditingOnBranch("feature/x".into()));
    }

    #[test]
    fn read_only_with_changes_then_draft() {
        let (mut ws, repo) = on_branch(
            MockRepository::new("/vault").with_changes(&["journal.md"]),
            "feature/x",
        );

        let Transition::NeedsInput(InputRequest::SaveDecision { branch, .. }) =
            ws.enter_read_only_mode(true).unwrap()
        else {
            panic!("expected a save decision");
        };
        assert_eq!(branch, "feature/x");

        let outcome = ws.resume_save(SaveDecision::Draft("wip".into())).unwrap();

        assert_eq!(outcome, SaveOutcome::Drafted);
        assert_eq!(ws.mode(), Mode::ReadOnlyOnMain);
        assert_eq!(repo.current().as_deref(), Some("main"));
        let ops = repo.operations();
        let commit = position(&ops, |op| matches!(op, MockOperation::Commit { .. })).unwrap();
        let checkout = position(&ops, |op| {
            *op == MockOperation::Checkout {
                branch: "main".into(),
            }
        })
        .unwrap();
        assert!(commit < checkout);
    }

    #[test]
    fn resume_push_publishes() {
        let (mut ws, _) = on_branch(
            MockRepository::new("/vault").with_changes(&["a.md"]),
            "feature/x",
        );
        let outcome = ws.resume_save(SaveDecision::Push("done".into())).unwrap();
        assert!(matches!(outcome, SaveOutcome::Published(p) if p.offer_pull_request));
    }
}
