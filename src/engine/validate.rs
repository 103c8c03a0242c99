//! engine::validate
//!
//! Reconciles the workspace record with the repository.
//!
//! The checked-out branch reported by git is the source of truth. The
//! validator is idempotent and is the only self-healing path in the engine:
//!
//! | declared  | actual branch | action                                 |
//! |-----------|---------------|----------------------------------------|
//! | read-only | not main      | checkout main (read-only wins)         |
//! | editing   | main          | declare read-only, informational notice |
//! | any       | detached      | warning notice, nothing changes        |
//! | otherwise |               | record the actual branch               |
//!
//! Before that, the configured main branch is replaced by the remote's
//! `origin/HEAD` when the two differ. Without an `origin/HEAD`, a configured
//! main branch that exists neither locally nor on the remote is replaced by
//! `main` or `master`.

use tracing::{info, warn};

use super::{EngineError, Notice, Workspace};
use crate::git::BranchListing;

/// The branch a repository most likely treats as its main line.
pub(crate) fn detect_main_branch(listing: &BranchListing) -> Option<String> {
    if let Some(head) = listing
        .remote_head
        .as_ref()
        .filter(|h| listing.contains(h))
    {
        return Some(head.clone());
    }
    ["main", "master"]
        .into_iter()
        .find(|name| listing.contains(name))
        .map(str::to_string)
}

/// The main branch to adopt instead of `configured`, if any.
///
/// The remote's `origin/HEAD` wins whenever it names a listed branch. Without
/// one, a configured branch that no longer exists falls back to detection.
fn corrected_main_branch(listing: &BranchListing, configured: &str) -> Option<String> {
    let detected = match listing.remote_head.as_deref().filter(|h| listing.contains(h)) {
        Some(head) => Some(head.to_string()),
        None if !listing.contains(configured) => detect_main_branch(listing),
        None => None,
    };
    detected.filter(|d| d != configured)
}

impl Workspace {
    /// Bring the record in line with the repository.
    ///
    /// Does nothing for a disconnected workspace. Never touches uncommitted
    /// content: the only git mutation it may perform is `checkout <main>`.
    pub fn validate_and_enforce_branch_rules(&mut self) -> Result<(), EngineError> {
        if !self.config.is_repository_connected {
            return Ok(());
        }

        let Some(actual) = self.repo.current_branch()? else {
            warn!("HEAD is detached, skipping branch validation");
            self.notices.push(Notice::warning(
                "HEAD is detached; check out a branch so vaultgate can track the mode.",
            ));
            return Ok(());
        };

        let mut changed = false;

        let listing = self.repo.list_branches()?;
        if let Some(detected) = corrected_main_branch(&listing, &self.config.main_branch) {
            warn!(
                configured = %self.config.main_branch,
                detected = %detected,
                "configured main branch differs from repository default"
            );
            self.notices.push(Notice::info(format!(
                "Main branch '{}' does not match the repository; using '{}'.",
                self.config.main_branch, detected
            )));
            if self.config.read_only_mode {
                self.config.current_branch = detected.clone();
            }
            self.config.main_branch = detected;
            changed = true;
        }

        let main = self.config.main_branch.clone();
        if self.config.read_only_mode && actual != main {
            warn!(actual = %actual, main = %main, "read-only mode off main, checking out main");
            if let Err(e) = self.repo.checkout(&main) {
                if changed {
                    self.persist()?;
                }
                return Err(e.into());
            }
            self.notices.push(Notice::info(format!(
                "Read-only mode: moved from '{}' back to '{}'.",
                actual, main
            )));
            self.config.current_branch = main;
            changed = true;
        } else if !self.config.read_only_mode && actual == main {
            info!(main = %main, "edit mode on main, switching to read-only");
            self.notices.push(Notice::info(format!(
                "'{}' is read-only; switched to read-only mode.",
                main
            )));
            self.config.read_only_mode = true;
            self.config.current_branch = main;
            changed = true;
        } else if self.config.current_branch != actual {
            info!(
                recorded = %self.config.current_branch,
                actual = %actual,
                "recorded branch out of date"
            );
            if !self.config.read_only_mode {
                self.config.last_working_branch = actual.clone();
            }
            self.config.available_branches.insert(actual.clone());
            self.config.current_branch = actual;
            changed = true;
        }

        if changed {
            self.persist()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{MemoryConfigStore, RepositoryConfig};
    use crate::engine::{Mode, NoticeLevel};
    use crate::git::mock::{FailOn, MockOperation, MockRepository};
    use crate::git::GitError;

    fn record(main: &str, current: &str, read_only: bool) -> RepositoryConfig {
        RepositoryConfig {
            repository_url: "https://github.com/owner/vault.git".into(),
            is_repository_connected: true,
            main_branch: main.into(),
            current_branch: current.into(),
            read_only_mode: read_only,
            ..RepositoryConfig::default()
        }
    }

    fn unvalidated(repo: &MockRepository, config: RepositoryConfig) -> (Workspace, MemoryConfigStore) {
        let store = MemoryConfigStore::with_config(config);
        let ws = Workspace::new(Box::new(repo.clone()), Box::new(store.clone()));
        (ws, store)
    }

    #[test]
    fn editing_on_main_flips_to_read_only() {
        let repo = MockRepository::new("/vault");
        let (mut ws, store) = unvalidated(&repo, record("main", "feature/x", false));

        ws.validate_and_enforce_branch_rules().unwrap();

        assert_eq!(ws.mode(), Mode::ReadOnlyOnMain);
        assert_eq!(ws.config().current_branch, "main");
        let notices = ws.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Info);
        assert!(store.snapshot().unwrap().read_only_mode);
    }

    #[test]
    fn read_only_off_main_checks_out_main() {
        let repo = MockRepository::new("/vault").on_branch("stray");
        let (mut ws, _) = unvalidated(&repo, record("main", "main", true));

        ws.validate_and_enforce_branch_rules().unwrap();

        assert_eq!(repo.current().as_deref(), Some("main"));
        assert_eq!(ws.config().current_branch, "main");
        assert!(ws.config().read_only_mode);
    }

    #[test]
    fn read_only_checkout_failure_stays_read_only() {
        let repo = MockRepository::new("/vault")
            .on_branch("stray")
            .fail_on(FailOn::Checkout(None, GitError::Io("index.lock exists".into())));
        let (mut ws, _) = unvalidated(&repo, record("main", "main", true));

        assert!(ws.validate_and_enforce_branch_rules().is_err());
        assert!(ws.config().read_only_mode);
    }

    #[test]
    fn syncs_recorded_working_branch() {
        let repo = MockRepository::new("/vault").on_branch("b");
        let (mut ws, _) = unvalidated(&repo, record("main", "a", false));

        ws.validate_and_enforce_branch_rules().unwrap();

        assert_eq!(ws.config().current_branch, "b");
        assert_eq!(ws.config().last_working_branch, "b");
        assert!(ws.take_notices().is_empty());
    }

    #[test]
    fn detached_head_only_warns() {
        let repo = MockRepository::new("/vault").detached();
        let before = record("main", "a", false);
        let (mut ws, store) = unvalidated(&repo, before.clone());

        ws.validate_and_enforce_branch_rules().unwrap();

        assert_eq!(ws.config(), &before);
        assert_eq!(store.saves(), 0);
        assert!(repo.mutations().is_empty());
        assert_eq!(ws.take_notices()[0].level, NoticeLevel::Warning);
    }

    #[test]
    fn corrects_missing_main_branch() {
        let repo = MockRepository::new("/vault");
        let (mut ws, _) = unvalidated(&repo, record("master", "master", true));

        ws.validate_and_enforce_branch_rules().unwrap();

        assert_eq!(ws.config().main_branch, "main");
        assert_eq!(ws.config().current_branch, "main");
        assert!(ws.config().is_consistent());
        assert!(!repo
            .operations()
            .iter()
            .any(|op| matches!(op, MockOperation::Checkout { .. })));
    }

    #[test]
    fn adopts_remote_default_over_stale_main() {
        let repo = MockRepository::new("/vault")
            .with_local_branches(&["master"])
            .with_remote_branches(&["master"])
            .on_branch("master");
        let (mut ws, store) = unvalidated(&repo, record("master", "master", true));

        ws.validate_and_enforce_branch_rules().unwrap();

        assert_eq!(ws.config().main_branch, "main");
        assert_eq!(ws.config().current_branch, "main");
        assert_eq!(repo.current().as_deref(), Some("main"));
        assert!(repo.operations().contains(&MockOperation::Checkout {
            branch: "main".into()
        }));
        assert!(ws.config().is_consistent());
        assert_eq!(store.snapshot().unwrap().main_branch, "main");
        assert!(ws
            .take_notices()
            .iter()
            .any(|n| n.message.contains("using 'main'")));
    }

    #[test]
    fn keeps_existing_main_without_remote_default() {
        let repo = MockRepository::new("/vault")
            .with_local_branches(&["master"])
            .with_remote_default(None);
        let (mut ws, _) = unvalidated(&repo, record("master", "master", true));

        ws.validate_and_enforce_branch_rules().unwrap();

        assert_eq!(ws.config().main_branch, "master");
        assert_eq!(repo.current().as_deref(), Some("master"));
    }

    #[test]
    fn idempotent() {
        let repo = MockRepository::new("/vault").on_branch("stray");
        let (mut ws, store) = unvalidated(&repo, record("main", "main", true));

        ws.validate_and_enforce_branch_rules().unwrap();
        let saves = store.saves();
        let state = ws.config().clone();
        ws.validate_and_enforce_branch_rules().unwrap();

        assert_eq!(ws.config(), &state);
        assert_eq!(store.saves(), saves);
    }

    #[test]
    fn disconnected_does_nothing() {
        let repo = MockRepository::new("/vault");
        let (mut ws, _) = unvalidated(&repo, RepositoryConfig::default());
        ws.validate_and_enforce_branch_rules().unwrap();
        assert!(repo.operations().is_empty());
    }

    #[test]
    fn detect_prefers_remote_head() {
        let listing = BranchListing {
            local: ["master".to_string(), "trunk".to_string()].into_iter().collect(),
            remote: ["trunk".to_string()].into_iter().collect(),
            remote_head: Some("trunk".into()),
        };
        assert_eq!(detect_main_branch(&listing).as_deref(), Some("trunk"));

        let listing = BranchListing {
            remote_head: None,
            ..listing
        };
        assert_eq!(detect_main_branch(&listing).as_deref(), Some("master"));
        assert_eq!(detect_main_branch(&BranchListing::default()), None);
    }
}
