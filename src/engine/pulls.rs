//! engine::pulls
//!
//! Pull request lifecycle: create, list, merge and close.
//!
//! Only `merge` touches local state. After a successful merge it waits for
//! the host to settle, returns the workspace to read-only mode and pulls
//! main. A failure in that follow-up never turns the merge itself into an
//! error; it is reported in [`MergeOutcome::sync`].

use std::time::Duration;

use tracing::{debug, info, warn};

use super::{EngineError, InputRequest, Notice, PolicyViolation, Transition, Workspace};
use crate::core::config::Config;
use crate::credentials::Credentials;
use crate::forge::{create_forge, CreatePrRequest, Forge, MergeMethod, PullRequest};

/// How the local main caught up after a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncResult {
    /// Read-only mode entered and main pulled.
    Synced,
    /// Uncommitted work blocked the read-only transition.
    NeedsInput(InputRequest),
    /// The transition or the pull failed.
    Failed(String),
}

/// Result of a successful merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub number: u64,
    pub sync: SyncResult,
}

/// Pull request operations against one repository.
pub struct PullRequests {
    forge: Box<dyn Forge>,
    main_branch: String,
    post_merge_delay: Duration,
}

impl std::fmt::Debug for PullRequests {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PullRequests")
            .field("forge", &self.forge.name())
            .field("main_branch", &self.main_branch)
            .field("post_merge_delay", &self.post_merge_delay)
            .finish()
    }
}

impl PullRequests {
    pub fn new(forge: Box<dyn Forge>, main_branch: impl Into<String>, post_merge_delay: Duration) -> Self {
        Self {
            forge,
            main_branch: main_branch.into(),
            post_merge_delay,
        }
    }

    /// Build from a connected workspace.
    ///
    /// `explicit_token` wins over the stored credential. Without either,
    /// the forge still builds, and every call fails with `AuthRequired`.
    pub fn for_workspace(
        ws: &Workspace,
        credentials: &Credentials,
        explicit_token: Option<&str>,
        config: &Config,
    ) -> Result<Self, EngineError> {
        ws.require_connected()?;
        let url = &ws.config().repository_url;
        let token = credentials.resolve(url, explicit_token)?;
        let forge = create_forge(url, token, config.api_base())?;
        Ok(Self::new(
            forge,
            ws.config().main_branch.clone(),
            config.post_merge_delay(),
        ))
    }

    /// Open a pull request from `branch` into main.
    ///
    /// An empty title falls back to the branch name.
    pub async fn create(
        &self,
        branch: &str,
        title: &str,
        body: Option<&str>,
    ) -> Result<PullRequest, EngineError> {
        if branch == self.main_branch {
            return Err(PolicyViolation::PullRequestFromMain {
                main: self.main_branch.clone(),
            }
            .into());
        }

        let title = match title.trim() {
            "" => branch.to_string(),
            t => t.to_string(),
        };
        let pr = self
            .forge
            .create_pr(CreatePrRequest {
                head: branch.to_string(),
                base: self.main_branch.clone(),
                title,
                body: body.map(str::to_string).filter(|b| !b.trim().is_empty()),
            })
            .await?;
        info!(number = pr.number, head = %pr.head, "created pull request");
        Ok(pr)
    }

    /// Open pull requests, each with its mergeability.
    ///
    /// The list endpoint does not compute mergeability, so every PR is
    /// fetched on its own. A PR whose detail fetch fails is kept with
    /// `Mergeable::Unknown`.
    pub async fn list(&self) -> Result<Vec<PullRequest>, EngineError> {
        let listed = self.forge.list_open_prs().await?;
        let mut prs = Vec::with_capacity(listed.len());
        for pr in listed {
            match self.forge.get_pr(pr.number).await {
                Ok(detail) => prs.push(detail),
                Err(e) => {
                    debug!(number = pr.number, error = %e, "pull request detail unavailable");
                    prs.push(pr);
                }
            }
        }
        Ok(prs)
    }

    /// Merge a pull request, then bring the workspace back to an updated main.
    pub async fn merge(
        &self,
        ws: &mut Workspace,
        number: u64,
        method: MergeMethod,
    ) -> Result<MergeOutcome, EngineError> {
        self.forge.merge_pr(number, method).await?;
        info!(number, method = %method.as_str(), "merged pull request");

        tokio::time::sleep(self.post_merge_delay).await;

        let sync = match ws.enter_read_only_mode(true) {
            Ok(Transition::Applied) => match ws.pull_main() {
                Ok(()) => SyncResult::Synced,
                Err(e) => SyncResult::Failed(e.to_string()),
            },
            Ok(Transition::NeedsInput(request)) => SyncResult::NeedsInput(request),
            Err(e) => SyncResult::Failed(e.to_string()),
        };

        match &sync {
            SyncResult::Synced => ws.push_notice(Notice::info(format!(
                "Merged #{} and updated '{}'.",
                number, self.main_branch
            ))),
            SyncResult::NeedsInput(_) => ws.push_notice(Notice::info(format!(
                "Merged #{}; save or discard local changes to update '{}'.",
                number, self.main_branch
            ))),
            SyncResult::Failed(message) => {
                warn!(number, error = %message, "post-merge sync failed");
                ws.push_notice(Notice::warning(format!(
                    "Merged #{}, but updating '{}' failed: {}",
                    number, self.main_branch, message
                )));
            }
        }

        Ok(MergeOutcome { number, sync })
    }

    /// Close a pull request without merging.
    pub async fn close(&self, number: u64) -> Result<(), EngineError> {
        self.forge.close_pr(number).await?;
        info!(number, "closed pull request");
        Ok(())
    }
}
