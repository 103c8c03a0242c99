//! forge::mock
//!
//! Mock forge implementation for deterministic testing.
//!
//! # Design
//!
//! The mock forge stores PRs in memory, records every call, and can be
//! configured to fail a specific operation. Merged and closed PRs leave
//! the open set, so a follow-up `list_open_prs` reflects them.
//!
//! # Example
//!
//! ```
//! use vaultgate::forge::mock::MockForge;
//! use vaultgate::forge::{CreatePrRequest, Forge};
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new();
//!
//! let pr = forge.create_pr(CreatePrRequest {
//!     head: "notes/x".to_string(),
//!     base: "main".to_string(),
//!     title: "Add notes".to_string(),
//!     body: None,
//! }).await.unwrap();
//!
//! assert_eq!(pr.number, 1);
//! assert_eq!(forge.get_pr(1).await.unwrap().title, "Add notes");
//! # });
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::traits::{
    CreatePrRequest, Forge, ForgeError, Mergeable, MergeMethod, PullRequest, Visibility,
};

/// Mock forge for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Debug, Clone)]
pub struct MockForge {
    inner: Arc<Mutex<MockForgeInner>>,
}

#[derive(Debug)]
struct MockForgeInner {
    /// Open PRs by number.
    prs: BTreeMap<u64, PullRequest>,
    next_pr_number: u64,
    visibility: Visibility,
    fail_on: Option<FailOn>,
    operations: Vec<MockOperation>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    CreatePr(ForgeError),
    ListOpenPrs(ForgeError),
    GetPr(ForgeError),
    MergePr(ForgeError),
    ClosePr(ForgeError),
    Visibility(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    CreatePr { head: String, base: String, title: String },
    ListOpenPrs,
    GetPr { number: u64 },
    MergePr { number: u64, method: MergeMethod },
    ClosePr { number: u64 },
    Visibility,
}

impl MockForge {
    /// Create a new empty mock forge for a public repository.
    pub fn new() -> Self {
        Self::with_prs(Vec::new())
    }

    /// Create a mock forge with pre-existing open PRs.
    pub fn with_prs(prs: Vec<PullRequest>) -> Self {
        let max_number = prs.iter().map(|p| p.number).max().unwrap_or(0);
        Self {
            inner: Arc::new(Mutex::new(MockForgeInner {
                prs: prs.into_iter().map(|p| (p.number, p)).collect(),
                next_pr_number: max_number + 1,
                visibility: Visibility::Public,
                fail_on: None,
                operations: Vec::new(),
            })),
        }
    }

    /// Report the repository as `visibility`.
    pub fn with_visibility(self, visibility: Visibility) -> Self {
        self.inner.lock().unwrap().visibility = visibility;
        self
    }

    /// Configure the mock to fail on a specific operation.
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.inner.lock().unwrap().fail_on = Some(fail_on);
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.inner.lock().unwrap().fail_on = None;
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.inner.lock().unwrap().operations.clone()
    }

    /// Number of PRs still open.
    pub fn open_count(&self) -> usize {
        self.inner.lock().unwrap().prs.len()
    }

    /// A PR in the same shape the GitHub client returns.
    pub fn sample_pr(number: u64, head: &str, mergeable: Mergeable) -> PullRequest {
        PullRequest {
            number,
            title: format!("Update {}", head),
            body: None,
            head: head.to_string(),
            base: "main".to_string(),
            author: "octocat".to_string(),
            mergeable,
            html_url: format!("https://github.com/owner/vault/pull/{}", number),
        }
    }

    fn record(&self, op: MockOperation) {
        self.inner.lock().unwrap().operations.push(op);
    }

    fn check_fail(&self, matcher: impl Fn(&FailOn) -> Option<&ForgeError>) -> Result<(), ForgeError> {
        let inner = self.inner.lock().unwrap();
        match inner.fail_on.as_ref().and_then(matcher) {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    fn take_open(&self, number: u64) -> Result<PullRequest, ForgeError> {
        self.inner
            .lock()
            .unwrap()
            .prs
            .remove(&number)
            .ok_or_else(|| ForgeError::NotFound(format!("PR #{}", number)))
    }
}

impl Default for MockForge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_pr(&self, request: CreatePrRequest) -> Result<PullRequest, ForgeError> {
        self.record(MockOperation::CreatePr {
            head: request.head.clone(),
            base: request.base.clone(),
            title: request.title.clone(),
        });
        self.check_fail(|f| match f {
            FailOn::CreatePr(e) => Some(e),
            _ => None,
        })?;

        let mut inner = self.inner.lock().unwrap();
        if inner.prs.values().any(|p| p.head == request.head) {
            return Err(ForgeError::ApiError {
                status: 422,
                message: format!(
                    "Validation Failed: A pull request already exists for owner:{}.",
                    request.head
                ),
            });
        }

        let number = inner.next_pr_number;
        inner.next_pr_number += 1;
        let pr = PullRequest {
            title: request.title,
            body: request.body,
            base: request.base,
            ..Self::sample_pr(number, &request.head, Mergeable::Unknown)
        };
        inner.prs.insert(number, pr.clone());
        Ok(pr)
    }

    async fn list_open_prs(&self) -> Result<Vec<PullRequest>, ForgeError> {
        self.record(MockOperation::ListOpenPrs);
        self.check_fail(|f| match f {
            FailOn::ListOpenPrs(e) => Some(e),
            _ => None,
        })?;

        // Like the list endpoint: newest first, mergeability not computed
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .prs
            .values()
            .rev()
            .cloned()
            .map(|p| PullRequest {
                mergeable: Mergeable::Unknown,
                ..p
            })
            .collect())
    }

    async fn get_pr(&self, number: u64) -> Result<PullRequest, ForgeError> {
        self.record(MockOperation::GetPr { number });
        self.check_fail(|f| match f {
            FailOn::GetPr(e) => Some(e),
            _ => None,
        })?;

        self.inner
            .lock()
            .unwrap()
            .prs
            .get(&number)
            .cloned()
            .ok_or_else(|| ForgeError::NotFound(format!("PR #{}", number)))
    }

    async fn merge_pr(&self, number: u64, method: MergeMethod) -> Result<(), ForgeError> {
        self.record(MockOperation::MergePr { number, method });
        self.check_fail(|f| match f {
            FailOn::MergePr(e) => Some(e),
            _ => None,
        })?;

        let pr = self.take_open(number)?;
        if pr.mergeable == Mergeable::Conflicting {
            self.inner.lock().unwrap().prs.insert(number, pr);
            return Err(ForgeError::ApiError {
                status: 405,
                message: "Pull Request is not mergeable".into(),
            });
        }
        Ok(())
    }

    async fn close_pr(&self, number: u64) -> Result<(), ForgeError> {
        self.record(MockOperation::ClosePr { number });
        self.check_fail(|f| match f {
            FailOn::ClosePr(e) => Some(e),
            _ => None,
        })?;
        self.take_open(number).map(|_| ())
    }

    async fn repository_visibility(&self) -> Result<Visibility, ForgeError> {
        self.record(MockOperation::Visibility);
        self.check_fail(|f| match f {
            FailOn::Visibility(e) => Some(e),
            _ => None,
        })?;
        Ok(self.inner.lock().unwrap().visibility)
    }
}
