//! forge::traits
//!
//! Forge trait definition for the hosted repository's REST API.
//!
//! # Design
//!
//! The `Forge` trait is async because every operation is a network round
//! trip. It covers exactly what vaultgate needs from the host: the pull
//! request lifecycle (create, list, inspect, merge, close) and the
//! repository visibility query used during setup.
//!
//! A forge never touches the working tree. Callers decide what local
//! follow-up (if any) a remote result triggers.
//!
//! # Example
//!
//! ```ignore
//! use vaultgate::forge::{CreatePrRequest, Forge};
//!
//! async fn open_pr(forge: &dyn Forge) -> Result<(), ForgeError> {
//!     let pr = forge
//!         .create_pr(CreatePrRequest {
//!             head: "notes/weekly".into(),
//!             base: "main".into(),
//!             title: "Weekly notes".into(),
//!             body: None,
//!         })
//!         .await?;
//!     println!("Created PR #{}: {}", pr.number, pr.html_url);
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from forge operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForgeError {
    /// No token could be resolved for a call that needs one.
    #[error("authentication required; run `vg auth` to store a token")]
    AuthRequired,

    /// The token was rejected or lacks permission.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// The API answered with an error; `message` is the remote's text.
    #[error("{message} (HTTP {status})")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The remote URL does not point at a supported host.
    #[error("unsupported remote: {0}")]
    UnsupportedRemote(String),
}

/// Request to create a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePrRequest {
    /// Branch with the changes
    pub head: String,
    /// Branch to merge into
    pub base: String,
    pub title: String,
    pub body: Option<String>,
}

/// Whether the host can merge a pull request cleanly.
///
/// GitHub computes this lazily; `null` in the API means "not yet known".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mergeable {
    Clean,
    Conflicting,
    #[default]
    Unknown,
}

impl From<Option<bool>> for Mergeable {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Mergeable::Clean,
            Some(false) => Mergeable::Conflicting,
            None => Mergeable::Unknown,
        }
    }
}

impl fmt::Display for Mergeable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mergeable::Clean => write!(f, "mergeable"),
            Mergeable::Conflicting => write!(f, "conflicts"),
            Mergeable::Unknown => write!(f, "checking"),
        }
    }
}

/// Pull request information returned from the forge.
///
/// Not persisted; re-fetched whenever it is shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    /// Head branch name
    pub head: String,
    /// Base branch name
    pub base: String,
    /// Login of the user who opened it
    pub author: String,
    pub mergeable: Mergeable,
    /// Web URL for viewing
    pub html_url: String,
}

/// Merge method for merging a PR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMethod {
    /// Create a merge commit
    #[default]
    Merge,
    /// Squash all commits and merge
    Squash,
    /// Rebase commits onto base branch
    Rebase,
}

impl MergeMethod {
    /// Value of the API's `merge_method` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeMethod::Merge => "merge",
            MergeMethod::Squash => "squash",
            MergeMethod::Rebase => "rebase",
        }
    }
}

impl fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "merge" => Ok(MergeMethod::Merge),
            "squash" => Ok(MergeMethod::Squash),
            "rebase" => Ok(MergeMethod::Rebase),
            other => Err(format!(
                "unknown merge method '{}' (valid: merge, squash, rebase)",
                other
            )),
        }
    }
}

/// Repository visibility as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    /// Whether anonymous clones and reads are possible.
    pub fn is_public(&self) -> bool {
        matches!(self, Visibility::Public)
    }
}

/// The Forge trait for interacting with the repository host.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// All methods return `Result<T, ForgeError>`. Callers should handle:
/// - `AuthRequired` / `AuthFailed`: Prompt user to authenticate
/// - `NotFound`: Resource doesn't exist
/// - `ApiError`: Display the remote's message verbatim
/// - `NetworkError`: Check connectivity
///
/// Nothing here retries.
#[async_trait]
pub trait Forge: Send + Sync {
    /// Get the forge name (e.g., "github").
    fn name(&self) -> &'static str;

    /// Open a pull request.
    ///
    /// # Errors
    ///
    /// - `AuthRequired` if no token is configured
    /// - `ApiError` with status 422 if validation fails (e.g. a PR for the
    ///   head already exists, or head has no commits over base)
    async fn create_pr(&self, request: CreatePrRequest) -> Result<PullRequest, ForgeError>;

    /// Open pull requests, newest first.
    ///
    /// The list endpoint does not compute mergeability, so entries carry
    /// [`Mergeable::Unknown`] unless the implementation fetches each one.
    async fn list_open_prs(&self) -> Result<Vec<PullRequest>, ForgeError>;

    /// A single pull request, including its mergeability.
    async fn get_pr(&self, number: u64) -> Result<PullRequest, ForgeError>;

    /// Merge a pull request.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the PR doesn't exist
    /// - `ApiError` if merge fails (conflicts, required checks failing)
    async fn merge_pr(&self, number: u64, method: MergeMethod) -> Result<(), ForgeError>;

    /// Close a pull request without merging.
    async fn close_pr(&self, number: u64) -> Result<(), ForgeError>;

    /// Whether the repository is public or private.
    ///
    /// Works without a token for public repositories. Without a token a
    /// private repository answers 404, which is reported as
    /// [`Visibility::Private`].
    async fn repository_visibility(&self) -> Result<Visibility, ForgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mergeable_from_api_value() {
        assert_eq!(Mergeable::from(Some(true)), Mergeable::Clean);
        assert_eq!(Mergeable::from(Some(false)), Mergeable::Conflicting);
        assert_eq!(Mergeable::from(None), Mergeable::Unknown);
    }

    #[test]
    fn merge_method_parse_and_display() {
        for method in [MergeMethod::Merge, MergeMethod::Squash, MergeMethod::Rebase] {
            assert_eq!(method.to_string().parse::<MergeMethod>(), Ok(method));
        }
        assert_eq!("SQUASH".parse::<MergeMethod>(), Ok(MergeMethod::Squash));
        assert!("fast-forward".parse::<MergeMethod>().is_err());
        assert_eq!(MergeMethod::default(), MergeMethod::Merge);
    }

    #[test]
    fn api_error_shows_remote_message() {
        let err = ForgeError::ApiError {
            status: 422,
            message: "A pull request already exists for owner:notes".into(),
        };
        assert_eq!(
            err.to_string(),
            "A pull request already exists for owner:notes (HTTP 422)"
        );
    }

    #[test]
    fn auth_required_mentions_command() {
        assert!(ForgeError::AuthRequired.to_string().contains("vg auth"));
    }
}
