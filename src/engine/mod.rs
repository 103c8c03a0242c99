//! engine
//!
//! The branch-mode state machine and the workflows layered on it.
//!
//! # Architecture
//!
//! A [`Workspace`] owns one working directory's [`RepositoryConfig`]
//! and drives it through the injected ports:
//!
//! - [`Repository`](crate::git::Repository): every git read and write
//! - [`ConfigStore`](crate::core::config::ConfigStore): persistence of the record
//! - [`Forge`](crate::forge::Forge): remote calls, used only by [`pulls`] and [`setup`]
//!
//! ```text
//! ReadOnlyOnMain ──enter_edit_mode(b)──▶ EditingOnBranch(b)
//!        ▲                                     │
//!        └──── enter_read_only_mode / save ────┘
//! ```
//!
//! Transitions that need something from the user return
//! [`Transition::NeedsInput`] without touching anything; the caller
//! collects the answer and re-invokes (`enter_edit_mode(Some(b))`) or
//! resumes (`resume_save`). Dropping a `NeedsInput` is the same as declining.
//!
//! # Invariants
//!
//! - `read_only_mode` ⟺ `current_branch == main_branch`, in every state a
//!   transition leaves behind
//! - Policy violations are rejected before any git call
//! - The validator runs after every transition and at startup; it never
//!   touches uncommitted content
//! - Bulk mutations (pull, clone) run under a [`BulkMutationGuard`](crate::git::BulkMutationGuard)

pub mod machine;
pub mod publish;
pub mod pulls;
pub mod setup;
pub mod updates;
mod validate;

pub use machine::Workspace;
pub use publish::{PublishOutcome, SaveOutcome};
pub use pulls::{MergeOutcome, PullRequests, SyncResult};

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::core::config::ConfigError;
use crate::core::types::TypeError;
use crate::credentials::CredentialError;
use crate::forge::ForgeError;
use crate::git::GitError;

/// Execution context for commands.
///
/// Contains global settings derived from CLI flags that affect command behavior.
#[derive(Debug, Clone)]
pub struct Context {
    /// Working directory override.
    pub cwd: Option<PathBuf>,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
    /// Interactive mode enabled.
    pub interactive: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            cwd: None,
            debug: false,
            quiet: false,
            interactive: true,
        }
    }
}

/// Current mode, derived from the persisted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Sitting on main; nothing may be edited.
    ReadOnlyOnMain,
    /// Sitting on a working branch; edits allowed.
    EditingOnBranch(String),
}

impl Mode {
    pub fn is_read_only(&self) -> bool {
        matches!(self, Mode::ReadOnlyOnMain)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::ReadOnlyOnMain => write!(f, "read-only"),
            Mode::EditingOnBranch(branch) => write!(f, "editing on '{}'", branch),
        }
    }
}

/// Severity of a [`Notice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Human-readable message for the UI collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of a transition that may have to ask the user first.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Transition {
    /// The transition completed.
    Applied,
    /// Nothing changed; the caller must supply input and retry.
    NeedsInput(InputRequest),
}

/// What a suspended transition is waiting for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputRequest {
    /// Pick (or name) a working branch, then call
    /// `enter_edit_mode(Some(branch))`.
    BranchSelection {
        /// Known branches other than main
        branches: Vec<String>,
    },
    /// Uncommitted changes on `branch`; answer with `resume_save`.
    SaveDecision {
        branch: String,
        changed_files: Vec<String>,
    },
}

/// The user's answer to [`InputRequest::SaveDecision`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveDecision {
    /// Commit locally with this message, then go read-only.
    Draft(String),
    /// Commit, publish the branch, then go read-only.
    Push(String),
}

/// Requests the branch rules forbid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    #[error("editing '{main}' is not allowed; choose or create a working branch")]
    EditMain { main: String },

    #[error("read-only mode stays on '{main}'; use `vg edit {branch}` to work on '{branch}'")]
    SwitchOffMain { branch: String, main: String },

    #[error("cannot switch to '{main}' while editing; use `vg read-only` instead")]
    SwitchToMain { main: String },

    #[error("nothing can be saved on '{main}'; switch to a working branch first")]
    SaveOnMain { main: String },

    #[error("cannot {action} in read-only mode; use `vg edit <branch>` first")]
    NotEditing { action: &'static str },

    #[error("cannot {action} while editing; use `vg read-only` first")]
    NotReadOnly { action: &'static str },

    #[error("'{main}' cannot be deleted")]
    DeleteMain { main: String },

    #[error("'{branch}' is checked out and cannot be deleted")]
    DeleteCurrent { branch: String },

    #[error("only the current working branch '{current}' can be renamed")]
    RenameNotCurrent { current: String },

    #[error("a pull request needs a working branch, not '{main}'")]
    PullRequestFromMain { main: String },

    #[error("workspace is already connected to {url}; run `vg disconnect` first")]
    AlreadyConnected { url: String },
}

/// Errors from engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No repository is attached to this workspace.
    #[error("no repository connected; run `vg clone <url>`, `vg init` or `vg attach`")]
    NotConnected,

    /// Rejected by the branch rules before anything ran.
    #[error(transparent)]
    Policy(#[from] PolicyViolation),

    /// Git error.
    #[error("git error: {0}")]
    Git(#[from] GitError),

    /// Remote API error.
    #[error(transparent)]
    Forge(#[from] ForgeError),

    /// The safety pull before a push failed; nothing was pushed.
    #[error("'{branch}' is behind the remote and pulling failed, so nothing was pushed: {message}")]
    PushConflict { branch: String, message: String },

    /// Persisting the workspace record failed.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Token storage failed.
    #[error(transparent)]
    Credentials(#[from] CredentialError),

    /// A branch name or URL was malformed.
    #[error(transparent)]
    Invalid(#[from] TypeError),

    /// Missing or empty user input.
    #[error("{0}")]
    InvalidInput(String),
}

impl EngineError {
    /// Whether this is a policy rejection.
    pub fn is_policy(&self) -> bool {
        matches!(self, EngineError::Policy(_))
    }

    /// Render as a notice: policy rejections are warnings, the rest errors.
    pub fn notice(&self) -> Notice {
        if self.is_policy() {
            Notice::warning(self.to_string())
        } else {
            Notice::error(self.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_display() {
        assert_eq!(Mode::ReadOnlyOnMain.to_string(), "read-only");
        assert_eq!(
            Mode::EditingOnBranch("notes".into()).to_string(),
            "editing on 'notes'"
        );
    }

    #[test]
    fn policy_notice_is_warning() {
        let err = EngineError::from(PolicyViolation::EditMain {
            main: "main".into(),
        });
        let notice = err.notice();
        assert_eq!(notice.level, NoticeLevel::Warning);
        assert!(notice.message.contains("'main'"));
    }

    #[test]
    fn adapter_notice_is_error() {
        let err = EngineError::from(GitError::GitNotFound);
        assert_eq!(err.notice().level, NoticeLevel::Error);
    }

    #[test]
    fn push_conflict_mentions_branch() {
        let err = EngineError::PushConflict {
            branch: "notes".into(),
            message: "CONFLICT (content)".into(),
        };
        let text = err.to_string();
        assert!(text.contains("'notes'"));
        assert!(text.contains("nothing was pushed"));
    }
}
