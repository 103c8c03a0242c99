//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`BranchName`] - Validated Git branch name
//!
//! # Validation
//!
//! Branch names are validated at construction time, before any git command
//! sees them. A name that git would reject never reaches the adapter, so a
//! failed `checkout -b` always means a real repository condition (collision,
//! dirty tree) rather than a typo.
//!
//! # Examples
//!
//! ```
//! use vaultgate::core::types::BranchName;
//!
//! let branch = BranchName::new("notes/weekly").unwrap();
//! assert_eq!(branch.as_str(), "notes/weekly");
//!
//! assert!(BranchName::new("invalid..name").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("invalid repository url: {0}")]
    InvalidRepoUrl(String),
}

/// A validated Git branch name.
///
/// Branch names must conform to Git's refname rules (see `git check-ref-format`):
/// - Cannot be empty
/// - Cannot start with `.` or `-`
/// - Cannot end with `.lock` or `/`
/// - Cannot contain `..`, `@{`, `//`, or ASCII control characters
/// - Cannot contain spaces, `~`, `^`, `:`, `\`, `?`, `*`, `[`
/// - Cannot be exactly `@` or `HEAD`
///
/// # Example
///
/// ```
/// use vaultgate::core::types::BranchName;
///
/// assert!(BranchName::new("draft/chapter-3").is_ok());
/// assert!(BranchName::new("").is_err());
/// assert!(BranchName::new("has space").is_err());
/// assert!(BranchName::new("HEAD").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BranchName(String);

impl BranchName {
    /// Create a new validated branch name.
    ///
    /// Surrounding whitespace is trimmed first, since names usually come
    /// from a prompt.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidBranchName` if the name violates Git's refname rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into().trim().to_string();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    fn validate(name: &str) -> Result<(), TypeError> {
        let reject = |msg: &str| Err(TypeError::InvalidBranchName(msg.to_string()));

        if name.is_empty() {
            return reject("branch name cannot be empty");
        }
        if name == "@" || name == "HEAD" {
            return reject("branch name is reserved");
        }
        if name.starts_with('.') {
            return reject("branch name cannot start with '.'");
        }
        if name.starts_with('-') {
            return reject("branch name cannot start with '-'");
        }
        if name.ends_with(".lock") {
            return reject("branch name cannot end with '.lock'");
        }
        if name.ends_with('/') {
            return reject("branch name cannot end with '/'");
        }
        for bad in ["..", "@{", "//"] {
            if name.contains(bad) {
                return Err(TypeError::InvalidBranchName(format!(
                    "branch name cannot contain '{bad}'"
                )));
            }
        }

        const INVALID_CHARS: [char; 8] = [' ', '~', '^', ':', '\\', '?', '*', '['];
        if let Some(c) = name.chars().find(|c| INVALID_CHARS.contains(c)) {
            return Err(TypeError::InvalidBranchName(format!(
                "branch name cannot contain '{c}'"
            )));
        }
        if name.chars().any(|c| c.is_ascii_control()) {
            return reject("branch name cannot contain control characters");
        }

        for component in name.split('/') {
            if component.starts_with('.') {
                return reject("path component cannot start with '.'");
            }
            if component.ends_with(".lock") {
                return reject("path component cannot end with '.lock'");
            }
        }

        Ok(())
    }

    /// Get the branch name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BranchName {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<BranchName> for String {
    fn from(name: BranchName) -> Self {
        name.0
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BranchName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
