//! vaultgate - edit a git-backed vault on branches while main stays read-only
//!
//! A vault (a directory of notes) lives in a GitHub repository. Reading
//! happens on main, which is never edited directly; editing happens on
//! working branches that are saved as local drafts or pushed and merged
//! through pull requests.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, drives the engine)
//! - [`engine`] - Branch-mode state machine, save/publish and pull request
//!   workflows
//! - [`core`] - Domain types, configuration, workspace state and locking
//! - [`git`] - Single interface for all git operations
//! - [`forge`] - Repository host API (GitHub)
//! - [`credentials`] - Access tokens keyed by normalized repository
//! - [`secrets`] - Secret storage backends
//! - [`ui`] - Output and prompts
//!
//! # Invariants
//!
//! 1. Read-only mode holds exactly when main is checked out
//! 2. Nothing commits to main
//! 3. A failed git operation leaves the recorded state as it was
//! 4. Tokens never appear in logs, errors or output

pub mod cli;
pub mod core;
pub mod credentials;
pub mod engine;
pub mod forge;
pub mod git;
pub mod secrets;
pub mod ui;
