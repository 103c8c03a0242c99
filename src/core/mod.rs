//! core
//!
//! Core domain types, configuration, and locking for vaultgate.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName
//! - [`remote`] - Repository identity parsed from remote URLs
//! - [`config`] - Global preferences and the persisted workspace record
//! - [`lock`] - Cross-process workspace lock
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Persisted records are read and written whole
//! - One URL parser feeds every consumer of repository identity

pub mod config;
pub mod lock;
pub mod remote;
pub mod types;
