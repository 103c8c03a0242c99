//! forge
//!
//! Abstraction for the repository host's REST API.
//!
//! # Architecture
//!
//! The `Forge` trait defines the remote port: pull request lifecycle plus
//! the repository visibility query. The engine only ever holds a
//! `Box<dyn Forge>` built by [`create_forge`]; tests substitute
//! [`mock::MockForge`].
//!
//! Forge failures never compromise local state. A remote error is surfaced
//! to the user and nothing in the working tree changes because of it.
//!
//! # Modules
//!
//! - `traits`: Core `Forge` trait and request/response types
//! - [`github`]: GitHub REST implementation
//! - [`mock`]: Mock implementation for deterministic testing
//! - `factory`: Forge creation from a remote URL

mod factory;
pub mod github;
pub mod mock;
mod traits;

pub use factory::{create_forge, is_supported_remote};
pub use traits::*;
