//! cli
//!
//! Command-line interface layer for vaultgate.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Turn engine input requests into prompts, or into errors naming the
//!   flag to pass when prompts are disabled
//! - Does NOT run git directly
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to
//! handlers that drive the [`crate::engine`] workspace. Every branch or
//! mode change goes through the engine's policy checks.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use crate::engine;
use anyhow::Result;

/// Run parsed arguments.
///
/// This is the main entry point called from `main.rs`, after logging is
/// set up from the same flags.
pub fn run(cli: Cli) -> Result<()> {
    let ctx = engine::Context {
        cwd: cli.cwd.clone(),
        debug: cli.debug,
        quiet: cli.quiet,
        interactive: cli.interactive(),
    };

    commands::dispatch(cli.command, &ctx)
}
