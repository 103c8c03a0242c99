//! ui
//!
//! Terminal output and stdin prompts for the `vg` binary.
//!
//! - [`output`] - Results to stdout, notices and errors to stderr
//! - [`prompts`] - Answers to the engine's input requests
//!
//! Prompts fail with `NotInteractive` instead of blocking when prompts are
//! disabled, so every caller has to name the flag that answers the
//! question instead.

pub mod output;
pub mod prompts;
