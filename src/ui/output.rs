//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag. Results go
//! to stdout; warnings, errors and engine notices go to stderr so they never
//! mix with output a script might parse.

use std::fmt::Display;

use crate::engine::{Notice, NoticeLevel};

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a warning message (respects quiet mode).
pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        eprintln!("warning: {}", message);
    }
}

/// Print an engine notice at its level.
///
/// Error notices are shown even in quiet mode.
pub fn notice(notice: &Notice, verbosity: Verbosity) {
    match notice.level {
        NoticeLevel::Info => {
            if verbosity != Verbosity::Quiet {
                eprintln!("{}", notice.message);
            }
        }
        NoticeLevel::Warning => warn(&notice.message, verbosity),
        NoticeLevel::Error => error(&notice.message),
    }
}

/// Print every notice in order.
pub fn notices(notices: &[Notice], verbosity: Verbosity) {
    for n in notices {
        notice(n, verbosity);
    }
}

/// Format a list of items.
pub fn format_list<T: Display>(items: &[T], prefix: &str) -> String {
    items
        .iter()
        .map(|item| format!("{}{}", prefix, item))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format a branch list, marking the current branch with `*`.
pub fn format_branches<'a>(
    branches: impl IntoIterator<Item = &'a String>,
    current: &str,
    main: &str,
) -> String {
    branches
        .into_iter()
        .map(|b| {
            let marker = if b == current { "* " } else { "  " };
            let suffix = if b == main { " (main, read-only)" } else { "" };
            format!("{}{}{}", marker, b, suffix)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_flags() {
        assert_eq!(Verbosity::from_flags(true, true), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, true), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, false), Verbosity::Normal);
    }

    #[test]
    fn list_prefixes_each_line() {
        assert_eq!(format_list(&["a", "b"], "- "), "- a\n- b");
    }

    #[test]
    fn branches_mark_current_and_main() {
        let names = vec!["feature/x".to_string(), "main".to_string()];
        assert_eq!(
            format_branches(&names, "feature/x", "main"),
            "* feature/x\n  main (main, read-only)"
        );
    }
}
