//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--interactive` / `--no-interactive`: Control prompts
//! - `--quiet` / `-q`: Minimal output

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::forge::MergeMethod;

/// vaultgate - Edit a git-backed vault on branches while main stays read-only
#[derive(Parser, Debug)]
#[command(name = "vg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if vg was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output; implies --no-interactive
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable interactive prompts
    #[arg(long = "interactive", global = true, conflicts_with = "no_interactive")]
    pub interactive_flag: bool,

    /// Disable interactive prompts
    #[arg(long, global = true)]
    pub no_interactive: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Determine if interactive mode is enabled.
    ///
    /// Returns true if:
    /// - `--interactive` was explicitly set, OR
    /// - Neither `--no-interactive` nor `--quiet` was set AND stdin is a TTY
    pub fn interactive(&self) -> bool {
        if self.interactive_flag {
            true
        } else if self.no_interactive || self.quiet {
            false
        } else {
            std::io::stdin().is_terminal()
        }
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the mode, branches and connection
    Status,

    /// Reconcile the recorded mode with the checked-out branch
    #[command(
        long_about = "Reconcile the recorded mode with the checked-out branch.\n\n\
            Runs automatically after every command. Run it by hand after checking out \
            branches with plain git: read-only mode moves back to main, and edit mode \
            found on main switches to read-only. Uncommitted content is never touched."
    )]
    Validate,

    /// Leave read-only mode and edit on a working branch
    #[command(
        long_about = "Leave read-only mode and edit on a working branch.\n\n\
            Main is never edited directly. Pick an existing branch or name a new one; \
            a name that exists neither locally nor on the remote is created from the \
            current HEAD. Without a branch, vg lists the known working branches.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Start editing on a new branch
    vg edit notes/weekly

    # Choose from known branches
    vg edit

    # When done, save and publish
    vg save --push -m \"Weekly notes\""
    )]
    Edit {
        /// Branch to edit on
        branch: Option<String>,
    },

    /// Return to main in read-only mode
    #[command(
        name = "read-only",
        long_about = "Return to main in read-only mode.\n\n\
            With uncommitted changes on the working branch vg asks whether to save \
            them as a draft or push them first. --no-save-check skips the question; \
            git then carries the changes over to main or refuses the checkout."
    )]
    ReadOnly {
        /// Do not ask about uncommitted changes
        #[arg(long)]
        no_save_check: bool,
    },

    /// Check out another branch within the current mode
    Switch {
        /// Branch to check out
        branch: String,
    },

    /// Manage branches
    Branch {
        #[command(subcommand)]
        action: BranchAction,
    },

    /// Save work on the current branch and return to main
    #[command(
        long_about = "Save work on the current branch and return to main.\n\n\
            --draft commits locally. --push commits (if anything changed), pulls the \
            branch first when the remote copy is ahead, and pushes. A branch pushed for \
            the first time is offered a pull request.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Keep work local for now
    vg save --draft -m \"wip\"

    # Publish an already-committed draft
    vg save --push"
    )]
    Save {
        /// Commit locally only
        #[arg(long, conflicts_with = "push")]
        draft: bool,

        /// Commit and push
        #[arg(long)]
        push: bool,

        /// Commit message
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Update main from the remote (read-only mode only)
    Pull,

    /// Manage pull requests
    Pr {
        #[command(subcommand)]
        action: PrAction,
    },

    /// Store or remove the access token for the repository
    #[command(after_help = "\
WORKFLOW EXAMPLES:
    # Paste a token at the prompt
    vg auth

    # Non-interactive
    vg auth --token ghp_xxxx

    # Check whether a token is stored
    vg auth --status")]
    Auth {
        /// Token to store (prompted when omitted)
        #[arg(long)]
        token: Option<String>,

        /// Repository URL (defaults to the connected repository)
        #[arg(long)]
        url: Option<String>,

        /// Show whether a token is stored
        #[arg(long, conflicts_with_all = ["logout", "token"])]
        status: bool,

        /// Remove the stored token
        #[arg(long, conflicts_with = "token")]
        logout: bool,
    },

    /// Clone a repository and connect to it
    Clone {
        /// Repository URL
        url: String,

        /// Target directory (defaults to the repository name)
        dir: Option<PathBuf>,

        /// Access token for private repositories
        #[arg(long)]
        token: Option<String>,
    },

    /// Create a repository in the working directory and connect to it
    Init {
        /// Remote URL to add as origin
        #[arg(long)]
        url: Option<String>,

        /// Main branch name (defaults to the configured default)
        #[arg(long)]
        main: Option<String>,
    },

    /// Connect to the repository already in the working directory
    Attach,

    /// Detach the repository from vaultgate
    Disconnect {
        /// Keep the stored access token
        #[arg(long)]
        keep_token: bool,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Branch subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum BranchAction {
    /// List known branches
    List {
        /// Re-read branches from git first
        #[arg(long)]
        refresh: bool,
    },

    /// Create a working branch from HEAD (edit mode only)
    Create {
        /// New branch name
        name: String,
    },

    /// Delete a local branch
    Delete {
        /// Branch to delete
        name: String,
    },

    /// Rename the current working branch
    Rename {
        /// New name
        new_name: String,

        /// Branch being renamed (must be the current one)
        #[arg(long)]
        from: Option<String>,
    },
}

/// Pull request subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum PrAction {
    /// List open pull requests
    List,

    /// Open a pull request from the current or given branch into main
    Create {
        /// Head branch (defaults to the last working branch)
        #[arg(long)]
        branch: Option<String>,

        /// Title (defaults to the branch name)
        #[arg(long)]
        title: Option<String>,

        /// Description
        #[arg(long)]
        body: Option<String>,

        /// Open the pull request in a browser
        #[arg(long)]
        web: bool,

        /// Token for this request only
        #[arg(long)]
        token: Option<String>,
    },

    /// Merge a pull request and update main
    Merge {
        /// Pull request number
        number: u64,

        /// Merge method
        #[arg(long, value_enum, default_value_t = MergeMethodArg::Merge)]
        method: MergeMethodArg,
    },

    /// Close a pull request without merging
    Close {
        /// Pull request number
        number: u64,
    },
}

/// Merge method argument.
#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMethodArg {
    /// Create a merge commit
    Merge,
    /// Squash and merge
    Squash,
    /// Rebase and merge
    Rebase,
}

impl From<MergeMethodArg> for MergeMethod {
    fn from(arg: MergeMethodArg) -> Self {
        match arg {
            MergeMethodArg::Merge => MergeMethod::Merge,
            MergeMethodArg::Squash => MergeMethod::Squash,
            MergeMethodArg::Rebase => MergeMethod::Rebase,
        }
    }
}

/// Shell type for completion generation.
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
