//! cli::commands::completion
//!
//! Shell completion scripts, written to stdout.
//!
//! ```bash
//! vg completion zsh > ~/.zfunc/_vg
//! ```

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::generate;

use crate::cli::args::{Cli, Shell};

impl From<Shell> for clap_complete::Shell {
    fn from(shell: Shell) -> Self {
        match shell {
            Shell::Bash => clap_complete::Shell::Bash,
            Shell::Zsh => clap_complete::Shell::Zsh,
            Shell::Fish => clap_complete::Shell::Fish,
            Shell::PowerShell => clap_complete::Shell::PowerShell,
        }
    }
}

/// Run the completion command.
pub fn completion(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    let bin = cmd.get_name().to_string();
    generate(
        clap_complete::Shell::from(shell),
        &mut cmd,
        bin,
        &mut std::io::stdout(),
    );
    Ok(())
}
