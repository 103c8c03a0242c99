//! cli::commands::auth
//!
//! Store, inspect or remove the access token for a repository.
//!
//! The token itself is never printed. `--status` only says whether one is
//! stored, and under which normalized repository key.

use anyhow::{bail, Context as _, Result};

use super::{credentials, load_config, workdir};
use crate::core::config::{ConfigStore, FileConfigStore};
use crate::core::remote::RepoId;
use crate::engine::Context;
use crate::ui::output::{self, Verbosity};
use crate::ui::prompts;

/// Run the auth command.
pub fn auth(
    ctx: &Context,
    token: Option<&str>,
    url: Option<&str>,
    status: bool,
    logout: bool,
) -> Result<()> {
    let verbosity = Verbosity::from_flags(ctx.quiet, ctx.debug);
    let config = load_config()?;
    let creds = credentials(&config)?;

    let url = match url {
        Some(url) => url.trim().to_string(),
        None => connected_url(ctx)?,
    };
    let id = RepoId::parse(&url)?;

    if status {
        let stored = creds.get(&url)?.is_some();
        if stored {
            output::print(format!("A token is stored for {}.", id.key()), verbosity);
        } else {
            output::print(format!("No token stored for {}.", id.key()), verbosity);
        }
        return Ok(());
    }

    if logout {
        creds.remove(&url)?;
        output::print(format!("Removed the token for {}.", id.key()), verbosity);
        return Ok(());
    }

    let token = match token {
        Some(t) => t.to_string(),
        None => {
            if !ctx.interactive {
                bail!("No token given. Pass --token <token>.");
            }
            prompts::password(&format!("Access token for {}", id), true)?
        }
    };
    creds.set(&url, &token)?;
    output::print(format!("Stored a token for {}.", id.key()), verbosity);
    Ok(())
}

/// URL of the repository connected in the working directory.
fn connected_url(ctx: &Context) -> Result<String> {
    let dir = workdir(ctx)?;
    let state = FileConfigStore::for_workspace(&dir)
        .context("Failed to locate workspace state")?
        .load()
        .context("Failed to read workspace state")?;
    if !state.is_repository_connected || state.repository_url.is_empty() {
        bail!("No repository connected here. Pass --url <repository>.");
    }
    Ok(state.repository_url)
}
