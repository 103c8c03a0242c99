//! cli::commands::setup
//!
//! Connect a workspace to a repository (clone, init, attach) and
//! disconnect it again.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};

use super::{credentials, load_config, workdir, Session};
use crate::core::remote::RepoId;
use crate::engine::setup::check_access;
use crate::engine::Context;
use crate::forge::{create_forge, Visibility};
use crate::ui::output;

/// Run the clone command.
///
/// The target defaults to a directory named after the repository inside
/// the working directory. The host is asked for the repository's
/// visibility first; a private repository needs a token.
pub fn clone(ctx: &Context, url: &str, dir: Option<PathBuf>, token: Option<&str>) -> Result<()> {
    let url = url.trim();
    let id = RepoId::parse(url)?;
    let base = workdir(ctx)?;
    let base = std::fs::canonicalize(&base).unwrap_or(base);
    let target = match dir {
        Some(dir) if dir.is_absolute() => dir,
        Some(dir) => base.join(dir),
        None => base.join(&id.repo),
    };
    if !is_empty_dir(&target)? {
        bail!("'{}' already exists and is not empty.", target.display());
    }

    let config = load_config()?;
    let creds = credentials(&config)?;
    let resolved = creds.resolve(url, token)?;
    let forge = create_forge(url, resolved.clone(), config.api_base())?;
    let rt = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let visibility = rt.block_on(check_access(forge.as_ref(), resolved.is_some()))?;

    let target_ctx = Context {
        cwd: Some(target.clone()),
        ..ctx.clone()
    };
    let mut session = Session::open_mutating(&target_ctx)?;
    let identity = session.config.identity().cloned();
    session.run(|ws| ws.clone_repository(url, identity.as_ref()))?;

    if let Some(token) = token {
        creds.set(url, token)?;
    }

    let kind = match visibility {
        Visibility::Public => "public",
        Visibility::Private => "private",
    };
    output::print(
        format!("Cloned {} repository {} into {}.", kind, id, target.display()),
        session.verbosity,
    );
    output::print(format!("Mode: {}.", session.ws.mode()), session.verbosity);
    session.finish();
    Ok(())
}

fn is_empty_dir(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(true);
    }
    let mut entries = std::fs::read_dir(path)
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    Ok(entries.next().is_none())
}

/// Run the init command.
pub fn init(ctx: &Context, url: Option<&str>, main: Option<&str>) -> Result<()> {
    let mut session = Session::open_mutating(ctx)?;
    let main = main
        .unwrap_or_else(|| session.config.default_main_branch())
        .to_string();
    let identity = session.config.identity().cloned();

    session.run(|ws| ws.init_repository(url, &main, identity.as_ref()))?;

    output::print(
        format!("Initialized a repository with main branch '{}'.", main),
        session.verbosity,
    );
    if url.is_none() {
        output::print(
            "No remote configured; saving with --push needs one.",
            session.verbosity,
        );
    }
    session.finish();
    Ok(())
}

/// Run the attach command.
pub fn attach(ctx: &Context) -> Result<()> {
    let mut session = Session::open_mutating(ctx)?;
    session.run(|ws| ws.attach_existing())?;

    let config = session.ws.config();
    let remote = if config.repository_url.is_empty() {
        "no remote".to_string()
    } else {
        config.repository_url.clone()
    };
    output::print(
        format!("Connected ({}), {}.", remote, session.ws.mode()),
        session.verbosity,
    );
    session.finish();
    Ok(())
}

/// Run the disconnect command.
pub fn disconnect(ctx: &Context, keep_token: bool) -> Result<()> {
    let mut session = Session::open_mutating(ctx)?;
    if !session.ws.is_connected() {
        bail!("No repository connected.");
    }
    let creds = if keep_token {
        None
    } else {
        Some(credentials(&session.config)?)
    };

    session.run(|ws| ws.disconnect(creds.as_ref()))?;
    output::print("Disconnected. The working tree is unchanged.", session.verbosity);
    session.finish();
    Ok(())
}
