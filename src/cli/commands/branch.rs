//! cli::commands::branch
//!
//! List, create, delete and rename branches.

use anyhow::Result;

use super::Session;
use crate::cli::args::BranchAction;
use crate::engine::Context;
use crate::ui::output;

/// Run a branch subcommand.
pub fn branch(ctx: &Context, action: BranchAction) -> Result<()> {
    match action {
        BranchAction::List { refresh } => list(ctx, refresh),
        BranchAction::Create { name } => create(ctx, &name),
        BranchAction::Delete { name } => delete(ctx, &name),
        BranchAction::Rename { new_name, from } => rename(ctx, from.as_deref(), &new_name),
    }
}

fn list(ctx: &Context, refresh: bool) -> Result<()> {
    let mut session = if refresh {
        Session::open_mutating(ctx)?
    } else {
        Session::open(ctx)?
    };
    if refresh {
        session.run(|ws| ws.refresh_branches())?;
    }

    let config = session.ws.config();
    if config.available_branches.is_empty() {
        output::print("No branches known.", session.verbosity);
    } else {
        output::print(
            output::format_branches(
                &config.available_branches,
                &config.current_branch,
                &config.main_branch,
            ),
            session.verbosity,
        );
    }
    session.finish();
    Ok(())
}

fn create(ctx: &Context, name: &str) -> Result<()> {
    let mut session = Session::open_mutating(ctx)?;
    session.run(|ws| ws.create_new_branch(name))?;
    output::print(format!("Created and checked out '{}'.", name), session.verbosity);
    session.finish();
    Ok(())
}

fn delete(ctx: &Context, name: &str) -> Result<()> {
    let mut session = Session::open_mutating(ctx)?;
    session.run(|ws| ws.delete_branch(name))?;
    output::print(format!("Deleted '{}'.", name), session.verbosity);
    session.finish();
    Ok(())
}

fn rename(ctx: &Context, from: Option<&str>, to: &str) -> Result<()> {
    let mut session = Session::open_mutating(ctx)?;
    let from = match from {
        Some(from) => from.to_string(),
        None => session.ws.config().current_branch.clone(),
    };
    session.run(|ws| ws.rename_branch(&from, to))?;
    output::print(format!("Renamed '{}' to '{}'.", from, to), session.verbosity);
    session.finish();
    Ok(())
}
