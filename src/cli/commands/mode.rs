//! cli::commands::mode
//!
//! Mode transitions: edit, read-only, switch, validate and pull.
//!
//! # Example
//!
//! ```bash
//! vg edit notes/weekly   # leave read-only mode
//! vg switch drafts       # another working branch
//! vg read-only           # back to main, asking about unsaved work
//! vg pull                # update main
//! ```

use anyhow::{bail, Result};

use super::save::settle_save_decision;
use super::Session;
use crate::engine::{Context, InputRequest, Transition};
use crate::ui::output;
use crate::ui::prompts::{self, Choice};

/// Run the edit command.
pub fn edit(ctx: &Context, branch: Option<&str>) -> Result<()> {
    let mut session = Session::open_mutating(ctx)?;
    session.start_update_check()?;

    let mut transition = session.run(|ws| ws.enter_edit_mode(branch))?;
    while let Transition::NeedsInput(request) = transition {
        let InputRequest::BranchSelection { branches } = request else {
            bail!("unexpected input request while entering edit mode");
        };
        let chosen = choose_branch(ctx, &branches)?;
        transition = session.run(|ws| ws.enter_edit_mode(Some(chosen.as_str())))?;
    }

    output::print(
        format!("Editing on '{}'.", session.ws.config().current_branch),
        session.verbosity,
    );
    session.finish();
    Ok(())
}

fn choose_branch(ctx: &Context, branches: &[String]) -> Result<String> {
    if !ctx.interactive {
        bail!("No branch given. Run `vg edit <branch>`.");
    }
    let message = if branches.is_empty() {
        "Name a new working branch:"
    } else {
        "Choose a branch to edit, or type a new name:"
    };
    Ok(match prompts::select_or_enter(message, branches, true)? {
        Choice::Existing(i) => branches[i].clone(),
        Choice::Entered(name) => name,
    })
}

/// Run the read-only command.
pub fn read_only(ctx: &Context, save_check: bool) -> Result<()> {
    let mut session = Session::open_mutating(ctx)?;
    session.start_update_check()?;

    match session.run(|ws| ws.enter_read_only_mode(save_check))? {
        Transition::Applied => {
            output::print("Read-only on main.", session.verbosity);
        }
        Transition::NeedsInput(request) => settle_save_decision(ctx, &mut session, request)?,
    }

    session.finish();
    Ok(())
}

/// Run the switch command.
pub fn switch(ctx: &Context, branch: &str) -> Result<()> {
    let mut session = Session::open_mutating(ctx)?;
    match session.run(|ws| ws.switch_to_branch(branch))? {
        Transition::Applied => {
            output::print(format!("Switched to '{}'.", branch), session.verbosity);
        }
        Transition::NeedsInput(_) => bail!("unexpected input request while switching branches"),
    }
    session.finish();
    Ok(())
}

/// Run the validate command.
pub fn validate(ctx: &Context) -> Result<()> {
    let mut session = Session::open_mutating(ctx)?;
    session.start_update_check()?;
    if !session.ws.is_connected() {
        bail!("No repository connected.");
    }
    session.run(|ws| ws.validate_and_enforce_branch_rules())?;
    output::print(format!("Mode: {}.", session.ws.mode()), session.verbosity);
    session.finish();
    Ok(())
}

/// Run the pull command.
pub fn pull(ctx: &Context) -> Result<()> {
    let mut session = Session::open_mutating(ctx)?;
    session.run(|ws| ws.pull_main())?;
    output::print(
        format!("Updated '{}'.", session.ws.config().main_branch),
        session.verbosity,
    );
    session.finish();
    Ok(())
}
