//! cli::commands::save
//!
//! Save work on the current branch as a draft or publish it.
//!
//! Also settles the save question that `vg read-only` and `vg pr merge`
//! stop at when the working branch has uncommitted changes.

use anyhow::{bail, Context as _, Result};

use super::{credentials, Session};
use crate::engine::{
    Context, InputRequest, PublishOutcome, PullRequests, SaveDecision, SaveOutcome,
};
use crate::ui::output;
use crate::ui::prompts;

const SAVE_CHOICES: [&str; 3] = [
    "Save as a draft (commit locally)",
    "Push to the remote",
    "Cancel",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaveKind {
    Draft,
    Push,
}

/// Run the save command.
pub fn save(ctx: &Context, draft: bool, push: bool, message: Option<&str>) -> Result<()> {
    let mut session = Session::open_mutating(ctx)?;

    let kind = match (draft, push) {
        (true, _) => SaveKind::Draft,
        (_, true) => SaveKind::Push,
        _ => match ask_kind(ctx)? {
            Some(kind) => kind,
            None => {
                session.finish();
                return Ok(());
            }
        },
    };

    let dirty = session.ws.repository().has_uncommitted_changes()?;
    let message = match message {
        Some(m) => m.to_string(),
        None if dirty => ask_message(ctx)?,
        None => String::new(),
    };

    let decision = match kind {
        SaveKind::Draft => SaveDecision::Draft(message),
        SaveKind::Push => SaveDecision::Push(message),
    };
    apply_decision(ctx, &mut session, decision)?;
    session.finish();
    Ok(())
}

/// Ask how to save uncommitted work found on the way back to main, then
/// finish the transition.
pub(crate) fn settle_save_decision(
    ctx: &Context,
    session: &mut Session,
    request: InputRequest,
) -> Result<()> {
    let InputRequest::SaveDecision {
        branch,
        changed_files,
    } = request
    else {
        bail!("unexpected input request while leaving edit mode");
    };

    if !ctx.interactive {
        bail!(
            "'{}' has uncommitted changes. Run `vg save --draft -m <message>` or \
             `vg save --push -m <message>`, or `vg read-only --no-save-check`.",
            branch
        );
    }

    output::print(
        format!(
            "'{}' has uncommitted changes:\n{}",
            branch,
            output::format_list(&changed_files, "  ")
        ),
        session.verbosity,
    );

    let Some(kind) = ask_kind(ctx)? else {
        output::print(format!("Still editing on '{}'.", branch), session.verbosity);
        return Ok(());
    };
    let message = ask_message(ctx)?;
    let decision = match kind {
        SaveKind::Draft => SaveDecision::Draft(message),
        SaveKind::Push => SaveDecision::Push(message),
    };
    apply_decision(ctx, session, decision)
}

fn ask_kind(ctx: &Context) -> Result<Option<SaveKind>> {
    if !ctx.interactive {
        bail!("Choose how to save: pass --draft or --push.");
    }
    Ok(
        match prompts::select("How should the work be saved?", &SAVE_CHOICES, None, true)? {
            0 => Some(SaveKind::Draft),
            1 => Some(SaveKind::Push),
            _ => None,
        },
    )
}

fn ask_message(ctx: &Context) -> Result<String> {
    if !ctx.interactive {
        bail!("A commit message is required: pass -m <message>.");
    }
    let message = prompts::input("Commit message", None, true)?;
    if message.trim().is_empty() {
        bail!("A commit message is required.");
    }
    Ok(message)
}

fn apply_decision(ctx: &Context, session: &mut Session, decision: SaveDecision) -> Result<()> {
    match session.run(|ws| ws.resume_save(decision))? {
        SaveOutcome::Drafted => {
            session.flush_notices();
            output::print("Read-only on main.", session.verbosity);
        }
        SaveOutcome::Published(outcome) => {
            session.flush_notices();
            if outcome.offer_pull_request {
                offer_pull_request(ctx, session, &outcome)?;
            }
        }
    }
    Ok(())
}

/// After the first push of a branch, offer to open a pull request for it.
fn offer_pull_request(ctx: &Context, session: &mut Session, outcome: &PublishOutcome) -> Result<()> {
    let branch = &outcome.pushed_branch;
    let hint = format!(
        "Run `vg pr create --branch {}` to open a pull request.",
        branch
    );
    if !ctx.interactive {
        output::print(hint, session.verbosity);
        return Ok(());
    }
    if !prompts::confirm(
        &format!("Open a pull request for '{}'?", branch),
        true,
        true,
    )? {
        return Ok(());
    }

    let title = prompts::input("Title", Some(branch.as_str()), true)?;
    let creds = credentials(&session.config)?;
    let manager = PullRequests::for_workspace(&session.ws, &creds, None, &session.config)?;

    let rt = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    match rt.block_on(manager.create(branch, &title, None)) {
        Ok(pr) => output::print(
            format!("Opened #{}: {}", pr.number, pr.html_url),
            session.verbosity,
        ),
        Err(e) => {
            // The push stands; only the pull request is missing.
            output::warn(format!("{}. {}", e, hint), session.verbosity);
        }
    }
    Ok(())
}
