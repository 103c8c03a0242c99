//! cli::commands::pr
//!
//! Pull request commands.
//!
//! # Example
//!
//! ```bash
//! vg pr list
//! vg pr create --branch notes/weekly --title "Weekly notes" --web
//! vg pr merge 12 --method squash
//! vg pr close 13
//! ```
//!
//! Every subcommand needs a token with access to the repository, stored
//! with `vg auth` or passed to `pr create` with `--token`.

use anyhow::{bail, Context as _, Result};
use tokio::runtime::Runtime;

use super::save::settle_save_decision;
use super::{credentials, Session};
use crate::cli::args::PrAction;
use crate::engine::{Context, PullRequests, SyncResult};
use crate::forge::{MergeMethod, PullRequest};
use crate::ui::output;
use crate::ui::prompts;

/// Run a pr subcommand.
pub fn pr(ctx: &Context, action: PrAction) -> Result<()> {
    match action {
        PrAction::List => list(ctx),
        PrAction::Create {
            branch,
            title,
            body,
            web,
            token,
        } => create(
            ctx,
            branch.as_deref(),
            title.as_deref(),
            body.as_deref(),
            web,
            token.as_deref(),
        ),
        PrAction::Merge { number, method } => merge(ctx, number, method.into()),
        PrAction::Close { number } => close(ctx, number),
    }
}

fn runtime() -> Result<Runtime> {
    Runtime::new().context("Failed to start async runtime")
}

fn manager(session: &Session, token: Option<&str>) -> Result<PullRequests> {
    let creds = credentials(&session.config)?;
    Ok(PullRequests::for_workspace(
        &session.ws,
        &creds,
        token,
        &session.config,
    )?)
}

fn format_pr(pr: &PullRequest) -> String {
    format!(
        "#{:<5} {}  ({} -> {}, {}, {})",
        pr.number, pr.title, pr.head, pr.base, pr.author, pr.mergeable
    )
}

fn list(ctx: &Context) -> Result<()> {
    let session = Session::open(ctx)?;
    let manager = manager(&session, None)?;
    let prs = runtime()?.block_on(manager.list())?;

    if prs.is_empty() {
        output::print("No open pull requests.", session.verbosity);
    } else {
        let lines: Vec<String> = prs.iter().map(format_pr).collect();
        output::print(lines.join("\n"), session.verbosity);
    }
    session.finish();
    Ok(())
}

fn create(
    ctx: &Context,
    branch: Option<&str>,
    title: Option<&str>,
    body: Option<&str>,
    web: bool,
    token: Option<&str>,
) -> Result<()> {
    let session = Session::open(ctx)?;
    let config = session.ws.config();

    let branch = match branch {
        Some(b) => b.to_string(),
        None if config.current_branch != config.main_branch => config.current_branch.clone(),
        None if !config.last_working_branch.is_empty() => config.last_working_branch.clone(),
        None => bail!("No working branch to open a pull request from. Pass --branch <name>."),
    };
    let title = match title {
        Some(t) => t.to_string(),
        None if ctx.interactive => prompts::input("Title", Some(branch.as_str()), true)?,
        None => branch.clone(),
    };

    let manager = manager(&session, token)?;
    let pr = runtime()?.block_on(manager.create(&branch, &title, body))?;
    output::print(
        format!("Opened #{}: {}", pr.number, pr.html_url),
        session.verbosity,
    );

    if web {
        if let Err(e) = open::that(&pr.html_url) {
            output::warn(
                format!("Could not open a browser: {}", e),
                session.verbosity,
            );
        }
    }
    session.finish();
    Ok(())
}

fn merge(ctx: &Context, number: u64, method: MergeMethod) -> Result<()> {
    let mut session = Session::open_mutating(ctx)?;
    let manager = manager(&session, None)?;

    let outcome = runtime()?.block_on(manager.merge(&mut session.ws, number, method))?;
    session.flush_notices();

    if let SyncResult::NeedsInput(request) = outcome.sync {
        settle_save_decision(ctx, &mut session, request)?;
        if session.ws.config().read_only_mode {
            session.run(|ws| ws.pull_main())?;
            output::print(
                format!("Updated '{}'.", session.ws.config().main_branch),
                session.verbosity,
            );
        }
    }
    session.finish();
    Ok(())
}

fn close(ctx: &Context, number: u64) -> Result<()> {
    let session = Session::open(ctx)?;
    let manager = manager(&session, None)?;
    runtime()?.block_on(manager.close(number))?;
    output::print(format!("Closed #{}.", number), session.verbosity);
    session.finish();
    Ok(())
}
