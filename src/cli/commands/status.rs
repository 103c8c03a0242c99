//! cli::commands::status
//!
//! Show the mode, branches and connection.

use anyhow::Result;

use super::Session;
use crate::engine::{Context, Mode};
use crate::ui::output;

/// Run the status command.
pub fn status(ctx: &Context) -> Result<()> {
    let mut session = Session::open(ctx)?;
    session.start_update_check()?;
    let v = session.verbosity;

    let ws = &session.ws;
    if !ws.is_connected() {
        output::print("Not connected. Run `vg clone <url>`, `vg init` or `vg attach`.", v);
        session.finish();
        return Ok(());
    }

    let config = ws.config();
    let url = if config.repository_url.is_empty() {
        "(no remote)"
    } else {
        config.repository_url.as_str()
    };
    output::print(format!("Repository: {}", url), v);
    output::print(format!("Main:       {}", config.main_branch), v);
    match ws.mode() {
        Mode::ReadOnlyOnMain => output::print("Mode:       read-only", v),
        Mode::EditingOnBranch(branch) => output::print(format!("Mode:       editing on {}", branch), v),
    }
    if !config.last_working_branch.is_empty() {
        output::print(format!("Last edit:  {}", config.last_working_branch), v);
    }
    match config.last_synced_at {
        Some(at) => output::print(format!("Synced:     {}", at.format("%Y-%m-%d %H:%M UTC")), v),
        None => output::print("Synced:     never", v),
    }

    let changed = ws.repository().status()?;
    if !changed.is_empty() {
        output::print(format!("\n{} uncommitted change(s):", changed.len()), v);
        let paths: Vec<_> = changed.iter().map(|e| format!("{} {}", e.code, e.path)).collect();
        output::print(output::format_list(&paths, "  "), v);
    }

    session.finish();
    Ok(())
}
