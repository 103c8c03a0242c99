//! engine::updates
//!
//! Background check for new commits on the remote main.
//!
//! Uses only read-only git commands (`ls-remote`, `rev-parse`), so it can
//! run on a blocking thread while the foreground command mutates the
//! repository.

use tokio::task::JoinHandle;
use tracing::debug;

use super::Notice;
use crate::git::{GitError, Repository};

/// Compare the local and remote heads of `main_branch`.
///
/// Returns a notice when the remote has moved on. Missing refs on either
/// side are not an update.
pub fn check_for_updates(
    repo: &dyn Repository,
    main_branch: &str,
) -> Result<Option<Notice>, GitError> {
    let Some(remote) = repo.remote_head(main_branch)? else {
        return Ok(None);
    };
    let Some(local) = repo.local_head(main_branch)? else {
        return Ok(None);
    };

    if remote == local {
        debug!(branch = %main_branch, "main is up to date");
        return Ok(None);
    }

    debug!(branch = %main_branch, %local, %remote, "remote main has moved");
    Ok(Some(Notice::info(format!(
        "Updates are available on '{}'; run `vg pull` to fetch them.",
        main_branch
    ))))
}

/// Run [`check_for_updates`] on the blocking pool.
///
/// Failures are logged and yield `None`; an update check never produces
/// an error for the user.
pub fn spawn_update_check<R>(repo: R, main_branch: String) -> JoinHandle<Option<Notice>>
where
    R: Repository + 'static,
{
    tokio::task::spawn_blocking(move || match check_for_updates(&repo, &main_branch) {
        Ok(notice) => notice,
        Err(e) => {
            debug!(error = %e, "update check failed");
            None
        }
    })
}
