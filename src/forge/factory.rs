//! forge::factory
//!
//! Forge selection and creation.
//!
//! # Design
//!
//! Commands and the engine build forges through [`create_forge`] instead of
//! naming `GitHubForge` directly, so tests can hand the engine a
//! [`MockForge`](super::mock::MockForge) through the same `Box<dyn Forge>`
//! seam.
//!
//! # Host Detection
//!
//! The remote URL is parsed once with [`RepoId::parse`]. `github.com` maps to
//! `https://api.github.com`; any other host is treated as GitHub Enterprise
//! Server (`https://<host>/api/v3`) unless it is a well-known non-GitHub
//! host, which is rejected up front.
//!
//! # Example
//!
//! ```ignore
//! use vaultgate::forge::create_forge;
//!
//! let forge = create_forge("git@github.com:owner/vault.git", Some(token), None)?;
//! let prs = forge.list_open_prs().await?;
//! ```

use tracing::debug;

use super::github::GitHubForge;
use super::traits::{Forge, ForgeError};
use crate::core::remote::RepoId;

/// Hosts that are known not to speak the GitHub API.
const NON_GITHUB_HOSTS: &[&str] = &["gitlab.com", "bitbucket.org", "codeberg.org"];

/// Whether the remote at `remote_url` can be driven by `GitHubForge`.
pub fn is_supported_remote(remote_url: &str) -> bool {
    RepoId::parse(remote_url).is_ok_and(|id| !NON_GITHUB_HOSTS.contains(&id.host.as_str()))
}

/// Create a forge from a remote URL and an optional token.
///
/// `api_base_override` replaces the host-derived API base (configured via
/// `api_base` in the global config).
///
/// # Errors
///
/// - `ForgeError::UnsupportedRemote` if the URL cannot be parsed or names a
///   non-GitHub host
pub fn create_forge(
    remote_url: &str,
    token: Option<String>,
    api_base_override: Option<&str>,
) -> Result<Box<dyn Forge>, ForgeError> {
    let id = RepoId::parse(remote_url)
        .map_err(|_| ForgeError::UnsupportedRemote(remote_url.to_string()))?;

    if NON_GITHUB_HOSTS.contains(&id.host.as_str()) {
        return Err(ForgeError::UnsupportedRemote(format!(
            "{} is not a GitHub host",
            id.host
        )));
    }

    let forge = match api_base_override {
        Some(base) => GitHubForge::with_api_base(&id, token, base),
        None => GitHubForge::new(&id, token),
    };
    debug!(forge = ?forge, "created forge");
    Ok(Box::new(forge))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn github_urls_create_github_forge() {
        for url in [
            "git@github.com:owner/vault.git",
            "https://github.com/owner/vault",
            "github.com/owner/vault",
        ] {
            let forge = create_forge(url, Some("t".into()), None).unwrap();
            assert_eq!(forge.name(), "github", "{url}");
        }
    }

    #[test]
    fn enterprise_host_is_accepted() {
        assert!(is_supported_remote("https://ghe.corp.net/team/notes.git"));
        assert!(create_forge("https://ghe.corp.net/team/notes.git", None, None).is_ok());
    }

    #[test]
    fn non_github_host_rejected() {
        assert!(!is_supported_remote("git@gitlab.com:owner/project.git"));
        assert!(matches!(
            create_forge("git@gitlab.com:owner/project.git", None, None),
            Err(ForgeError::UnsupportedRemote(_))
        ));
    }

    #[test]
    fn unparseable_url_rejected() {
        assert!(matches!(
            create_forge("not-a-url", None, None),
            Err(ForgeError::UnsupportedRemote(_))
        ));
    }
}
