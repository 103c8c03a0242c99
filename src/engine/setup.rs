//! engine::setup
//!
//! Attaching a repository to a workspace and detaching it again.
//!
//! Three ways in, one way out:
//!
//! - [`clone_repository`](Workspace::clone_repository): `git clone` into the
//!   working directory
//! - [`init_repository`](Workspace::init_repository): `git init` with an
//!   optional origin
//! - [`attach_existing`](Workspace::attach_existing): adopt a repository
//!   that is already there
//! - [`disconnect`](Workspace::disconnect): reset the record and forget the
//!   stored token
//!
//! Every way in ends with the same record rebuild and a validation pass.
//! Whether a token is needed at all is decided by [`check_access`], which
//! asks the host for the repository's visibility.

use tracing::info;

use super::validate::detect_main_branch;
use super::{EngineError, PolicyViolation, Workspace};
use crate::core::config::{IdentityConfig, RepositoryConfig};
use crate::core::remote::RepoId;
use crate::core::types::BranchName;
use crate::credentials::Credentials;
use crate::forge::{Forge, ForgeError, Visibility};
use crate::git::GitError;

/// Ask the host whether the repository can be used with the credentials
/// at hand.
///
/// A private repository without a token is refused with `AuthRequired`.
pub async fn check_access(forge: &dyn Forge, has_token: bool) -> Result<Visibility, EngineError> {
    let visibility = forge.repository_visibility().await?;
    if !visibility.is_public() && !has_token {
        return Err(ForgeError::AuthRequired.into());
    }
    Ok(visibility)
}

impl Workspace {
    fn require_disconnected(&self) -> Result<(), EngineError> {
        if self.config.is_repository_connected {
            return Err(PolicyViolation::AlreadyConnected {
                url: self.config.repository_url.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Clone `url` into the working directory and connect to it.
    pub fn clone_repository(
        &mut self,
        url: &str,
        identity: Option<&IdentityConfig>,
    ) -> Result<(), EngineError> {
        self.require_disconnected()?;
        let id = RepoId::parse(url)?;

        {
            let _guard = self.flag.begin()?;
            self.repo.clone_from(url)?;
        }
        info!(repo = %id, "cloned repository");

        if let Some(identity) = identity {
            self.apply_identity(identity)?;
        }
        self.connect(url.trim().to_string(), None)
    }

    /// Create a repository in the working directory.
    ///
    /// HEAD is pointed at `main_branch` before the first commit, so the
    /// name does not depend on git's `init.defaultBranch`.
    pub fn init_repository(
        &mut self,
        url: Option<&str>,
        main_branch: &str,
        identity: Option<&IdentityConfig>,
    ) -> Result<(), EngineError> {
        self.require_disconnected()?;
        let main = BranchName::new(main_branch)?;
        if let Some(url) = url {
            RepoId::parse(url)?;
        }

        self.repo.init()?;
        if self.repo.current_branch()?.as_deref() != Some(main.as_str()) {
            self.repo.checkout_new(main.as_str())?;
        }
        if let Some(url) = url {
            self.repo.add_remote(url)?;
        }
        if let Some(identity) = identity {
            self.apply_identity(identity)?;
        }
        info!(main = %main.as_str(), "initialized repository");

        self.connect(
            url.map(|u| u.trim().to_string()).unwrap_or_default(),
            Some(main.into()),
        )
    }

    /// Connect to the repository already present in the working directory.
    ///
    /// A working branch that is checked out stays checked out, in edit mode.
    pub fn attach_existing(&mut self) -> Result<(), EngineError> {
        self.require_disconnected()?;
        if !self.repo.is_repository() {
            return Err(GitError::NotARepo {
                path: self.repo.workdir().to_path_buf(),
            }
            .into());
        }

        let url = self.repo.remote_url()?.unwrap_or_default();
        self.connect(url, None)
    }

    /// Detach the repository from this workspace.
    ///
    /// Nothing in the working tree changes. The stored token for the
    /// repository is removed when `credentials` is given.
    pub fn disconnect(&mut self, credentials: Option<&Credentials>) -> Result<(), EngineError> {
        let url = self.config.repository_url.clone();
        if let Some(credentials) = credentials {
            if RepoId::parse(&url).is_ok() {
                credentials.remove(&url)?;
            }
        }

        self.config.disconnect();
        self.persist()?;
        info!(url = %url, "disconnected");
        Ok(())
    }

    /// Write the commit identity into the repository's git config.
    pub fn apply_identity(&self, identity: &IdentityConfig) -> Result<(), EngineError> {
        if identity.name.is_none() && identity.email.is_none() {
            return Ok(());
        }
        self.repo
            .set_identity(identity.name.as_deref(), identity.email.as_deref())?;
        Ok(())
    }

    fn connect(&mut self, url: String, main: Option<String>) -> Result<(), EngineError> {
        let listing = self.repo.list_branches()?;
        let current = self.repo.current_branch()?;

        let main = match main {
            Some(main) => main,
            None => self
                .repo
                .remote_default_branch()?
                .or_else(|| detect_main_branch(&listing))
                .or_else(|| current.clone())
                .unwrap_or_else(|| RepositoryConfig::default().main_branch),
        };
        let current = current.unwrap_or_else(|| main.clone());
        let editing = current != main;

        let mut available = listing.all();
        available.insert(current.clone());

        self.config = RepositoryConfig {
            repository_url: url,
            is_repository_connected: true,
            main_branch: main,
            last_working_branch: if editing { current.clone() } else { String::new() },
            current_branch: current,
            available_branches: available,
            read_only_mode: !editing,
            last_synced_at: None,
        };
        self.persist()?;
        info!(
            url = %self.config.repository_url,
            main = %self.config.main_branch,
            "connected repository"
        );

        self.validate_and_enforce_branch_rules()
    }
}
