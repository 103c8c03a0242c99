//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Validates command-specific arguments
//! 2. Calls the engine to execute the command
//! 3. Formats and displays output
//!
//! Handlers do NOT perform repository mutations directly.
//!
//! # Sessions
//!
//! Commands against a workspace open a [`Session`]: the global config, the
//! [`Workspace`] with its startup validation, and for mutating commands the
//! cross-process [`WorkspaceLock`]. Notices the engine produced are printed
//! when the session finishes, along with the result of the background
//! update check when one was started.
//!
//! # Async Commands
//!
//! Pull request and clone commands talk to the host API. They build a
//! tokio runtime and `block_on` the async part, keeping the rest of the CLI
//! synchronous. The session keeps a separate runtime for the update check
//! so it can be abandoned without waiting.

mod auth;
mod branch;
mod completion;
mod mode;
mod pr;
mod save;
mod setup;
mod status;

pub use auth::auth;
pub use branch::branch;
pub use completion::completion;
pub use mode::{edit, pull, read_only, switch, validate};
pub use pr::pr;
pub use save::save;
pub use setup::{attach, clone, disconnect, init};
pub use status::status;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as _, Result};
use tokio::runtime::Runtime;
use tokio::task::JoinHandle;

use crate::cli::args::Command;
use crate::core::config::{Config, FileConfigStore};
use crate::core::lock::WorkspaceLock;
use crate::credentials::Credentials;
use crate::engine::{updates, Context, EngineError, Notice, Workspace};
use crate::git::GitCli;
use crate::ui::output::{self, Verbosity};

/// How long a finishing command waits for the update check.
const UPDATE_CHECK_WAIT: Duration = Duration::from_secs(3);

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Status => status(ctx),
        Command::Validate => validate(ctx),
        Command::Edit { branch } => edit(ctx, branch.as_deref()),
        Command::ReadOnly { no_save_check } => read_only(ctx, !no_save_check),
        Command::Switch { branch } => switch(ctx, &branch),
        Command::Branch { action } => branch(ctx, action),
        Command::Save {
            draft,
            push,
            message,
        } => save(ctx, draft, push, message.as_deref()),
        Command::Pull => pull(ctx),
        Command::Pr { action } => pr(ctx, action),
        Command::Auth {
            token,
            url,
            status,
            logout,
        } => auth(ctx, token.as_deref(), url.as_deref(), status, logout),
        Command::Clone { url, dir, token } => clone(ctx, &url, dir, token.as_deref()),
        Command::Init { url, main } => init(ctx, url.as_deref(), main.as_deref()),
        Command::Attach => attach(ctx),
        Command::Disconnect { keep_token } => disconnect(ctx, keep_token),
        Command::Completion { shell } => completion(shell),
    }
}

/// The directory commands operate on.
pub(crate) fn workdir(ctx: &Context) -> Result<PathBuf> {
    match &ctx.cwd {
        Some(dir) => Ok(dir.clone()),
        None => std::env::current_dir().context("Failed to determine current directory"),
    }
}

/// Load global config, failing with the file that could not be read.
pub(crate) fn load_config() -> Result<Config> {
    Config::load().context("Failed to load configuration")
}

pub(crate) fn credentials(config: &Config) -> Result<Credentials> {
    Credentials::from_config(config).context("Failed to initialize secret store")
}

/// An open workspace for the duration of one command.
pub(crate) struct Session {
    pub ws: Workspace,
    pub config: Config,
    pub verbosity: Verbosity,
    update_check: Option<JoinHandle<Option<Notice>>>,
    runtime: Option<Runtime>,
    _lock: Option<WorkspaceLock>,
}

impl Session {
    /// Open the workspace for a read-only command.
    pub fn open(ctx: &Context) -> Result<Self> {
        Self::open_inner(ctx, false)
    }

    /// Open the workspace and take the workspace lock.
    pub fn open_mutating(ctx: &Context) -> Result<Self> {
        Self::open_inner(ctx, true)
    }

    fn open_inner(ctx: &Context, mutating: bool) -> Result<Self> {
        let dir = workdir(ctx)?;
        let config = load_config()?;
        let lock = if mutating {
            Some(WorkspaceLock::for_workspace(&dir).context("Failed to lock workspace")?)
        } else {
            None
        };

        let store = FileConfigStore::for_workspace(&dir)
            .context("Failed to locate workspace state")?;
        let ws = Workspace::open(Box::new(GitCli::new(&dir)), Box::new(store));

        Ok(Self {
            ws,
            config,
            verbosity: Verbosity::from_flags(ctx.quiet, ctx.debug),
            update_check: None,
            runtime: None,
            _lock: lock,
        })
    }

    /// Runtime that hosts the background update check.
    fn runtime(&mut self) -> Result<&Runtime> {
        if self.runtime.is_none() {
            self.runtime = Some(Runtime::new().context("Failed to start async runtime")?);
        }
        self.runtime
            .as_ref()
            .context("Failed to start async runtime")
    }

    /// Start the remote update check when enabled and connected.
    pub fn start_update_check(&mut self) -> Result<()> {
        if !self.config.check_updates_on_start() || !self.ws.is_connected() {
            return Ok(());
        }
        let repo = GitCli::new(self.ws.workdir());
        let main = self.ws.config().main_branch.clone();
        let handle = {
            let runtime = self.runtime()?;
            let _enter = runtime.enter();
            updates::spawn_update_check(repo, main)
        };
        self.update_check = Some(handle);
        Ok(())
    }

    /// Run an engine call, printing the notices it left behind if it fails.
    pub fn run<T>(
        &mut self,
        f: impl FnOnce(&mut Workspace) -> Result<T, EngineError>,
    ) -> Result<T> {
        match f(&mut self.ws) {
            Ok(value) => Ok(value),
            Err(e) => {
                self.flush_notices();
                Err(e.into())
            }
        }
    }

    /// Print pending notices.
    pub fn flush_notices(&mut self) {
        output::notices(&self.ws.take_notices(), self.verbosity);
    }

    /// Print notices, then wait briefly for the update check.
    pub fn finish(mut self) {
        self.flush_notices();
        if let (Some(handle), Some(runtime)) = (self.update_check.take(), self.runtime.as_ref()) {
            let result = runtime.block_on(tokio::time::timeout(UPDATE_CHECK_WAIT, handle));
            if let Ok(Ok(Some(notice))) = result {
                output::notice(&notice, self.verbosity);
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // A stalled `ls-remote` must not hold the process open.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
