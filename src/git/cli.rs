//! git::cli
//!
//! [`Repository`] implementation that shells out to the `git` binary.
//!
//! Each method is one synchronous `git` invocation with the working
//! directory as cwd. `GIT_TERMINAL_PROMPT=0` is set so a missing credential
//! fails the command instead of blocking on a terminal prompt.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tracing::{debug, instrument};

use super::interface::{
    parse_branch_listing, parse_porcelain, BranchListing, GitError, Repository, StatusEntry,
    REMOTE,
};

/// git CLI adapter bound to one working directory.
#[derive(Debug, Clone)]
pub struct GitCli {
    workdir: PathBuf,
}

impl GitCli {
    /// Create an adapter for `workdir`. The directory need not exist yet
    /// (clone and init create it).
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    fn spawn(&self, args: &[&str], cwd: &Path) -> Result<Output, GitError> {
        debug!(?args, cwd = %cwd.display(), "running git");
        Command::new("git")
            .args(args)
            .current_dir(cwd)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| match e.kind() {
                // NotFound also covers a missing cwd, which is not a missing binary
                std::io::ErrorKind::NotFound if cwd.exists() => GitError::GitNotFound,
                _ => GitError::Io(format!("cannot run git in {}: {}", cwd.display(), e)),
            })
    }

    /// Run git in `cwd` and return trimmed stdout.
    fn run_in(&self, args: &[&str], cwd: &Path) -> Result<String, GitError> {
        let output = self.spawn(args, cwd)?;
        if !output.status.success() {
            return Err(command_failed(args, &output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }

    fn run(&self, args: &[&str]) -> Result<String, GitError> {
        self.run_in(args, &self.workdir)
    }
}

fn command_failed(args: &[&str], output: &Output) -> GitError {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let message = if stderr.is_empty() {
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            format!("exit status {}", output.status.code().unwrap_or(-1))
        } else {
            stdout
        }
    } else {
        stderr
    };
    GitError::CommandFailed {
        command: args.join(" "),
        message,
    }
}

impl Repository for GitCli {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn is_repository(&self) -> bool {
        self.workdir.join(".git").exists()
    }

    #[instrument(skip(self))]
    fn current_branch(&self) -> Result<Option<String>, GitError> {
        if !self.is_repository() {
            return Err(GitError::NotARepo {
                path: self.workdir.clone(),
            });
        }
        let name = self.run(&["branch", "--show-current"])?;
        let name = name.trim();
        Ok(if name.is_empty() {
            None
        } else {
            Some(name.to_string())
        })
    }

    #[instrument(skip(self))]
    fn status(&self) -> Result<Vec<StatusEntry>, GitError> {
        Ok(parse_porcelain(&self.run(&["status", "--porcelain"])?))
    }

    #[instrument(skip(self))]
    fn add_all(&self) -> Result<(), GitError> {
        self.run(&["add", "."]).map(drop)
    }

    #[instrument(skip(self, message))]
    fn commit(&self, message: &str) -> Result<(), GitError> {
        self.run(&["commit", "-m", message]).map(drop)
    }

    #[instrument(skip(self))]
    fn push(&self, branch: &str) -> Result<(), GitError> {
        self.run(&["push", REMOTE, branch]).map(drop)
    }

    #[instrument(skip(self))]
    fn pull(&self, branch: &str) -> Result<(), GitError> {
        // Explicit strategy: git refuses to reconcile divergent branches otherwise
        self.run(&["pull", "--no-rebase", "--no-edit", REMOTE, branch])
            .map(drop)
    }

    #[instrument(skip(self))]
    fn fetch(&self) -> Result<(), GitError> {
        self.run(&["fetch", REMOTE]).map(drop)
    }

    #[instrument(skip(self))]
    fn behind_count(&self, branch: &str) -> Result<u32, GitError> {
        let range = format!("HEAD..{}/{}", REMOTE, branch);
        let args = ["rev-list", "--count", range.as_str()];
        let output = self.run(&args)?;
        output
            .trim()
            .parse()
            .map_err(|_| GitError::UnexpectedOutput {
                command: args.join(" "),
                output,
            })
    }

    #[instrument(skip(self))]
    fn checkout(&self, branch: &str) -> Result<(), GitError> {
        self.run(&["checkout", branch]).map(drop)
    }

    #[instrument(skip(self))]
    fn checkout_new(&self, branch: &str) -> Result<(), GitError> {
        self.run(&["checkout", "-b", branch]).map(drop)
    }

    #[instrument(skip(self))]
    fn list_branches(&self) -> Result<BranchListing, GitError> {
        Ok(parse_branch_listing(&self.run(&["branch", "-a"])?))
    }

    #[instrument(skip(self))]
    fn remote_default_branch(&self) -> Result<Option<String>, GitError> {
        Ok(parse_branch_listing(&self.run(&["branch", "-r"])?).remote_head)
    }

    #[instrument(skip(self))]
    fn rename_current_branch(&self, new_name: &str) -> Result<(), GitError> {
        self.run(&["branch", "-M", new_name]).map(drop)
    }

    #[instrument(skip(self))]
    fn delete_branch(&self, branch: &str) -> Result<(), GitError> {
        self.run(&["branch", "-d", branch]).map(drop)
    }

    #[instrument(skip(self))]
    fn remote_branch_exists(&self, branch: &str) -> Result<bool, GitError> {
        let args = ["ls-remote", "--exit-code", REMOTE, branch];
        let output = self.spawn(&args, &self.workdir)?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(2) => Ok(false),
            _ => Err(command_failed(&args, &output)),
        }
    }

    #[instrument(skip(self))]
    fn remote_head(&self, branch: &str) -> Result<Option<String>, GitError> {
        let refname = format!("refs/heads/{}", branch);
        let output = self.run(&["ls-remote", REMOTE, refname.as_str()])?;
        Ok(output
            .lines()
            .filter_map(|line| line.split_once('\t'))
            .find(|(_, name)| *name == refname)
            .map(|(oid, _)| oid.to_string()))
    }

    #[instrument(skip(self))]
    fn local_head(&self, branch: &str) -> Result<Option<String>, GitError> {
        let args = ["rev-parse", "--verify", "--quiet", branch];
        let output = self.spawn(&args, &self.workdir)?;
        if output.status.success() {
            let oid = String::from_utf8_lossy(&output.stdout).trim().to_string();
            Ok(Some(oid))
        } else if output.status.code() == Some(1) {
            Ok(None)
        } else {
            Err(command_failed(&args, &output))
        }
    }

    #[instrument(skip(self, url))]
    fn clone_from(&self, url: &str) -> Result<(), GitError> {
        let parent = self
            .workdir
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)
            .map_err(|e| GitError::Io(format!("cannot create {}: {}", parent.display(), e)))?;
        let target = self.workdir.to_string_lossy();
        self.run_in(&["clone", url, target.as_ref()], parent)
            .map(drop)
    }

    #[instrument(skip(self))]
    fn init(&self) -> Result<(), GitError> {
        std::fs::create_dir_all(&self.workdir).map_err(|e| {
            GitError::Io(format!("cannot create {}: {}", self.workdir.display(), e))
        })?;
        self.run(&["init"]).map(drop)
    }

    #[instrument(skip(self))]
    fn set_identity(&self, name: Option<&str>, email: Option<&str>) -> Result<(), GitError> {
        if let Some(name) = name {
            self.run(&["config", "user.name", name])?;
        }
        if let Some(email) = email {
            self.run(&["config", "user.email", email])?;
        }
        Ok(())
    }

    #[instrument(skip(self, url))]
    fn add_remote(&self, url: &str) -> Result<(), GitError> {
        self.run(&["remote", "add", REMOTE, url]).map(drop)
    }

    #[instrument(skip(self))]
    fn remote_url(&self) -> Result<Option<String>, GitError> {
        let args = ["remote", "get-url", REMOTE];
        let output = self.spawn(&args, &self.workdir)?;
        if output.status.success() {
            let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
            Ok(Some(url))
        } else if output.status.code() == Some(2) {
            // "error: No such remote 'origin'"
            Ok(None)
        } else {
            Err(command_failed(&args, &output))
        }
    }
}
