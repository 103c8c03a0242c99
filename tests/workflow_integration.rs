//! Integration tests for the editing workflow.
//!
//! These tests drive a [`Workspace`] over real git repositories created in
//! temp dirs: a bare repository stands in for GitHub, and a second clone
//! plays a collaborator pushing from elsewhere.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

use vaultgate::core::config::MemoryConfigStore;
use vaultgate::engine::updates::check_for_updates;
use vaultgate::engine::{
    EngineError, InputRequest, Mode, SaveDecision, SaveOutcome, Transition, Workspace,
};
use vaultgate::git::{GitCli, Repository};

// =============================================================================
// Test Fixtures
// =============================================================================

/// A bare remote with one commit on main, and a working clone of it.
struct Fixture {
    remote: TempDir,
    work: TempDir,
    store: MemoryConfigStore,
}

impl Fixture {
    fn new() -> Self {
        let remote = TempDir::new().expect("failed to create temp dir");
        run_git(remote.path(), &["init", "-q", "--bare"]);
        run_git(remote.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);

        let work = TempDir::new().expect("failed to create temp dir");
        run_git(work.path(), &["init", "-q"]);
        configure(work.path());
        run_git(work.path(), &["checkout", "-q", "-b", "main"]);
        std::fs::write(work.path().join("README.md"), "# Vault\n").unwrap();
        run_git(work.path(), &["add", "."]);
        run_git(work.path(), &["commit", "-q", "-m", "Initial commit"]);
        run_git(work.path(), &["remote", "add", "origin", url(remote.path()).as_str()]);
        run_git(work.path(), &["push", "-q", "origin", "main"]);

        Self {
            remote,
            work,
            store: MemoryConfigStore::new(),
        }
    }

    fn path(&self) -> &Path {
        self.work.path()
    }

    fn git(&self) -> GitCli {
        GitCli::new(self.path())
    }

    /// Open a workspace over the working clone, sharing one state store.
    fn workspace(&self) -> Workspace {
        Workspace::open(Box::new(self.git()), Box::new(self.store.clone()))
    }

    /// Open and connect.
    fn attached(&self) -> Workspace {
        let mut ws = self.workspace();
        ws.attach_existing().expect("attach failed");
        ws
    }

    fn write(&self, name: &str, content: &str) {
        std::fs::write(self.path().join(name), content).unwrap();
    }

    /// A second clone of the remote, for changes made elsewhere.
    fn collaborator(&self) -> (TempDir, GitCli) {
        let dir = TempDir::new().expect("failed to create temp dir");
        let path = dir.path().join("clone");
        run_git(
            dir.path(),
            &["clone", "-q", url(self.remote.path()).as_str(), "clone"],
        );
        configure(&path);
        (dir, GitCli::new(path))
    }

    fn current_branch(&self) -> String {
        self.git().current_branch().unwrap().unwrap_or_default()
    }
}

fn url(path: &Path) -> String {
    path.to_str().expect("temp path is utf-8").to_string()
}

fn configure(dir: &Path) {
    run_git(dir, &["config", "user.email", "test@example.com"]);
    run_git(dir, &["config", "user.name", "Test User"]);
    run_git(dir, &["config", "core.editor", "true"]);
}

fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

// =============================================================================
// Connecting
// =============================================================================

#[test]
fn attach_starts_read_only_on_main() {
    let fx = Fixture::new();
    let ws = fx.attached();

    assert_eq!(ws.mode(), Mode::ReadOnlyOnMain);
    assert_eq!(ws.config().main_branch, "main");
    assert_eq!(ws.config().repository_url, url(fx.remote.path()));
    assert!(ws.config().available_branches.contains("main"));
    assert!(fx.store.snapshot().unwrap().is_repository_connected);
}

#[test]
fn reopened_workspace_keeps_its_state() {
    let fx = Fixture::new();
    let mut ws = fx.attached();
    ws.enter_edit_mode(Some("drafts")).unwrap();
    drop(ws);

    let ws = fx.workspace();
    assert_eq!(ws.mode(), Mode::EditingOnBranch("drafts".into()));
    assert_eq!(fx.current_branch(), "drafts");
}

// =============================================================================
// Editing and Saving
// =============================================================================

#[test]
fn new_branch_push_offers_pull_request() {
    let fx = Fixture::new();
    let mut ws = fx.attached();

    let transition = ws.enter_edit_mode(Some("notes/weekly")).unwrap();
    assert_eq!(transition, Transition::Applied);
    assert_eq!(fx.current_branch(), "notes/weekly");

    fx.write("weekly.md", "monday\n");
    let outcome = ws.save_and_push("Weekly notes").unwrap();

    assert_eq!(outcome.pushed_branch, "notes/weekly");
    assert!(outcome.offer_pull_request);
    assert!(outcome.committed);
    assert_eq!(ws.mode(), Mode::ReadOnlyOnMain);
    assert_eq!(fx.current_branch(), "main");
    assert!(fx.git().remote_branch_exists("notes/weekly").unwrap());
    assert!(!fx.path().join("weekly.md").exists());
}

#[test]
fn second_push_of_branch_does_not_offer_pull_request() {
    let fx = Fixture::new();
    let mut ws = fx.attached();

    ws.enter_edit_mode(Some("journal")).unwrap();
    fx.write("a.md", "a");
    ws.save_and_push("a").unwrap();

    ws.enter_edit_mode(Some("journal")).unwrap();
    fx.write("b.md", "b");
    let outcome = ws.save_and_push("b").unwrap();
    assert!(!outcome.offer_pull_request);
}

#[test]
fn draft_stays_local() {
    let fx = Fixture::new();
    let mut ws = fx.attached();

    ws.enter_edit_mode(Some("draft")).unwrap();
    fx.write("idea.md", "maybe\n");
    ws.save_as_draft("wip").unwrap();

    assert_eq!(ws.mode(), Mode::ReadOnlyOnMain);
    assert_eq!(fx.current_branch(), "main");
    assert!(fx.git().local_head("draft").unwrap().is_some());
    assert!(!fx.git().remote_branch_exists("draft").unwrap());
    assert!(!fx.git().has_uncommitted_changes().unwrap());
}

#[test]
fn leaving_edit_mode_asks_about_changes() {
    let fx = Fixture::new();
    let mut ws = fx.attached();

    ws.enter_edit_mode(Some("draft")).unwrap();
    fx.write("note.md", "unsaved");

    let transition = ws.enter_read_only_mode(true).unwrap();
    let Transition::NeedsInput(InputRequest::SaveDecision {
        branch,
        changed_files,
    }) = transition
    else {
        panic!("expected a save decision, got {:?}", transition);
    };
    assert_eq!(branch, "draft");
    assert_eq!(changed_files, vec!["note.md".to_string()]);
    assert_eq!(fx.current_branch(), "draft");

    let outcome = ws.resume_save(SaveDecision::Draft("keep".into())).unwrap();
    assert_eq!(outcome, SaveOutcome::Drafted);
    assert_eq!(fx.current_branch(), "main");
}

#[test]
fn push_pulls_branch_first_when_remote_is_ahead() {
    let fx = Fixture::new();
    let mut ws = fx.attached();

    ws.enter_edit_mode(Some("shared")).unwrap();
    fx.write("a.md", "a");
    ws.save_and_push("a").unwrap();

    let (_dir, other) = fx.collaborator();
    other.checkout("shared").unwrap();
    std::fs::write(other.workdir().join("b.md"), "b").unwrap();
    other.commit_all("b").unwrap();
    other.push("shared").unwrap();

    ws.enter_edit_mode(Some("shared")).unwrap();
    fx.write("c.md", "c");
    let outcome = ws.save_and_push("c").unwrap();

    assert!(!outcome.offer_pull_request);
    let git = fx.git();
    assert_eq!(
        git.local_head("shared").unwrap(),
        git.remote_head("shared").unwrap()
    );
    run_git(fx.path(), &["cat-file", "-e", "shared:b.md"]);
    run_git(fx.path(), &["cat-file", "-e", "shared:c.md"]);
}

#[test]
fn editing_main_is_rejected_without_touching_git() {
    let fx = Fixture::new();
    let mut ws = fx.attached();
    fx.write("stray.md", "x");

    let err = ws.enter_edit_mode(Some("main")).unwrap_err();
    assert!(err.is_policy());
    assert!(matches!(err, EngineError::Policy(_)));
    assert_eq!(fx.current_branch(), "main");
    assert!(fx.git().has_uncommitted_changes().unwrap());
}

// =============================================================================
// Main Updates
// =============================================================================

#[test]
fn pull_main_brings_in_remote_commits() {
    let fx = Fixture::new();
    let mut ws = fx.attached();
    assert!(check_for_updates(ws.repository(), "main").unwrap().is_none());

    let (_dir, other) = fx.collaborator();
    std::fs::write(other.workdir().join("news.md"), "news").unwrap();
    other.commit_all("news").unwrap();
    other.push("main").unwrap();

    let notice = check_for_updates(ws.repository(), "main").unwrap();
    assert!(notice.is_some());

    ws.pull_main().unwrap();
    assert!(fx.path().join("news.md").exists());
    assert!(ws.config().last_synced_at.is_some());
    assert!(check_for_updates(ws.repository(), "main").unwrap().is_none());
}

#[test]
fn pull_main_refused_while_editing() {
    let fx = Fixture::new();
    let mut ws = fx.attached();
    ws.enter_edit_mode(Some("draft")).unwrap();

    assert!(ws.pull_main().unwrap_err().is_policy());
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn manual_checkout_is_corrected_on_open() {
    let fx = Fixture::new();
    drop(fx.attached());

    run_git(fx.path(), &["checkout", "-q", "-b", "stray"]);
    let ws = fx.workspace();

    assert_eq!(ws.mode(), Mode::ReadOnlyOnMain);
    assert_eq!(fx.current_branch(), "main");
}

#[test]
fn deleting_pushed_branch_keeps_name_available() {
    let fx = Fixture::new();
    let mut ws = fx.attached();

    // Nothing to commit: the branch is pushed at main's commit, so git
    // considers it merged and lets it go.
    ws.enter_edit_mode(Some("topic")).unwrap();
    let outcome = ws.save_and_push("").unwrap();
    assert!(!outcome.committed);
    ws.delete_branch("topic").unwrap();

    assert!(fx.git().local_head("topic").unwrap().is_none());
    assert!(ws.config().available_branches.contains("topic"));
    assert_eq!(ws.config().last_working_branch, "topic");
}
