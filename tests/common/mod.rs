#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use lingo_review::cancel::CancelHandle;
use lingo_review::config::{PlatformConfig, RemoteSection};
use lingo_review::confirm::{Decision, Prompter};
use lingo_review::error::{Error, Result};
use lingo_review::issue::{Issue, Point, Position};
use lingo_review::orchestrator::ReviewReporter;
use lingo_review::remote::{EventStream, ReviewEvent, ReviewService};
use lingo_review::report::ReportWriter;
use lingo_review::request::ReviewRequest;
use lingo_review::vcs::{VcsAdapter, VcsKind};
use tokio::sync::mpsc;

pub fn run_git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} in {} failed: {}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Working repo with no commits yet.
pub fn setup_empty_git_repo() -> tempfile::TempDir {
    let repo_dir = tempfile::TempDir::new().unwrap();
    run_git(repo_dir.path(), &["init", "-q"]);
    run_git(repo_dir.path(), &["config", "user.email", "test@test.com"]);
    run_git(repo_dir.path(), &["config", "user.name", "Test"]);
    repo_dir
}

/// Create a bare remote + working repo with an initial commit pushed to main.
pub fn setup_git_repo() -> (tempfile::TempDir, tempfile::TempDir) {
    let bare_dir = tempfile::TempDir::new().unwrap();
    run_git(bare_dir.path(), &["init", "-q", "--bare"]);

    let repo_dir = setup_empty_git_repo();
    std::fs::write(repo_dir.path().join("README.md"), "hello\n").unwrap();
    run_git(repo_dir.path(), &["add", "README.md"]);
    run_git(repo_dir.path(), &["commit", "-q", "-m", "init"]);
    run_git(repo_dir.path(), &["branch", "-M", "main"]);
    run_git(
        repo_dir.path(),
        &["remote", "add", "origin", bare_dir.path().to_str().unwrap()],
    );
    run_git(repo_dir.path(), &["push", "-q", "-u", "origin", "main"]);

    (bare_dir, repo_dir)
}

/// Platform config with both VCS sections filled in.
pub fn test_config() -> PlatformConfig {
    PlatformConfig {
        service_address: "http://127.0.0.1:1".to_string(),
        token: Some("test-token".to_string()),
        timeout: None,
        git: RemoteSection {
            server_addr: Some("github.com".to_string()),
            remote_name: Some("origin".to_string()),
            depot: None,
        },
        perforce: RemoteSection {
            server_addr: Some("ssl:p4.example.com:1666".to_string()),
            remote_name: Some("perforce".to_string()),
            depot: Some("games".to_string()),
        },
    }
}

pub fn issue(name: &str) -> Issue {
    Issue {
        name: name.to_string(),
        comment: format!("{name} needs attention"),
        position: Position {
            start: Point {
                filename: "src/lib.rs".to_string(),
                line: 10,
                column: 1,
            },
            end: Point {
                filename: "src/lib.rs".to_string(),
                line: 10,
                column: 20,
            },
        },
        line_text: "let x = 1;".to_string(),
        ..Default::default()
    }
}

// --- VCS ---

#[derive(Default)]
pub struct VcsTracker {
    pub synced: usize,
}

pub struct FakeVcs {
    pub kind: VcsKind,
    /// `None` means the repository has no commits.
    pub commit: Option<String>,
    pub patches: Vec<String>,
    pub working_dir: String,
    pub tracker: Arc<Mutex<VcsTracker>>,
}

impl FakeVcs {
    pub fn git() -> Self {
        Self {
            kind: VcsKind::Git,
            commit: Some("0123456789abcdef".to_string()),
            patches: vec!["diff --git a/src/lib.rs b/src/lib.rs\n".to_string()],
            working_dir: String::new(),
            tracker: Arc::new(Mutex::new(VcsTracker::default())),
        }
    }

    pub fn perforce() -> Self {
        Self {
            kind: VcsKind::Perforce,
            commit: Some("4242".to_string()),
            ..Self::git()
        }
    }
}

impl VcsAdapter for FakeVcs {
    fn kind(&self) -> VcsKind {
        self.kind
    }

    fn sync(&self) -> Result<()> {
        self.tracker.lock().unwrap().synced += 1;
        Ok(())
    }

    fn owner_and_name_from_remote(&self) -> Result<(String, String)> {
        Ok(("acme".to_string(), "widgets".to_string()))
    }

    fn current_commit_id(&self) -> Result<String> {
        self.commit.clone().ok_or(Error::NoCommit)
    }

    fn patches(&self) -> Result<Vec<String>> {
        Ok(self.patches.clone())
    }

    fn working_dir(&self) -> Result<String> {
        Ok(self.working_dir.clone())
    }
}

// --- Review service ---

/// Replays a fixed list of events. With `keep_open` the stream never ends
/// by itself, like a service still thinking.
pub struct ScriptedService {
    script: Mutex<Vec<ReviewEvent>>,
    keep_open: bool,
    pub opened: Arc<AtomicUsize>,
    pub requests: Arc<Mutex<Vec<ReviewRequest>>>,
    senders: Mutex<Vec<mpsc::UnboundedSender<ReviewEvent>>>,
}

impl ScriptedService {
    pub fn new(events: Vec<ReviewEvent>) -> Self {
        Self {
            script: Mutex::new(events),
            keep_open: false,
            opened: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
            senders: Mutex::new(Vec::new()),
        }
    }

    pub fn issues_then_done(names: &[&str]) -> Self {
        let mut events: Vec<ReviewEvent> =
            names.iter().map(|n| ReviewEvent::Issue(issue(n))).collect();
        events.push(ReviewEvent::Done);
        Self::new(events)
    }

    pub fn keep_open(mut self) -> Self {
        self.keep_open = true;
        self
    }

    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl ReviewService for ScriptedService {
    async fn open(&self, request: &ReviewRequest, _cancel: &CancelHandle) -> Result<EventStream> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        let events = std::mem::take(&mut *self.script.lock().unwrap());
        let (tx, rx) = mpsc::unbounded_channel();
        for event in events {
            let _ = tx.send(event);
        }
        if self.keep_open {
            self.senders.lock().unwrap().push(tx);
        }
        Ok(rx)
    }
}

// --- Prompter ---

/// Answers prompts from a queue; an exhausted queue aborts.
pub struct ScriptedPrompter {
    answers: VecDeque<Decision>,
    pub asked: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new(answers: &[Decision]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            asked: Vec::new(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn confirm(&mut self, issue: &Issue) -> Result<Decision> {
        self.asked.push(issue.name.clone());
        Ok(self.answers.pop_front().unwrap_or(Decision::Abort))
    }
}

// --- Reporter / writer ---

#[derive(Default)]
pub struct ReporterLog {
    pub statuses: Vec<String>,
    pub warnings: Vec<String>,
    pub kept: Vec<usize>,
}

#[derive(Clone, Default)]
pub struct RecordingReporter {
    pub log: Arc<Mutex<ReporterLog>>,
}

impl ReviewReporter for RecordingReporter {
    fn status(&self, message: &str) {
        self.log.lock().unwrap().statuses.push(message.to_string());
    }

    fn warning(&self, message: &str) {
        self.log.lock().unwrap().warnings.push(message.to_string());
    }

    fn issues_kept(&self, count: usize) {
        self.log.lock().unwrap().kept.push(count);
    }
}

#[derive(Clone, Default)]
pub struct RecordingWriter {
    pub writes: Arc<Mutex<Vec<(PathBuf, String)>>>,
}

impl ReportWriter for RecordingWriter {
    fn write(&self, report: &str, path: &Path) -> Result<()> {
        self.writes
            .lock()
            .unwrap()
            .push((path.to_path_buf(), report.to_string()));
        Ok(())
    }
}
