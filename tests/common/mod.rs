// Shared test fixtures for integration tests
// Functions here are used across different test files
#![allow(dead_code)]

use anyhow::{Result, anyhow};
use credwalk::git::GitClient;
use credwalk::model::{Credential, NewRepository, NewScan, ScanType};
use credwalk::notify::{Notification, Router};
use credwalk::queue::{IdGenerator, Task, TaskPlan, TaskQueue};
use credwalk::rescan::Scanner;
use credwalk::store::Database;
use git2::{Repository, Signature};
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;
use time::OffsetDateTime;

/// Create an in-memory test database with schema
pub async fn create_test_db() -> Database {
    let db = Database::new(":memory:").await.unwrap();
    db.init_schema().await.unwrap();
    db
}

pub fn new_repository(owner: &str, name: &str) -> NewRepository {
    NewRepository {
        path: format!("/repos/{}/{}", owner, name),
        ssh_url: format!("git@github.com:{}/{}.git", owner, name),
        private: true,
        default_branch: "master".to_string(),
        raw_json: serde_json::json!({ "name": name, "owner": { "login": owner } }),
        ..NewRepository::new(owner, name)
    }
}

pub fn new_scan(owner: &str, repository: &str, rules_version: i64, start: &str, stop: &str) -> NewScan {
    let now = OffsetDateTime::now_utc();
    NewScan {
        owner: owner.to_string(),
        repository: repository.to_string(),
        rules_version,
        scan_type: ScanType::Diff,
        branch: "master".to_string(),
        start_sha: start.to_string(),
        stop_sha: stop.to_string(),
        scan_start: now,
        scan_end: now,
    }
}

/// Ids "task-1", "task-2", ... in call order
#[derive(Default)]
pub struct SequentialIds {
    next: AtomicUsize,
}

impl IdGenerator for SequentialIds {
    fn generate(&self) -> String {
        format!("task-{}", self.next.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Queue that records tasks and can be told to fail from the nth enqueue on
#[derive(Default)]
pub struct RecordingQueue {
    tasks: Mutex<Vec<Task>>,
    fail_from: Option<usize>,
    attempts: AtomicUsize,
}

impl RecordingQueue {
    pub fn failing_from(n: usize) -> Self {
        Self { fail_from: Some(n), ..Self::default() }
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.lock().unwrap().clone()
    }

    pub fn plans(&self) -> Vec<TaskPlan> {
        self.tasks().into_iter().map(|task| task.plan).collect()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.tasks().iter().filter(|task| task.kind() == kind).count()
    }
}

impl TaskQueue for RecordingQueue {
    async fn enqueue(&self, task: Task) -> Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_from.is_some_and(|n| attempt >= n) {
            return Err(anyhow!("queue unavailable"));
        }
        self.tasks.lock().unwrap().push(task);
        Ok(())
    }
}

/// Commit graph held in memory: sha -> parents
#[derive(Default)]
pub struct FakeGitClient {
    parents: FxHashMap<String, Vec<String>>,
    calls: AtomicUsize,
}

impl FakeGitClient {
    pub fn with_commit(mut self, sha: &str, parents: &[&str]) -> Self {
        self.parents
            .insert(sha.to_string(), parents.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl GitClient for FakeGitClient {
    async fn parents(&self, _owner: &str, _repository: &str, sha: &str) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.parents
            .get(sha)
            .cloned()
            .ok_or_else(|| anyhow!("commit {} not found", sha))
    }
}

/// Returns canned findings keyed by stop sha; unknown ranges fail
#[derive(Default)]
pub struct FakeScanner {
    results: FxHashMap<String, Vec<Credential>>,
    calls: Mutex<Vec<(String, String, String)>>,
}

impl FakeScanner {
    pub fn with_result(mut self, stop_sha: &str, credentials: Vec<Credential>) -> Self {
        self.results.insert(stop_sha.to_string(), credentials);
        self
    }

    /// (branch, start, stop) per call
    pub fn calls(&self) -> Vec<(String, String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Scanner for FakeScanner {
    async fn scan(
        &self,
        _owner: &str,
        _repository: &str,
        _excluded_paths: &FxHashSet<String>,
        branch: &str,
        start_sha: &str,
        stop_sha: &str,
    ) -> Result<Vec<Credential>> {
        self.calls
            .lock()
            .unwrap()
            .push((branch.to_string(), start_sha.to_string(), stop_sha.to_string()));
        self.results
            .get(stop_sha)
            .cloned()
            .ok_or_else(|| anyhow!("scan of {} failed", stop_sha))
    }
}

/// Records delivered batches; optionally fails every delivery
#[derive(Default)]
pub struct FakeRouter {
    batches: Mutex<Vec<Vec<Notification>>>,
    fail: bool,
}

impl FakeRouter {
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn batches(&self) -> Vec<Vec<Notification>> {
        self.batches.lock().unwrap().clone()
    }
}

impl Router for FakeRouter {
    async fn deliver(&self, batch: &[Notification]) -> Result<()> {
        self.batches.lock().unwrap().push(batch.to_vec());
        if self.fail {
            return Err(anyhow!("router unavailable"));
        }
        Ok(())
    }
}

/// Create a temporary git repository at `<root>/<owner>/<name>`
pub fn create_test_repo(owner: &str, name: &str) -> (TempDir, PathBuf, Repository) {
    let dir = TempDir::new().unwrap();
    let repo_path = dir.path().join(owner).join(name);
    std::fs::create_dir_all(&repo_path).unwrap();
    let repo = Repository::init(&repo_path).unwrap();

    // Configure git user for commits
    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Test User").unwrap();
    config.set_str("user.email", "test@example.com").unwrap();

    (dir, repo_path, repo)
}

/// Write files and commit them with explicit parents (no ref is updated)
pub fn commit_with_parents(
    repo: &Repository,
    files: &[(&str, &str)],
    message: &str,
    parents: &[git2::Oid],
) -> git2::Oid {
    let sig = Signature::now("Test User", "test@example.com").unwrap();

    let mut index = repo.index().unwrap();
    for (path, content) in files {
        let full_path = repo.workdir().unwrap().join(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&full_path, content).unwrap();
        index.add_path(std::path::Path::new(path)).unwrap();
    }
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let parent_commits: Vec<git2::Commit<'_>> = parents
        .iter()
        .map(|oid| repo.find_commit(*oid).unwrap())
        .collect();
    let parent_refs: Vec<&git2::Commit<'_>> = parent_commits.iter().collect();

    repo.commit(None, &sig, &sig, message, &tree, &parent_refs).unwrap()
}
