//! Git history access

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Resolves commit parents for a hosted repository
#[allow(async_fn_in_trait)]
pub trait GitClient {
    /// Parent SHAs of `sha`, empty for a root commit
    async fn parents(&self, owner: &str, repository: &str, sha: &str) -> Result<Vec<String>>;
}

/// Reads parents from local clones laid out as `<root>/<owner>/<repository>`
pub struct LocalGitClient {
    root: PathBuf,
}

impl LocalGitClient {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn repository_path(&self, owner: &str, repository: &str) -> PathBuf {
        self.root.join(owner).join(repository)
    }
}

impl GitClient for LocalGitClient {
    async fn parents(&self, owner: &str, repository: &str, sha: &str) -> Result<Vec<String>> {
        let path = self.repository_path(owner, repository);
        let sha = sha.to_string();

        // gix is synchronous; keep it off the async workers
        tokio::task::spawn_blocking(move || read_parents(&path, &sha))
            .await
            .context("Parent lookup task failed")?
    }
}

fn read_parents(path: &Path, sha: &str) -> Result<Vec<String>> {
    let repo = gix::open(path)
        .with_context(|| format!("Failed to open git repository at {}", path.display()))?;
    let id = gix::ObjectId::from_hex(sha.as_bytes())
        .with_context(|| format!("Invalid commit sha: {}", sha))?;
    let commit = repo
        .find_commit(id)
        .with_context(|| format!("Commit {} not found in {}", sha, path.display()))?;

    Ok(commit
        .parent_ids()
        .map(|parent| parent.detach().to_hex().to_string())
        .collect())
}
