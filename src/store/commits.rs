//! Commit registry: the ancestry walker's visited set

use anyhow::Result;
use time::OffsetDateTime;

use crate::model::Commit;
use crate::util::to_unix;

use super::Database;

/// Ledger of commits whose follow-on work has already been enqueued.
///
/// Registering the same commit twice must succeed and leave one record, so
/// concurrent workers racing on a shared ancestor are harmless.
#[allow(async_fn_in_trait)]
pub trait CommitRegistry {
    async fn is_commit_registered(&self, owner: &str, repository: &str, sha: &str) -> Result<bool>;

    async fn register_commit(&self, commit: &Commit) -> Result<()>;
}

impl CommitRegistry for Database {
    async fn is_commit_registered(&self, owner: &str, repository: &str, sha: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM commits WHERE owner = ? AND repository = ? AND sha = ?")
            .bind(owner)
            .bind(repository)
            .bind(sha)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn register_commit(&self, commit: &Commit) -> Result<()> {
        sqlx::query(
            "INSERT INTO commits (owner, repository, sha, created_at) VALUES (?, ?, ?, ?)
             ON CONFLICT (owner, repository, sha) DO NOTHING"
        )
        .bind(&commit.owner)
        .bind(&commit.repository)
        .bind(&commit.sha)
        .bind(to_unix(OffsetDateTime::now_utc()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

impl Database {
    /// Number of registered commits for one repository
    pub async fn registered_commit_count(&self, owner: &str, repository: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM commits WHERE owner = ? AND repository = ?")
            .bind(owner)
            .bind(repository)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
