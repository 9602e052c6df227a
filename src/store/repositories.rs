//! Repository bookkeeping: discovery, clone/fetch status and failure tracking

use anyhow::{Context, Result};
use serde_json::Value;
use sqlx::{Row, sqlite::SqliteRow};
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::model::{Fetch, NewRepository, Repository};
use crate::util::{from_unix, to_unix};

use super::{Database, FAILED_FETCH_THRESHOLD, StoreError};

const REPOSITORY_COLUMNS: &str = "id, owner, name, path, ssh_url, private, default_branch, raw_json, \
     cloned, disabled, failed_fetches, created_at, updated_at";

fn repository_from_row(row: &SqliteRow) -> Result<Repository> {
    let raw_json: String = row.try_get("raw_json")?;
    Ok(Repository {
        id: row.try_get("id")?,
        owner: row.try_get("owner")?,
        name: row.try_get("name")?,
        path: row.try_get("path")?,
        ssh_url: row.try_get("ssh_url")?,
        private: row.try_get("private")?,
        default_branch: row.try_get("default_branch")?,
        raw_json: serde_json::from_str(&raw_json).context("Invalid raw_json on repository row")?,
        cloned: row.try_get("cloned")?,
        disabled: row.try_get("disabled")?,
        failed_fetches: row.try_get("failed_fetches")?,
        created_at: from_unix(row.try_get("created_at")?),
        updated_at: from_unix(row.try_get("updated_at")?),
    })
}

fn repositories_from_rows(rows: &[SqliteRow]) -> Result<Vec<Repository>> {
    rows.iter().map(repository_from_row).collect()
}

impl Database {
    /// Insert the repository unless one with the same owner and name exists,
    /// returning the stored row either way
    pub async fn find_or_create(&self, repository: &NewRepository) -> Result<Repository> {
        let now = to_unix(OffsetDateTime::now_utc());
        sqlx::query(
            "INSERT INTO repositories
                (owner, name, path, ssh_url, private, default_branch, raw_json,
                 cloned, failed_fetches, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (owner, name) DO NOTHING"
        )
        .bind(&repository.owner)
        .bind(&repository.name)
        .bind(&repository.path)
        .bind(&repository.ssh_url)
        .bind(repository.private)
        .bind(&repository.default_branch)
        .bind(serde_json::to_string(&repository.raw_json)?)
        .bind(repository.cloned)
        .bind(repository.failed_fetches)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_repository(&repository.owner, &repository.name)
            .await?
            .ok_or_else(|| StoreError::repository_not_found(&repository.owner, &repository.name).into())
    }

    /// Insert a repository; fails if the owner/name pair is already stored
    pub async fn create(&self, repository: &NewRepository) -> Result<Repository> {
        let now = to_unix(OffsetDateTime::now_utc());
        let row = sqlx::query(&format!(
            "INSERT INTO repositories
                (owner, name, path, ssh_url, private, default_branch, raw_json,
                 cloned, failed_fetches, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {}",
            REPOSITORY_COLUMNS
        ))
        .bind(&repository.owner)
        .bind(&repository.name)
        .bind(&repository.path)
        .bind(&repository.ssh_url)
        .bind(repository.private)
        .bind(&repository.default_branch)
        .bind(serde_json::to_string(&repository.raw_json)?)
        .bind(repository.cloned)
        .bind(repository.failed_fetches)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to create repository {}/{}", repository.owner, repository.name))?;

        repository_from_row(&row)
    }

    pub async fn find_repository(&self, owner: &str, name: &str) -> Result<Option<Repository>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM repositories WHERE owner = ? AND name = ?",
            REPOSITORY_COLUMNS
        ))
        .bind(owner)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(repository_from_row).transpose()
    }

    pub async fn all_repositories(&self) -> Result<Vec<Repository>> {
        let rows = sqlx::query(&format!("SELECT {} FROM repositories ORDER BY id", REPOSITORY_COLUMNS))
            .fetch_all(&self.pool)
            .await?;
        repositories_from_rows(&rows)
    }

    /// Record a successful clone and where it lives on disk
    pub async fn mark_as_cloned(&self, owner: &str, name: &str, path: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE repositories SET cloned = 1, path = ?, updated_at = ?
             WHERE owner = ? AND name = ?"
        )
        .bind(path)
        .bind(to_unix(OffsetDateTime::now_utc()))
        .bind(owner)
        .bind(name)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::repository_not_found(owner, name).into());
        }
        Ok(())
    }

    /// Count one more failed fetch, disabling the repository once the
    /// threshold is reached. A disabled repository is never re-enabled here.
    pub async fn register_failed_fetch(&self, repository: &Repository) -> Result<Repository> {
        let row = sqlx::query(&format!(
            "UPDATE repositories
             SET failed_fetches = failed_fetches + 1,
                 disabled = CASE WHEN failed_fetches + 1 >= ? THEN 1 ELSE disabled END,
                 updated_at = ?
             WHERE owner = ? AND name = ?
             RETURNING {}",
            REPOSITORY_COLUMNS
        ))
        .bind(FAILED_FETCH_THRESHOLD)
        .bind(to_unix(OffsetDateTime::now_utc()))
        .bind(&repository.owner)
        .bind(&repository.name)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Err(StoreError::repository_not_found(&repository.owner, &repository.name).into());
        };

        let updated = repository_from_row(&row)?;
        if updated.disabled && !repository.disabled {
            warn!(
                owner = %updated.owner,
                repo = %updated.name,
                failed_fetches = updated.failed_fetches,
                "repository-disabled"
            );
        } else {
            debug!(
                owner = %updated.owner,
                repo = %updated.name,
                failed_fetches = updated.failed_fetches,
                "failed-fetch-registered"
            );
        }
        Ok(updated)
    }

    /// Append a fetch record for a stored repository
    pub async fn register_fetch(
        &self,
        repository: &Repository,
        changes: &Value,
        fetched_at: OffsetDateTime,
    ) -> Result<Fetch> {
        let row = sqlx::query(
            "INSERT INTO fetches (repository_id, changes, created_at)
             SELECT id, ?, ? FROM repositories WHERE owner = ? AND name = ?
             RETURNING id, repository_id"
        )
        .bind(serde_json::to_string(changes)?)
        .bind(to_unix(fetched_at))
        .bind(&repository.owner)
        .bind(&repository.name)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to record fetch for {}", repository.full_name()))?;

        let Some(row) = row else {
            return Err(StoreError::repository_not_found(&repository.owner, &repository.name).into());
        };

        Ok(Fetch {
            id: row.try_get("id")?,
            repository_id: row.try_get("repository_id")?,
            changes: changes.clone(),
            created_at: from_unix(to_unix(fetched_at)),
        })
    }

    /// Cloned, enabled repositories whose latest fetch is strictly older than
    /// `cutoff`; a repository that was never fetched is always due
    pub async fn not_fetched_since(&self, cutoff: OffsetDateTime) -> Result<Vec<Repository>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM repositories r
             LEFT JOIN (
                 SELECT repository_id, MAX(created_at) AS last_fetched_at
                 FROM fetches
                 GROUP BY repository_id
             ) f ON f.repository_id = r.id
             WHERE r.cloned = 1
               AND r.disabled = 0
               AND (f.last_fetched_at IS NULL OR f.last_fetched_at < ?)
             ORDER BY r.id",
            prefixed_columns("r")
        ))
        .bind(to_unix(cutoff))
        .fetch_all(&self.pool)
        .await?;

        repositories_from_rows(&rows)
    }

    /// Repositories with scan history but no scan recorded under `rules_version`
    pub async fn not_scanned_with_version(&self, rules_version: i64) -> Result<Vec<Repository>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM repositories r
             WHERE EXISTS (SELECT 1 FROM scans a WHERE a.repository_id = r.id)
               AND NOT EXISTS (
                 SELECT 1 FROM scans s
                 WHERE s.repository_id = r.id AND s.rules_version = ?
             )
             ORDER BY r.id",
            prefixed_columns("r")
        ))
        .bind(rules_version)
        .fetch_all(&self.pool)
        .await?;

        repositories_from_rows(&rows)
    }
}

fn prefixed_columns(alias: &str) -> String {
    REPOSITORY_COLUMNS
        .split(", ")
        .map(|column| format!("{}.{}", alias, column.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}
