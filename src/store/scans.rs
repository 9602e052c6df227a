//! Scan history and the credentials each scan produced

use anyhow::{Context, Result};
use sqlx::{QueryBuilder, Row, Sqlite, Transaction, sqlite::SqliteRow};
use time::OffsetDateTime;

use crate::model::{Credential, NewScan, PriorScan};
use crate::rescan::ScanHistory;
use crate::util::{from_unix, to_unix};

use super::Database;

fn credential_from_row(row: &SqliteRow) -> Result<Credential> {
    Ok(Credential {
        owner: row.try_get("owner")?,
        repository: row.try_get("repository")?,
        sha: row.try_get("sha")?,
        path: row.try_get("path")?,
        line_number: row.try_get("line_number")?,
        match_start: row.try_get("match_start")?,
        match_end: row.try_get("match_end")?,
        private: row.try_get("private")?,
        scan_id: row.try_get("scan_id")?,
        created_at: from_unix(row.try_get("created_at")?),
    })
}

impl Database {
    /// Store a finished scan and its findings in ONE transaction.
    ///
    /// The scan is attached to the stored repository with the same owner and
    /// name, or left detached if there is none. Returns the new scan id.
    pub async fn record_scan(&self, scan: &NewScan, credentials: &[Credential]) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let scan_id: i64 = sqlx::query_scalar(
            "INSERT INTO scans
                (repository_id, rules_version, scan_type, branch, start_sha, stop_sha, scan_start, scan_end)
             VALUES ((SELECT id FROM repositories WHERE owner = ? AND name = ?), ?, ?, ?, ?, ?, ?, ?)
             RETURNING id"
        )
        .bind(&scan.owner)
        .bind(&scan.repository)
        .bind(scan.rules_version)
        .bind(scan.scan_type.as_str())
        .bind(&scan.branch)
        .bind(&scan.start_sha)
        .bind(&scan.stop_sha)
        .bind(to_unix(scan.scan_start))
        .bind(to_unix(scan.scan_end))
        .fetch_one(&mut *tx)
        .await
        .with_context(|| format!("Failed to record scan of {}/{}", scan.owner, scan.repository))?;

        Self::save_credentials_in_tx(&mut tx, scan_id, credentials).await?;

        tx.commit().await?;
        Ok(scan_id)
    }

    async fn save_credentials_in_tx(
        tx: &mut Transaction<'_, Sqlite>,
        scan_id: i64,
        credentials: &[Credential],
    ) -> Result<()> {
        // Stays well under SQLite's bound-parameter limit at 10 columns per row
        const BATCH_SIZE: usize = 500;
        let now = to_unix(OffsetDateTime::now_utc());

        for chunk in credentials.chunks(BATCH_SIZE) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO credentials \
                 (scan_id, owner, repository, sha, path, line_number, match_start, match_end, private, created_at) "
            );
            qb.push_values(chunk, |mut row, credential| {
                row.push_bind(scan_id)
                    .push_bind(&credential.owner)
                    .push_bind(&credential.repository)
                    .push_bind(&credential.sha)
                    .push_bind(&credential.path)
                    .push_bind(credential.line_number)
                    .push_bind(credential.match_start)
                    .push_bind(credential.match_end)
                    .push_bind(credential.private)
                    .push_bind(now);
            });
            qb.build().execute(&mut **tx).await?;
        }

        Ok(())
    }

    /// Number of scans recorded for a repository under a given rules version
    pub async fn scan_count(&self, owner: &str, repository: &str, rules_version: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM scans s
             JOIN repositories r ON r.id = s.repository_id
             WHERE r.owner = ? AND r.name = ? AND s.rules_version = ?"
        )
        .bind(owner)
        .bind(repository)
        .bind(rules_version)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

impl ScanHistory for Database {
    /// For each scanned range with no scan under `rules_version` yet, the
    /// latest older scan of it. Detached scans are skipped.
    async fn scans_not_yet_run_with_version(&self, rules_version: i64) -> Result<Vec<PriorScan>> {
        let rows = sqlx::query(
            "SELECT s.id, r.owner, r.name AS repository, s.rules_version,
                    s.branch, s.start_sha, s.stop_sha
             FROM scans s
             JOIN repositories r ON r.id = s.repository_id
             WHERE s.rules_version < ?
               AND s.id = (
                   SELECT MAX(o.id) FROM scans o
                   WHERE o.repository_id = s.repository_id
                     AND o.branch = s.branch
                     AND o.start_sha = s.start_sha
                     AND o.stop_sha = s.stop_sha
                     AND o.rules_version < ?
               )
               AND NOT EXISTS (
                   SELECT 1 FROM scans n
                   WHERE n.repository_id = s.repository_id
                     AND n.branch = s.branch
                     AND n.start_sha = s.start_sha
                     AND n.stop_sha = s.stop_sha
                     AND n.rules_version >= ?
               )
             ORDER BY s.id"
        )
        .bind(rules_version)
        .bind(rules_version)
        .bind(rules_version)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<PriorScan> {
                Ok(PriorScan {
                    id: row.try_get("id")?,
                    owner: row.try_get("owner")?,
                    repository: row.try_get("repository")?,
                    rules_version: row.try_get("rules_version")?,
                    branch: row.try_get("branch")?,
                    start_sha: row.try_get("start_sha")?,
                    stop_sha: row.try_get("stop_sha")?,
                })
            })
            .collect()
    }

    async fn credentials_for_scan(&self, scan_id: i64) -> Result<Vec<Credential>> {
        let rows = sqlx::query(
            "SELECT scan_id, owner, repository, sha, path, line_number,
                    match_start, match_end, private, created_at
             FROM credentials WHERE scan_id = ? ORDER BY id"
        )
        .bind(scan_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(credential_from_row).collect()
    }
}
