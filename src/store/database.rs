use anyhow::{Context, Result};
use sqlx::{
    Pool, Row, Sqlite,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use super::SCHEMA_VERSION;

/// Tables in drop order (children before parents)
const TABLES: [&str; 5] = ["credentials", "scans", "fetches", "commits", "repositories"];

/// Handle to the SQLite store shared by workers
pub struct Database {
    pub(super) pool: Pool<Sqlite>,
}

impl Database {
    /// Open (or create) the database at `db_path`; `":memory:"` gives a private in-memory store
    pub async fn new(db_path: &str) -> Result<Self> {
        let in_memory = db_path == ":memory:";

        // PRAGMAs are applied to every pooled connection
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", db_path))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        // An in-memory database lives and dies with its single connection
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 8 })
            .idle_timeout(if in_memory { None } else { Some(Duration::from_secs(600)) })
            .max_lifetime(if in_memory { None } else { Some(Duration::from_secs(1800)) })
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database at {}", db_path))?;

        debug!(path = db_path, "database-connected");
        Ok(Self { pool })
    }

    /// Initialize database schema, returns true if schema was rebuilt
    pub async fn init_schema(&self) -> Result<bool> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )"
        ).execute(&self.pool).await?;

        let stored_version: Option<String> = sqlx::query("SELECT value FROM metadata WHERE key = 'schema_version'")
            .fetch_optional(&self.pool)
            .await?
            .map(|row| row.try_get("value"))
            .transpose()?;

        let needs_rebuild = stored_version.as_deref() != Some(SCHEMA_VERSION);

        if needs_rebuild {
            if let Some(old) = &stored_version {
                info!(from = %old, to = SCHEMA_VERSION, "schema-version-changed");
            }
            for table in TABLES {
                sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
                    .execute(&self.pool)
                    .await?;
            }
            sqlx::query("DELETE FROM metadata").execute(&self.pool).await?;
        }

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS repositories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner TEXT NOT NULL,
                name TEXT NOT NULL,
                path TEXT NOT NULL DEFAULT '',
                ssh_url TEXT NOT NULL DEFAULT '',
                private INTEGER NOT NULL DEFAULT 0,
                default_branch TEXT NOT NULL DEFAULT '',
                raw_json TEXT NOT NULL DEFAULT 'null',
                cloned INTEGER NOT NULL DEFAULT 0,
                disabled INTEGER NOT NULL DEFAULT 0,
                failed_fetches INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                UNIQUE (owner, name)
            )"
        ).execute(&self.pool).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS fetches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                repository_id INTEGER NOT NULL REFERENCES repositories(id),
                changes TEXT NOT NULL DEFAULT 'null',
                created_at INTEGER NOT NULL
            )"
        ).execute(&self.pool).await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_fetches_repository
                ON fetches (repository_id, created_at)"
        ).execute(&self.pool).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS scans (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                repository_id INTEGER REFERENCES repositories(id),
                rules_version INTEGER NOT NULL,
                scan_type TEXT NOT NULL,
                branch TEXT NOT NULL DEFAULT '',
                start_sha TEXT NOT NULL DEFAULT '',
                stop_sha TEXT NOT NULL DEFAULT '',
                scan_start INTEGER NOT NULL,
                scan_end INTEGER NOT NULL
            )"
        ).execute(&self.pool).await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_scans_repository_version
                ON scans (repository_id, rules_version)"
        ).execute(&self.pool).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS credentials (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                scan_id INTEGER REFERENCES scans(id),
                owner TEXT NOT NULL,
                repository TEXT NOT NULL,
                sha TEXT NOT NULL,
                path TEXT NOT NULL,
                line_number INTEGER NOT NULL,
                match_start INTEGER NOT NULL DEFAULT 0,
                match_end INTEGER NOT NULL DEFAULT 0,
                private INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )"
        ).execute(&self.pool).await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_credentials_scan ON credentials (scan_id)"
        ).execute(&self.pool).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS commits (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner TEXT NOT NULL,
                repository TEXT NOT NULL,
                sha TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                UNIQUE (owner, repository, sha)
            )"
        ).execute(&self.pool).await?;

        if needs_rebuild {
            sqlx::query("INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?)")
                .bind(SCHEMA_VERSION)
                .execute(&self.pool)
                .await?;
        }

        Ok(needs_rebuild)
    }

    /// Get metadata value by key
    pub async fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM metadata WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|row| row.try_get("value")).transpose()?)
    }

    /// Set metadata value
    pub async fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO metadata (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Close the pool, waiting for checked-out connections to return
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
