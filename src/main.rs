mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::io;
use std::path::PathBuf;
use time::{Duration, OffsetDateTime};
use tracing::info;

use cli::{Cli, Command};
use credwalk::ancestry::AncestryScanJob;
use credwalk::git::LocalGitClient;
use credwalk::metrics::MemoryEmitter;
use credwalk::model::Repository;
use credwalk::queue::{
    AncestryScanPlan, IdGenerator, JsonLinesQueue, MemoryQueue, TaskPlan, TaskQueue, UuidGenerator,
};
use credwalk::store::Database;
use credwalk::util::format_timestamp;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    credwalk::logging::init(&cli.log_level)?;

    let db_path = match cli.database {
        Some(path) => path,
        None => default_database_path()?,
    };
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Could not create {}", parent.display()))?;
        }
    }

    let db_path_str = db_path.to_str().context("Invalid path encoding")?;
    let db = Database::new(db_path_str).await?;
    if db.init_schema().await? {
        info!(path = db_path_str, "schema-created");
    }

    match cli.command {
        Command::Init => {
            info!(path = db_path_str, "schema-ready");
        }
        Command::Due { minutes } => {
            let cutoff = fetch_cutoff(OffsetDateTime::now_utc(), minutes)?;
            print_repositories(&db.not_fetched_since(cutoff).await?);
        }
        Command::Unscanned { rules_version } => {
            print_repositories(&db.not_scanned_with_version(rules_version).await?);
        }
        Command::Walk { repos_root, owner, repo, sha, depth, local } => {
            let plan = AncestryScanPlan {
                owner,
                repository: repo,
                sha,
                depth,
                commit_timestamp: 0,
            };
            walk(&db, repos_root, plan, local).await?;
        }
    }

    db.close().await;
    Ok(())
}

fn default_database_path() -> Result<PathBuf> {
    Ok(dirs::data_dir()
        .context("Could not determine data directory")?
        .join("credwalk")
        .join("credwalk.db"))
}

/// `now` minus `minutes`, rejecting windows the clock cannot represent
fn fetch_cutoff(now: OffsetDateTime, minutes: i64) -> Result<OffsetDateTime> {
    minutes
        .checked_mul(60)
        .map(Duration::seconds)
        .and_then(|window| now.checked_sub(window))
        .with_context(|| format!("--minutes {} is out of range", minutes))
}

fn print_repositories(repositories: &[Repository]) {
    for repository in repositories {
        println!(
            "{}\t{}\tfailed_fetches={}\tupdated={}",
            repository.full_name(),
            repository.path,
            repository.failed_fetches,
            format_timestamp(repository.updated_at)
        );
    }
}

/// Run the ancestry job for `plan`, writing scan tasks to stdout.
///
/// Without `local`, ancestry follow-ups are printed too, for an external
/// queue to pick up. With it they are drained here until the walk ends.
async fn walk(db: &Database, repos_root: PathBuf, plan: AncestryScanPlan, local: bool) -> Result<()> {
    let client = LocalGitClient::new(repos_root);
    let emitter = MemoryEmitter::new();
    let output = JsonLinesQueue::new(io::stdout());
    let generator = UuidGenerator;

    if local {
        let pending = MemoryQueue::new();
        pending.enqueue(plan.task(generator.generate())).await?;

        let mut processed = 0usize;
        while let Some(task) = pending.pop() {
            match task.plan {
                TaskPlan::AncestryScan(plan) => {
                    AncestryScanJob::new(plan, db, &client, &emitter, &pending, &generator)
                        .run()
                        .await?;
                    processed += 1;
                }
                _ => output.enqueue(task).await?,
            }
        }
        info!(processed, "walk-complete");
    } else {
        AncestryScanJob::new(plan, db, &client, &emitter, &output, &generator)
            .run()
            .await?;
    }

    for (name, value) in emitter.snapshot() {
        info!(counter = %name, value, "counter");
    }
    Ok(())
}
