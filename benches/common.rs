// Shared benchmark helpers
#![allow(dead_code)]

use credwalk::model::{Commit, Credential, NewRepository, NewScan, ScanType};
use credwalk::store::Database;
use time::OffsetDateTime;

/// Setup an in-memory database with one cloned repository
pub async fn setup_bench_db() -> Database {
    let db = Database::new(":memory:").await.unwrap();
    db.init_schema().await.unwrap();
    db.create(&NewRepository { cloned: true, ..NewRepository::new("bench-owner", "bench-repo") })
        .await
        .unwrap();
    db
}

/// Distinct commits of the bench repository
pub fn generate_commits(count: usize) -> Vec<Commit> {
    (0..count)
        .map(|i| Commit::new("bench-owner", "bench-repo", format!("{:040x}", i)))
        .collect()
}

/// Findings spread over a handful of files
pub fn generate_credentials(count: usize) -> Vec<Credential> {
    (0..count)
        .map(|i| {
            Credential::new(
                "bench-owner",
                "bench-repo",
                format!("{:040x}", i / 100),
                format!("config/file_{}.yml", i % 7),
                i as i64,
            )
        })
        .collect()
}

pub fn bench_scan(rules_version: i64, stop_sha: &str) -> NewScan {
    let now = OffsetDateTime::now_utc();
    NewScan {
        owner: "bench-owner".to_string(),
        repository: "bench-repo".to_string(),
        rules_version,
        scan_type: ScanType::Diff,
        branch: "master".to_string(),
        start_sha: String::new(),
        stop_sha: stop_sha.to_string(),
        scan_start: now,
        scan_end: now,
    }
}
