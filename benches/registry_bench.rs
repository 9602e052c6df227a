// Store and dedupe benchmarks

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;
use criterion::async_executor::AsyncExecutor;
use credwalk::model::Credential;
use credwalk::rescan::ScanHistory;
use credwalk::store::CommitRegistry;
use rustc_hash::FxHashSet;
use tokio::runtime::Runtime;

mod common;

struct TokioExecutor(Runtime);

impl AsyncExecutor for TokioExecutor {
    fn block_on<T>(&self, future: impl std::future::Future<Output = T>) -> T {
        self.0.block_on(future)
    }
}

fn bench_register_commits(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_register");
    for size in [100, 1_000, 5_000] {
        let commits = common::generate_commits(size);

        group.bench_with_input(
            BenchmarkId::new("commits", size),
            &commits,
            |b, commits| {
                b.to_async(TokioExecutor(Runtime::new().unwrap())).iter(|| async {
                    let db = common::setup_bench_db().await;
                    for commit in commits {
                        db.register_commit(commit).await.unwrap();
                    }
                    black_box(db)
                });
            },
        );
    }
    group.finish();
}

fn bench_lookup_commits(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_lookup");
    for size in [1_000, 10_000] {
        let commits = common::generate_commits(size);
        let runtime = Runtime::new().unwrap();
        let db = runtime.block_on(async {
            let db = common::setup_bench_db().await;
            for commit in &commits {
                db.register_commit(commit).await.unwrap();
            }
            db
        });

        group.bench_with_input(
            BenchmarkId::new("registered", size),
            &commits,
            |b, commits| {
                let db = &db;
                // Same runtime the pool was opened on
                b.to_async(&runtime).iter(|| async move {
                    let mut hits = 0;
                    for commit in commits.iter().step_by(10) {
                        if db
                            .is_commit_registered(&commit.owner, &commit.repository, &commit.sha)
                            .await
                            .unwrap()
                        {
                            hits += 1;
                        }
                    }
                    black_box(hits)
                });
            },
        );
    }
    group.finish();
}

fn bench_record_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("record_scan");
    for size in [100, 1_000, 10_000] {
        let credentials = common::generate_credentials(size);

        group.bench_with_input(
            BenchmarkId::new("credentials", size),
            &credentials,
            |b, credentials| {
                b.to_async(TokioExecutor(Runtime::new().unwrap())).iter(|| async {
                    let db = common::setup_bench_db().await;
                    let scan_id = db
                        .record_scan(&common::bench_scan(1, "stop"), credentials)
                        .await
                        .unwrap();
                    black_box(db.credentials_for_scan(scan_id).await.unwrap())
                });
            },
        );
    }
    group.finish();
}

fn bench_dedupe(c: &mut Criterion) {
    let mut group = c.benchmark_group("rescan_dedupe");
    for size in [1_000, 10_000] {
        let old = common::generate_credentials(size);
        // Half overlap with the old findings
        let new = common::generate_credentials(size + size / 2)
            .into_iter()
            .skip(size / 2)
            .collect::<Vec<_>>();

        group.bench_with_input(BenchmarkId::new("findings", size), &(old, new), |b, (old, new)| {
            b.iter(|| {
                let known: FxHashSet<String> = old.iter().map(Credential::hash).collect();
                let fresh = new.iter().filter(|credential| !known.contains(&credential.hash())).count();
                black_box(fresh)
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_register_commits,
    bench_lookup_commits,
    bench_record_scan,
    bench_dedupe
);
criterion_main!(benches);
