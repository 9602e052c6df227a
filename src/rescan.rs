//! Rescan coordinator
//!
//! When the detection rules change, every earlier scan recorded under an older
//! rules version is run again over the same commit range. Findings the earlier
//! scan already reported are dropped by content hash; anything left over is
//! delivered as one notification batch per scan.

use anyhow::Result;
use rustc_hash::FxHashSet;
use time::{Duration, OffsetDateTime};
use tokio::sync::{oneshot, watch};
use tracing::{Instrument, debug, error, info, info_span};

use crate::metrics::{Counter, Emitter, RESCAN_FAILED, RESCAN_SUCCESS};
use crate::model::{Credential, PriorScan};
use crate::notify::{Notification, Router};

/// Read side of the scan history used by the rescanner
#[allow(async_fn_in_trait)]
pub trait ScanHistory {
    /// Earlier scans whose range has not been covered under `rules_version`
    async fn scans_not_yet_run_with_version(&self, rules_version: i64) -> Result<Vec<PriorScan>>;

    /// Findings recorded for a scan
    async fn credentials_for_scan(&self, scan_id: i64) -> Result<Vec<Credential>>;
}

/// The detection engine.
///
/// Implementations record the scan they perform (under the rules version
/// they run) so a completed rescan drops out of the backlog.
#[allow(async_fn_in_trait)]
pub trait Scanner {
    async fn scan(
        &self,
        owner: &str,
        repository: &str,
        excluded_paths: &FxHashSet<String>,
        branch: &str,
        start_sha: &str,
        stop_sha: &str,
    ) -> Result<Vec<Credential>>;
}

#[derive(Debug, Clone, Copy)]
pub struct RescannerConfig {
    /// Rules version of the running scanner
    pub rules_version: i64,
    /// Age past which old findings would be matched loosely; see `loosen_match`
    pub max_age: Option<Duration>,
}

/// Outcome of one pass over the backlog
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RescanSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// Notifications delivered successfully
    pub notified: usize,
    /// The pass stopped early on shutdown
    pub cancelled: bool,
}

pub struct Rescanner<'a, H, S, R> {
    history: &'a H,
    scanner: &'a S,
    router: &'a R,
    config: RescannerConfig,
    success_counter: Box<dyn Counter>,
    failed_counter: Box<dyn Counter>,
}

impl<'a, H, S, R> Rescanner<'a, H, S, R>
where
    H: ScanHistory,
    S: Scanner,
    R: Router,
{
    pub fn new(
        history: &'a H,
        scanner: &'a S,
        router: &'a R,
        emitter: &dyn Emitter,
        config: RescannerConfig,
    ) -> Self {
        Self {
            history,
            scanner,
            router,
            config,
            success_counter: emitter.counter(RESCAN_SUCCESS),
            failed_counter: emitter.counter(RESCAN_FAILED),
        }
    }

    /// Signal readiness, work through the backlog, then idle until shutdown.
    ///
    /// Shutdown is honoured between scans only; a scan in flight completes.
    /// A dropped shutdown sender counts as shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>, ready: oneshot::Sender<()>) -> Result<()> {
        let span = info_span!("rescanner", rules_version = self.config.rules_version);

        async move {
            info!("started");
            // Nobody listening for readiness is fine
            let _ = ready.send(());

            let summary = self.rescan_backlog(&shutdown).await;
            if !summary.cancelled {
                info!(
                    succeeded = summary.succeeded,
                    failed = summary.failed,
                    notified = summary.notified,
                    "all-scans-up-to-date"
                );
                let _ = shutdown.wait_for(|stop| *stop).await;
            }

            info!("done");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// One sequential pass over every scan recorded under an older rules version
    pub async fn rescan_backlog(&self, shutdown: &watch::Receiver<bool>) -> RescanSummary {
        let mut summary = RescanSummary::default();

        let prior_scans = match self
            .history
            .scans_not_yet_run_with_version(self.config.rules_version)
            .await
        {
            Ok(prior_scans) => prior_scans,
            Err(err) => {
                error!(error = ?err, "failed-getting-prior-scans");
                Vec::new()
            }
        };

        for prior_scan in &prior_scans {
            if *shutdown.borrow() {
                summary.cancelled = true;
                return summary;
            }

            let span = info_span!(
                "rescanning",
                owner = %prior_scan.owner,
                repo = %prior_scan.repository,
                scan_id = prior_scan.id,
            );
            match self.rescan(prior_scan).instrument(span).await {
                Ok(notified) => {
                    summary.succeeded += 1;
                    summary.notified += notified;
                }
                Err(err) => {
                    self.failed_counter.inc();
                    summary.failed += 1;
                    error!(scan_id = prior_scan.id, error = ?err, "failed-to-rescan");
                }
            }
        }

        summary
    }

    /// Rescan one range; returns how many notifications went out
    async fn rescan(&self, prior_scan: &PriorScan) -> Result<usize> {
        info!("rescanning");

        let old_credentials = self
            .history
            .credentials_for_scan(prior_scan.id)
            .await
            .inspect_err(|err| error!(error = ?err, "failed-getting-prior-credentials"))?;

        let known: FxHashSet<String> = old_credentials.iter().map(Credential::hash).collect();
        let latest_credential = old_credentials.iter().map(|c| c.created_at).max();

        let found = self
            .scanner
            .scan(
                &prior_scan.owner,
                &prior_scan.repository,
                &FxHashSet::default(),
                &prior_scan.branch,
                &prior_scan.start_sha,
                &prior_scan.stop_sha,
            )
            .await?;

        self.success_counter.inc();

        let batch: Vec<Notification> = found
            .iter()
            .filter(|credential| !known.contains(&credential.hash()))
            .map(Notification::from)
            .collect();
        let batch = self.loosen_match(batch, latest_credential);

        if batch.is_empty() {
            debug!(found = found.len(), "no-new-credentials");
            return Ok(0);
        }

        if let Err(err) = self.router.deliver(&batch).await {
            error!(error = ?err, "failed-to-notify");
            return Ok(0);
        }

        info!(count = batch.len(), "notified");
        Ok(batch.len())
    }

    /// Hook for de-duplicating findings of old scans with looser criteria than
    /// the exact content hash. Matching rules for this are not defined, so the
    /// batch passes through unchanged.
    fn loosen_match(&self, batch: Vec<Notification>, latest_credential: Option<OffsetDateTime>) -> Vec<Notification> {
        let Some(max_age) = self.config.max_age else {
            return batch;
        };

        let age = latest_credential.map(|latest| OffsetDateTime::now_utc() - latest);
        if age.is_none_or(|age| age >= max_age) {
            debug!(age_seconds = age.map(|age| age.whole_seconds()), "loose-matching-skipped");
        }
        batch
    }
}
