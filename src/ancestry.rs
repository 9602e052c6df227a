//! Ancestry scan job
//!
//! Expands one commit of a repository's history into queued scan work. Each
//! parent becomes a diff scan plus a new ancestry task one generation deeper,
//! so the history walk happens through the queue rather than the call stack.
//!
//! Two things keep the walk finite:
//!
//! - the commit registry acts as the visited set, so a commit reachable along
//!   several merge paths is expanded once;
//! - the depth budget shrinks per generation and ends in a full ref scan.
//!
//! Registration happens only after every enqueue succeeded. A failed job
//! registers nothing and a retry re-derives the same follow-on work, possibly
//! duplicating tasks that were enqueued before the failure.

use anyhow::Result;
use tracing::{Instrument, debug, error, info, info_span};

use crate::git::GitClient;
use crate::metrics::{Counter, Emitter, INITIAL_COMMIT_SCANNED, MAX_DEPTH_REACHED};
use crate::model::Commit;
use crate::queue::{AncestryScanPlan, DiffScanPlan, IdGenerator, RefScanPlan, TaskQueue};
use crate::store::CommitRegistry;

pub struct AncestryScanJob<'a, R, C, Q, G> {
    plan: AncestryScanPlan,
    registry: &'a R,
    client: &'a C,
    queue: &'a Q,
    generator: &'a G,
    depth_reached: Box<dyn Counter>,
    initial_commit: Box<dyn Counter>,
}

impl<'a, R, C, Q, G> AncestryScanJob<'a, R, C, Q, G>
where
    R: CommitRegistry,
    C: GitClient,
    Q: TaskQueue,
    G: IdGenerator,
{
    pub fn new(
        plan: AncestryScanPlan,
        registry: &'a R,
        client: &'a C,
        emitter: &dyn Emitter,
        queue: &'a Q,
        generator: &'a G,
    ) -> Self {
        Self {
            plan,
            registry,
            client,
            queue,
            generator,
            depth_reached: emitter.counter(MAX_DEPTH_REACHED),
            initial_commit: emitter.counter(INITIAL_COMMIT_SCANNED),
        }
    }

    /// Process the plan. Any error means nothing was registered and the task
    /// should be retried whole.
    pub async fn run(&self) -> Result<()> {
        let span = info_span!(
            "scanning-ancestry",
            sha = %self.plan.sha,
            owner = %self.plan.owner,
            repo = %self.plan.repository,
            commit_timestamp = self.plan.commit_timestamp,
        );

        async {
            let result = self.expand().await;
            if let Err(err) = &result {
                error!(error = ?err, "failed");
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn expand(&self) -> Result<()> {
        let plan = &self.plan;

        if self
            .registry
            .is_commit_registered(&plan.owner, &plan.repository, &plan.sha)
            .await?
        {
            debug!("known-commit");
            return Ok(());
        }

        if plan.depth <= 0 {
            self.enqueue_ref_scan().await?;
            self.register_commit().await?;

            info!("max-depth-reached");
            self.depth_reached.inc();
            return Ok(());
        }

        let parents = self
            .client
            .parents(&plan.owner, &plan.repository, &plan.sha)
            .await?;
        debug!(?parents, "parents");

        if parents.is_empty() {
            self.enqueue_ref_scan().await?;

            info!("reached-initial-commit");
            self.initial_commit.inc();
        }

        for parent in &parents {
            self.enqueue_diff_scan(parent, &plan.sha).await?;
            self.enqueue_ancestry_scan(parent).await?;
        }

        self.register_commit().await?;

        debug!("done");
        Ok(())
    }

    async fn enqueue_ref_scan(&self) -> Result<()> {
        let task = RefScanPlan {
            owner: self.plan.owner.clone(),
            repository: self.plan.repository.clone(),
            git_ref: self.plan.sha.clone(),
        }
        .task(self.generator.generate());

        self.queue.enqueue(task).await
    }

    async fn enqueue_diff_scan(&self, from: &str, to: &str) -> Result<()> {
        let task = DiffScanPlan {
            owner: self.plan.owner.clone(),
            repository: self.plan.repository.clone(),
            from: from.to_string(),
            to: to.to_string(),
        }
        .task(self.generator.generate());

        self.queue.enqueue(task).await
    }

    async fn enqueue_ancestry_scan(&self, sha: &str) -> Result<()> {
        let task = AncestryScanPlan {
            owner: self.plan.owner.clone(),
            repository: self.plan.repository.clone(),
            sha: sha.to_string(),
            depth: self.plan.depth - 1,
            commit_timestamp: 0,
        }
        .task(self.generator.generate());

        self.queue.enqueue(task).await
    }

    async fn register_commit(&self) -> Result<()> {
        self.registry
            .register_commit(&Commit::new(
                self.plan.owner.clone(),
                self.plan.repository.clone(),
                self.plan.sha.clone(),
            ))
            .await
    }
}
