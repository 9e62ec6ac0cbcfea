//! Dispatcher — the single producer feeding upload tasks to the worker pool.
//!
//! Walks the candidate stream once, in order. Before each submission it
//! checks the breaker (stop iterating) and the registry (skip). It never
//! waits on an individual upload. Waiting for an intake slot gives way to a
//! breaker trip, and the final drain always runs.

use ferry_core::CandidateAsset;
use futures::{Stream, StreamExt};

use crate::pool::WorkerPool;
use crate::stats::StatsSnapshot;
use crate::task::{UploadContext, UploadTask};

/// What a finished run reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Tasks handed to the pool.
    pub submitted: usize,
    /// Candidates skipped by the dispatcher because the registry knew them.
    pub skipped_known: usize,
    pub outcomes: StatsSnapshot,
    /// The breaker tripped during the run. Candidates after the trip, if any
    /// remained, were not dispatched.
    pub stopped_early: bool,
}

impl RunSummary {
    pub fn uploaded(&self) -> usize {
        self.outcomes.uploaded
    }
}

pub struct Dispatcher {
    ctx: UploadContext,
    pool: WorkerPool,
}

impl Dispatcher {
    /// `pool` must already be started.
    pub fn new(ctx: UploadContext, pool: WorkerPool) -> Self {
        Self { ctx, pool }
    }

    pub fn context(&self) -> &UploadContext {
        &self.ctx
    }

    /// Dispatch every candidate, drain the pool, and report.
    ///
    /// Only a pool misuse error escapes; upload failures never do. Even then
    /// the pool is drained before the error is returned.
    pub async fn run<S>(mut self, candidates: S) -> anyhow::Result<RunSummary>
    where
        S: Stream<Item = CandidateAsset>,
    {
        let mut summary = RunSummary::default();
        let mut failure = None;
        futures::pin_mut!(candidates);

        while let Some(asset) = candidates.next().await {
            if self.ctx.breaker.is_tripped() {
                summary.stopped_early = true;
                break;
            }
            if self.ctx.registry.contains(&asset.id) {
                tracing::info!(file = %asset.file_name(), "is already uploaded");
                summary.skipped_known += 1;
                continue;
            }

            // A full intake can hold us here for a whole upload.
            let slot = tokio::select! {
                biased;
                _ = self.ctx.breaker.tripped() => None,
                slot = self.pool.reserve() => Some(slot),
            };
            let slot = match slot {
                Some(Ok(slot)) if !self.ctx.breaker.is_tripped() => slot,
                Some(Err(e)) => {
                    failure = Some(e);
                    break;
                }
                _ => {
                    summary.stopped_early = true;
                    break;
                }
            };

            let task = UploadTask::new(asset, self.ctx.clone());
            slot.send(async move {
                task.run().await;
            });
            summary.submitted += 1;
        }

        let report = self.pool.stop().await;
        debug_assert_eq!(report.completed, report.submitted);

        if let Some(e) = failure {
            tracing::error!(error = %e, submitted = summary.submitted, "dispatch aborted");
            return Err(e.into());
        }

        if self.ctx.breaker.is_tripped() {
            summary.stopped_early = true;
            tracing::error!(
                reason = self.ctx.breaker.reason().unwrap_or_default(),
                "too many server errors, stopped dispatching"
            );
        }

        summary.outcomes = self.ctx.stats.snapshot();
        tracing::info!(
            uploaded = summary.outcomes.uploaded,
            submitted = summary.submitted,
            skipped = summary.skipped_known,
            stopped_early = summary.stopped_early,
            "upload run finished"
        );
        Ok(summary)
    }
}
