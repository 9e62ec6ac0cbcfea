//! Upload task — one candidate asset, claimed, uploaded, and classified.
//!
//! The claim happens before the remote call so that a second task for the
//! same fingerprint sees it immediately instead of after a slow upload. A
//! claim is never released, even when the upload fails.

use std::sync::Arc;

use ferry_core::{CandidateAsset, FailureKind};

use crate::breaker::CircuitBreaker;
use crate::registry::DedupRegistry;
use crate::remote::RemoteAssetService;
use crate::stats::UploadStats;

/// Exactly one per candidate that reaches a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Uploaded,
    SkippedAlreadyClaimed,
    SkippedUnsupported,
    /// Systemic overload; the breaker has been tripped.
    FailedFatal,
    FailedOther,
}

/// Everything a task shares with its siblings and the dispatcher.
#[derive(Clone)]
pub struct UploadContext {
    pub registry: DedupRegistry,
    pub breaker: CircuitBreaker,
    pub remote: Arc<dyn RemoteAssetService>,
    pub stats: Arc<UploadStats>,
}

impl UploadContext {
    pub fn new(remote: Arc<dyn RemoteAssetService>, registry: DedupRegistry) -> Self {
        Self {
            registry,
            breaker: CircuitBreaker::new(),
            remote,
            stats: Arc::new(UploadStats::new()),
        }
    }
}

pub struct UploadTask {
    asset: CandidateAsset,
    ctx: UploadContext,
}

impl UploadTask {
    pub fn new(asset: CandidateAsset, ctx: UploadContext) -> Self {
        Self { asset, ctx }
    }

    pub fn asset(&self) -> &CandidateAsset {
        &self.asset
    }

    pub async fn run(self) -> TaskOutcome {
        let Self { asset, ctx } = self;
        let path = asset.full_path();

        if !ctx.registry.try_claim(&asset.id) {
            tracing::info!(file = %asset.file_name(), "has already been uploaded");
            ctx.stats.record(TaskOutcome::SkippedAlreadyClaimed);
            return TaskOutcome::SkippedAlreadyClaimed;
        }

        let err = match ctx.remote.upload_asset(&asset).await {
            Ok(meta) => {
                let count = ctx.stats.record(TaskOutcome::Uploaded);
                tracing::info!(
                    file = %asset.file_name(),
                    remote_id = %meta.id,
                    duplicate = meta.duplicate,
                    count,
                    "uploaded"
                );
                return TaskOutcome::Uploaded;
            }
            Err(e) => e,
        };

        let outcome = match err.kind() {
            FailureKind::Unsupported => {
                tracing::warn!(path = %path.display(), error = %err, "can't upload file");
                TaskOutcome::SkippedUnsupported
            }
            FailureKind::Systemic => {
                ctx.breaker.trip(err.to_string());
                TaskOutcome::FailedFatal
            }
            FailureKind::Other => {
                tracing::error!(path = %path.display(), error = %err, "can't upload file");
                TaskOutcome::FailedOther
            }
        };
        ctx.stats.record(outcome);
        outcome
    }
}
