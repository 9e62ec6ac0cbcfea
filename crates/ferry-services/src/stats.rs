//! Run counters, shared by every upload task.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::task::TaskOutcome;

#[derive(Default)]
pub struct UploadStats {
    uploaded: AtomicUsize,
    skipped_claimed: AtomicUsize,
    skipped_unsupported: AtomicUsize,
    failed_fatal: AtomicUsize,
    failed_other: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub uploaded: usize,
    pub skipped_claimed: usize,
    pub skipped_unsupported: usize,
    pub failed_fatal: usize,
    pub failed_other: usize,
}

impl StatsSnapshot {
    /// Number of tasks that produced an outcome.
    pub fn total(&self) -> usize {
        self.uploaded
            + self.skipped_claimed
            + self.skipped_unsupported
            + self.failed_fatal
            + self.failed_other
    }
}

impl UploadStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one outcome. Returns the new value of that outcome's counter,
    /// which for `Uploaded` is the running upload count.
    pub fn record(&self, outcome: TaskOutcome) -> usize {
        let counter = match outcome {
            TaskOutcome::Uploaded => &self.uploaded,
            TaskOutcome::SkippedAlreadyClaimed => &self.skipped_claimed,
            TaskOutcome::SkippedUnsupported => &self.skipped_unsupported,
            TaskOutcome::FailedFatal => &self.failed_fatal,
            TaskOutcome::FailedOther => &self.failed_other,
        };
        counter.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn uploaded(&self) -> usize {
        self.uploaded.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uploaded: self.uploaded.load(Ordering::Acquire),
            skipped_claimed: self.skipped_claimed.load(Ordering::Acquire),
            skipped_unsupported: self.skipped_unsupported.load(Ordering::Acquire),
            failed_fatal: self.failed_fatal.load(Ordering::Acquire),
            failed_other: self.failed_other.load(Ordering::Acquire),
        }
    }
}
