//! Dedup registry — fingerprints known remotely or claimed during this run.
//!
//! Membership only grows. There is no removal operation. Checks and inserts
//! for the same fingerprint serialize on the shard lock that owns it, so a
//! claim is visible to every `contains` that starts after it returns.

use std::sync::Arc;

use dashmap::DashSet;
use ferry_core::FingerprintId;

/// Shared, cloneable handle. Clones see the same set.
#[derive(Clone, Default)]
pub struct DedupRegistry {
    ids: Arc<DashSet<FingerprintId>>,
}

impl DedupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry pre-populated with the remote inventory.
    pub fn seeded(known: impl IntoIterator<Item = FingerprintId>) -> Self {
        let registry = Self::new();
        for id in known {
            registry.ids.insert(id);
        }
        tracing::debug!(known = registry.len(), "dedup registry seeded");
        registry
    }

    /// True if the id was in the remote inventory or has been claimed.
    pub fn contains(&self, id: &FingerprintId) -> bool {
        self.ids.contains(id)
    }

    /// Mark an id as claimed. Safe to call repeatedly.
    pub fn claim(&self, id: &FingerprintId) {
        self.ids.insert(id.clone());
    }

    /// Check and claim in one step.
    ///
    /// Returns true only for the single caller that inserted the id. Every
    /// other caller, concurrent or later, gets false.
    pub fn try_claim(&self, id: &FingerprintId) -> bool {
        self.ids.insert(id.clone())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
