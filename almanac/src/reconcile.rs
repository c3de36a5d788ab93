//! Cache reconciliation
//!
//! Merges a fresh observation of local entries into the persisted cache:
//!
//! 1. an empty observation changes nothing;
//! 2. observed entries already in the cache are left alone;
//! 3. a stale cached entry matching a new one (same digits, compatible
//!    name) is replaced in place by it;
//! 4. cached entries no longer observed are dropped unless external;
//! 5. unmatched new entries are appended.

use crate::contact::{CacheEntry, Origin};
use serde::Serialize;
use tracing::debug;

/// What a pass did to the cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub observed: usize,
    pub updated: usize,
    pub pruned: usize,
    pub added: usize,
    /// The observation was empty and the cache was left untouched
    pub skipped: bool,
}

impl ReconcileReport {
    pub fn changed(&self) -> bool {
        self.updated + self.pruned + self.added > 0
    }
}

/// Reconcile `observed` into `cache` in place
pub fn reconcile(cache: &mut Vec<CacheEntry>, observed: &[CacheEntry]) -> ReconcileReport {
    let mut report = ReconcileReport {
        observed: observed.len(),
        ..Default::default()
    };

    // Nothing observed usually means the aggregator's backends are down;
    // don't wipe the cache over it.
    if observed.is_empty() {
        report.skipped = true;
        return report;
    }

    let mut new_diffs: Vec<&CacheEntry> = observed
        .iter()
        .filter(|entry| !cache.contains(entry))
        .collect();

    for old in cache.iter_mut() {
        // Already current; only stale entries are replaced.
        if observed.contains(old) {
            continue;
        }
        if let Some(pos) = new_diffs.iter().position(|new| old.matches(new)) {
            *old = new_diffs.remove(pos).clone();
            report.updated += 1;
        }
    }

    let before = cache.len();
    cache.retain(|entry| entry.origin == Origin::External || observed.contains(entry));
    report.pruned = before - cache.len();

    report.added = new_diffs.len();
    cache.extend(new_diffs.into_iter().cloned());

    debug!(
        "Reconciled {} observed: {} updated, {} pruned, {} added",
        report.observed, report.updated, report.pruned, report.added
    );

    report
}
