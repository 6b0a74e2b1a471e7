// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Hit and miss accounting.

use std::sync::atomic::{AtomicU64, Ordering};

use strata_tier::SharedTierReport;

/// Monotonic hit/miss counters for one tier.
#[derive(Debug, Default)]
pub(crate) struct TierCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TierCounters {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> (u64, u64) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }
}

/// Returns `hits / (hits + misses)`, or `0.0` before any read.
#[must_use]
#[expect(clippy::cast_precision_loss, reason = "ratios do not need full u64 precision")]
pub(crate) fn hit_rate(hits: u64, misses: u64) -> f64 {
    let total = hits.saturating_add(misses);
    if total == 0 { 0.0 } else { hits as f64 / total as f64 }
}

/// Local tier counters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub struct LocalStats {
    /// Reads answered by a fresh local entry.
    pub hits: u64,
    /// Reads that found no fresh local entry.
    pub misses: u64,
    /// Entries currently resident, stale ones included.
    pub key_count: u64,
    /// `hits / (hits + misses)`, `0.0` before any read.
    pub hit_rate: f64,
}

/// Shared tier counters, as seen by this process.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct SharedStats {
    /// Reads answered by the shared tier.
    pub hits: u64,
    /// Reads the shared tier could not answer, including failed ones.
    pub misses: u64,
    /// `hits / (hits + misses)`, `0.0` before any read.
    pub hit_rate: f64,
    /// What the shared tier reports about itself, if it could be reached.
    pub reported: Option<SharedTierReport>,
}

/// A point-in-time snapshot of cache statistics.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct Stats {
    /// Local tier statistics.
    pub local: LocalStats,
    /// Shared tier statistics.
    pub shared: SharedStats,
}

impl Stats {
    pub(crate) fn new(local: &TierCounters, key_count: u64, shared: &TierCounters, reported: Option<SharedTierReport>) -> Self {
        let (local_hits, local_misses) = local.snapshot();
        let (shared_hits, shared_misses) = shared.snapshot();

        Self {
            local: LocalStats {
                hits: local_hits,
                misses: local_misses,
                key_count,
                hit_rate: hit_rate(local_hits, local_misses),
            },
            shared: SharedStats {
                hits: shared_hits,
                misses: shared_misses,
                hit_rate: hit_rate(shared_hits, shared_misses),
                reported,
            },
        }
    }
}
