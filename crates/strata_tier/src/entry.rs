// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::{
    ops::Deref,
    sync::Arc,
    time::{Duration, Instant},
};

/// A locally cached value with its freshness metadata.
///
/// The value is held by reference: cloning an entry clones the [`Arc`], never the value, so
/// every reader of the same local entry observes the exact same in-memory object.
///
/// Freshness is judged against an external clock reading rather than [`Instant::now`], which
/// keeps expiry deterministic under a controlled clock.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::{Duration, Instant};
///
/// use strata_tier::CacheEntry;
///
/// let now = Instant::now();
/// let entry = CacheEntry::new(Arc::new(42), now, Duration::from_secs(60));
///
/// assert_eq!(**entry.value(), 42);
/// assert!(entry.is_fresh(now + Duration::from_secs(59)));
/// assert!(!entry.is_fresh(now + Duration::from_secs(60)));
/// ```
#[derive(Debug)]
pub struct CacheEntry<V> {
    value: Arc<V>,
    cached_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    /// Creates an entry written at `cached_at` that stays fresh for `ttl`.
    #[must_use]
    pub fn new(value: Arc<V>, cached_at: Instant, ttl: Duration) -> Self {
        Self { value, cached_at, ttl }
    }

    /// Returns the shared handle to the cached value.
    #[must_use]
    pub fn value(&self) -> &Arc<V> {
        &self.value
    }

    /// Consumes the entry and returns the shared handle to the value.
    #[must_use]
    pub fn into_value(self) -> Arc<V> {
        self.value
    }

    /// Returns the clock reading at which the entry was written.
    #[must_use]
    pub fn cached_at(&self) -> Instant {
        self.cached_at
    }

    /// Returns how long the entry stays fresh after it was written.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns how long ago the entry was written, as seen from `now`.
    #[must_use]
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.cached_at)
    }

    /// Returns `true` while the entry is younger than its TTL.
    #[must_use]
    pub fn is_fresh(&self, now: Instant) -> bool {
        self.age(now) < self.ttl
    }

    /// Returns `true` if the entry has expired but is still inside the `grace` window
    /// that follows its TTL.
    #[must_use]
    pub fn is_stale_within(&self, now: Instant, grace: Duration) -> bool {
        let age = self.age(now);
        age >= self.ttl && age < self.ttl.saturating_add(grace)
    }
}

impl<V> Clone for CacheEntry<V> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            cached_at: self.cached_at,
            ttl: self.ttl,
        }
    }
}

impl<V> Deref for CacheEntry<V> {
    type Target = V;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_shares_the_value() {
        let entry = CacheEntry::new(Arc::new("value".to_string()), Instant::now(), Duration::from_secs(1));
        let cloned = entry.clone();
        assert!(Arc::ptr_eq(entry.value(), cloned.value()));
    }

    #[test]
    fn age_saturates_for_readings_before_write() {
        let now = Instant::now();
        let entry = CacheEntry::new(Arc::new(1), now + Duration::from_secs(5), Duration::from_secs(1));
        assert_eq!(entry.age(now), Duration::ZERO);
        assert!(entry.is_fresh(now));
    }

    #[test]
    fn stale_window_follows_ttl() {
        let now = Instant::now();
        let entry = CacheEntry::new(Arc::new(1), now, Duration::from_secs(10));

        assert!(!entry.is_stale_within(now + Duration::from_secs(9), Duration::from_secs(5)));
        assert!(entry.is_stale_within(now + Duration::from_secs(10), Duration::from_secs(5)));
        assert!(entry.is_stale_within(now + Duration::from_secs(14), Duration::from_secs(5)));
        assert!(!entry.is_stale_within(now + Duration::from_secs(15), Duration::from_secs(5)));
    }

    #[test]
    fn zero_grace_never_reports_stale() {
        let now = Instant::now();
        let entry = CacheEntry::new(Arc::new(1), now, Duration::from_secs(10));
        assert!(!entry.is_stale_within(now + Duration::from_secs(10), Duration::ZERO));
    }
}
