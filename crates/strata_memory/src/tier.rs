// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Local tier implementation using moka.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use moka::{Expiry, future::Cache, notification::RemovalCause, policy::EvictionPolicy};
use parking_lot::Mutex;
use strata_tier::CacheEntry;

use crate::builder::MemoryTierBuilder;

/// An entry the local tier dropped because its lifetime ran out.
#[derive(Debug)]
pub struct ExpiredEntry<V> {
    /// The key the entry was stored under.
    pub key: String,
    /// The value that was stored.
    pub value: Arc<V>,
}

/// Keeps each entry resident for its own TTL plus the tier-wide grace window.
struct EntryExpiry {
    grace: Duration,
}

impl EntryExpiry {
    fn lifetime<V>(&self, entry: &CacheEntry<V>) -> Duration {
        entry.ttl().saturating_add(self.grace)
    }
}

impl<V> Expiry<String, CacheEntry<V>> for EntryExpiry {
    fn expire_after_create(&self, _key: &String, entry: &CacheEntry<V>, _created_at: Instant) -> Option<Duration> {
        Some(self.lifetime(entry))
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &CacheEntry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(self.lifetime(entry))
    }
}

/// The in-process local tier.
///
/// A bounded concurrent map from keys to [`CacheEntry`] values, with least-recently-used
/// eviction and per-entry expiry. Entries are held by [`Arc`]: every hit on the same entry
/// returns the same allocation.
///
/// When an entry reaches the end of its lifetime (`ttl + stale_grace`) and is removed, the
/// tier publishes an [`ExpiredEntry`] on the channel returned by
/// [`take_expirations`](Self::take_expirations). Deletes, overwrites and capacity evictions
/// are silent. Removal happens during moka's housekeeping, which runs as a side effect of
/// other operations or explicitly through [`run_pending_tasks`](Self::run_pending_tasks).
///
/// Cloning a `MemoryTier` yields another handle to the same storage.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::{Duration, Instant};
///
/// use strata_memory::MemoryTier;
/// use strata_tier::CacheEntry;
///
/// # futures::executor::block_on(async {
/// let tier = MemoryTier::<i32>::new();
/// tier.set("key", CacheEntry::new(Arc::new(42), Instant::now(), Duration::from_secs(60)))
///     .await;
///
/// let entry = tier.get("key").await.expect("entry should exist");
/// assert_eq!(**entry.value(), 42);
/// # });
/// ```
pub struct MemoryTier<V> {
    inner: Cache<String, CacheEntry<V>>,
    expirations: Arc<Mutex<Option<UnboundedReceiver<ExpiredEntry<V>>>>>,
    stale_grace: Duration,
}

impl<V> std::fmt::Debug for MemoryTier<V>
where
    V: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTier")
            .field("name", &self.inner.name())
            .field("entry_count", &self.inner.entry_count())
            .field("stale_grace", &self.stale_grace)
            .finish_non_exhaustive()
    }
}

impl<V> Clone for MemoryTier<V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            expirations: Arc::clone(&self.expirations),
            stale_grace: self.stale_grace,
        }
    }
}

impl<V> Default for MemoryTier<V>
where
    V: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> MemoryTier<V>
where
    V: Send + Sync + 'static,
{
    /// Creates a local tier with the default capacity and no stale grace.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a builder for configuring a local tier.
    #[must_use]
    pub fn builder() -> MemoryTierBuilder<V> {
        MemoryTierBuilder::new()
    }

    pub(crate) fn from_builder(builder: &MemoryTierBuilder<V>) -> Self {
        let (sender, receiver) = unbounded();

        let mut moka_builder = Cache::builder()
            .max_capacity(builder.max_capacity)
            .eviction_policy(EvictionPolicy::lru())
            .expire_after(EntryExpiry {
                grace: builder.stale_grace,
            })
            .eviction_listener(expiry_listener(sender));

        if let Some(capacity) = builder.initial_capacity {
            moka_builder = moka_builder.initial_capacity(capacity);
        }

        if let Some(name) = builder.name.as_deref() {
            moka_builder = moka_builder.name(name);
        }

        Self {
            inner: moka_builder.build(),
            expirations: Arc::new(Mutex::new(Some(receiver))),
            stale_grace: builder.stale_grace,
        }
    }

    /// Returns the entry stored under `key`, fresh or stale.
    ///
    /// Callers judge freshness with [`CacheEntry::is_fresh`] against their own clock.
    pub async fn get(&self, key: &str) -> Option<CacheEntry<V>> {
        self.inner.get(key).await
    }

    /// Stores `entry` under `key`, replacing any previous entry.
    pub async fn set(&self, key: impl Into<String>, entry: CacheEntry<V>) {
        self.inner.insert(key.into(), entry).await;
    }

    /// Removes `key`. Removing a missing key is a no-op.
    pub async fn delete(&self, key: &str) {
        self.inner.invalidate(key).await;
    }

    /// Returns every key currently resident, in no particular order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.inner.iter().map(|(key, _)| key.as_ref().clone()).collect()
    }

    /// Returns the number of resident entries.
    ///
    /// The count is approximate until pending housekeeping has run.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Returns `true` if no entries are resident.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the grace window entries spend resident after their TTL.
    #[must_use]
    pub fn stale_grace(&self) -> Duration {
        self.stale_grace
    }

    /// Runs pending housekeeping: applies evictions, removes expired entries and publishes
    /// their expiry events, and settles the entry count.
    pub async fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks().await;
    }

    /// Takes the receiving end of the expiry channel.
    ///
    /// Returns `None` if the receiver has already been taken. The channel is unbounded and
    /// closes once the last handle to the tier is dropped.
    #[must_use]
    pub fn take_expirations(&self) -> Option<UnboundedReceiver<ExpiredEntry<V>>> {
        self.expirations.lock().take()
    }
}

fn expiry_listener<V>(sender: UnboundedSender<ExpiredEntry<V>>) -> impl Fn(Arc<String>, CacheEntry<V>, RemovalCause) + Send + Sync + 'static
where
    V: Send + Sync + 'static,
{
    move |key, entry, cause| {
        if cause != RemovalCause::Expired {
            return;
        }

        // A closed channel means nobody is listening for expirations anymore.
        let _ = sender.unbounded_send(ExpiredEntry {
            key: key.as_ref().clone(),
            value: entry.into_value(),
        });
    }
}
