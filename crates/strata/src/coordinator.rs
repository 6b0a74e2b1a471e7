// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The cache coordinator.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::{
    FutureExt, StreamExt, TryStreamExt,
    channel::mpsc::UnboundedReceiver,
    future::{BoxFuture, join_all},
    stream::TryChunksError,
};
use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};
use strata_memory::{ExpiredEntry, MemoryTier};
use strata_tier::{CacheEntry, KeyPattern, SharedTier};
use tick::{Clock, PeriodicTimer};
use tokio::{runtime::Handle, sync::broadcast, task::JoinHandle};

use crate::{
    builder::{Settings, TieredCacheBuilder},
    codec,
    config::CacheOptions,
    error::{Error, Result},
    events::{CacheEvent, InvalidationCause},
    flight::Flights,
    stats::{Stats, TierCounters},
    tags::TagIndex,
    telemetry::{CacheActivity, CacheOperation, CacheTelemetry, TierKind, ext::ClockExt},
    warm::{WarmScope, WarmSummary, WarmTask},
};

const EVENT_CAPACITY: usize = 1024;

/// A two-tier cache: an in-process local tier in front of a shared tier.
///
/// Reads go to the local tier first, then to the shared tier, and finally to the caller's fetch
/// function; whatever is found is written back to the faster tiers. Writes go to both tiers and
/// to the tag index. The shared tier is treated as unreliable: when it cannot be reached, reads
/// and writes carry on with the local tier alone.
///
/// Local hits return the very same [`Arc`] on every call; values read from the shared tier are
/// freshly decoded.
///
/// Cloning is cheap and every clone drives the same cache.
///
/// # Examples
///
/// ```
/// use std::convert::Infallible;
///
/// use strata::{CacheOptions, TieredCache};
/// use strata_tier::testing::MockSharedTier;
/// use tick::Clock;
///
/// # futures::executor::block_on(async {
/// let cache = TieredCache::builder::<String>(Clock::new_frozen())
///     .shared(MockSharedTier::new())
///     .open();
///
/// let options = CacheOptions::default().with_tag("greetings");
/// let value = cache
///     .get("hello", || async { Ok::<_, Infallible>("world".to_string()) }, &options)
///     .await?;
/// assert_eq!(*value, "world");
///
/// assert_eq!(cache.invalidate_by_tag("greetings").await?, 1);
/// # Ok::<(), strata::Error>(())
/// # });
/// ```
pub struct TieredCache<V, S = ()> {
    inner: Arc<Inner<V, S>>,
}

impl<V, S> Clone for TieredCache<V, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V, S> std::fmt::Debug for TieredCache<V, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredCache")
            .field("name", &self.inner.name)
            .field("settings", &self.inner.settings)
            .finish_non_exhaustive()
    }
}

impl TieredCache<(), ()> {
    /// Creates a builder for a cache holding values of type `V`.
    ///
    /// The clock judges local freshness and times tier operations.
    #[must_use]
    pub fn builder<V>(clock: Clock) -> TieredCacheBuilder<V, ()> {
        TieredCacheBuilder::new(clock)
    }
}

struct Inner<V, S> {
    name: &'static str,
    clock: Clock,
    local: MemoryTier<V>,
    shared: S,
    settings: Settings,
    tags: TagIndex,
    flights: Flights<Result<Arc<V>>>,
    local_counters: TierCounters,
    shared_counters: TierCounters,
    telemetry: CacheTelemetry,
    events: broadcast::Sender<CacheEvent>,
    refreshing: Mutex<HashSet<String>>,
    warm_tasks: Vec<WarmTask<V>>,
    maintenance: Mutex<Option<JoinHandle<()>>>,
}

impl<V, S> Drop for Inner<V, S> {
    fn drop(&mut self) {
        if let Some(handle) = self.maintenance.get_mut().take() {
            handle.abort();
        }
    }
}

enum SharedRead<V> {
    Hit(V),
    Miss,
    Unavailable,
}

impl<V, S> TieredCache<V, S>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
    S: SharedTier + 'static,
{
    pub(crate) fn open(
        clock: Clock,
        shared: S,
        name: &'static str,
        settings: Settings,
        warm_tasks: Vec<WarmTask<V>>,
        telemetry: CacheTelemetry,
    ) -> Self {
        let local = MemoryTier::builder()
            .max_capacity(settings.max_capacity)
            .stale_grace(settings.stale_grace)
            .name(name)
            .build();
        let expirations = local.take_expirations();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let inner = Arc::new(Inner {
            name,
            clock,
            local,
            shared,
            tags: TagIndex::new(settings.tag_index),
            settings,
            flights: Flights::default(),
            local_counters: TierCounters::default(),
            shared_counters: TierCounters::default(),
            telemetry,
            events,
            refreshing: Mutex::new(HashSet::new()),
            warm_tasks,
            maintenance: Mutex::new(None),
        });

        match (Handle::try_current(), expirations) {
            (Ok(runtime), Some(expirations)) => {
                let sweep = PeriodicTimer::new(&inner.clock, inner.settings.sweep_interval.unwrap_or(Duration::MAX));
                let handle = runtime.spawn(maintain(Arc::downgrade(&inner), expirations, sweep));
                *inner.maintenance.lock() = Some(handle);
            }
            (Err(_), _) => {
                tracing::warn!(cache.name = name, "no Tokio runtime, expired local entries will not be promoted");
            }
            (Ok(_), None) => {}
        }

        Self { inner }
    }

    /// Returns the value for `key`, loading it with `fetch` if neither tier has it.
    ///
    /// A fresh local entry is returned as is. Otherwise the shared tier is consulted, and a hit
    /// there is copied into the local tier with `options.local_ttl`. On a full miss, `fetch` runs
    /// and its value is stored in both tiers with `options`, as if by [`set`](Self::set).
    ///
    /// Concurrent calls for the same key share one load, so `fetch` runs once. On a Tokio runtime
    /// the load runs in its own task and is not cancelled when the calls waiting for it are
    /// dropped: it still stores its value, and callers that joined it still receive it.
    ///
    /// With [`stale_while_revalidate`](CacheOptions::stale_while_revalidate) set, if the shared
    /// tier cannot be reached and the local entry expired less than the configured stale grace
    /// ago, the stale value is returned at once and `fetch` runs in a background task that
    /// refreshes both tiers. This needs a Tokio runtime; without one, `fetch` runs inline.
    /// While a background refresh for a key is running, further stale reads do not start
    /// another.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::Recompute`](crate::ErrorKind::Recompute) if `fetch` fails, or if it
    /// panics while running in its own task. Nothing is cached in that case. Shared tier failures
    /// are never returned.
    pub async fn get<F, Fut, E>(&self, key: &str, fetch: F, options: &CacheOptions) -> Result<Arc<V>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let inner = &self.inner;
        let timed = inner.clock.timed(inner.local.get(key)).await;

        let stale = match timed.result {
            Some(entry) if entry.is_fresh(inner.clock.instant()) => {
                inner.local_counters.hit();
                inner.record(TierKind::Local, CacheOperation::Get, CacheActivity::Hit, Some(timed.duration));
                return Ok(entry.into_value());
            }
            Some(entry) => {
                inner.record(TierKind::Local, CacheOperation::Get, CacheActivity::Expired, Some(timed.duration));
                Some(entry)
            }
            None => {
                inner.record(TierKind::Local, CacheOperation::Get, CacheActivity::Miss, Some(timed.duration));
                None
            }
        };
        inner.local_counters.miss();

        inner.flights.run(key, || inner.start_load(key, fetch, options, stale)).await
    }

    /// Stores `value` in both tiers and indexes `key` under every tag in `options`.
    ///
    /// The local write always succeeds. Shared tier and tag index writes are awaited but their
    /// failures are only logged, as are values that cannot be encoded for the shared tier.
    pub async fn set(&self, key: &str, value: V, options: &CacheOptions) {
        self.inner.store(key, Arc::new(value), options).await;
    }

    /// Removes `key` from both tiers.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::TierUnavailable`](crate::ErrorKind::TierUnavailable) if the shared
    /// tier delete fails. The local entry is removed regardless.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let inner = &self.inner;
        inner.local.delete(key).await;

        let timed = inner.clock.timed(inner.shared.delete(key)).await;
        timed.result.map_err(|e| Error::tier_unavailable("delete", e))?;

        inner.record(TierKind::Shared, CacheOperation::Invalidate, CacheActivity::Invalidated, Some(timed.duration));
        inner.publish(CacheEvent::Invalidated {
            cause: InvalidationCause::Key,
            keys: vec![key.to_string()],
        });
        Ok(())
    }

    /// Removes every key indexed under `tag` from both tiers, then drops the tag itself.
    ///
    /// Returns the number of keys the tag indexed; an unknown tag yields `0`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::TierUnavailable`](crate::ErrorKind::TierUnavailable) if the tag
    /// index cannot be read or a shared delete fails.
    pub async fn invalidate_by_tag(&self, tag: &str) -> Result<usize> {
        const OPERATION: &str = "invalidate_by_tag";
        let inner = &self.inner;
        let started = inner.clock.instant();

        let members = inner
            .tags
            .members(&inner.shared, tag)
            .await
            .map_err(|e| Error::tier_unavailable(OPERATION, e))?;
        if members.is_empty() {
            return Ok(0);
        }

        let mut keys: Vec<String> = members.into_iter().collect();
        keys.sort_unstable();

        for key in &keys {
            inner.local.delete(key).await;
        }
        for batch in keys.chunks(inner.settings.scan_batch) {
            inner
                .shared
                .pipeline_delete(batch)
                .await
                .map_err(|e| Error::tier_unavailable(OPERATION, e))?;
        }
        inner
            .tags
            .remove(&inner.shared, tag)
            .await
            .map_err(|e| Error::tier_unavailable(OPERATION, e))?;

        let elapsed = inner.clock.instant().saturating_duration_since(started);
        inner.record(TierKind::Shared, CacheOperation::Invalidate, CacheActivity::Invalidated, Some(elapsed));

        let count = keys.len();
        inner.publish(CacheEvent::Invalidated {
            cause: InvalidationCause::Tag(tag.to_string()),
            keys,
        });
        Ok(count)
    }

    /// Removes every shared tier key matching the glob `pattern` from both tiers.
    ///
    /// The shared key space is scanned lazily and keys are deleted in batches as they are
    /// found. Keys that exist only in the local tier are not matched. Returns the number of
    /// distinct keys deleted.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidPattern`](crate::ErrorKind::InvalidPattern) before touching
    /// either tier if the pattern is malformed, and
    /// [`ErrorKind::TierUnavailable`](crate::ErrorKind::TierUnavailable) if the scan or a
    /// delete fails. Batches deleted before a failure stay deleted.
    pub async fn invalidate_pattern(&self, pattern: &str) -> Result<usize> {
        const OPERATION: &str = "invalidate_pattern";
        let pattern = KeyPattern::parse(pattern)?;
        let inner = &self.inner;
        let started = inner.clock.instant();

        let mut seen = HashSet::new();
        let mut deleted = Vec::new();
        let mut pages = inner.shared.scan(&pattern).try_chunks(inner.settings.scan_batch);

        while let Some(page) = pages.next().await {
            let page = page.map_err(|TryChunksError(_, e)| Error::tier_unavailable(OPERATION, e))?;

            // Scans may report a key more than once.
            let batch: Vec<String> = page.into_iter().filter(|key| seen.insert(key.clone())).collect();
            if batch.is_empty() {
                continue;
            }

            for key in &batch {
                inner.local.delete(key).await;
            }
            inner
                .shared
                .pipeline_delete(&batch)
                .await
                .map_err(|e| Error::tier_unavailable(OPERATION, e))?;
            deleted.extend(batch);
        }

        let elapsed = inner.clock.instant().saturating_duration_since(started);
        inner.record(TierKind::Shared, CacheOperation::Scan, CacheActivity::Invalidated, Some(elapsed));

        let count = deleted.len();
        if count > 0 {
            inner.publish(CacheEvent::Invalidated {
                cause: InvalidationCause::Pattern(pattern.as_str().to_string()),
                keys: deleted,
            });
        }
        Ok(count)
    }

    /// Writes `value` to the shared tier with the configured shared TTL, unless the shared tier
    /// already holds `key`.
    ///
    /// The maintenance task calls this for every entry the local tier expires, so values keep
    /// living in the shared tier after they age out locally. A newer value written by another
    /// instance is never overwritten. Failures are logged.
    pub async fn promote_to_shared(&self, key: &str, value: Arc<V>) {
        self.inner.promote(key, &value).await;
    }

    /// Runs every registered warming task for `scope` concurrently.
    ///
    /// Each task computes its key and value from the scope and stores the value with its own
    /// options. A task that fails or panics is logged and counted; the others are unaffected.
    pub async fn warm_cache(&self, scope: &WarmScope) -> WarmSummary {
        let inner = &self.inner;
        let runs = inner
            .warm_tasks
            .iter()
            .map(|task| AssertUnwindSafe(inner.warm_one(task, scope)).catch_unwind());
        let outcomes = join_all(runs).await;

        let mut succeeded = 0;
        for (task, outcome) in inner.warm_tasks.iter().zip(outcomes) {
            match outcome {
                Ok(true) => succeeded += 1,
                Ok(false) => {}
                Err(_) => tracing::error!(cache.name = inner.name, warm.task = task.name(), "warming task panicked"),
            }
        }

        WarmSummary {
            succeeded,
            total: inner.warm_tasks.len(),
        }
    }

    /// Returns hit and miss counters for both tiers, the local entry count, and what the shared
    /// tier reports about itself.
    ///
    /// Pending local housekeeping runs first so the entry count is settled.
    pub async fn stats(&self) -> Stats {
        let inner = &self.inner;
        inner.local.run_pending_tasks().await;
        let key_count = inner.local.len();
        inner.telemetry.record_size(inner.name, key_count);

        let reported = match inner.shared.stats().await {
            Ok(report) => Some(report),
            Err(e) => {
                inner.telemetry.degraded(inner.name, CacheOperation::Stats, &e);
                None
            }
        };

        Stats::new(&inner.local_counters, key_count, &inner.shared_counters, reported)
    }

    /// Subscribes to [`CacheEvent`]s published by this cache and its clones.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    /// Stops the maintenance task.
    ///
    /// The cache stays usable, but the local tier is no longer swept and expired entries are no
    /// longer promoted. Dropping the last clone of the cache has the same effect.
    pub fn close(&self) {
        if let Some(handle) = self.inner.maintenance.lock().take() {
            handle.abort();
        }
    }
}

impl<V, S> Inner<V, S>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
    S: SharedTier + 'static,
{
    fn record(&self, tier: TierKind, operation: CacheOperation, activity: CacheActivity, duration: Option<Duration>) {
        self.telemetry.record(self.name, tier, operation, activity, duration);
    }

    fn publish(&self, event: CacheEvent) {
        // Sending only fails when nobody is subscribed.
        let _ = self.events.send(event);
    }

    /// Starts a miss-path load that outlives the caller who started it.
    ///
    /// On a Tokio runtime the load runs as its own task, so it completes and caches its value
    /// even if every caller waiting for it is dropped. Without a runtime it runs inline.
    fn start_load<F, Fut, E>(
        self: &Arc<Self>,
        key: &str,
        fetch: F,
        options: &CacheOptions,
        stale: Option<CacheEntry<V>>,
    ) -> BoxFuture<'static, Result<Arc<V>>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let inner = Arc::clone(self);
        let owned_key = key.to_string();
        let options = options.clone();
        let load = async move { inner.load(&owned_key, fetch, &options, stale).await };

        let Ok(runtime) = Handle::try_current() else {
            return load.boxed();
        };

        let key = key.to_string();
        let task = runtime.spawn(load);
        async move { task.await.unwrap_or_else(|e| Err(Error::recompute(&key, Arc::new(e)))) }.boxed()
    }

    async fn load<F, Fut, E>(self: &Arc<Self>, key: &str, fetch: F, options: &CacheOptions, stale: Option<CacheEntry<V>>) -> Result<Arc<V>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        // An earlier flight may have stored the value since this caller's local read.
        if let Some(entry) = self.local.get(key).await
            && entry.is_fresh(self.clock.instant())
        {
            return Ok(entry.into_value());
        }

        match self.read_shared(key).await {
            SharedRead::Hit(value) => {
                let value = Arc::new(value);
                let entry = CacheEntry::new(Arc::clone(&value), self.clock.instant(), options.local_ttl);
                self.local.set(key, entry).await;
                return Ok(value);
            }
            SharedRead::Miss => {}
            SharedRead::Unavailable => {
                if let Ok(runtime) = Handle::try_current()
                    && let Some(value) = self.serve_stale(key, stale, options)
                {
                    self.revalidate(&runtime, key, fetch, options);
                    return Ok(value);
                }
            }
        }

        let value = match fetch().await {
            Ok(value) => Arc::new(value),
            Err(e) => {
                self.record(TierKind::Local, CacheOperation::Get, CacheActivity::Error, None);
                return Err(Error::recompute(key, Arc::new(e)));
            }
        };

        self.store(key, Arc::clone(&value), options).await;
        Ok(value)
    }

    /// Returns the stale value to serve, if stale-while-revalidate applies.
    fn serve_stale(&self, key: &str, stale: Option<CacheEntry<V>>, options: &CacheOptions) -> Option<Arc<V>> {
        if !options.stale_while_revalidate {
            return None;
        }

        let entry = stale?;
        if !entry.is_stale_within(self.clock.instant(), self.settings.stale_grace) {
            return None;
        }

        tracing::debug!(cache.name = self.name, cache.key = key, "serving stale value");
        Some(entry.into_value())
    }

    /// Refreshes `key` in the background unless a refresh is already running.
    fn revalidate<F, Fut, E>(self: &Arc<Self>, runtime: &Handle, key: &str, fetch: F, options: &CacheOptions)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<V, E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        if !self.refreshing.lock().insert(key.to_string()) {
            return;
        }

        let inner = Arc::clone(self);
        let key = key.to_string();
        let options = options.clone();
        runtime.spawn(async move {
            match AssertUnwindSafe(async move { fetch().await }).catch_unwind().await {
                Ok(Ok(value)) => {
                    inner.store(&key, Arc::new(value), &options).await;
                    inner.record(TierKind::Local, CacheOperation::Get, CacheActivity::Revalidated, None);
                }
                Ok(Err(e)) => {
                    tracing::warn!(cache.name = inner.name, cache.key = key.as_str(), error = %e, "background revalidation failed");
                }
                Err(_) => {
                    tracing::error!(cache.name = inner.name, cache.key = key.as_str(), "background revalidation panicked");
                }
            }
            // Cleared on every outcome so later stale reads can refresh the key again.
            inner.refreshing.lock().remove(&key);
        });
    }

    async fn read_shared(&self, key: &str) -> SharedRead<V> {
        let timed = self.clock.timed(self.shared.get(key)).await;

        match timed.result {
            Ok(Some(bytes)) => match codec::decode(&bytes) {
                Ok(value) => {
                    self.shared_counters.hit();
                    self.record(TierKind::Shared, CacheOperation::Get, CacheActivity::Hit, Some(timed.duration));
                    SharedRead::Hit(value)
                }
                Err(e) => {
                    self.shared_counters.miss();
                    tracing::warn!(cache.name = self.name, cache.key = key, error = %e, "undecodable shared value treated as a miss");
                    self.record(TierKind::Shared, CacheOperation::Get, CacheActivity::Miss, Some(timed.duration));
                    SharedRead::Miss
                }
            },
            Ok(None) => {
                self.shared_counters.miss();
                self.record(TierKind::Shared, CacheOperation::Get, CacheActivity::Miss, Some(timed.duration));
                SharedRead::Miss
            }
            Err(e) => {
                self.shared_counters.miss();
                self.telemetry.degraded(self.name, CacheOperation::Get, &e);
                SharedRead::Unavailable
            }
        }
    }

    async fn store(&self, key: &str, value: Arc<V>, options: &CacheOptions) {
        let entry = CacheEntry::new(Arc::clone(&value), self.clock.instant(), options.local_ttl);
        self.local.set(key, entry).await;
        self.record(TierKind::Local, CacheOperation::Insert, CacheActivity::Inserted, None);

        futures::join!(self.write_shared(key, &value, options.shared_ttl), self.index_tags(key, options));

        self.publish(CacheEvent::Stored { key: key.to_string() });
    }

    /// Encodes a value for the shared tier, logging values that cannot be encoded.
    fn encode(&self, key: &str, value: &V, operation: CacheOperation) -> Option<Vec<u8>> {
        match codec::encode(value) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                self.telemetry.degraded(self.name, operation, &Error::serialization(key, e));
                None
            }
        }
    }

    async fn write_shared(&self, key: &str, value: &V, ttl: Duration) {
        let Some(bytes) = self.encode(key, value, CacheOperation::Insert) else {
            return;
        };

        let timed = self.clock.timed(self.shared.set(key, bytes, ttl)).await;
        match timed.result {
            Ok(()) => self.record(TierKind::Shared, CacheOperation::Insert, CacheActivity::Inserted, Some(timed.duration)),
            Err(e) => self.telemetry.degraded(self.name, CacheOperation::Insert, &e),
        }
    }

    async fn index_tags(&self, key: &str, options: &CacheOptions) {
        let adds = options
            .tags
            .iter()
            .map(|tag| self.tags.add(&self.shared, tag, key, options.shared_ttl));

        for result in join_all(adds).await {
            if let Err(e) = result {
                self.telemetry.degraded(self.name, CacheOperation::Insert, &e);
            }
        }
    }

    /// Copies an expiring local value into the shared tier unless the key already exists there.
    ///
    /// A value already in the shared tier was written or refreshed elsewhere and is at least as
    /// new as this one.
    async fn promote(&self, key: &str, value: &V) {
        let Some(bytes) = self.encode(key, value, CacheOperation::Promote) else {
            return;
        };

        let timed = self.clock.timed(self.shared.set_if_absent(key, bytes, self.settings.shared_ttl)).await;
        match timed.result {
            Ok(true) => {
                self.record(TierKind::Shared, CacheOperation::Promote, CacheActivity::Promoted, Some(timed.duration));
                self.publish(CacheEvent::Promoted { key: key.to_string() });
            }
            Ok(false) => {
                tracing::debug!(cache.name = self.name, cache.key = key, "shared tier already holds the key, promotion skipped");
            }
            Err(e) => self.telemetry.degraded(self.name, CacheOperation::Promote, &e),
        }
    }

    async fn warm_one(&self, task: &WarmTask<V>, scope: &WarmScope) -> bool {
        let key = task.key(scope);
        match task.load(scope).await {
            Ok(value) => {
                self.store(&key, Arc::new(value), task.options()).await;
                true
            }
            Err(e) => {
                self.record(TierKind::Local, CacheOperation::Warm, CacheActivity::Error, None);
                tracing::warn!(cache.name = self.name, warm.task = task.name(), cache.key = key.as_str(), error = %e, "warming task failed");
                false
            }
        }
    }

    async fn sweep(&self) {
        self.local.run_pending_tasks().await;
        self.telemetry.record_size(self.name, self.local.len());
    }
}

/// Promotes expired local entries and periodically sweeps the local tier.
///
/// Holds the cache weakly and exits once it is gone.
async fn maintain<V, S>(cache: Weak<Inner<V, S>>, mut expirations: UnboundedReceiver<ExpiredEntry<V>>, mut sweep: PeriodicTimer)
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
    S: SharedTier + 'static,
{
    loop {
        tokio::select! {
            expired = expirations.next() => {
                let (Some(expired), Some(inner)) = (expired, cache.upgrade()) else {
                    break;
                };
                inner.promote(&expired.key, &expired.value).await;
            }
            _ = sweep.next() => {
                let Some(inner) = cache.upgrade() else {
                    break;
                };
                inner.sweep().await;
            }
        }
    }
}
