// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for assembling a [`TieredCache`].

use std::marker::PhantomData;
use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};
use strata_tier::SharedTier;
use tick::Clock;

use crate::{
    config::{CacheConfig, TagIndexPolicy},
    coordinator::TieredCache,
    telemetry::config::TelemetryConfig,
    warm::WarmTask,
};

const DEFAULT_NAME: &str = "strata";

/// Settings resolved from the builder and kept by the coordinator.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub max_capacity: u64,
    pub shared_ttl: Duration,
    pub stale_grace: Duration,
    pub sweep_interval: Option<Duration>,
    pub scan_batch: usize,
    pub tag_index: TagIndexPolicy,
}

impl From<&CacheConfig> for Settings {
    fn from(config: &CacheConfig) -> Self {
        Self {
            max_capacity: config.max_capacity,
            shared_ttl: config.shared_ttl(),
            stale_grace: config.stale_grace(),
            sweep_interval: config.sweep_interval(),
            scan_batch: config.scan_batch.max(1),
            tag_index: config.tag_index,
        }
    }
}

/// Builder for a [`TieredCache`].
///
/// Created by [`TieredCache::builder`]. A shared tier must be supplied with
/// [`shared`](Self::shared) before the cache can be opened.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use strata::{CacheConfig, TieredCache};
/// use strata_tier::testing::MockSharedTier;
/// use tick::Clock;
///
/// let cache = TieredCache::builder::<String>(Clock::new_frozen())
///     .shared(MockSharedTier::new())
///     .name("reports")
///     .config(CacheConfig::default())
///     .max_capacity(1_000)
///     .stale_grace(Duration::from_secs(10))
///     .open();
/// ```
pub struct TieredCacheBuilder<V, S> {
    clock: Clock,
    shared: S,
    name: &'static str,
    settings: Settings,
    warm_tasks: Vec<WarmTask<V>>,
    telemetry: TelemetryConfig,
    _value: PhantomData<fn() -> V>,
}

impl<V, S> std::fmt::Debug for TieredCacheBuilder<V, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredCacheBuilder")
            .field("name", &self.name)
            .field("settings", &self.settings)
            .field("warm_tasks", &self.warm_tasks.len())
            .finish_non_exhaustive()
    }
}

impl<V> TieredCacheBuilder<V, ()> {
    pub(crate) fn new(clock: Clock) -> Self {
        Self {
            clock,
            shared: (),
            name: DEFAULT_NAME,
            settings: Settings::from(&CacheConfig::default()),
            warm_tasks: Vec::new(),
            telemetry: TelemetryConfig::default(),
            _value: PhantomData,
        }
    }
}

impl<V, S> TieredCacheBuilder<V, S> {
    /// Sets the shared tier.
    #[must_use]
    pub fn shared<T: SharedTier>(self, shared: T) -> TieredCacheBuilder<V, T> {
        TieredCacheBuilder {
            clock: self.clock,
            shared,
            name: self.name,
            settings: self.settings,
            warm_tasks: self.warm_tasks,
            telemetry: self.telemetry,
            _value: PhantomData,
        }
    }

    /// Sets the name used in logs and metrics. Defaults to `"strata"`.
    #[must_use]
    pub fn name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Applies every setting from `config`, replacing earlier calls.
    #[must_use]
    pub fn config(mut self, config: CacheConfig) -> Self {
        self.settings = Settings::from(&config);
        self
    }

    /// Sets the maximum number of local entries.
    #[must_use]
    pub fn max_capacity(mut self, capacity: u64) -> Self {
        self.settings.max_capacity = capacity;
        self
    }

    /// Sets the shared TTL used when promoting expired local entries.
    #[must_use]
    pub fn shared_ttl(mut self, ttl: Duration) -> Self {
        self.settings.shared_ttl = ttl;
        self
    }

    /// Sets how long an expired local entry remains servable under stale-while-revalidate.
    #[must_use]
    pub fn stale_grace(mut self, grace: Duration) -> Self {
        self.settings.stale_grace = grace;
        self
    }

    /// Sets the interval between local sweeps, or disables them with `None`.
    ///
    /// Sweeps remove expired local entries, which publishes them for promotion even when the
    /// cache sees no traffic.
    #[must_use]
    pub fn sweep_interval(mut self, interval: Option<Duration>) -> Self {
        self.settings.sweep_interval = interval;
        self
    }

    /// Sets how many keys bulk invalidation deletes per shared-tier round trip.
    #[must_use]
    pub fn scan_batch(mut self, batch: usize) -> Self {
        self.settings.scan_batch = batch.max(1);
        self
    }

    /// Sets how tag index sets are bounded.
    #[must_use]
    pub fn tag_index_policy(mut self, policy: TagIndexPolicy) -> Self {
        self.settings.tag_index = policy;
        self
    }

    /// Registers a task run by [`TieredCache::warm_cache`].
    #[must_use]
    pub fn warm_task(mut self, task: WarmTask<V>) -> Self {
        self.warm_tasks.push(task);
        self
    }

    /// Sets telemetry options.
    #[must_use]
    pub fn telemetry(mut self, telemetry: TelemetryConfig) -> Self {
        self.telemetry = telemetry;
        self
    }
}

impl<V, S> TieredCacheBuilder<V, S>
where
    V: Serialize + DeserializeOwned + Send + Sync + 'static,
    S: SharedTier + 'static,
{
    /// Opens the cache.
    ///
    /// When called inside a Tokio runtime, this also starts the maintenance task that sweeps
    /// the local tier and promotes expired entries. Outside a runtime the cache still works,
    /// but expired entries are not promoted.
    #[must_use]
    pub fn open(self) -> TieredCache<V, S> {
        TieredCache::open(self.clock, self.shared, self.name, self.settings, self.warm_tasks, self.telemetry.build())
    }
}
