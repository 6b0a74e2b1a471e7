// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-call options and coordinator-wide configuration.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::Deserialize;

/// Default time an entry stays fresh in the local tier.
pub const DEFAULT_LOCAL_TTL: Duration = Duration::from_secs(60);

/// Default time an entry lives in the shared tier.
pub const DEFAULT_SHARED_TTL: Duration = Duration::from_secs(300);

/// Default window during which an expired local entry may still be served.
pub const DEFAULT_STALE_GRACE: Duration = Duration::from_secs(30);

/// Default interval between local housekeeping sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(120);

/// Default number of keys deleted per shared-tier round trip during bulk invalidation.
pub const DEFAULT_SCAN_BATCH: usize = 100;

/// Options for a single `get` or `set` call.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use strata::CacheOptions;
///
/// let options = CacheOptions::default()
///     .with_local_ttl(Duration::from_secs(10))
///     .with_tag("dashboard")
///     .with_tag("user:42")
///     .stale_while_revalidate(true);
///
/// assert_eq!(options.shared_ttl, Duration::from_secs(300));
/// assert_eq!(options.tags.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct CacheOptions {
    /// How long the value stays fresh in the local tier.
    pub local_ttl: Duration,
    /// How long the value lives in the shared tier.
    pub shared_ttl: Duration,
    /// Tags the key is indexed under for bulk invalidation.
    pub tags: BTreeSet<String>,
    /// Serve an expired local value while recomputing in the background, when the shared tier
    /// cannot be reached.
    pub stale_while_revalidate: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            local_ttl: DEFAULT_LOCAL_TTL,
            shared_ttl: DEFAULT_SHARED_TTL,
            tags: BTreeSet::new(),
            stale_while_revalidate: false,
        }
    }
}

impl CacheOptions {
    /// Sets the local tier TTL.
    #[must_use]
    pub fn with_local_ttl(mut self, ttl: Duration) -> Self {
        self.local_ttl = ttl;
        self
    }

    /// Sets the shared tier TTL.
    #[must_use]
    pub fn with_shared_ttl(mut self, ttl: Duration) -> Self {
        self.shared_ttl = ttl;
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Adds several tags.
    #[must_use]
    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Enables or disables stale-while-revalidate.
    #[must_use]
    pub fn stale_while_revalidate(mut self, enabled: bool) -> Self {
        self.stale_while_revalidate = enabled;
        self
    }
}

/// How tag index sets in the shared tier are bounded.
///
/// With [`Persistent`](Self::Persistent), a tag set is removed only by
/// `invalidate_by_tag`; members whose entries expire on their own stay in the set until then.
/// [`Expiring`](Self::Expiring) refreshes a TTL of `shared_ttl + margin` on the tag set at every
/// write, so abandoned tags age out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TagIndexPolicy {
    /// Tag sets never expire.
    #[default]
    Persistent,
    /// Tag sets expire `shared_ttl + margin_secs` after their most recent write.
    Expiring {
        /// Extra lifetime beyond the member's shared TTL, in seconds.
        margin_secs: u64,
    },
}

impl TagIndexPolicy {
    /// Creates an expiring policy with the given margin.
    #[must_use]
    pub fn expiring(margin: Duration) -> Self {
        Self::Expiring {
            margin_secs: margin.as_secs(),
        }
    }

    pub(crate) fn ttl_for(self, shared_ttl: Duration) -> Option<Duration> {
        match self {
            Self::Persistent => None,
            Self::Expiring { margin_secs } => Some(shared_ttl.saturating_add(Duration::from_secs(margin_secs))),
        }
    }
}

/// Coordinator configuration, loadable from a host's configuration file.
///
/// Durations are whole seconds. Every field has a default.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use strata::{CacheConfig, TagIndexPolicy};
///
/// let config: CacheConfig = serde_json::from_str(
///     r#"{
///         "max_capacity": 500,
///         "sweep_interval_secs": 0,
///         "tag_index": { "kind": "expiring", "margin_secs": 60 }
///     }"#,
/// )?;
///
/// assert_eq!(config.max_capacity, 500);
/// assert_eq!(config.sweep_interval(), None);
/// assert_eq!(config.stale_grace(), Duration::from_secs(30));
/// assert_eq!(config.tag_index, TagIndexPolicy::expiring(Duration::from_secs(60)));
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct CacheConfig {
    /// Maximum number of entries in the local tier.
    pub max_capacity: u64,
    /// Default local TTL used by [`default_options`](Self::default_options).
    pub local_ttl_secs: u64,
    /// Default shared TTL, also used when promoting expired local entries.
    pub shared_ttl_secs: u64,
    /// Window after the local TTL during which a stale value may be served.
    pub stale_grace_secs: u64,
    /// Interval between local housekeeping sweeps; `0` disables the sweep.
    pub sweep_interval_secs: u64,
    /// Keys per shared-tier delete round trip during bulk invalidation.
    pub scan_batch: usize,
    /// How tag index sets are bounded.
    pub tag_index: TagIndexPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_capacity: strata_memory::DEFAULT_MAX_CAPACITY,
            local_ttl_secs: DEFAULT_LOCAL_TTL.as_secs(),
            shared_ttl_secs: DEFAULT_SHARED_TTL.as_secs(),
            stale_grace_secs: DEFAULT_STALE_GRACE.as_secs(),
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL.as_secs(),
            scan_batch: DEFAULT_SCAN_BATCH,
            tag_index: TagIndexPolicy::Persistent,
        }
    }
}

impl CacheConfig {
    /// Returns the default local TTL.
    #[must_use]
    pub fn local_ttl(&self) -> Duration {
        Duration::from_secs(self.local_ttl_secs)
    }

    /// Returns the default shared TTL.
    #[must_use]
    pub fn shared_ttl(&self) -> Duration {
        Duration::from_secs(self.shared_ttl_secs)
    }

    /// Returns the stale grace window.
    #[must_use]
    pub fn stale_grace(&self) -> Duration {
        Duration::from_secs(self.stale_grace_secs)
    }

    /// Returns the sweep interval, or `None` when sweeping is disabled.
    #[must_use]
    pub fn sweep_interval(&self) -> Option<Duration> {
        (self.sweep_interval_secs > 0).then(|| Duration::from_secs(self.sweep_interval_secs))
    }

    /// Returns [`CacheOptions`] carrying this configuration's default TTLs.
    #[must_use]
    pub fn default_options(&self) -> CacheOptions {
        CacheOptions::default()
            .with_local_ttl(self.local_ttl())
            .with_shared_ttl(self.shared_ttl())
    }
}
