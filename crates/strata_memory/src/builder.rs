// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring the local tier.
//!
//! The builder hides moka's configuration types so they never appear in this crate's public
//! API.

use std::marker::PhantomData;
use std::time::Duration;

use crate::tier::MemoryTier;

/// Default maximum number of entries held by a [`MemoryTier`].
pub const DEFAULT_MAX_CAPACITY: u64 = 10_000;

/// Builder for configuring a [`MemoryTier`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use strata_memory::MemoryTier;
///
/// let tier = MemoryTier::<String>::builder()
///     .max_capacity(1000)
///     .initial_capacity(100)
///     .stale_grace(Duration::from_secs(30))
///     .name("sessions")
///     .build();
/// ```
#[derive(Debug)]
pub struct MemoryTierBuilder<V> {
    pub(crate) max_capacity: u64,
    pub(crate) initial_capacity: Option<usize>,
    pub(crate) stale_grace: Duration,
    pub(crate) name: Option<String>,
    _phantom: PhantomData<V>,
}

impl<V> Default for MemoryTierBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> MemoryTierBuilder<V> {
    /// Creates a builder holding up to [`DEFAULT_MAX_CAPACITY`] entries with no stale grace.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_capacity: DEFAULT_MAX_CAPACITY,
            initial_capacity: None,
            stale_grace: Duration::ZERO,
            name: None,
            _phantom: PhantomData,
        }
    }

    /// Sets the maximum number of entries.
    ///
    /// Once the tier is full, storing a new key evicts the least recently used entry rather
    /// than failing. Capacity evictions never publish expiry events.
    #[must_use]
    pub fn max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = capacity;
        self
    }

    /// Sets the initial capacity (pre-allocation hint) for the tier.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Sets how long an entry stays resident after its TTL elapses.
    ///
    /// Entries are physically removed, and their expiry published, only once
    /// `ttl + stale_grace` has passed. During the grace window a reader can still observe the
    /// stale value and decide whether to serve it.
    #[must_use]
    pub fn stale_grace(mut self, grace: Duration) -> Self {
        self.stale_grace = grace;
        self
    }

    /// Sets a name for the tier, used by moka in its own diagnostics.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the configured [`MemoryTier`].
    #[must_use]
    pub fn build(self) -> MemoryTier<V>
    where
        V: Send + Sync + 'static,
    {
        MemoryTier::from_builder(&self)
    }
}
