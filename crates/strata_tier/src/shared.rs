// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The contract for the shared (distributed) cache tier.
//!
//! [`SharedTier`] is byte-oriented: the coordinator serializes values before handing them over
//! and deserializes what comes back. Besides plain key/value storage, a shared tier provides
//! unordered string sets (used for the tag index), a cursor-based key scan, and a batched
//! delete.

use std::{collections::HashSet, time::Duration};

use futures::stream::BoxStream;

use crate::{Error, KeyPattern};

/// Counters a shared tier reports about itself.
///
/// Fields a backend cannot provide stay at their defaults; `key_count` is `None` when the
/// backend does not expose a key count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct SharedTierReport {
    /// Server-side lookups that found a key.
    pub hits: u64,
    /// Server-side lookups that found nothing.
    pub misses: u64,
    /// Number of keys stored, if known.
    pub key_count: Option<u64>,
}

impl SharedTierReport {
    /// Creates a report from hit and miss counters.
    #[must_use]
    pub fn new(hits: u64, misses: u64) -> Self {
        Self {
            hits,
            misses,
            key_count: None,
        }
    }

    /// Sets the number of keys stored.
    #[must_use]
    pub fn with_key_count(mut self, key_count: u64) -> Self {
        self.key_count = Some(key_count);
        self
    }
}

/// A distributed, byte-oriented cache tier.
///
/// Every operation may fail with an [`Error`] when the backend is unreachable. Implementations
/// should not retry internally beyond what their connection layer already does; callers decide
/// whether a failure is fatal.
pub trait SharedTier: Send + Sync {
    /// Reads the bytes stored under `key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>, Error>> + Send;

    /// Stores `value` under `key`, replacing any previous value, expiring after `ttl`.
    fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes `key`, whether it holds a value or a set. Removing a missing key succeeds.
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), Error>> + Send;

    /// Lazily enumerates the keys matching `pattern`.
    ///
    /// The stream is cursor-paginated: implementations fetch one page at a time and must not
    /// materialize the full key space up front. Keys written or removed while the scan runs may
    /// or may not appear.
    fn scan(&self, pattern: &KeyPattern) -> BoxStream<'static, Result<String, Error>>;

    /// Adds `member` to the set stored at `set_key`, creating the set if needed.
    fn set_add(&self, set_key: &str, member: &str) -> impl Future<Output = Result<(), Error>> + Send;

    /// Returns every member of the set stored at `set_key`, or an empty set.
    fn set_members(&self, set_key: &str) -> impl Future<Output = Result<HashSet<String>, Error>> + Send;

    /// Stores `value` under `key` only if the key does not exist, expiring after `ttl`.
    ///
    /// Returns whether the value was written. The default implementation reads the key and then
    /// writes it, so a concurrent writer can slip in between; backends that can test and set in
    /// one step should override it.
    fn set_if_absent(&self, key: &str, value: Vec<u8>, ttl: Duration) -> impl Future<Output = Result<bool, Error>> + Send {
        async move {
            if self.get(key).await?.is_some() {
                return Ok(false);
            }
            self.set(key, value, ttl).await?;
            Ok(true)
        }
    }

    /// Sets a time-to-live on an existing key. A missing key is left alone.
    fn expire(&self, key: &str, ttl: Duration) -> impl Future<Output = Result<(), Error>> + Send;

    /// Sets a time-to-live on an existing key unless it already has a longer one.
    ///
    /// A key without a time-to-live receives `ttl`; a key whose remaining time-to-live is at
    /// least `ttl` is left alone, as is a missing key.
    fn extend_ttl(&self, key: &str, ttl: Duration) -> impl Future<Output = Result<(), Error>> + Send;

    /// Removes all `keys` in a single batched round trip.
    fn pipeline_delete(&self, keys: &[String]) -> impl Future<Output = Result<(), Error>> + Send;

    /// Returns the backend's own hit and miss counters.
    ///
    /// The default implementation reports nothing.
    fn stats(&self) -> impl Future<Output = Result<SharedTierReport, Error>> + Send {
        async { Ok(SharedTierReport::default()) }
    }
}
