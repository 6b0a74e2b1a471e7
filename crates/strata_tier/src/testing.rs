// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock shared tier for testing.
//!
//! This module provides [`MockSharedTier`], an in-memory [`SharedTier`] that records every
//! operation and supports failure injection for testing degraded paths.

use std::{
    collections::{BTreeMap, HashSet},
    ops::Bound,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;

use crate::{Error, KeyPattern, SharedTier, SharedTierReport};

const DEFAULT_PAGE_SIZE: usize = 10;

/// Recorded shared tier operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SharedOp {
    /// A value was read.
    Get(String),
    /// A value was written.
    Set {
        /// The key written.
        key: String,
        /// The TTL requested.
        ttl: Duration,
    },
    /// A value was written only if its key was absent.
    SetIfAbsent {
        /// The key written.
        key: String,
        /// The TTL requested.
        ttl: Duration,
    },
    /// A key was deleted.
    Delete(String),
    /// A scan page was fetched for the given glob.
    Scan(String),
    /// A member was added to a set.
    SetAdd {
        /// The set key.
        set_key: String,
        /// The member added.
        member: String,
    },
    /// The members of a set were read.
    SetMembers(String),
    /// A TTL was attached to a key.
    Expire {
        /// The key.
        key: String,
        /// The TTL requested.
        ttl: Duration,
    },
    /// A key's TTL was raised, if shorter.
    ExtendTtl {
        /// The key.
        key: String,
        /// The TTL requested.
        ttl: Duration,
    },
    /// A batch of keys was deleted in one round trip.
    PipelineDelete(Vec<String>),
    /// Tier counters were requested.
    Stats,
}

#[derive(Debug, Clone)]
enum Stored {
    Value { bytes: Vec<u8>, ttl: Option<Duration> },
    Set { members: HashSet<String>, ttl: Option<Duration> },
}

impl Stored {
    fn set_ttl(&mut self, new_ttl: Duration) {
        match self {
            Self::Value { ttl, .. } | Self::Set { ttl, .. } => *ttl = Some(new_ttl),
        }
    }

    fn ttl(&self) -> Option<Duration> {
        match self {
            Self::Value { ttl, .. } | Self::Set { ttl, .. } => *ttl,
        }
    }
}

type FailPredicate = Box<dyn Fn(&SharedOp) -> bool + Send + Sync>;

/// A configurable in-memory shared tier for testing.
///
/// Values and sets share one ordered key space, the way they do in Redis. TTLs are recorded
/// but never enforced: tests observe them through [`ttl_of`](Self::ttl_of) instead of waiting
/// for them to elapse.
///
/// Scans are paginated: each page covers at most `page_size` keys of the raw key space, is
/// fetched only when the stream is polled past the previous page, and is recorded as one
/// [`SharedOp::Scan`].
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use strata_tier::SharedTier;
/// use strata_tier::testing::{MockSharedTier, SharedOp};
///
/// # futures::executor::block_on(async {
/// let tier = MockSharedTier::new();
/// tier.set("key", b"42".to_vec(), Duration::from_secs(5)).await.unwrap();
/// assert_eq!(tier.get("key").await.unwrap(), Some(b"42".to_vec()));
///
/// // Fail every read from now on.
/// tier.fail_when(|op| matches!(op, SharedOp::Get(_)));
/// assert!(tier.get("key").await.is_err());
/// # });
/// ```
pub struct MockSharedTier {
    data: Arc<Mutex<BTreeMap<String, Stored>>>,
    operations: Arc<Mutex<Vec<SharedOp>>>,
    fail_when: Arc<Mutex<Option<FailPredicate>>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    page_size: usize,
}

impl std::fmt::Debug for MockSharedTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSharedTier")
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl Clone for MockSharedTier {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
            hits: Arc::clone(&self.hits),
            misses: Arc::clone(&self.misses),
            page_size: self.page_size,
        }
    }
}

impl Default for MockSharedTier {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSharedTier {
    /// Creates an empty mock tier.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(BTreeMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Creates a mock tier on which every operation fails, as if the server were down.
    #[must_use]
    pub fn unreachable() -> Self {
        let tier = Self::new();
        tier.fail_when(|_| true);
        tier
    }

    /// Sets how many raw keys each scan page covers. Values below 1 are treated as 1.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Stores raw bytes without recording an operation.
    pub fn seed(&self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.data.lock().insert(
            key.into(),
            Stored::Value {
                bytes: bytes.into(),
                ttl: None,
            },
        );
    }

    /// Returns the raw bytes stored under `key`, without recording an operation.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        match self.data.lock().get(key) {
            Some(Stored::Value { bytes, .. }) => Some(bytes.clone()),
            _ => None,
        }
    }

    /// Returns the members of the set at `set_key`, without recording an operation.
    #[must_use]
    pub fn members(&self, set_key: &str) -> HashSet<String> {
        match self.data.lock().get(set_key) {
            Some(Stored::Set { members, .. }) => members.clone(),
            _ => HashSet::new(),
        }
    }

    /// Returns the TTL last attached to `key`, if any.
    #[must_use]
    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        self.data.lock().get(key).and_then(Stored::ttl)
    }

    /// Returns true if the key space contains `key`.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.lock().contains_key(key)
    }

    /// Returns the number of keys, values and sets alike.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Sets a predicate that decides which operations fail.
    ///
    /// Failed operations are still recorded and leave the stored data untouched.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&SharedOp) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<SharedOp> {
        self.operations.lock().clone()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    fn check(&self, op: SharedOp) -> Result<(), Error> {
        let failed = self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&op));
        let message = format!("mock: {op:?} failed");
        self.operations.lock().push(op);
        if failed { Err(Error::from_message(message)) } else { Ok(()) }
    }

    fn scan_page(&self, pattern: &KeyPattern, after: Option<&str>) -> Result<(Vec<String>, Option<String>), Error> {
        self.check(SharedOp::Scan(pattern.as_str().to_string()))?;

        let data = self.data.lock();
        let lower = after.map_or(Bound::Unbounded, |key| Bound::Excluded(key.to_string()));
        let page: Vec<String> = data
            .range((lower, Bound::Unbounded))
            .take(self.page_size)
            .map(|(key, _)| key.clone())
            .collect();

        let cursor = if page.len() == self.page_size { page.last().cloned() } else { None };
        let matched = page.into_iter().filter(|key| pattern.matches(key)).collect();
        Ok((matched, cursor))
    }
}

enum ScanState {
    Start,
    After(String),
    Done,
}

impl SharedTier for MockSharedTier {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        self.check(SharedOp::Get(key.to_string()))?;
        let found = self.raw(key);
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        Ok(found)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), Error> {
        self.check(SharedOp::Set {
            key: key.to_string(),
            ttl,
        })?;
        self.data.lock().insert(
            key.to_string(),
            Stored::Value {
                bytes: value,
                ttl: Some(ttl),
            },
        );
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<bool, Error> {
        self.check(SharedOp::SetIfAbsent {
            key: key.to_string(),
            ttl,
        })?;
        let mut data = self.data.lock();
        if data.contains_key(key) {
            return Ok(false);
        }
        data.insert(
            key.to_string(),
            Stored::Value {
                bytes: value,
                ttl: Some(ttl),
            },
        );
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.check(SharedOp::Delete(key.to_string()))?;
        self.data.lock().remove(key);
        Ok(())
    }

    fn scan(&self, pattern: &KeyPattern) -> BoxStream<'static, Result<String, Error>> {
        let tier = self.clone();
        let pattern = pattern.clone();

        stream::unfold(ScanState::Start, move |state| {
            let tier = tier.clone();
            let pattern = pattern.clone();
            async move {
                let after = match state {
                    ScanState::Start => None,
                    ScanState::After(key) => Some(key),
                    ScanState::Done => return None,
                };

                match tier.scan_page(&pattern, after.as_deref()) {
                    Ok((keys, cursor)) => {
                        let next = cursor.map_or(ScanState::Done, ScanState::After);
                        Some((stream::iter(keys.into_iter().map(Ok)).boxed(), next))
                    }
                    Err(error) => Some((stream::once(async move { Err(error) }).boxed(), ScanState::Done)),
                }
            }
        })
        .flatten()
        .boxed()
    }

    async fn set_add(&self, set_key: &str, member: &str) -> Result<(), Error> {
        self.check(SharedOp::SetAdd {
            set_key: set_key.to_string(),
            member: member.to_string(),
        })?;

        let mut data = self.data.lock();
        let stored = data.entry(set_key.to_string()).or_insert_with(|| Stored::Set {
            members: HashSet::new(),
            ttl: None,
        });
        match stored {
            Stored::Set { members, .. } => {
                members.insert(member.to_string());
                Ok(())
            }
            Stored::Value { .. } => Err(Error::from_message(format!("mock: {set_key} does not hold a set"))),
        }
    }

    async fn set_members(&self, set_key: &str) -> Result<HashSet<String>, Error> {
        self.check(SharedOp::SetMembers(set_key.to_string()))?;
        Ok(self.members(set_key))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), Error> {
        self.check(SharedOp::Expire {
            key: key.to_string(),
            ttl,
        })?;
        if let Some(stored) = self.data.lock().get_mut(key) {
            stored.set_ttl(ttl);
        }
        Ok(())
    }

    async fn extend_ttl(&self, key: &str, ttl: Duration) -> Result<(), Error> {
        self.check(SharedOp::ExtendTtl {
            key: key.to_string(),
            ttl,
        })?;
        if let Some(stored) = self.data.lock().get_mut(key)
            && stored.ttl().is_none_or(|current| current < ttl)
        {
            stored.set_ttl(ttl);
        }
        Ok(())
    }

    async fn pipeline_delete(&self, keys: &[String]) -> Result<(), Error> {
        self.check(SharedOp::PipelineDelete(keys.to_vec()))?;
        let mut data = self.data.lock();
        for key in keys {
            data.remove(key);
        }
        Ok(())
    }

    async fn stats(&self) -> Result<SharedTierReport, Error> {
        self.check(SharedOp::Stats)?;
        Ok(SharedTierReport::new(self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
            .with_key_count(self.data.lock().len() as u64))
    }
}
