// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Notifications published by the coordinator.

/// Why keys were invalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvalidationCause {
    /// A single key was deleted.
    Key,
    /// Every key indexed under the tag was invalidated.
    Tag(String),
    /// Every shared key matching the pattern was invalidated.
    Pattern(String),
}

/// A change published to [`subscribe`](crate::TieredCache::subscribe)rs.
///
/// Delivery is best effort: a subscriber that falls too far behind skips the oldest events and
/// observes a lag error from the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CacheEvent {
    /// A value was written to the cache.
    Stored {
        /// The written key.
        key: String,
    },
    /// Keys were removed from both tiers.
    Invalidated {
        /// What triggered the invalidation.
        cause: InvalidationCause,
        /// The removed keys.
        keys: Vec<String>,
    },
    /// An expired local entry was copied to the shared tier.
    Promoted {
        /// The promoted key.
        key: String,
    },
}
