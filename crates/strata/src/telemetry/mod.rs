// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured logs and OpenTelemetry metrics for tier operations.
//!
//! Every tier operation is described by the cache name, the tier, the operation and its
//! activity. With logs enabled, each record becomes a `tracing` event whose level follows the
//! activity; with the `metrics` feature and a meter provider, it also increments the
//! `cache.event.count` counter and records durations in `cache.operation.duration`.
//! Shared tier failures are logged at warning level whether or not logs are enabled.

use tracing::Level;

pub(crate) mod attributes;
mod cache;
pub(crate) mod config;
pub(crate) mod ext;
#[cfg(any(feature = "metrics", test))]
pub(crate) mod metrics;
#[cfg(test)]
pub(crate) mod testing;

pub(crate) use cache::CacheTelemetry;

/// The tier an operation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TierKind {
    Local,
    Shared,
}

impl TierKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Shared => "shared",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheOperation {
    Get,
    Insert,
    Invalidate,
    Scan,
    Promote,
    Warm,
    Stats,
}

impl CacheOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "cache.get",
            Self::Insert => "cache.insert",
            Self::Invalidate => "cache.invalidate",
            Self::Scan => "cache.scan",
            Self::Promote => "cache.promote",
            Self::Warm => "cache.warm",
            Self::Stats => "cache.stats",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CacheActivity {
    Hit,
    Miss,
    Expired,
    Inserted,
    Invalidated,
    Promoted,
    Revalidated,
    Degraded,
    Error,
}

impl CacheActivity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "cache.hit",
            Self::Miss => "cache.miss",
            Self::Expired => "cache.expired",
            Self::Inserted => "cache.inserted",
            Self::Invalidated => "cache.invalidated",
            Self::Promoted => "cache.promoted",
            Self::Revalidated => "cache.revalidated",
            Self::Degraded => "cache.degraded",
            Self::Error => "cache.error",
        }
    }

    pub fn level(self) -> Level {
        match self {
            Self::Hit | Self::Miss => Level::DEBUG,
            Self::Expired | Self::Inserted | Self::Invalidated | Self::Promoted | Self::Revalidated => Level::INFO,
            Self::Degraded => Level::WARN,
            Self::Error => Level::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_kind_as_str() {
        assert_eq!(TierKind::Local.as_str(), "local");
        assert_eq!(TierKind::Shared.as_str(), "shared");
    }

    #[test]
    fn operation_as_str() {
        assert_eq!(CacheOperation::Get.as_str(), "cache.get");
        assert_eq!(CacheOperation::Insert.as_str(), "cache.insert");
        assert_eq!(CacheOperation::Invalidate.as_str(), "cache.invalidate");
        assert_eq!(CacheOperation::Scan.as_str(), "cache.scan");
        assert_eq!(CacheOperation::Promote.as_str(), "cache.promote");
        assert_eq!(CacheOperation::Warm.as_str(), "cache.warm");
        assert_eq!(CacheOperation::Stats.as_str(), "cache.stats");
    }

    #[test]
    fn activity_as_str() {
        assert_eq!(CacheActivity::Hit.as_str(), "cache.hit");
        assert_eq!(CacheActivity::Miss.as_str(), "cache.miss");
        assert_eq!(CacheActivity::Expired.as_str(), "cache.expired");
        assert_eq!(CacheActivity::Inserted.as_str(), "cache.inserted");
        assert_eq!(CacheActivity::Invalidated.as_str(), "cache.invalidated");
        assert_eq!(CacheActivity::Promoted.as_str(), "cache.promoted");
        assert_eq!(CacheActivity::Revalidated.as_str(), "cache.revalidated");
        assert_eq!(CacheActivity::Degraded.as_str(), "cache.degraded");
        assert_eq!(CacheActivity::Error.as_str(), "cache.error");
    }

    #[test]
    fn activity_levels() {
        assert_eq!(CacheActivity::Hit.level(), Level::DEBUG);
        assert_eq!(CacheActivity::Miss.level(), Level::DEBUG);
        assert_eq!(CacheActivity::Expired.level(), Level::INFO);
        assert_eq!(CacheActivity::Inserted.level(), Level::INFO);
        assert_eq!(CacheActivity::Invalidated.level(), Level::INFO);
        assert_eq!(CacheActivity::Promoted.level(), Level::INFO);
        assert_eq!(CacheActivity::Revalidated.level(), Level::INFO);
        assert_eq!(CacheActivity::Degraded.level(), Level::WARN);
        assert_eq!(CacheActivity::Error.level(), Level::ERROR);
    }
}
