// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! A two-tier cache coordinator.
//!
//! [`TieredCache`] puts a bounded in-process tier in front of a shared, byte-oriented tier
//! such as Redis and keeps the two consistent for the application:
//!
//! - Read-through `get`: local tier, then shared tier, then the caller's fetch function, with
//!   concurrent misses for one key collapsed into a single fetch.
//! - Write-through `set` to both tiers, with values encoded as JSON for the shared tier.
//! - Bulk invalidation by tag, through an index kept in the shared tier, and by glob pattern,
//!   through a lazy scan of the shared key space.
//! - Promotion of expired local entries to the shared tier, and proactive warming.
//! - Stale-while-revalidate when the shared tier is down.
//! - Hit and miss statistics, `tracing` logs and optional OpenTelemetry metrics.
//!
//! The shared tier is treated as unreliable. When it fails, reads and writes fall back to the
//! local tier and the failure is logged; only invalidations, which must not silently fail,
//! report it.
//!
//! # Examples
//!
//! ```
//! use std::convert::Infallible;
//! use std::time::Duration;
//!
//! use strata::{CacheOptions, TieredCache};
//! use strata_tier::testing::MockSharedTier;
//! use tick::Clock;
//!
//! # futures::executor::block_on(async {
//! let cache = TieredCache::builder::<Vec<u32>>(Clock::new_frozen())
//!     .shared(MockSharedTier::new())
//!     .name("scores")
//!     .open();
//!
//! let options = CacheOptions::default()
//!     .with_local_ttl(Duration::from_secs(30))
//!     .with_tag("team:7");
//!
//! let scores = cache
//!     .get("scores:team:7", || async { Ok::<_, Infallible>(vec![3, 1, 4]) }, &options)
//!     .await?;
//! assert_eq!(*scores, vec![3, 1, 4]);
//!
//! cache.set("scores:team:8", vec![1, 5], &options).await;
//! assert_eq!(cache.invalidate_pattern("scores:team:*").await?, 2);
//!
//! let stats = cache.stats().await;
//! assert_eq!(stats.local.misses, 1);
//! # Ok::<(), strata::Error>(())
//! # });
//! ```
//!
//! # Features
//!
//! - `metrics`: records OpenTelemetry metrics configured through
//!   [`TelemetryConfig::with_metrics`].
//! - `redis`: re-exports the Redis shared tier as [`RedisTier`] and [`RedisConfig`].
//! - `test-util`: enables the in-memory shared tier in `strata_tier::testing` and controllable
//!   clocks in `tick`.

pub mod builder;
mod codec;
mod config;
mod coordinator;
mod error;
mod events;
mod flight;
mod stats;
mod tags;
mod telemetry;
mod warm;

#[doc(inline)]
pub use builder::TieredCacheBuilder;
#[doc(inline)]
pub use config::{CacheConfig, CacheOptions, DEFAULT_LOCAL_TTL, DEFAULT_SCAN_BATCH, DEFAULT_SHARED_TTL, DEFAULT_STALE_GRACE, DEFAULT_SWEEP_INTERVAL, TagIndexPolicy};
#[doc(inline)]
pub use coordinator::TieredCache;
#[doc(inline)]
pub use error::{Error, ErrorKind, Result};
#[doc(inline)]
pub use events::{CacheEvent, InvalidationCause};
#[doc(inline)]
pub use stats::{LocalStats, SharedStats, Stats};
#[doc(inline)]
pub use strata_tier::{KeyPattern, PatternError, SharedTier, SharedTierReport};
#[cfg(feature = "redis")]
#[doc(inline)]
pub use strata_redis::{RedisConfig, RedisTier};
#[doc(inline)]
pub use telemetry::config::TelemetryConfig;
#[doc(inline)]
pub use warm::{BoxError, WarmScope, WarmSummary, WarmTask};
