// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! In-process local tier backed by moka.
//!
//! This crate provides [`MemoryTier`], the fast, process-exclusive tier of a strata cache.
//! Use [`MemoryTierBuilder`] to configure capacity and the stale grace window without exposing
//! moka types.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use std::time::{Duration, Instant};
//!
//! use strata_memory::MemoryTier;
//! use strata_tier::CacheEntry;
//!
//! # futures::executor::block_on(async {
//! let tier = MemoryTier::<String>::builder()
//!     .max_capacity(1000)
//!     .stale_grace(Duration::from_secs(30))
//!     .build();
//!
//! let expirations = tier.take_expirations().expect("receiver is taken once");
//!
//! tier.set("user:1", CacheEntry::new(Arc::new("Ada".to_string()), Instant::now(), Duration::from_secs(60)))
//!     .await;
//! assert!(tier.get("user:1").await.is_some());
//! # drop(expirations);
//! # });
//! ```
//!
//! # Features
//!
//! - **Capacity limits**: least-recently-used eviction once the configured entry count is reached
//! - **Per-entry expiry**: each entry lives for its own TTL plus the tier's stale grace window
//! - **Expiry events**: natural expirations are published on an explicit channel

pub mod builder;
pub mod tier;

#[doc(inline)]
pub use builder::{DEFAULT_MAX_CAPACITY, MemoryTierBuilder};
#[doc(inline)]
pub use tier::{ExpiredEntry, MemoryTier};
