// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Redis-backed shared tier for the strata multi-tier cache.
//!
//! [`RedisTier`] implements [`strata_tier::SharedTier`] on top of a reconnecting Redis
//! connection manager. Settings come from [`RedisConfig`].
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use strata_redis::{RedisConfig, RedisTier};
//! use strata_tier::SharedTier;
//!
//! # async fn example() -> Result<(), strata_tier::Error> {
//! let tier = RedisTier::connect(&RedisConfig::default()).await?;
//! tier.set("greeting", b"\"hello\"".to_vec(), Duration::from_secs(300)).await?;
//! assert!(tier.get("greeting").await?.is_some());
//! # Ok(())
//! # }
//! ```

mod config;
mod tier;

#[doc(inline)]
pub use config::RedisConfig;
#[doc(inline)]
pub use tier::RedisTier;
