// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Tier contracts shared by every strata cache backend.
//!
//! This crate defines the pieces the coordinator and the tier implementations agree on:
//!
//! - [`CacheEntry`], the local tier record holding a value by reference plus its freshness
//!   metadata.
//! - [`SharedTier`], the trait a distributed, byte-oriented tier (Redis in production)
//!   implements.
//! - [`KeyPattern`], a validated glob used for pattern scans and bulk invalidation.
//! - [`Error`], the opaque error returned by tier operations.
//!
//! # Implementing a Shared Tier
//!
//! ```
//! use std::collections::{HashMap, HashSet};
//! use std::sync::Mutex;
//! use std::time::Duration;
//!
//! use futures::stream::{self, BoxStream, StreamExt};
//! use strata_tier::{Error, KeyPattern, SharedTier};
//!
//! #[derive(Default)]
//! struct SimpleTier {
//!     values: Mutex<HashMap<String, Vec<u8>>>,
//!     sets: Mutex<HashMap<String, HashSet<String>>>,
//! }
//!
//! impl SharedTier for SimpleTier {
//!     async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
//!         Ok(self.values.lock().unwrap().get(key).cloned())
//!     }
//!
//!     async fn set(&self, key: &str, value: Vec<u8>, _ttl: Duration) -> Result<(), Error> {
//!         self.values.lock().unwrap().insert(key.to_string(), value);
//!         Ok(())
//!     }
//!
//!     async fn delete(&self, key: &str) -> Result<(), Error> {
//!         self.values.lock().unwrap().remove(key);
//!         self.sets.lock().unwrap().remove(key);
//!         Ok(())
//!     }
//!
//!     fn scan(&self, pattern: &KeyPattern) -> BoxStream<'static, Result<String, Error>> {
//!         let keys: Vec<_> = self
//!             .values
//!             .lock()
//!             .unwrap()
//!             .keys()
//!             .filter(|key| pattern.matches(key))
//!             .cloned()
//!             .collect();
//!         stream::iter(keys.into_iter().map(Ok)).boxed()
//!     }
//!
//!     async fn set_add(&self, set_key: &str, member: &str) -> Result<(), Error> {
//!         self.sets.lock().unwrap().entry(set_key.to_string()).or_default().insert(member.to_string());
//!         Ok(())
//!     }
//!
//!     async fn set_members(&self, set_key: &str) -> Result<HashSet<String>, Error> {
//!         Ok(self.sets.lock().unwrap().get(set_key).cloned().unwrap_or_default())
//!     }
//!
//!     async fn expire(&self, _key: &str, _ttl: Duration) -> Result<(), Error> {
//!         Ok(())
//!     }
//!
//!     async fn extend_ttl(&self, _key: &str, _ttl: Duration) -> Result<(), Error> {
//!         Ok(())
//!     }
//!
//!     async fn pipeline_delete(&self, keys: &[String]) -> Result<(), Error> {
//!         for key in keys {
//!             self.delete(key).await?;
//!         }
//!         Ok(())
//!     }
//! }
//! ```

mod entry;
pub mod error;
pub mod pattern;
mod shared;
#[cfg(any(feature = "test-util", test))]
pub mod testing;

#[doc(inline)]
pub use entry::CacheEntry;
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use pattern::{KeyPattern, PatternError};
#[doc(inline)]
pub use shared::{SharedTier, SharedTierReport};
