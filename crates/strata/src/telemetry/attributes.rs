// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Attribute keys shared by metric points and log fields.

#[cfg(any(feature = "metrics", test))]
pub(crate) const CACHE_NAME: &str = "cache.name";

#[cfg(any(feature = "metrics", test))]
pub(crate) const CACHE_TIER: &str = "cache.tier";

#[cfg(any(feature = "metrics", test))]
pub(crate) const CACHE_OPERATION: &str = "cache.operation";

#[cfg(any(feature = "metrics", test))]
pub(crate) const CACHE_ACTIVITY: &str = "cache.activity";

#[cfg(test)]
pub(crate) const CACHE_DURATION: &str = "cache.duration_ns";

#[cfg(test)]
pub(crate) const CACHE_EVENT: &str = "cache.event";
