// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Proactive cache warming.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::config::CacheOptions;

/// The error type warming loaders report.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

type KeyFn = dyn Fn(&WarmScope) -> String + Send + Sync;
type LoadFn<V> = dyn Fn(&WarmScope) -> BoxFuture<'static, Result<V, BoxError>> + Send + Sync;

/// Who a warming pass is for.
///
/// Warming tasks derive their cache key and their data from the scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WarmScope {
    tenant: String,
    user: String,
}

impl WarmScope {
    /// Creates a scope for `user` within `tenant`.
    #[must_use]
    pub fn new(tenant: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            user: user.into(),
        }
    }

    /// Returns the tenant.
    #[must_use]
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// Returns the user.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }
}

/// A named unit of warming work.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use futures::FutureExt;
/// use strata::{CacheOptions, WarmTask};
///
/// let task = WarmTask::new(
///     "summary",
///     |scope| format!("summary:{}:{}", scope.tenant(), scope.user()),
///     |scope| {
///         let user = scope.user().to_string();
///         async move { Ok(format!("summary for {user}")) }.boxed()
///     },
/// )
/// .with_options(CacheOptions::default().with_local_ttl(Duration::from_secs(30)));
///
/// assert_eq!(task.name(), "summary");
/// ```
pub struct WarmTask<V> {
    name: String,
    key: Box<KeyFn>,
    load: Arc<LoadFn<V>>,
    options: CacheOptions,
}

impl<V> fmt::Debug for WarmTask<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarmTask")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<V> WarmTask<V> {
    /// Creates a task from a key function and a loader.
    pub fn new<K, L>(name: impl Into<String>, key: K, load: L) -> Self
    where
        K: Fn(&WarmScope) -> String + Send + Sync + 'static,
        L: Fn(&WarmScope) -> BoxFuture<'static, Result<V, BoxError>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            key: Box::new(key),
            load: Arc::new(load),
            options: CacheOptions::default(),
        }
    }

    /// Sets the options the warmed value is stored with.
    #[must_use]
    pub fn with_options(mut self, options: CacheOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the task name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn key(&self, scope: &WarmScope) -> String {
        (self.key)(scope)
    }

    pub(crate) fn load(&self, scope: &WarmScope) -> BoxFuture<'static, Result<V, BoxError>> {
        (self.load)(scope)
    }

    pub(crate) fn options(&self) -> &CacheOptions {
        &self.options
    }
}

/// The outcome of a warming pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct WarmSummary {
    /// Tasks that stored their value.
    pub succeeded: usize,
    /// Tasks that ran.
    pub total: usize,
}

impl WarmSummary {
    /// Returns the number of tasks that failed or panicked.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.total - self.succeeded
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;
    use futures::executor::block_on;

    use super::*;

    #[test]
    fn task_derives_key_and_value_from_scope() {
        let task = WarmTask::new(
            "profile",
            |scope: &WarmScope| format!("profile:{}", scope.user()),
            |scope: &WarmScope| {
                let tenant = scope.tenant().to_string();
                async move { Ok(tenant.len()) }.boxed()
            },
        );
        let scope = WarmScope::new("acme", "ada");

        assert_eq!(task.key(&scope), "profile:ada");
        assert_eq!(block_on(task.load(&scope)).expect("load should succeed"), 4);
        assert_eq!(task.options(), &CacheOptions::default());
    }

    #[test]
    fn summary_counts_failures() {
        let summary = WarmSummary { succeeded: 2, total: 3 };
        assert_eq!(summary.failed(), 1);
    }

    #[test]
    fn debug_names_the_task() {
        let task = WarmTask::<u8>::new("x", |_: &WarmScope| String::new(), |_: &WarmScope| async { Ok(0) }.boxed());
        assert!(format!("{task:?}").contains("\"x\""));
    }
}
