// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Connection settings for the Redis shared tier.

use std::time::Duration;

use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use serde::Deserialize;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 6379;
const DEFAULT_MAX_RETRIES: usize = 3;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_SCAN_COUNT: usize = 100;

/// Settings used to reach the Redis server.
///
/// Every field has a default, so a configuration file only needs to name what differs.
/// Durations are plain millisecond counts.
///
/// # Examples
///
/// ```
/// use strata_redis::RedisConfig;
///
/// let config: RedisConfig = serde_json::from_str(r#"{ "host": "cache.internal", "db": 2 }"#)?;
/// assert_eq!(config.host, "cache.internal");
/// assert_eq!(config.port, 6379);
/// assert_eq!(config.scan_count, 100);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
#[non_exhaustive]
pub struct RedisConfig {
    /// A full `redis://` URL. When set, it takes precedence over the discrete address and
    /// credential fields.
    pub url: Option<String>,
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// ACL user name, if the server requires one.
    pub username: Option<String>,
    /// Password, if the server requires one.
    pub password: Option<String>,
    /// Logical database index.
    pub db: i64,
    /// How many times a failed connection attempt is retried.
    pub max_retries: usize,
    /// Whether to issue a `PING` after connecting and fail fast if it does not answer.
    pub ready_check: bool,
    /// Connection establishment timeout, in milliseconds.
    pub connect_timeout_ms: u64,
    /// Per-command response timeout, in milliseconds.
    pub response_timeout_ms: u64,
    /// `COUNT` hint sent with every `SCAN` page.
    pub scan_count: usize,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            db: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            ready_check: true,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            scan_count: DEFAULT_SCAN_COUNT,
        }
    }
}

impl RedisConfig {
    /// Creates a configuration that connects to `url` with default settings otherwise.
    #[must_use]
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Returns the connection establishment timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the per-command response timeout.
    #[must_use]
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub(crate) fn connection_info(&self) -> ConnectionInfo {
        ConnectionInfo {
            addr: ConnectionAddr::Tcp(self.host.clone(), self.port),
            redis: RedisConnectionInfo {
                db: self.db,
                username: self.username.clone(),
                password: self.password.clone(),
                ..RedisConnectionInfo::default()
            },
        }
    }
}
