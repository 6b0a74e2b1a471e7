// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The Redis shared tier.

use std::{collections::HashSet, sync::LazyLock, time::Duration};

use futures::stream::{self, BoxStream, StreamExt};
use redis::{
    AsyncCommands, Client, RedisError, Script,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use strata_tier::{Error, KeyPattern, SharedTier, SharedTierReport};

use crate::config::RedisConfig;

/// Raises a key's TTL to `ARGV[1]` milliseconds unless it already has a longer one.
///
/// `PTTL` answers -1 for a key without a TTL and -2 for a missing key, on which `PEXPIRE` is a
/// no-op.
static EXTEND_TTL: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
        local remaining = redis.call('PTTL', KEYS[1])
        if remaining < tonumber(ARGV[1]) then
            return redis.call('PEXPIRE', KEYS[1], ARGV[1])
        end
        return 0
        ",
    )
});

fn tier_error(error: RedisError) -> Error {
    Error::from_message(error)
}

/// Converts a TTL to whole milliseconds, never less than one.
fn millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// A [`SharedTier`] backed by a Redis server.
///
/// The tier holds a [`ConnectionManager`], which multiplexes commands over one connection and
/// reconnects on its own after failures. Cloning the tier is cheap and shares the connection.
#[derive(Clone)]
pub struct RedisTier {
    connection: ConnectionManager,
    scan_count: usize,
}

impl std::fmt::Debug for RedisTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisTier").field("scan_count", &self.scan_count).finish_non_exhaustive()
    }
}

impl RedisTier {
    /// Connects to the server described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the connection cannot be established
    /// within the configured retries, or the ready check does not answer.
    pub async fn connect(config: &RedisConfig) -> Result<Self, Error> {
        let client = match config.url.as_deref() {
            Some(url) => Client::open(url),
            None => Client::open(config.connection_info()),
        }
        .map_err(tier_error)?;

        let manager_config = ConnectionManagerConfig::new()
            .set_number_of_retries(config.max_retries)
            .set_connection_timeout(config.connect_timeout())
            .set_response_timeout(config.response_timeout());

        let mut connection = client
            .get_connection_manager_with_config(manager_config)
            .await
            .map_err(tier_error)?;

        if config.ready_check {
            let _: String = redis::cmd("PING").query_async(&mut connection).await.map_err(tier_error)?;
        }

        tracing::info!(
            redis.host = config.host.as_str(),
            redis.port = config.port,
            redis.db = config.db,
            "shared tier connected"
        );

        Ok(Self {
            connection,
            scan_count: config.scan_count.max(1),
        })
    }

    fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }
}

enum ScanCursor {
    Next(u64),
    Done,
}

impl SharedTier for RedisTier {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        self.connection().get(key).await.map_err(tier_error)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), Error> {
        self.connection()
            .pset_ex::<_, _, ()>(key, value, millis(ttl))
            .await
            .map_err(tier_error)
    }

    async fn set_if_absent(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<bool, Error> {
        let written: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("PX")
            .arg(millis(ttl))
            .arg("NX")
            .query_async(&mut self.connection())
            .await
            .map_err(tier_error)?;
        Ok(written.is_some())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.connection().del::<_, ()>(key).await.map_err(tier_error)
    }

    fn scan(&self, pattern: &KeyPattern) -> BoxStream<'static, Result<String, Error>> {
        let connection = self.connection();
        let pattern = pattern.as_str().to_string();
        let count = self.scan_count;

        stream::unfold(ScanCursor::Next(0), move |cursor| {
            let mut connection = connection.clone();
            let pattern = pattern.clone();
            async move {
                let ScanCursor::Next(position) = cursor else {
                    return None;
                };

                let page: Result<(u64, Vec<String>), RedisError> = redis::cmd("SCAN")
                    .arg(position)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(count)
                    .query_async(&mut connection)
                    .await;

                match page {
                    Ok((next, keys)) => {
                        let cursor = if next == 0 { ScanCursor::Done } else { ScanCursor::Next(next) };
                        Some((stream::iter(keys.into_iter().map(Ok)).boxed(), cursor))
                    }
                    Err(error) => Some((stream::once(async move { Err(tier_error(error)) }).boxed(), ScanCursor::Done)),
                }
            }
        })
        .flatten()
        .boxed()
    }

    async fn set_add(&self, set_key: &str, member: &str) -> Result<(), Error> {
        self.connection().sadd::<_, _, ()>(set_key, member).await.map_err(tier_error)
    }

    async fn set_members(&self, set_key: &str) -> Result<HashSet<String>, Error> {
        self.connection().smembers(set_key).await.map_err(tier_error)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), Error> {
        let ms = i64::try_from(millis(ttl)).unwrap_or(i64::MAX);
        self.connection().pexpire::<_, ()>(key, ms).await.map_err(tier_error)
    }

    async fn extend_ttl(&self, key: &str, ttl: Duration) -> Result<(), Error> {
        EXTEND_TTL
            .key(key)
            .arg(millis(ttl))
            .invoke_async::<i64>(&mut self.connection())
            .await
            .map(drop)
            .map_err(tier_error)
    }

    async fn pipeline_delete(&self, keys: &[String]) -> Result<(), Error> {
        if keys.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        for key in keys {
            pipe.del(key).ignore();
        }
        pipe.query_async::<()>(&mut self.connection()).await.map_err(tier_error)
    }

    async fn stats(&self) -> Result<SharedTierReport, Error> {
        let mut connection = self.connection();
        let info: String = redis::cmd("INFO").arg("stats").query_async(&mut connection).await.map_err(tier_error)?;
        let key_count: u64 = redis::cmd("DBSIZE").query_async(&mut connection).await.map_err(tier_error)?;
        Ok(parse_info_stats(&info).with_key_count(key_count))
    }
}

/// Extracts `keyspace_hits` and `keyspace_misses` from an `INFO stats` reply.
///
/// Missing or unparsable counters read as zero.
pub(crate) fn parse_info_stats(info: &str) -> SharedTierReport {
    let mut hits = 0;
    let mut misses = 0;

    for line in info.lines() {
        let Some((name, value)) = line.trim().split_once(':') else {
            continue;
        };
        match name {
            "keyspace_hits" => hits = value.trim().parse().unwrap_or(0),
            "keyspace_misses" => misses = value.trim().parse().unwrap_or(0),
            _ => {}
        }
    }

    SharedTierReport::new(hits, misses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_clamps_to_one() {
        assert_eq!(millis(Duration::ZERO), 1);
        assert_eq!(millis(Duration::from_micros(300)), 1);
        assert_eq!(millis(Duration::from_secs(300)), 300_000);
        assert_eq!(millis(Duration::MAX), u64::MAX);
    }

    #[test]
    fn info_stats_are_parsed() {
        let info = "# Stats\r\ntotal_connections_received:12\r\nkeyspace_hits:1500\r\nkeyspace_misses:250\r\nevicted_keys:0\r\n";
        assert_eq!(parse_info_stats(info), SharedTierReport::new(1500, 250));
    }

    #[test]
    fn info_stats_tolerate_missing_fields() {
        assert_eq!(parse_info_stats("# Stats\r\n"), SharedTierReport::default());
        assert_eq!(parse_info_stats("keyspace_hits:abc\nkeyspace_misses:3"), SharedTierReport::new(0, 3));
    }
}
