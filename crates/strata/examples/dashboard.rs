// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Dashboard caching example.
//!
//! A dashboard service caches per-user widgets that are slow to compute. The example walks
//! through the life of a cache:
//!
//! - configuration loaded from JSON,
//! - warming a user's widgets on login,
//! - read-through with stampede protection,
//! - invalidating everything a user owns by tag, and one team's widgets by pattern,
//! - reading back the hit statistics.
//!
//! The shared tier is the in-memory mock, so the example runs without a Redis server.

use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use futures::{FutureExt, future::join_all};
use serde::{Deserialize, Serialize};
use strata::{BoxError, CacheConfig, CacheOptions, TieredCache, WarmScope, WarmTask};
use strata_tier::testing::MockSharedTier;
use tick::Clock;

const CONFIG: &str = r#"{
    "max_capacity": 1000,
    "local_ttl_secs": 30,
    "shared_ttl_secs": 600,
    "tag_index": { "kind": "expiring", "margin_secs": 60 }
}"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Widget {
    title: String,
    points: Vec<u32>,
}

/// Stands in for the expensive aggregation queries behind each widget.
static QUERIES: AtomicU32 = AtomicU32::new(0);

async fn render_widget(user: &str, widget: &str) -> Result<Widget, Infallible> {
    QUERIES.fetch_add(1, Ordering::Relaxed);
    tokio::time::sleep(Duration::from_millis(20)).await;
    Ok(Widget {
        title: format!("{widget} for {user}"),
        points: vec![3, 1, 4, 1, 5],
    })
}

fn widget_options(user: &str, team: &str) -> CacheOptions {
    CacheOptions::default().with_tags([format!("user:{user}"), format!("team:{team}")])
}

fn summary_task() -> WarmTask<Widget> {
    WarmTask::new(
        "summary",
        |scope| format!("widget:{}:{}:summary", scope.tenant(), scope.user()),
        |scope| {
            let user = scope.user().to_string();
            async move {
                render_widget(&user, "summary")
                    .await
                    .map_err(|e| -> BoxError { Box::new(e) })
            }
            .boxed()
        },
    )
    .with_options(widget_options("42", "platform"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    let config: CacheConfig = serde_json::from_str(CONFIG)?;
    let shared = MockSharedTier::new();
    let cache = TieredCache::builder::<Widget>(Clock::new_tokio())
        .name("dashboard")
        .config(config)
        .shared(shared.clone())
        .warm_task(summary_task())
        .open();

    // Warm on login.
    let warmed = cache.warm_cache(&WarmScope::new("platform", "42")).await;
    println!("warmed {}/{} widgets", warmed.succeeded, warmed.total);

    // Twenty concurrent page loads ask for the same uncached widget; only one query runs.
    let loads = (0..20).map(|_| {
        let cache = cache.clone();
        async move {
            cache
                .get(
                    "widget:platform:42:latency",
                    || render_widget("42", "latency"),
                    &widget_options("42", "platform"),
                )
                .await
        }
    });
    for widget in join_all(loads).await {
        let widget: Arc<Widget> = widget?;
        assert_eq!(widget.title, "latency for 42");
    }
    println!("queries after 20 concurrent loads: {}", QUERIES.load(Ordering::Relaxed));

    let other = cache
        .get(
            "widget:search:7:errors",
            || render_widget("7", "errors"),
            &widget_options("7", "search"),
        )
        .await?;
    println!("loaded {:?}", other.title);

    // User 42 changed their settings: drop everything they own.
    let dropped = cache.invalidate_by_tag("user:42").await?;
    println!("invalidated {dropped} widgets tagged user:42");

    // The search team redeployed: drop their widgets by key pattern.
    let dropped = cache.invalidate_pattern("widget:search:*").await?;
    println!("invalidated {dropped} widgets matching widget:search:*");

    let stats = cache.stats().await;
    println!(
        "local: {} hits, {} misses, {:.0}% hit rate, {} entries",
        stats.local.hits,
        stats.local.misses,
        stats.local.hit_rate * 100.0,
        stats.local.key_count
    );
    println!("shared keys left: {}", shared.key_count());

    cache.close();
    Ok(())
}
