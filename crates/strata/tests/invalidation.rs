// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for tag, pattern and single-key invalidation.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use strata::{CacheEvent, CacheOptions, Error, ErrorKind, InvalidationCause, TagIndexPolicy, TieredCache};
use strata_tier::testing::{MockSharedTier, SharedOp};
use tick::Clock;

type TestResult = Result<(), Error>;

fn block_on<F: std::future::Future>(f: F) -> F::Output {
    futures::executor::block_on(f)
}

fn cache_with(shared: MockSharedTier) -> TieredCache<String, MockSharedTier> {
    TieredCache::builder::<String>(Clock::new_frozen()).shared(shared).open()
}

async fn never_called() -> Result<String, io::Error> {
    Err(io::Error::other("fetch should not run"))
}

#[test]
fn tag_invalidation_removes_every_member() -> TestResult {
    block_on(async {
        let shared = MockSharedTier::new();
        let cache = cache_with(shared.clone());
        let tagged = CacheOptions::default().with_tag("T");

        cache.set("a", "1".to_string(), &tagged).await;
        cache.set("b", "2".to_string(), &tagged).await;
        cache.set("c", "3".to_string(), &CacheOptions::default()).await;

        assert_eq!(cache.invalidate_by_tag("T").await?, 2);

        assert!(!shared.contains_key("a"));
        assert!(!shared.contains_key("b"));
        assert!(!shared.contains_key("tag:T"));
        assert_eq!(*cache.get("c", never_called, &CacheOptions::default()).await?, "3");

        let fetches = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&fetches);
        let recomputed = cache
            .get(
                "a",
                move || async move {
                    counted.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, io::Error>("1 again".to_string())
                },
                &tagged,
            )
            .await?;
        assert_eq!(*recomputed, "1 again");
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        Ok(())
    })
}

#[test]
fn unknown_tag_invalidates_nothing() -> TestResult {
    block_on(async {
        let shared = MockSharedTier::new();
        let cache = cache_with(shared.clone());

        assert_eq!(cache.invalidate_by_tag("nobody").await?, 0);
        assert!(!shared.operations().iter().any(|op| matches!(op, SharedOp::PipelineDelete(_))));
        Ok(())
    })
}

#[test]
fn tag_invalidation_batches_shared_deletes() -> TestResult {
    block_on(async {
        let shared = MockSharedTier::new();
        let cache = TieredCache::builder::<String>(Clock::new_frozen())
            .shared(shared.clone())
            .scan_batch(2)
            .open();
        let tagged = CacheOptions::default().with_tag("bulk");
        for i in 0..5 {
            cache.set(&format!("k{i}"), i.to_string(), &tagged).await;
        }
        shared.clear_operations();

        assert_eq!(cache.invalidate_by_tag("bulk").await?, 5);

        let batches: Vec<usize> = shared
            .operations()
            .iter()
            .filter_map(|op| match op {
                SharedOp::PipelineDelete(keys) => Some(keys.len()),
                _ => None,
            })
            .collect();
        assert_eq!(batches, vec![2, 2, 1]);
        Ok(())
    })
}

#[test]
fn tag_invalidation_reports_an_unreachable_index() {
    block_on(async {
        let shared = MockSharedTier::new();
        let cache = cache_with(shared.clone());
        cache.set("a", "1".to_string(), &CacheOptions::default().with_tag("T")).await;
        shared.fail_when(|op| matches!(op, SharedOp::SetMembers(_)));

        let error = cache.invalidate_by_tag("T").await.expect_err("index read failure should surface");
        assert_eq!(error.kind(), ErrorKind::TierUnavailable);
    });
}

#[test]
fn pattern_invalidation_only_touches_matches() -> TestResult {
    block_on(async {
        let shared = MockSharedTier::new().with_page_size(1);
        let cache = cache_with(shared.clone());
        let options = CacheOptions::default();

        cache.set("user:1:profile", "p1".to_string(), &options).await;
        cache.set("user:1:settings", "s1".to_string(), &options).await;
        cache.set("user:2:profile", "p2".to_string(), &options).await;

        assert_eq!(cache.invalidate_pattern("user:1:*").await?, 2);

        assert!(!shared.contains_key("user:1:profile"));
        assert!(!shared.contains_key("user:1:settings"));
        assert!(shared.contains_key("user:2:profile"));
        assert_eq!(*cache.get("user:2:profile", never_called, &options).await?, "p2");

        let recomputed = cache
            .get("user:1:profile", || async { Ok::<_, io::Error>("p1'".to_string()) }, &options)
            .await?;
        assert_eq!(*recomputed, "p1'");
        Ok(())
    })
}

#[test]
fn pattern_invalidation_without_matches_returns_zero() -> TestResult {
    block_on(async {
        let cache = cache_with(MockSharedTier::new());
        cache.set("order:1", "o".to_string(), &CacheOptions::default()).await;

        assert_eq!(cache.invalidate_pattern("user:*").await?, 0);
        Ok(())
    })
}

#[test]
fn malformed_pattern_is_rejected_before_scanning() {
    block_on(async {
        let shared = MockSharedTier::new();
        let cache = cache_with(shared.clone());

        let error = cache.invalidate_pattern("user:[1").await.expect_err("pattern should be rejected");

        assert_eq!(error.kind(), ErrorKind::InvalidPattern);
        assert!(shared.operations().is_empty());
    });
}

#[test]
fn scan_failure_is_reported() {
    block_on(async {
        let shared = MockSharedTier::new();
        let cache = cache_with(shared.clone());
        cache.set("user:1", "u".to_string(), &CacheOptions::default()).await;
        shared.fail_when(|op| matches!(op, SharedOp::Scan(_)));

        let error = cache.invalidate_pattern("user:*").await.expect_err("scan failure should surface");
        assert_eq!(error.kind(), ErrorKind::TierUnavailable);
    });
}

#[test]
fn delete_removes_from_both_tiers() -> TestResult {
    block_on(async {
        let shared = MockSharedTier::new();
        let cache = cache_with(shared.clone());
        cache.set("k", "v".to_string(), &CacheOptions::default()).await;

        cache.delete("k").await?;

        assert!(!shared.contains_key("k"));
        let recomputed = cache
            .get("k", || async { Ok::<_, io::Error>("w".to_string()) }, &CacheOptions::default())
            .await?;
        assert_eq!(*recomputed, "w");
        Ok(())
    })
}

#[test]
fn invalidations_are_published() -> TestResult {
    block_on(async {
        let cache = cache_with(MockSharedTier::new());
        let mut events = cache.subscribe();
        let tagged = CacheOptions::default().with_tag("T");

        cache.set("a", "1".to_string(), &tagged).await;
        cache.delete("a").await?;
        cache.set("b", "2".to_string(), &tagged).await;
        cache.invalidate_by_tag("T").await?;
        cache.set("user:1", "u".to_string(), &CacheOptions::default()).await;
        cache.invalidate_pattern("user:*").await?;

        let received: Vec<CacheEvent> = std::iter::from_fn(|| events.try_recv().ok()).collect();
        assert_eq!(
            received,
            vec![
                CacheEvent::Stored { key: "a".to_string() },
                CacheEvent::Invalidated {
                    cause: InvalidationCause::Key,
                    keys: vec!["a".to_string()],
                },
                CacheEvent::Stored { key: "b".to_string() },
                CacheEvent::Invalidated {
                    cause: InvalidationCause::Tag("T".to_string()),
                    // The tag index still lists "a"; deleting a key does not unindex it.
                    keys: vec!["a".to_string(), "b".to_string()],
                },
                CacheEvent::Stored { key: "user:1".to_string() },
                CacheEvent::Invalidated {
                    cause: InvalidationCause::Pattern("user:*".to_string()),
                    keys: vec!["user:1".to_string()],
                },
            ]
        );
        Ok(())
    })
}

#[test]
fn expiring_tag_policy_bounds_the_index() {
    block_on(async {
        let shared = MockSharedTier::new();
        let cache = TieredCache::builder::<String>(Clock::new_frozen())
            .shared(shared.clone())
            .tag_index_policy(TagIndexPolicy::expiring(Duration::from_secs(60)))
            .open();

        cache
            .set(
                "k",
                "v".to_string(),
                &CacheOptions::default().with_shared_ttl(Duration::from_secs(120)).with_tag("T"),
            )
            .await;

        assert_eq!(shared.ttl_of("tag:T"), Some(Duration::from_secs(180)));
    });
}

#[test]
fn tag_index_outlives_its_longest_lived_member() -> TestResult {
    block_on(async {
        let shared = MockSharedTier::new();
        let cache = TieredCache::builder::<String>(Clock::new_frozen())
            .shared(shared.clone())
            .tag_index_policy(TagIndexPolicy::expiring(Duration::from_secs(60)))
            .open();
        let tagged = CacheOptions::default().with_tag("T");

        cache
            .set("long", "l".to_string(), &tagged.clone().with_shared_ttl(Duration::from_secs(3600)))
            .await;
        cache
            .set("short", "s".to_string(), &tagged.with_shared_ttl(Duration::from_secs(10)))
            .await;

        assert_eq!(shared.ttl_of("long"), Some(Duration::from_secs(3600)));
        assert_eq!(shared.ttl_of("tag:T"), Some(Duration::from_secs(3660)));
        assert_eq!(cache.invalidate_by_tag("T").await?, 2);
        assert!(!shared.contains_key("long"));
        Ok(())
    })
}
