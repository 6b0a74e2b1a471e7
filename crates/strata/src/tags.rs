// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The tag index: an inverted index from tags to keys, kept in the shared tier.

use std::collections::HashSet;
use std::time::Duration;

use strata_tier::SharedTier;

use crate::config::TagIndexPolicy;

const TAG_PREFIX: &str = "tag:";

/// Returns the shared-tier key holding the members of `tag`.
pub(crate) fn tag_key(tag: &str) -> String {
    format!("{TAG_PREFIX}{tag}")
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct TagIndex {
    policy: TagIndexPolicy,
}

impl TagIndex {
    pub(crate) fn new(policy: TagIndexPolicy) -> Self {
        Self { policy }
    }

    /// Adds `key` to the set of `tag`.
    ///
    /// Under an expiring policy the set's TTL is raised to cover this key, but never lowered, so
    /// the set outlives its longest-lived member.
    pub(crate) async fn add<S: SharedTier>(&self, shared: &S, tag: &str, key: &str, shared_ttl: Duration) -> strata_tier::Result<()> {
        let set_key = tag_key(tag);
        shared.set_add(&set_key, key).await?;

        if let Some(ttl) = self.policy.ttl_for(shared_ttl) {
            shared.extend_ttl(&set_key, ttl).await?;
        }

        Ok(())
    }

    pub(crate) async fn members<S: SharedTier>(&self, shared: &S, tag: &str) -> strata_tier::Result<HashSet<String>> {
        shared.set_members(&tag_key(tag)).await
    }

    pub(crate) async fn remove<S: SharedTier>(&self, shared: &S, tag: &str) -> strata_tier::Result<()> {
        shared.delete(&tag_key(tag)).await
    }
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use strata_tier::testing::{MockSharedTier, SharedOp};

    use super::*;

    #[test]
    fn persistent_index_never_sets_a_ttl() {
        block_on(async {
            let shared = MockSharedTier::new();
            let index = TagIndex::new(TagIndexPolicy::Persistent);

            index.add(&shared, "team", "a", Duration::from_secs(300)).await.expect("add should succeed");
            index.add(&shared, "team", "b", Duration::from_secs(300)).await.expect("add should succeed");

            let members = index.members(&shared, "team").await.expect("members should load");
            assert_eq!(members, HashSet::from(["a".to_string(), "b".to_string()]));
            assert_eq!(shared.ttl_of("tag:team"), None);
            assert!(
                !shared
                    .operations()
                    .iter()
                    .any(|op| matches!(op, SharedOp::Expire { .. } | SharedOp::ExtendTtl { .. }))
            );
        });
    }

    #[test]
    fn expiring_index_refreshes_the_ttl() {
        block_on(async {
            let shared = MockSharedTier::new();
            let index = TagIndex::new(TagIndexPolicy::expiring(Duration::from_secs(60)));

            index.add(&shared, "team", "a", Duration::from_secs(300)).await.expect("add should succeed");

            assert_eq!(shared.ttl_of("tag:team"), Some(Duration::from_secs(360)));
        });
    }

    #[test]
    fn short_lived_member_does_not_shorten_the_ttl() {
        block_on(async {
            let shared = MockSharedTier::new();
            let index = TagIndex::new(TagIndexPolicy::expiring(Duration::from_secs(60)));

            index.add(&shared, "team", "a", Duration::from_secs(3600)).await.expect("add should succeed");
            index.add(&shared, "team", "b", Duration::from_secs(10)).await.expect("add should succeed");

            assert_eq!(shared.ttl_of("tag:team"), Some(Duration::from_secs(3660)));
        });
    }

    #[test]
    fn remove_drops_the_set() {
        block_on(async {
            let shared = MockSharedTier::new();
            let index = TagIndex::new(TagIndexPolicy::Persistent);
            index.add(&shared, "team", "a", Duration::from_secs(1)).await.expect("add should succeed");

            index.remove(&shared, "team").await.expect("remove should succeed");

            assert!(index.members(&shared, "team").await.expect("members should load").is_empty());
        });
    }

    #[test]
    fn tag_keys_are_prefixed() {
        assert_eq!(tag_key("user:7"), "tag:user:7");
    }
}
