//! Response cache and invalidation policy.
//!
//! Cached responses are grouped into key families by prefix. When stored
//! data changes, [`keys_to_invalidate`] names the families that went stale
//! and the [`Cache`] implementation drops them.

mod memory;

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use memory::InMemoryCache;

use crate::models::PlayerId;

pub const WORKOUTS_PREFIX: &str = "workouts:";
pub const WORKOUT_PREFIX: &str = "workout:";
pub const COACH_STATS_PREFIX: &str = "coach-stats:";
pub const PLAYER_PROGRESS_PREFIX: &str = "player-progress:";
pub const PLAYER_STATS_PREFIX: &str = "player-stats:";
pub const LEADERBOARD_PREFIX: &str = "leaderboard:";
pub const USERS_PREFIX: &str = "users:";
pub const USER_PREFIX: &str = "user:";

/// What kind of stored data changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Workout,
    Progress,
    User,
    Leaderboard,
}

/// Key prefixes made stale by a change.
pub fn keys_to_invalidate(change: ChangeKind) -> BTreeSet<&'static str> {
    let prefixes: &[&'static str] = match change {
        ChangeKind::Workout => &[WORKOUTS_PREFIX, WORKOUT_PREFIX, COACH_STATS_PREFIX],
        ChangeKind::Progress => &[
            PLAYER_PROGRESS_PREFIX,
            LEADERBOARD_PREFIX,
            COACH_STATS_PREFIX,
            PLAYER_STATS_PREFIX,
        ],
        ChangeKind::User => &[
            USERS_PREFIX,
            USER_PREFIX,
            LEADERBOARD_PREFIX,
            PLAYER_STATS_PREFIX,
        ],
        ChangeKind::Leaderboard => &[LEADERBOARD_PREFIX, PLAYER_STATS_PREFIX],
    };
    prefixes.iter().copied().collect()
}

/// Union of the prefixes for several changes.
pub fn keys_for(changes: &[ChangeKind]) -> BTreeSet<&'static str> {
    changes
        .iter()
        .flat_map(|&c| keys_to_invalidate(c))
        .collect()
}

/// Builders for cache keys, one per cached response.
pub struct CacheKey;

impl CacheKey {
    pub fn leaderboard_page(page: u32, page_size: u32) -> String {
        format!("{}page:{}:{}", LEADERBOARD_PREFIX, page, page_size)
    }

    pub fn leaderboard_nearby(player_id: &PlayerId, window: usize) -> String {
        format!("{}nearby:{}:{}", LEADERBOARD_PREFIX, player_id, window)
    }

    pub fn player_stats(player_id: &PlayerId) -> String {
        format!("{}{}", PLAYER_STATS_PREFIX, player_id)
    }
}

/// Key-value store for serialized responses.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Cached value, if present and not expired.
    async fn get(&self, key: &str) -> Option<serde_json::Value>;

    /// Store a value for `ttl`.
    async fn set(&self, key: &str, value: serde_json::Value, ttl: Duration);

    /// Drop every key starting with any of `prefixes`. Returns how many went.
    async fn delete_by_prefix(&self, prefixes: &[&str]) -> usize;
}

/// Evict everything a change made stale.
pub async fn invalidate(cache: &dyn Cache, changes: &[ChangeKind]) -> usize {
    let prefixes: Vec<&str> = keys_for(changes).into_iter().collect();
    let removed = cache.delete_by_prefix(&prefixes).await;
    tracing::debug!(?changes, removed, "Invalidated cached responses");
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_invalidates_leaderboard_and_stats() {
        let keys = keys_to_invalidate(ChangeKind::Progress);
        assert!(keys.contains("player-progress:"));
        assert!(keys.contains("leaderboard:"));
        assert!(keys.contains("coach-stats:"));
        assert!(keys.contains("player-stats:"));
        assert!(!keys.contains("workouts:"));
    }

    #[test]
    fn test_workout_change_leaves_leaderboard() {
        let keys = keys_to_invalidate(ChangeKind::Workout);
        assert!(keys.contains("workouts:"));
        assert!(!keys.contains("leaderboard:"));
    }

    #[test]
    fn test_every_change_kind_stales_something() {
        for kind in [
            ChangeKind::Workout,
            ChangeKind::Progress,
            ChangeKind::User,
            ChangeKind::Leaderboard,
        ] {
            assert!(!keys_to_invalidate(kind).is_empty(), "{:?}", kind);
        }
    }

    #[test]
    fn test_keys_for_unions_without_duplicates() {
        let keys = keys_for(&[ChangeKind::Progress, ChangeKind::Leaderboard]);
        assert_eq!(keys.len(), 4);
    }

    #[test]
    fn test_cache_keys_land_in_their_families() {
        let id = PlayerId::from("p1");
        assert!(CacheKey::leaderboard_page(1, 20).starts_with(LEADERBOARD_PREFIX));
        assert!(CacheKey::leaderboard_nearby(&id, 3).starts_with(LEADERBOARD_PREFIX));
        assert_eq!(CacheKey::player_stats(&id), "player-stats:p1");
    }

    #[tokio::test]
    async fn test_invalidate_drops_stale_families() {
        let cache = InMemoryCache::new();
        let ttl = Duration::from_secs(60);
        cache.set(&CacheKey::leaderboard_page(1, 20), serde_json::json!([]), ttl).await;
        cache.set(&CacheKey::player_stats(&"p1".into()), serde_json::json!({}), ttl).await;
        cache.set("workout:w1", serde_json::json!({}), ttl).await;

        let removed = invalidate(&cache, &[ChangeKind::Leaderboard]).await;
        assert_eq!(removed, 2);
        assert!(cache.get("workout:w1").await.is_some());
    }
}
