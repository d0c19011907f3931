//! Leaderboard service.
//!
//! Ties the pure stat components to the store, cache and clock: a completed
//! session flows through the accumulator and achievement rules, is written
//! back with an optimistic version check, and evicts whatever cached views it
//! made stale. Ranks are recomputed separately, on demand.

use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{self, Cache, CacheKey, ChangeKind};
use crate::calculate::{
    self, ranking, LeaderboardEntry, Pagination, PaginationMeta, PointsAward, PointsPolicy,
    StatsError, StatsWarning,
};
use crate::clock::Clock;
use crate::config::AppConfig;
use crate::models::{Achievement, PlayerAggregate, PlayerId, SessionRecord};
use crate::storage::{AggregateStore, RankUpdate, StorageError};

/// Errors surfaced by the leaderboard service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Storage(StorageError),

    #[error(transparent)]
    Stats(#[from] StatsError),

    #[error("Player {0} is not registered")]
    NotFound(PlayerId),

    #[error("Player {0} is already registered")]
    AlreadyRegistered(PlayerId),

    #[error("Player {0} is not on the leaderboard")]
    NotRanked(PlayerId),

    #[error("Gave up on player {player_id} after {attempts} conflicting writes")]
    WriteConflict { player_id: PlayerId, attempts: u32 },
}

impl From<StorageError> for ServiceError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(id) => ServiceError::NotFound(id),
            other => ServiceError::Storage(other),
        }
    }
}

/// Tunables the service reads from config.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub points: PointsPolicy,
    pub max_write_attempts: u32,
    pub nearby_window: usize,
    pub page_size: u32,
    pub leaderboard_ttl: Duration,
    pub stats_ttl: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ServiceSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            points: config.points.clone(),
            max_write_attempts: config.leaderboard.max_write_attempts.max(1),
            nearby_window: config.leaderboard.nearby_window,
            page_size: config.leaderboard.page_size,
            leaderboard_ttl: config.cache.leaderboard_ttl(),
            stats_ttl: config.cache.stats_ttl(),
        }
    }
}

/// What one recorded session did.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub aggregate: PlayerAggregate,
    pub award: PointsAward,
    pub newly_earned: Vec<Achievement>,
    pub warnings: Vec<StatsWarning>,
}

impl SessionOutcome {
    /// Session points plus achievement bonuses.
    pub fn points_earned(&self) -> u64 {
        self.award.total() + self.newly_earned.iter().map(|a| a.points).sum::<u64>()
    }
}

/// One leaderboard page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardPage {
    pub entries: Vec<LeaderboardEntry>,
    pub meta: PaginationMeta,
}

/// A player's aggregate with their live position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub aggregate: PlayerAggregate,
    /// Position under the current ordering; 0 when inactive.
    pub live_rank: u32,
    pub total_players: usize,
}

pub struct LeaderboardService {
    store: Arc<dyn AggregateStore>,
    cache: Arc<dyn Cache>,
    clock: Arc<dyn Clock>,
    settings: ServiceSettings,
}

impl LeaderboardService {
    pub fn new(
        store: Arc<dyn AggregateStore>,
        cache: Arc<dyn Cache>,
        clock: Arc<dyn Clock>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            store,
            cache,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// Create an empty aggregate for a new player.
    pub async fn register_player(
        &self,
        player_id: PlayerId,
        display_name: &str,
        season: Option<&str>,
    ) -> Result<PlayerAggregate, ServiceError> {
        let mut aggregate = PlayerAggregate::new(player_id.clone(), display_name, self.clock.now());
        if let Some(season) = season {
            aggregate = aggregate.with_season(season);
        }

        let saved = match self.store.save(aggregate).await {
            Ok(saved) => saved,
            Err(StorageError::Conflict { .. }) => {
                return Err(ServiceError::AlreadyRegistered(player_id))
            }
            Err(e) => return Err(e.into()),
        };

        info!(player = %saved.player_id, name = %saved.display_name, "Registered player");
        cache::invalidate(self.cache.as_ref(), &[ChangeKind::User]).await;
        Ok(saved)
    }

    /// Take a player off the leaderboard. Their stats are kept.
    pub async fn deactivate_player(&self, player_id: &PlayerId) -> Result<PlayerAggregate, ServiceError> {
        let (saved, ()) = self
            .update_with_retry(player_id, false, |current| {
                let mut next = current.clone();
                next.is_active = false;
                next.rank = 0;
                Ok((next, ()))
            })
            .await?;

        info!(player = %player_id, "Deactivated player");
        cache::invalidate(self.cache.as_ref(), &[ChangeKind::User]).await;
        Ok(saved)
    }

    /// Count newly assigned workouts toward the completion rate.
    pub async fn record_assignment(
        &self,
        player_id: &PlayerId,
        count: u32,
    ) -> Result<PlayerAggregate, ServiceError> {
        let (saved, ()) = self
            .update_with_retry(player_id, true, |current| {
                let mut next = current.clone();
                next.total_workouts_assigned += count as u64;
                next.completion_rate = calculate::percentage(
                    next.total_workouts_completed,
                    next.total_workouts_assigned,
                )
                .unwrap_or(0.0);
                Ok((next, ()))
            })
            .await?;

        debug!(player = %player_id, assigned = saved.total_workouts_assigned, "Recorded assignment");
        cache::invalidate(self.cache.as_ref(), &[ChangeKind::Workout, ChangeKind::Progress]).await;
        Ok(saved)
    }

    /// Fold a completed session into the player's aggregate.
    ///
    /// Players seen for the first time get an aggregate on the fly.
    pub async fn record_session(
        &self,
        player_id: &PlayerId,
        session: &SessionRecord,
    ) -> Result<SessionOutcome, ServiceError> {
        let now = self.clock.now();
        let policy = &self.settings.points;

        let (aggregate, (award, newly_earned, warnings)) = self
            .update_with_retry(player_id, true, |current| {
                let applied = calculate::apply(current, session, policy)?;
                let evaluation = calculate::evaluate(&applied.aggregate, now);
                Ok((
                    evaluation.aggregate,
                    (applied.award, evaluation.newly_earned, applied.warnings),
                ))
            })
            .await?;

        let outcome = SessionOutcome {
            aggregate,
            award,
            newly_earned,
            warnings,
        };
        info!(
            player = %player_id,
            points = outcome.points_earned(),
            streak = outcome.aggregate.current_streak,
            achievements = outcome.newly_earned.len(),
            "Recorded session"
        );
        cache::invalidate(self.cache.as_ref(), &[ChangeKind::Progress]).await;
        Ok(outcome)
    }

    /// Recompute and store every active player's rank. Returns how many
    /// ranks were written.
    pub async fn recompute_ranks(&self) -> Result<usize, ServiceError> {
        let active = self.store.list_active().await?;
        let ranked = calculate::recompute_ranks(active);
        let updates: Vec<RankUpdate> = ranked.iter().map(RankUpdate::from).collect();
        let written = self.store.update_ranks(&updates).await?;

        info!(players = ranked.len(), written, "Recomputed ranks");
        cache::invalidate(self.cache.as_ref(), &[ChangeKind::Leaderboard]).await;
        Ok(written)
    }

    /// One page of the live leaderboard.
    pub async fn leaderboard(&self, pagination: Pagination) -> Result<LeaderboardPage, ServiceError> {
        let pagination = pagination.clamped();
        let key = CacheKey::leaderboard_page(pagination.page, pagination.page_size);
        if let Some(page) = self.cached(&key).await {
            return Ok(page);
        }

        let ordered = self.ordered().await?;
        let (rows, meta) = ranking::page(&ordered, &pagination);
        let offset = pagination.offset();
        let entries = rows
            .iter()
            .enumerate()
            .map(|(i, agg)| entry_at(agg, offset + i))
            .collect();

        let page = LeaderboardPage { entries, meta };
        self.store_cached(&key, &page, self.settings.leaderboard_ttl).await;
        Ok(page)
    }

    /// Players around `player_id`, `window` either side (config default if
    /// `None`).
    pub async fn nearby(
        &self,
        player_id: &PlayerId,
        window: Option<usize>,
    ) -> Result<Vec<LeaderboardEntry>, ServiceError> {
        let window = window.unwrap_or(self.settings.nearby_window);
        let key = CacheKey::leaderboard_nearby(player_id, window);
        if let Some(rows) = self.cached(&key).await {
            return Ok(rows);
        }

        let ordered = self.ordered().await?;
        let position = ordered
            .iter()
            .position(|agg| &agg.player_id == player_id)
            .ok_or_else(|| ServiceError::NotRanked(player_id.clone()))?;

        let rows = ranking::nearby(&ordered, position as u32 + 1, window);
        let first = position.saturating_sub(window);
        let entries: Vec<LeaderboardEntry> = rows
            .iter()
            .enumerate()
            .map(|(i, agg)| entry_at(agg, first + i))
            .collect();

        self.store_cached(&key, &entries, self.settings.leaderboard_ttl).await;
        Ok(entries)
    }

    /// A player's aggregate and live rank.
    pub async fn player_stats(&self, player_id: &PlayerId) -> Result<PlayerStats, ServiceError> {
        let key = CacheKey::player_stats(player_id);
        if let Some(stats) = self.cached(&key).await {
            return Ok(stats);
        }

        let aggregate = self.store.load(player_id).await?;
        let active = self.store.list_active().await?;
        let live_rank = if aggregate.is_active {
            ranking::rank_of(&aggregate, &active)
        } else {
            0
        };

        let stats = PlayerStats {
            aggregate,
            live_rank,
            total_players: active.len(),
        };
        self.store_cached(&key, &stats, self.settings.stats_ttl).await;
        Ok(stats)
    }

    /// Load, transform and save one aggregate, retrying on version conflicts.
    async fn update_with_retry<T, F>(
        &self,
        player_id: &PlayerId,
        create_missing: bool,
        mut update: F,
    ) -> Result<(PlayerAggregate, T), ServiceError>
    where
        F: FnMut(&PlayerAggregate) -> Result<(PlayerAggregate, T), ServiceError>,
    {
        let attempts = self.settings.max_write_attempts;
        for attempt in 1..=attempts {
            let current = match self.store.load(player_id).await {
                Ok(current) => current,
                Err(StorageError::NotFound(_)) if create_missing => {
                    debug!(player = %player_id, "Creating aggregate on first write");
                    PlayerAggregate::new(player_id.clone(), player_id.as_str(), self.clock.now())
                }
                Err(e) => return Err(e.into()),
            };

            let (next, extra) = update(&current)?;
            match self.store.save(next).await {
                Ok(saved) => return Ok((saved, extra)),
                Err(StorageError::Conflict { expected, found, .. }) => {
                    warn!(
                        player = %player_id,
                        attempt,
                        attempts,
                        expected,
                        found,
                        "Aggregate changed underneath us, retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ServiceError::WriteConflict {
            player_id: player_id.clone(),
            attempts,
        })
    }

    /// Active players in leaderboard order.
    async fn ordered(&self) -> Result<Vec<PlayerAggregate>, ServiceError> {
        let mut active = self.store.list_active().await?;
        active.sort_by(calculate::compare);
        Ok(active)
    }

    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.cache.get(key).await?;
        match serde_json::from_value(value) {
            Ok(hit) => {
                debug!(key, "Cache hit");
                Some(hit)
            }
            Err(e) => {
                warn!(key, "Discarding unreadable cache entry: {}", e);
                None
            }
        }
    }

    async fn store_cached<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        match serde_json::to_value(value) {
            Ok(value) => self.cache.set(key, value, ttl).await,
            Err(e) => warn!(key, "Not caching response: {}", e),
        }
    }
}

/// Row for the player at zero-based `position` in the live ordering.
fn entry_at(agg: &PlayerAggregate, position: usize) -> LeaderboardEntry {
    let mut entry = LeaderboardEntry::from(agg);
    entry.rank = position as u32 + 1;
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::clock::FixedClock;
    use crate::storage::JsonlAggregateStore;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    struct Harness {
        service: LeaderboardService,
        cache: Arc<InMemoryCache>,
        clock: Arc<FixedClock>,
    }

    fn harness_with(store: Arc<dyn AggregateStore>) -> Harness {
        let cache = Arc::new(InMemoryCache::new());
        let clock = Arc::new(FixedClock::at_date(day(1)));
        let service = LeaderboardService::new(
            store,
            cache.clone(),
            clock.clone(),
            ServiceSettings::default(),
        );
        Harness {
            service,
            cache,
            clock,
        }
    }

    fn harness() -> Harness {
        harness_with(Arc::new(JsonlAggregateStore::in_memory()))
    }

    fn session(d: u32, made: u32, attempted: u32) -> SessionRecord {
        let accuracy = if attempted == 0 {
            0.0
        } else {
            made as f64 * 100.0 / attempted as f64
        };
        SessionRecord::completed_on(day(d))
            .with_shots(made, attempted)
            .with_accuracy(accuracy)
            .with_minutes(45)
    }

    /// Reports a conflict for the first `conflicts` saves, then delegates.
    struct ContendedStore {
        inner: JsonlAggregateStore,
        conflicts: AtomicU32,
        saves: AtomicU32,
    }

    impl ContendedStore {
        fn new(conflicts: u32) -> Self {
            Self {
                inner: JsonlAggregateStore::in_memory(),
                conflicts: AtomicU32::new(conflicts),
                saves: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl AggregateStore for ContendedStore {
        async fn load(&self, player_id: &PlayerId) -> Result<PlayerAggregate, StorageError> {
            self.inner.load(player_id).await
        }

        async fn save(&self, aggregate: PlayerAggregate) -> Result<PlayerAggregate, StorageError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            let left = self.conflicts.load(Ordering::SeqCst);
            if left > 0 {
                self.conflicts.store(left - 1, Ordering::SeqCst);
                return Err(StorageError::Conflict {
                    player_id: aggregate.player_id.clone(),
                    expected: aggregate.version,
                    found: aggregate.version + 1,
                });
            }
            self.inner.save(aggregate).await
        }

        async fn list_active(&self) -> Result<Vec<PlayerAggregate>, StorageError> {
            self.inner.list_active().await
        }

        async fn update_ranks(&self, ranks: &[RankUpdate]) -> Result<usize, StorageError> {
            self.inner.update_ranks(ranks).await
        }
    }

    #[tokio::test]
    async fn test_register_then_duplicate() {
        let h = harness();
        let p = h
            .service
            .register_player("p1".into(), "Jordan", Some("2025-spring"))
            .await
            .unwrap();
        assert_eq!(p.version, 1);
        assert_eq!(p.season.as_deref(), Some("2025-spring"));

        let err = h.service.register_player("p1".into(), "Again", None).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyRegistered(_)));
    }

    #[tokio::test]
    async fn test_record_session_creates_and_awards() {
        let h = harness();
        let outcome = h.service.record_session(&"p1".into(), &session(1, 8, 10)).await.unwrap();

        let agg = &outcome.aggregate;
        assert_eq!(agg.total_workouts_completed, 1);
        assert_eq!(agg.current_streak, 1);
        assert_eq!(agg.display_name, "p1");
        assert!(outcome.newly_earned.iter().any(|a| a.achievement_id == "first_workout"));
        // 10 base + 8 accuracy + 10 first_workout
        assert_eq!(outcome.points_earned(), 28);
        assert_eq!(agg.points, 28);
        assert_eq!(agg.weekly_points, 28);
    }

    #[tokio::test]
    async fn test_streak_gap_through_service() {
        let h = harness();
        let id: PlayerId = "p1".into();
        for d in 1..=4 {
            h.service.record_session(&id, &session(d, 5, 10)).await.unwrap();
        }
        let fifth = h.service.record_session(&id, &session(5, 5, 10)).await.unwrap();
        assert_eq!(fifth.aggregate.current_streak, 5);

        let after_gap = h.service.record_session(&id, &session(8, 5, 10)).await.unwrap();
        assert_eq!(after_gap.aggregate.current_streak, 1);
        assert_eq!(after_gap.aggregate.longest_streak, 5);
    }

    #[tokio::test]
    async fn test_invalid_session_is_not_retried() {
        let store = Arc::new(ContendedStore::new(0));
        let h = harness_with(store.clone());
        let bad = SessionRecord::completed_on(day(1)).with_shots(12, 10);

        let err = h.service.record_session(&"p1".into(), &bad).await.unwrap_err();
        assert!(matches!(err, ServiceError::Stats(StatsError::InvalidSession(_))));
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_conflict_is_retried() {
        let store = Arc::new(ContendedStore::new(2));
        let h = harness_with(store.clone());

        let outcome = h.service.record_session(&"p1".into(), &session(1, 5, 10)).await.unwrap();
        assert_eq!(outcome.aggregate.total_workouts_completed, 1);
        assert_eq!(store.saves.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_conflict_gives_up_after_limit() {
        let store = Arc::new(ContendedStore::new(10));
        let h = harness_with(store.clone());

        let err = h.service.record_session(&"p1".into(), &session(1, 5, 10)).await.unwrap_err();
        assert!(matches!(err, ServiceError::WriteConflict { attempts: 3, .. }));
        assert_eq!(store.saves.load(Ordering::SeqCst), 3);
        assert!(matches!(
            h.service.player_stats(&"p1".into()).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_concurrent_sessions_for_one_player_all_land() {
        let store: Arc<dyn AggregateStore> = Arc::new(JsonlAggregateStore::in_memory());
        let cache = Arc::new(InMemoryCache::new());
        let clock = Arc::new(FixedClock::at_date(day(1)));
        let settings = ServiceSettings {
            max_write_attempts: 64,
            ..ServiceSettings::default()
        };
        let service = Arc::new(LeaderboardService::new(store.clone(), cache, clock, settings));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.record_session(&"p1".into(), &session(1, 5, 10)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let agg = store.load(&"p1".into()).await.unwrap();
        assert_eq!(agg.total_workouts_completed, 8);
        assert_eq!(agg.total_shots_made, 40);
    }

    #[tokio::test]
    async fn test_tie_break_on_accuracy() {
        let h = harness();
        let (a, b): (PlayerId, PlayerId) = ("a".into(), "b".into());
        h.service.register_player(a.clone(), "A", None).await.unwrap();
        h.service.register_player(b.clone(), "B", None).await.unwrap();

        for (id, made) in [(&a, 80), (&b, 90)] {
            let mut agg = h.service.store.load(id).await.unwrap();
            agg.points = 100;
            agg.total_shots_made = made;
            agg.total_shots_attempted = 100;
            agg.average_accuracy = made as f64;
            h.service.store.save(agg).await.unwrap();
        }

        h.service.recompute_ranks().await.unwrap();
        let page = h.service.leaderboard(Pagination::default()).await.unwrap();
        let order: Vec<&str> = page.entries.iter().map(|e| e.player_id.as_str()).collect();
        assert_eq!(order, vec!["b", "a"]);
        assert_eq!(h.service.store.load(&b).await.unwrap().rank, 1);
        assert_eq!(h.service.store.load(&a).await.unwrap().rank, 2);
    }

    #[tokio::test]
    async fn test_leaderboard_is_cached_until_progress() {
        let h = harness();
        h.service.record_session(&"p1".into(), &session(1, 5, 10)).await.unwrap();

        let first = h.service.leaderboard(Pagination::default()).await.unwrap();
        assert_eq!(first.meta.total_items, 1);
        assert!(h.cache.get(&CacheKey::leaderboard_page(1, 20)).await.is_some());

        h.service.record_session(&"p2".into(), &session(1, 9, 10)).await.unwrap();
        assert!(h.cache.get(&CacheKey::leaderboard_page(1, 20)).await.is_none());

        let second = h.service.leaderboard(Pagination::default()).await.unwrap();
        assert_eq!(second.meta.total_items, 2);
        assert_eq!(second.entries[0].player_id.as_str(), "p2");
        assert_eq!(second.entries[0].rank, 1);
    }

    #[tokio::test]
    async fn test_leaderboard_clamps_hand_built_pagination() {
        let h = harness();
        h.service.record_session(&"p1".into(), &session(1, 5, 10)).await.unwrap();

        let page = h
            .service
            .leaderboard(Pagination { page: 0, page_size: 0 })
            .await
            .unwrap();
        assert_eq!(page.entries.len(), 1);
        assert_eq!((page.meta.page, page.meta.page_size), (1, 1));
        assert!(h.cache.get(&CacheKey::leaderboard_page(1, 1)).await.is_some());
    }

    #[tokio::test]
    async fn test_deactivated_player_leaves_board() {
        let h = harness();
        for id in ["p1", "p2", "p3"] {
            h.service.record_session(&id.into(), &session(1, 5, 10)).await.unwrap();
        }
        h.service.deactivate_player(&"p2".into()).await.unwrap();
        h.service.recompute_ranks().await.unwrap();

        let page = h.service.leaderboard(Pagination::default()).await.unwrap();
        assert_eq!(page.meta.total_items, 2);
        assert!(page.entries.iter().all(|e| e.player_id.as_str() != "p2"));

        let stats = h.service.player_stats(&"p2".into()).await.unwrap();
        assert_eq!(stats.live_rank, 0);
        assert!(!stats.aggregate.is_active);

        let err = h.service.record_session(&"p2".into(), &session(2, 5, 10)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Stats(StatsError::InvalidSession(_))));
    }

    #[tokio::test]
    async fn test_nearby_window() {
        let h = harness();
        for i in 0..10u32 {
            // More makes, more points: p9 leads.
            h.service
                .record_session(&format!("p{}", i).into(), &session(1, i, 10))
                .await
                .unwrap();
        }

        let rows = h.service.nearby(&"p5".into(), Some(2)).await.unwrap();
        let ids: Vec<&str> = rows.iter().map(|e| e.player_id.as_str()).collect();
        assert_eq!(ids, vec!["p7", "p6", "p5", "p4", "p3"]);
        assert_eq!(rows[2].rank, 5);

        let top = h.service.nearby(&"p9".into(), Some(2)).await.unwrap();
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].rank, 1);

        let err = h.service.nearby(&"ghost".into(), None).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotRanked(_)));
    }

    #[tokio::test]
    async fn test_assignment_updates_completion_rate() {
        let h = harness();
        let id: PlayerId = "p1".into();
        h.service.record_assignment(&id, 4).await.unwrap();
        h.service.record_session(&id, &session(1, 5, 10)).await.unwrap();

        let stats = h.service.player_stats(&id).await.unwrap();
        assert_eq!(stats.aggregate.completion_rate, 25.0);
        assert_eq!(stats.live_rank, 1);
        assert_eq!(stats.total_players, 1);
    }

    #[tokio::test]
    async fn test_rank_recompute_evicts_player_stats() {
        let h = harness();
        h.service.record_session(&"p1".into(), &session(1, 5, 10)).await.unwrap();
        h.service.player_stats(&"p1".into()).await.unwrap();
        h.clock.advance(chrono::Duration::days(1));
        assert!(h.cache.get(&CacheKey::player_stats(&"p1".into())).await.is_some());

        h.service.recompute_ranks().await.unwrap();
        assert!(h.cache.get(&CacheKey::player_stats(&"p1".into())).await.is_none());
    }
}
