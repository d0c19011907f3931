//! Leaderboard ordering.
//!
//! Players are ordered by points, then lifetime accuracy, then by who
//! registered first. The player id settles anything left so the order never
//! depends on the order records were loaded in.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::{PlayerAggregate, PlayerId};

/// Total leaderboard order: `Less` means `a` ranks ahead of `b`.
pub fn compare(a: &PlayerAggregate, b: &PlayerAggregate) -> Ordering {
    b.points
        .cmp(&a.points)
        .then_with(|| b.average_accuracy.total_cmp(&a.average_accuracy))
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.player_id.cmp(&b.player_id))
}

/// Sort a snapshot and assign 1-based ranks, keeping the old rank as
/// `previous_rank`.
pub fn recompute_ranks(mut aggregates: Vec<PlayerAggregate>) -> Vec<PlayerAggregate> {
    aggregates.sort_by(compare);
    for (i, agg) in aggregates.iter_mut().enumerate() {
        agg.previous_rank = agg.rank;
        agg.rank = i as u32 + 1;
    }
    aggregates
}

/// Position `aggregate` would take among `all` (1-based).
pub fn rank_of(aggregate: &PlayerAggregate, all: &[PlayerAggregate]) -> u32 {
    let ahead = all
        .iter()
        .filter(|other| other.player_id != aggregate.player_id)
        .filter(|other| compare(other, aggregate) == Ordering::Less)
        .count();
    ahead as u32 + 1
}

/// Up to `k` players either side of `rank` in an already ranked slice.
///
/// Out-of-range ranks are clamped to the ends of the board.
pub fn nearby(ranked: &[PlayerAggregate], rank: u32, k: usize) -> &[PlayerAggregate] {
    if ranked.is_empty() {
        return ranked;
    }
    let index = (rank.max(1) as usize - 1).min(ranked.len() - 1);
    let start = index.saturating_sub(k);
    let end = index.saturating_add(k).saturating_add(1).min(ranked.len());
    &ranked[start..end]
}

/// Pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
        }
    }
}

impl Pagination {
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size.unwrap_or(20).clamp(1, 100),
        }
    }

    /// Same request with page and size pulled into range. Fields are public,
    /// so a hand-built or deserialized value may be out of bounds.
    pub fn clamped(&self) -> Self {
        Self::new(Some(self.page), Some(self.page_size))
    }

    pub fn offset(&self) -> usize {
        let p = self.clamped();
        (p.page as usize - 1) * p.page_size as usize
    }
}

/// Pagination metadata for a leaderboard page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub page_size: u32,
    pub total_items: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(pagination: &Pagination, total_items: u32) -> Self {
        let pagination = pagination.clamped();
        let total_pages = total_items.div_ceil(pagination.page_size);
        Self {
            page: pagination.page,
            page_size: pagination.page_size,
            total_items,
            total_pages,
            has_next: pagination.page < total_pages,
            has_prev: pagination.page > 1,
        }
    }
}

/// One page of a ranked slice.
pub fn page<'a>(
    ranked: &'a [PlayerAggregate],
    pagination: &Pagination,
) -> (&'a [PlayerAggregate], PaginationMeta) {
    let pagination = pagination.clamped();
    let meta = PaginationMeta::new(&pagination, ranked.len() as u32);
    let start = pagination.offset().min(ranked.len());
    let end = (start + pagination.page_size as usize).min(ranked.len());
    (&ranked[start..end], meta)
}

/// Leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub rank_change: i64,
    pub player_id: PlayerId,
    pub display_name: String,
    pub points: u64,
    pub average_accuracy: f64,
    pub current_streak: u32,
    pub total_workouts_completed: u64,
    pub total_achievements: usize,
}

impl From<&PlayerAggregate> for LeaderboardEntry {
    fn from(agg: &PlayerAggregate) -> Self {
        Self {
            rank: agg.rank,
            rank_change: agg.rank_change(),
            player_id: agg.player_id.clone(),
            display_name: agg.display_name.clone(),
            points: agg.points,
            average_accuracy: agg.average_accuracy,
            current_streak: agg.current_streak,
            total_workouts_completed: agg.total_workouts_completed,
            total_achievements: agg.total_achievements(),
        }
    }
}
