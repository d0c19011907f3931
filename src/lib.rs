//! # Court Coach
//!
//! Player statistics and leaderboard engine for a basketball coaching
//! platform, plus a repair layer for AI-generated workout plans.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (aggregates, sessions, workout plans)
//! - **calculate**: Session accumulation, achievements and ranking
//! - **normalize**: Repairs untrusted workout plan JSON
//! - **agents**: AI-backed workout generation
//! - **cache**: Cached views and their invalidation rules
//! - **storage**: Aggregate persistence (JSONL)
//! - **leaderboard**: Service tying the above together
//! - **config**: Configuration loading and validation

pub mod agents;
pub mod cache;
pub mod calculate;
pub mod clock;
pub mod config;
pub mod leaderboard;
pub mod models;
pub mod normalize;
pub mod storage;

pub use models::*;

use std::time::Duration;

/// Parse a human-friendly duration string (e.g., "6h", "30m", "90s").
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('h') {
        (n, 3600)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else {
        // Default to seconds
        (s, 1)
    };

    let num: u64 = num_str.parse().ok()?;
    num.checked_mul(multiplier).map(Duration::from_secs)
}
