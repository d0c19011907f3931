//! Persistence for player aggregates and generated plans.
//!
//! Aggregates live behind the [`AggregateStore`] trait. The bundled
//! implementation keeps them in memory and snapshots to a JSONL file in the
//! data directory after every write.

mod aggregates;
mod jsonl;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

pub use aggregates::JsonlAggregateStore;
pub use jsonl::{EntityType, JsonlReader, JsonlWriter};

use crate::models::{PlayerAggregate, PlayerId};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No aggregate for player {0}")]
    NotFound(PlayerId),

    #[error("Write conflict for player {player_id}: expected version {expected}, found {found}")]
    Conflict {
        player_id: PlayerId,
        expected: u64,
        found: u64,
    },
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn aggregates_path(&self) -> PathBuf {
        self.data_dir.join(EntityType::Aggregate.filename())
    }

    pub fn plans_path(&self) -> PathBuf {
        self.data_dir.join(EntityType::WorkoutPlan.filename())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}

/// New rank for one player, written without touching the other fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankUpdate {
    pub player_id: PlayerId,
    pub rank: u32,
    pub previous_rank: u32,
}

impl From<&PlayerAggregate> for RankUpdate {
    fn from(agg: &PlayerAggregate) -> Self {
        Self {
            player_id: agg.player_id.clone(),
            rank: agg.rank,
            previous_rank: agg.previous_rank,
        }
    }
}

/// Aggregate persistence. Each call is atomic for the records it touches.
#[async_trait]
pub trait AggregateStore: Send + Sync {
    /// Load one player's aggregate.
    async fn load(&self, player_id: &PlayerId) -> Result<PlayerAggregate, StorageError>;

    /// Compare-and-swap on `version`: the write lands only if the stored
    /// version still matches (0 for a new record). Returns the stored copy
    /// with its bumped version.
    async fn save(&self, aggregate: PlayerAggregate) -> Result<PlayerAggregate, StorageError>;

    /// Every aggregate with `is_active` set.
    async fn list_active(&self) -> Result<Vec<PlayerAggregate>, StorageError>;

    /// Write rank fields only. Unknown players are skipped; returns the
    /// number updated.
    async fn update_ranks(&self, ranks: &[RankUpdate]) -> Result<usize, StorageError>;
}
