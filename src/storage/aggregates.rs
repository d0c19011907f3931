//! Aggregate store backed by a JSONL snapshot.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{AggregateStore, JsonlReader, JsonlWriter, RankUpdate, StorageConfig, StorageError};
use crate::models::{PlayerAggregate, PlayerId};

/// Holds every aggregate in memory; when opened on a data directory, each
/// successful write rewrites `aggregates.jsonl` before the lock is released.
pub struct JsonlAggregateStore {
    records: RwLock<HashMap<PlayerId, PlayerAggregate>>,
    snapshot: Option<PathBuf>,
}

impl JsonlAggregateStore {
    /// Store with no file behind it.
    pub fn in_memory() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            snapshot: None,
        }
    }

    /// Load the snapshot from the data directory (empty if absent).
    pub fn open(config: &StorageConfig) -> Result<Self, StorageError> {
        let path = config.aggregates_path();
        let loaded: Vec<PlayerAggregate> = JsonlReader::new(path.clone()).read_all()?;
        info!("Loaded {} player aggregates from {:?}", loaded.len(), path);

        let records = loaded
            .into_iter()
            .map(|agg| (agg.player_id.clone(), agg))
            .collect();

        Ok(Self {
            records: RwLock::new(records),
            snapshot: Some(path),
        })
    }

    fn persist(&self, records: &HashMap<PlayerId, PlayerAggregate>) -> Result<(), StorageError> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        let mut rows: Vec<&PlayerAggregate> = records.values().collect();
        rows.sort_by(|a, b| a.player_id.cmp(&b.player_id));
        JsonlWriter::<PlayerAggregate>::new(path.clone()).write_all(rows)?;
        Ok(())
    }
}

#[async_trait]
impl AggregateStore for JsonlAggregateStore {
    async fn load(&self, player_id: &PlayerId) -> Result<PlayerAggregate, StorageError> {
        self.records
            .read()
            .await
            .get(player_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(player_id.clone()))
    }

    async fn save(&self, mut aggregate: PlayerAggregate) -> Result<PlayerAggregate, StorageError> {
        let mut records = self.records.write().await;

        let found = records
            .get(&aggregate.player_id)
            .map_or(0, |existing| existing.version);
        if found != aggregate.version {
            return Err(StorageError::Conflict {
                player_id: aggregate.player_id.clone(),
                expected: aggregate.version,
                found,
            });
        }

        aggregate.version += 1;
        let previous = records.insert(aggregate.player_id.clone(), aggregate.clone());
        if let Err(e) = self.persist(&records) {
            // Keep memory and file in step.
            match previous {
                Some(old) => records.insert(old.player_id.clone(), old),
                None => records.remove(&aggregate.player_id),
            };
            return Err(e);
        }

        debug!(player = %aggregate.player_id, version = aggregate.version, "Saved aggregate");
        Ok(aggregate)
    }

    async fn list_active(&self) -> Result<Vec<PlayerAggregate>, StorageError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|agg| agg.is_active)
            .cloned()
            .collect())
    }

    async fn update_ranks(&self, ranks: &[RankUpdate]) -> Result<usize, StorageError> {
        let mut records = self.records.write().await;
        let mut replaced = Vec::new();
        for update in ranks {
            // Players deactivated since the ranking was computed keep rank 0.
            if let Some(agg) = records.get_mut(&update.player_id).filter(|agg| agg.is_active) {
                replaced.push(agg.clone());
                agg.rank = update.rank;
                agg.previous_rank = update.previous_rank;
                agg.version += 1;
            }
        }
        if let Err(e) = self.persist(&records) {
            for old in replaced {
                records.insert(old.player_id.clone(), old);
            }
            return Err(e);
        }
        Ok(replaced.len())
    }
}
