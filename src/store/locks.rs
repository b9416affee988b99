use crate::core::RecordId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Aggregate whose mutations must not interleave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AggregateKey {
    Exercise(RecordId),
    Routine(RecordId),
    Workout(RecordId),
}

const PRUNE_THRESHOLD: usize = 1024;

/// One async mutex per aggregate, created on first use.
#[derive(Debug, Default)]
pub struct AggregateLocks {
    slots: Mutex<HashMap<AggregateKey, Arc<Mutex<()>>>>,
}

impl AggregateLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, key: AggregateKey) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().await;
            if slots.len() >= PRUNE_THRESHOLD {
                slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            }
            Arc::clone(slots.entry(key).or_default())
        };
        slot.lock_owned().await
    }

    /// Locks several aggregates in key order so overlapping batches cannot deadlock.
    pub async fn acquire_many(
        &self,
        keys: impl IntoIterator<Item = AggregateKey>,
    ) -> Vec<OwnedMutexGuard<()>> {
        let mut keys: Vec<AggregateKey> = keys.into_iter().collect();
        keys.sort_unstable();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            guards.push(self.acquire(key).await);
        }
        guards
    }
}
