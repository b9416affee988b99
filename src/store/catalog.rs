use super::StoreState;
use crate::core::RecordId;
use crate::domain::ExerciseRef;
use crate::reconcile::ReferenceResolver;
use log::debug;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLockReadGuard;

/// Read view over the exercise table used to resolve routine-slot references.
///
/// Holds the store's read lock; drop it before saving.
pub struct CatalogView<'a> {
    pub(super) state: RwLockReadGuard<'a, StoreState>,
    pub(super) batches: &'a AtomicU64,
}

impl ReferenceResolver for CatalogView<'_> {
    type Target = ExerciseRef;

    fn resolve_all(&self, ids: &BTreeSet<RecordId>) -> HashMap<RecordId, ExerciseRef> {
        self.batches.fetch_add(1, Ordering::Relaxed);
        let found: HashMap<RecordId, ExerciseRef> = ids
            .iter()
            .filter_map(|id| self.state.tables.exercise_ref(*id).map(|exercise| (*id, exercise)))
            .collect();
        debug!("catalog batch: requested={} found={}", ids.len(), found.len());
        found
    }
}
