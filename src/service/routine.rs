use crate::core::{AppError, Page, Patch, RecordId, Result};
use crate::domain::{Routine, validate_routine_name};
use crate::models::{
    RoutineCreateRequest, RoutineDetailResponse, RoutineHeaderRequest, RoutineOrderEntry,
    RoutineSummary, RoutineUpdateRequest, routine_exercise_specs,
};
use crate::reconcile::ReconcileResult;
use crate::store::{AggregateKey, MemoryStore};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{Level, event, instrument};

/// Routine use cases. Every mutation runs under the routine's aggregate lock:
/// load, reconcile, save.
#[derive(Clone)]
pub struct RoutineService {
    store: Arc<MemoryStore>,
}

impl RoutineService {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create(
        &self,
        owner_id: RecordId,
        request: RoutineCreateRequest,
    ) -> Result<RoutineDetailResponse> {
        validate_routine_name(&request.name).map_err(AppError::Validation)?;

        let display_order = match request.display_order {
            Some(order) => order,
            None => {
                let existing = self.store.list_routines(owner_id, 1, 1).await.total;
                i32::try_from(existing + 1).unwrap_or(i32::MAX)
            }
        };
        let mut routine = Routine::new(owner_id, request.name, display_order);
        routine.set_memo(request.memo);

        let specs = routine_exercise_specs(&request.exercises);
        let result = {
            let catalog = self.store.catalog().await;
            routine.sync_exercises(&specs, &catalog)?
        };

        self.store.save_routine(&mut routine).await?;
        event!(
            Level::INFO,
            routine_id = ?routine.id(),
            exercises = result.inserted(),
            sets = result.nested.inserted,
            "routine created"
        );
        Ok(RoutineDetailResponse::from(&routine))
    }

    pub async fn get(&self, id: RecordId) -> Result<RoutineDetailResponse> {
        let routine = self.load(id).await?;
        Ok(RoutineDetailResponse::from(&routine))
    }

    pub async fn list_for_owner(
        &self,
        owner_id: RecordId,
        page: u32,
        size: u32,
    ) -> Result<Page<RoutineSummary>> {
        Ok(self.store.list_routines(owner_id, page, size).await)
    }

    /// Header patch plus, when `routineExercises` was sent, a two-level
    /// reconciliation of slots and their sets.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: RecordId,
        request: RoutineUpdateRequest,
    ) -> Result<RoutineDetailResponse> {
        let _guard = self.store.locks().acquire(AggregateKey::Routine(id)).await;
        let mut routine = self.load(id).await?;

        routine.update_basic(&request.name, &request.display_order, &request.memo);
        validate_routine_name(routine.name()).map_err(AppError::Validation)?;

        if let Patch::Value(slots) = &request.routine_exercises {
            let specs = routine_exercise_specs(slots);
            let result = {
                let catalog = self.store.catalog().await;
                routine.sync_exercises(&specs, &catalog)?
            };
            log_reconciled(&result);
        }
        routine.touch();

        let summary = self.store.save_routine(&mut routine).await?;
        event!(
            Level::INFO,
            inserted = summary.inserted,
            updated = summary.updated,
            deleted = summary.deleted,
            "routine updated"
        );
        Ok(RoutineDetailResponse::from(&routine))
    }

    #[instrument(skip(self, request))]
    pub async fn update_header(
        &self,
        id: RecordId,
        request: RoutineHeaderRequest,
    ) -> Result<RoutineDetailResponse> {
        let _guard = self.store.locks().acquire(AggregateKey::Routine(id)).await;
        let mut routine = self.load(id).await?;

        routine.update_basic(&request.name, &request.display_order, &request.memo);
        validate_routine_name(routine.name()).map_err(AppError::Validation)?;
        routine.touch();

        self.store.save_routine(&mut routine).await?;
        Ok(RoutineDetailResponse::from(&routine))
    }

    /// Batch display-order update. Duplicate ids are a validation error, an
    /// unknown id fails the batch before anything changes.
    #[instrument(skip_all, fields(count = entries.len()))]
    pub async fn sort(&self, entries: &[RoutineOrderEntry]) -> Result<()> {
        let mut seen = HashSet::with_capacity(entries.len());
        if let Some(duplicate) = entries.iter().find(|entry| !seen.insert(entry.id)) {
            return Err(AppError::validation(format!(
                "routine {} is listed more than once",
                duplicate.id
            )));
        }
        if entries.is_empty() {
            return Ok(());
        }

        let _guards = self
            .store
            .locks()
            .acquire_many(entries.iter().map(|entry| AggregateKey::Routine(entry.id)))
            .await;
        let pairs: Vec<(RecordId, i32)> = entries
            .iter()
            .map(|entry| (entry.id, entry.display_order))
            .collect();
        self.store.reorder_routines(&pairs).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: RecordId) -> Result<()> {
        let _guard = self.store.locks().acquire(AggregateKey::Routine(id)).await;
        if !self.store.delete_routine(id).await? {
            return Err(AppError::not_found("routine", id));
        }
        event!(Level::INFO, routine_id = id, "routine deleted");
        Ok(())
    }

    async fn load(&self, id: RecordId) -> Result<Routine> {
        self.store
            .load_routine(id)
            .await?
            .ok_or_else(|| AppError::not_found("routine", id))
    }
}

fn log_reconciled(result: &ReconcileResult) {
    event!(
        Level::DEBUG,
        slots_inserted = result.children.inserted,
        slots_updated = result.children.updated,
        slots_removed = result.children.removed,
        sets_inserted = result.nested.inserted,
        sets_updated = result.nested.updated,
        sets_removed = result.nested.removed,
        "routine exercises reconciled"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_without_order_appends_after_existing_routines() {
        let service = RoutineService::new(Arc::new(MemoryStore::in_memory()));
        let request = |name: &str| RoutineCreateRequest {
            owner_id: 7,
            name: name.to_string(),
            display_order: None,
            memo: None,
            exercises: Vec::new(),
        };

        let first = service.create(7, request("Push")).await.unwrap();
        let second = service.create(7, request("Pull")).await.unwrap();
        assert_eq!(first.display_order, 1);
        assert_eq!(second.display_order, 2);
    }

    #[tokio::test]
    async fn sort_rejects_duplicate_ids() {
        let service = RoutineService::new(Arc::new(MemoryStore::in_memory()));
        let entry = RoutineOrderEntry {
            id: 1,
            display_order: 1,
        };
        let err = service.sort(&[entry, entry]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn sort_with_unknown_routine_is_not_found() {
        let service = RoutineService::new(Arc::new(MemoryStore::in_memory()));
        let err = service
            .sort(&[RoutineOrderEntry {
                id: 42,
                display_order: 1,
            }])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
