use crate::core::{AppError, Page, Patch, RecordId, Result};
use crate::domain::{Exercise, validate_exercise_header};
use crate::models::{
    ActivationStatesRequest, ActivationStatesResponse, ExerciseCreateRequest,
    ExerciseDetailResponse, ExercisePatchRequest, ExerciseSummary, ExerciseUpdateRequest,
    instruction_specs,
};
use crate::store::{AggregateKey, MemoryStore};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{Level, event, instrument};

/// Exercise catalog use cases.
#[derive(Clone)]
pub struct ExerciseService {
    store: Arc<MemoryStore>,
}

impl ExerciseService {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    #[instrument(skip_all, fields(name = %request.name))]
    pub async fn create(&self, request: ExerciseCreateRequest) -> Result<ExerciseDetailResponse> {
        validate_exercise_header(&request.name, &request.category).map_err(AppError::Validation)?;

        let mut exercise = Exercise::new(request.name, request.category);
        exercise.set_description(request.description);
        exercise.set_hidden(request.is_hidden);
        if let Some(requirement) = request.metric_requirement {
            exercise.set_metric_requirement(requirement);
        }
        let result = exercise.sync_instructions(&instruction_specs(&request.instructions))?;

        let summary = self.store.save_exercise(&mut exercise).await?;
        event!(
            Level::INFO,
            exercise_id = ?exercise.id(),
            instructions = result.inserted(),
            rows = summary.inserted,
            "exercise created"
        );
        Ok(ExerciseDetailResponse::from(&exercise))
    }

    pub async fn get(&self, id: RecordId) -> Result<ExerciseDetailResponse> {
        let exercise = self.load(id).await?;
        Ok(ExerciseDetailResponse::from(&exercise))
    }

    pub async fn list(&self, page: u32, size: u32) -> Result<Page<ExerciseSummary>> {
        Ok(self.store.list_exercises(page, size).await)
    }

    /// Full update; instructions are reconciled only when the field was sent.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: RecordId,
        request: ExerciseUpdateRequest,
    ) -> Result<ExerciseDetailResponse> {
        validate_exercise_header(&request.name, &request.category).map_err(AppError::Validation)?;

        let _guard = self.store.locks().acquire(AggregateKey::Exercise(id)).await;
        let mut exercise = self.load(id).await?;

        exercise.rename(request.name);
        exercise.recategorize(request.category);
        let mut description = exercise.description().map(str::to_string);
        request.description.apply_to(&mut description);
        exercise.set_description(description);
        if let Some(hidden) = request.is_hidden {
            exercise.set_hidden(hidden);
        }
        if let Some(requirement) = request.metric_requirement {
            exercise.set_metric_requirement(requirement);
        }
        if let Patch::Value(instructions) = &request.instructions {
            let result = exercise.sync_instructions(&instruction_specs(instructions))?;
            event!(
                Level::DEBUG,
                inserted = result.inserted(),
                updated = result.updated(),
                removed = result.removed(),
                "instructions reconciled"
            );
        }
        exercise.touch();

        let summary = self.store.save_exercise(&mut exercise).await?;
        event!(Level::INFO, deleted = summary.deleted, "exercise updated");
        Ok(ExerciseDetailResponse::from(&exercise))
    }

    /// Header-only patch; instructions are never touched.
    #[instrument(skip(self, request))]
    pub async fn patch_header(
        &self,
        id: RecordId,
        request: ExercisePatchRequest,
    ) -> Result<ExerciseDetailResponse> {
        let _guard = self.store.locks().acquire(AggregateKey::Exercise(id)).await;
        let mut exercise = self.load(id).await?;

        let mut name = exercise.name().to_string();
        request.name.apply_required(&mut name);
        let mut category = exercise.category().to_string();
        request.category.apply_required(&mut category);
        validate_exercise_header(&name, &category).map_err(AppError::Validation)?;

        exercise.rename(name);
        exercise.recategorize(category);
        let mut description = exercise.description().map(str::to_string);
        request.description.apply_to(&mut description);
        exercise.set_description(description);
        if let Some(hidden) = request.is_hidden.as_value() {
            exercise.set_hidden(*hidden);
        }
        if let Some(requirement) = request.metric_requirement.as_value() {
            exercise.set_metric_requirement(*requirement);
        }
        exercise.touch();

        self.store.save_exercise(&mut exercise).await?;
        Ok(ExerciseDetailResponse::from(&exercise))
    }

    pub async fn hide(&self, id: RecordId) -> Result<()> {
        self.toggle(id, true).await
    }

    pub async fn show(&self, id: RecordId) -> Result<()> {
        self.toggle(id, false).await
    }

    /// Hides or shows every listed exercise in one write. Unknown ids fail the
    /// whole batch with `NotFound`.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn set_hidden_many(&self, ids: &[RecordId], hidden: bool) -> Result<usize> {
        let _guards = self
            .store
            .locks()
            .acquire_many(ids.iter().copied().map(AggregateKey::Exercise))
            .await;
        let (shown, hidden_count) = if hidden {
            self.store.set_hidden(&[], ids).await?
        } else {
            self.store.set_hidden(ids, &[]).await?
        };
        Ok(shown + hidden_count)
    }

    /// Combined activate/deactivate batch. An id in both lists is rejected
    /// before anything changes.
    #[instrument(skip_all)]
    pub async fn update_activation_states(
        &self,
        request: ActivationStatesRequest,
    ) -> Result<ActivationStatesResponse> {
        let activate = request.activate_ids();
        let deactivate = request.deactivate_ids();

        let wanted_active: HashSet<RecordId> = activate.iter().copied().collect();
        let mut overlap: Vec<RecordId> = deactivate
            .iter()
            .copied()
            .filter(|id| wanted_active.contains(id))
            .collect();
        if !overlap.is_empty() {
            overlap.sort_unstable();
            overlap.dedup();
            return Err(AppError::validation(format!(
                "exercise ids {overlap:?} are listed for both activation and deactivation"
            )));
        }

        let _guards = self
            .store
            .locks()
            .acquire_many(
                activate
                    .iter()
                    .chain(deactivate)
                    .copied()
                    .map(AggregateKey::Exercise),
            )
            .await;
        let (activated, deactivated) = self.store.set_hidden(activate, deactivate).await?;
        event!(Level::INFO, activated, deactivated, "activation states updated");
        Ok(ActivationStatesResponse {
            activated,
            deactivated,
        })
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: RecordId) -> Result<()> {
        let _guard = self.store.locks().acquire(AggregateKey::Exercise(id)).await;
        if !self.store.delete_exercise(id).await? {
            return Err(AppError::not_found("exercise", id));
        }
        event!(Level::INFO, exercise_id = id, "exercise deleted");
        Ok(())
    }

    async fn toggle(&self, id: RecordId, hidden: bool) -> Result<()> {
        let _guard = self.store.locks().acquire(AggregateKey::Exercise(id)).await;
        let mut exercise = self.load(id).await?;
        if exercise.is_hidden() == hidden {
            return Ok(());
        }
        exercise.set_hidden(hidden);
        exercise.touch();
        self.store.save_exercise(&mut exercise).await?;
        Ok(())
    }

    async fn load(&self, id: RecordId) -> Result<Exercise> {
        self.store
            .load_exercise(id)
            .await?
            .ok_or_else(|| AppError::not_found("exercise", id))
    }
}
