use crate::core::{AppError, Page, RecordId, Result};
use crate::domain::{Workout, day_bounds, validate_workout_title};
use crate::models::{
    WorkoutCreateRequest, WorkoutDetailResponse, WorkoutSummary, WorkoutUpdateRequest,
    workout_exercise_specs,
};
use crate::store::{AggregateKey, MemoryStore};
use chrono::{FixedOffset, Offset, Utc};
use std::sync::Arc;
use tracing::{Level, event, instrument};

/// UTC+9, the calendar the "today" listing uses unless configured otherwise.
pub const DEFAULT_DAY_OFFSET_SECONDS: i32 = 9 * 3600;

pub fn default_day_offset() -> FixedOffset {
    FixedOffset::east_opt(DEFAULT_DAY_OFFSET_SECONDS).unwrap_or_else(|| Utc.fix())
}

/// Workout log use cases. A workout is recorded in one request and only its
/// title and memo change afterwards.
#[derive(Clone)]
pub struct WorkoutService {
    store: Arc<MemoryStore>,
    day_offset: FixedOffset,
}

impl WorkoutService {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            day_offset: default_day_offset(),
        }
    }

    /// Calendar used to decide which workouts belong to "today".
    pub fn with_day_offset(mut self, offset: FixedOffset) -> Self {
        self.day_offset = offset;
        self
    }

    #[instrument(skip(self, request), fields(owner_id = request.owner_id))]
    pub async fn create(&self, request: WorkoutCreateRequest) -> Result<WorkoutDetailResponse> {
        validate_workout_title(request.title.as_deref()).map_err(AppError::Validation)?;

        let mut workout = Workout::new(request.owner_id);
        workout.set_title(request.title);
        workout.set_memo(request.memo);
        workout.set_routine_snapshot(request.routine_snapshot);

        let specs = workout_exercise_specs(&request.exercises);
        let result = {
            let catalog = self.store.catalog().await;
            workout.record_exercises(&specs, &catalog)?
        };

        self.store.save_workout(&mut workout).await?;
        event!(
            Level::INFO,
            workout_id = ?workout.id(),
            exercises = result.inserted(),
            sets = result.nested.inserted,
            "workout recorded"
        );
        Ok(WorkoutDetailResponse::from(&workout))
    }

    pub async fn get(&self, id: RecordId) -> Result<WorkoutDetailResponse> {
        let workout = self.load(id).await?;
        Ok(WorkoutDetailResponse::from(&workout))
    }

    pub async fn list_for_owner(
        &self,
        owner_id: RecordId,
        page: u32,
        size: u32,
    ) -> Result<Page<WorkoutSummary>> {
        Ok(self.store.list_workouts(owner_id, page, size).await)
    }

    /// Workouts recorded during the current calendar day.
    pub async fn list_today(&self, owner_id: RecordId) -> Result<Vec<WorkoutSummary>> {
        let (start, end) = day_bounds(Utc::now(), self.day_offset);
        Ok(self.store.list_workouts_between(owner_id, start, end).await)
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: RecordId,
        request: WorkoutUpdateRequest,
    ) -> Result<WorkoutDetailResponse> {
        let _guard = self.store.locks().acquire(AggregateKey::Workout(id)).await;
        let mut workout = self.load(id).await?;

        workout.update_basic(&request.title, &request.memo);
        validate_workout_title(workout.title()).map_err(AppError::Validation)?;

        self.store.save_workout(&mut workout).await?;
        Ok(WorkoutDetailResponse::from(&workout))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: RecordId) -> Result<()> {
        let _guard = self.store.locks().acquire(AggregateKey::Workout(id)).await;
        if !self.store.delete_workout(id).await? {
            return Err(AppError::not_found("workout", id));
        }
        event!(Level::INFO, workout_id = id, "workout deleted");
        Ok(())
    }

    async fn load(&self, id: RecordId) -> Result<Workout> {
        self.store
            .load_workout(id)
            .await?
            .ok_or_else(|| AppError::not_found("workout", id))
    }
}
