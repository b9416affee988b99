use super::Result;
use super::router::AppState;
use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
pub(super) struct PageParams {
    page: Option<u32>,
    size: Option<u32>,
}

impl PageParams {
    fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    fn size(&self) -> u32 {
        self.size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }
}

#[derive(Debug, Serialize)]
pub(super) struct HealthResponse {
    status: &'static str,
}

pub(super) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct StoreStatsResponse {
    exercises: usize,
    routines: usize,
    workouts: usize,
    flushes: u64,
    reference_batches: u64,
    snapshots_written: u64,
    snapshot_failures: u64,
    ops_since_snapshot: u64,
}

pub(super) async fn store_stats(State(state): State<AppState>) -> Json<StoreStatsResponse> {
    let stats = state.store.stats().await;
    Json(StoreStatsResponse {
        exercises: stats.exercises,
        routines: stats.routines,
        workouts: stats.workouts,
        flushes: stats.flushes,
        reference_batches: stats.reference_batches,
        snapshots_written: stats.snapshots_written,
        snapshot_failures: stats.snapshot_failures,
        ops_since_snapshot: stats.ops_since_snapshot,
    })
}

pub(super) mod exercise {
    use super::*;
    use crate::core::{Page, RecordId};
    use crate::models::{
        ActivationStatesRequest, ActivationStatesResponse, ExerciseCreateRequest,
        ExerciseDetailResponse, ExerciseIdsRequest, ExercisePatchRequest, ExerciseSummary,
        ExerciseUpdateRequest,
    };
    use axum::extract::{Path, Query};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    pub(in crate::web) async fn create(
        State(state): State<AppState>,
        Json(payload): Json<ExerciseCreateRequest>,
    ) -> Result<impl IntoResponse> {
        let created = state.exercises.create(payload).await?;
        Ok((StatusCode::CREATED, Json(created)))
    }

    pub(in crate::web) async fn list(
        State(state): State<AppState>,
        Query(params): Query<PageParams>,
    ) -> Result<Json<Page<ExerciseSummary>>> {
        Ok(Json(state.exercises.list(params.page(), params.size()).await?))
    }

    pub(in crate::web) async fn get(
        State(state): State<AppState>,
        Path(id): Path<RecordId>,
    ) -> Result<Json<ExerciseDetailResponse>> {
        Ok(Json(state.exercises.get(id).await?))
    }

    pub(in crate::web) async fn update(
        State(state): State<AppState>,
        Path(id): Path<RecordId>,
        Json(payload): Json<ExerciseUpdateRequest>,
    ) -> Result<Json<ExerciseDetailResponse>> {
        Ok(Json(state.exercises.update(id, payload).await?))
    }

    pub(in crate::web) async fn patch_header(
        State(state): State<AppState>,
        Path(id): Path<RecordId>,
        Json(payload): Json<ExercisePatchRequest>,
    ) -> Result<Json<ExerciseDetailResponse>> {
        Ok(Json(state.exercises.patch_header(id, payload).await?))
    }

    pub(in crate::web) async fn hide(
        State(state): State<AppState>,
        Path(id): Path<RecordId>,
    ) -> Result<StatusCode> {
        state.exercises.hide(id).await?;
        Ok(StatusCode::NO_CONTENT)
    }

    pub(in crate::web) async fn show(
        State(state): State<AppState>,
        Path(id): Path<RecordId>,
    ) -> Result<StatusCode> {
        state.exercises.show(id).await?;
        Ok(StatusCode::NO_CONTENT)
    }

    pub(in crate::web) async fn deactivate_many(
        State(state): State<AppState>,
        Json(payload): Json<ExerciseIdsRequest>,
    ) -> Result<StatusCode> {
        state.exercises.set_hidden_many(&payload.exercise_ids, true).await?;
        Ok(StatusCode::OK)
    }

    pub(in crate::web) async fn activate_many(
        State(state): State<AppState>,
        Json(payload): Json<ExerciseIdsRequest>,
    ) -> Result<StatusCode> {
        state.exercises.set_hidden_many(&payload.exercise_ids, false).await?;
        Ok(StatusCode::OK)
    }

    pub(in crate::web) async fn update_activation_states(
        State(state): State<AppState>,
        Json(payload): Json<ActivationStatesRequest>,
    ) -> Result<Json<ActivationStatesResponse>> {
        Ok(Json(state.exercises.update_activation_states(payload).await?))
    }

    pub(in crate::web) async fn delete(
        State(state): State<AppState>,
        Path(id): Path<RecordId>,
    ) -> Result<StatusCode> {
        state.exercises.delete(id).await?;
        Ok(StatusCode::NO_CONTENT)
    }
}

pub(super) mod routine {
    use super::*;
    use crate::core::{Page, RecordId};
    use crate::models::{
        RoutineCreateRequest, RoutineDetailResponse, RoutineHeaderRequest, RoutineOrderEntry,
        RoutineSummary, RoutineUpdateRequest,
    };
    use axum::extract::{Path, Query};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    pub(in crate::web) async fn create(
        State(state): State<AppState>,
        Json(payload): Json<RoutineCreateRequest>,
    ) -> Result<impl IntoResponse> {
        let owner_id = payload.owner_id;
        let created = state.routines.create(owner_id, payload).await?;
        Ok((StatusCode::CREATED, Json(created)))
    }

    pub(in crate::web) async fn list_for_owner(
        State(state): State<AppState>,
        Path(user_id): Path<RecordId>,
        Query(params): Query<PageParams>,
    ) -> Result<Json<Page<RoutineSummary>>> {
        Ok(Json(
            state
                .routines
                .list_for_owner(user_id, params.page(), params.size())
                .await?,
        ))
    }

    pub(in crate::web) async fn get(
        State(state): State<AppState>,
        Path(id): Path<RecordId>,
    ) -> Result<Json<RoutineDetailResponse>> {
        Ok(Json(state.routines.get(id).await?))
    }

    pub(in crate::web) async fn update(
        State(state): State<AppState>,
        Path(id): Path<RecordId>,
        Json(payload): Json<RoutineUpdateRequest>,
    ) -> Result<Json<RoutineDetailResponse>> {
        Ok(Json(state.routines.update(id, payload).await?))
    }

    pub(in crate::web) async fn update_header(
        State(state): State<AppState>,
        Path(id): Path<RecordId>,
        Json(payload): Json<RoutineHeaderRequest>,
    ) -> Result<Json<RoutineDetailResponse>> {
        Ok(Json(state.routines.update_header(id, payload).await?))
    }

    pub(in crate::web) async fn sort(
        State(state): State<AppState>,
        Json(entries): Json<Vec<RoutineOrderEntry>>,
    ) -> Result<StatusCode> {
        state.routines.sort(&entries).await?;
        Ok(StatusCode::OK)
    }

    pub(in crate::web) async fn delete(
        State(state): State<AppState>,
        Path(id): Path<RecordId>,
    ) -> Result<StatusCode> {
        state.routines.delete(id).await?;
        Ok(StatusCode::OK)
    }
}

pub(super) mod workout {
    use super::*;
    use crate::core::{Page, RecordId};
    use crate::models::{
        WorkoutCreateRequest, WorkoutDetailResponse, WorkoutSummary, WorkoutUpdateRequest,
    };
    use axum::extract::{Path, Query};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    pub(in crate::web) async fn create(
        State(state): State<AppState>,
        Json(payload): Json<WorkoutCreateRequest>,
    ) -> Result<impl IntoResponse> {
        let created = state.workouts.create(payload).await?;
        Ok((StatusCode::CREATED, Json(created)))
    }

    pub(in crate::web) async fn list_for_owner(
        State(state): State<AppState>,
        Path(user_id): Path<RecordId>,
        Query(params): Query<PageParams>,
    ) -> Result<Json<Page<WorkoutSummary>>> {
        Ok(Json(
            state
                .workouts
                .list_for_owner(user_id, params.page(), params.size())
                .await?,
        ))
    }

    pub(in crate::web) async fn list_today(
        State(state): State<AppState>,
        Path(user_id): Path<RecordId>,
    ) -> Result<Json<Vec<WorkoutSummary>>> {
        Ok(Json(state.workouts.list_today(user_id).await?))
    }

    pub(in crate::web) async fn get(
        State(state): State<AppState>,
        Path(id): Path<RecordId>,
    ) -> Result<Json<WorkoutDetailResponse>> {
        Ok(Json(state.workouts.get(id).await?))
    }

    pub(in crate::web) async fn update(
        State(state): State<AppState>,
        Path(id): Path<RecordId>,
        Json(payload): Json<WorkoutUpdateRequest>,
    ) -> Result<Json<WorkoutDetailResponse>> {
        Ok(Json(state.workouts.update(id, payload).await?))
    }

    pub(in crate::web) async fn delete(
        State(state): State<AppState>,
        Path(id): Path<RecordId>,
    ) -> Result<StatusCode> {
        state.workouts.delete(id).await?;
        Ok(StatusCode::OK)
    }
}
