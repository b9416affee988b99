use super::handlers::{exercise, health, routine, store_stats, workout};
use crate::service::{ExerciseService, RoutineService, WorkoutService};
use crate::store::MemoryStore;
use axum::Router;
use axum::routing::{get, patch, post};
use chrono::FixedOffset;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub exercises: ExerciseService,
    pub routines: RoutineService,
    pub workouts: WorkoutService,
    pub store: Arc<MemoryStore>,
}

impl AppState {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            exercises: ExerciseService::new(Arc::clone(&store)),
            routines: RoutineService::new(Arc::clone(&store)),
            workouts: WorkoutService::new(Arc::clone(&store)),
            store,
        }
    }

    pub fn with_day_offset(mut self, offset: FixedOffset) -> Self {
        self.workouts = self.workouts.with_day_offset(offset);
        self
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/admin/stats", get(store_stats))
        .route("/api/exercise", post(exercise::create))
        .route("/api/exercise/all", get(exercise::list))
        .route("/api/exercise/deactivate", post(exercise::deactivate_many))
        .route("/api/exercise/activate", post(exercise::activate_many))
        .route(
            "/api/exercise/activation-states",
            patch(exercise::update_activation_states),
        )
        .route(
            "/api/exercise/:id",
            get(exercise::get)
                .put(exercise::update)
                .patch(exercise::patch_header)
                .delete(exercise::delete),
        )
        .route("/api/exercise/:id/deactivation", patch(exercise::hide))
        .route("/api/exercise/:id/activation", patch(exercise::show))
        .route("/api/routine", post(routine::create))
        .route("/api/routine/user/:user_id", get(routine::list_for_owner))
        .route("/api/routine/displayOrder", patch(routine::sort))
        .route("/api/routine/header/:id", patch(routine::update_header))
        .route(
            "/api/routine/:id",
            get(routine::get).put(routine::update).delete(routine::delete),
        )
        .route("/api/workout", post(workout::create))
        .route("/api/workout/user/:user_id", get(workout::list_for_owner))
        .route("/api/workout/user/:user_id/today", get(workout::list_today))
        .route(
            "/api/workout/:id",
            get(workout::get).patch(workout::update).delete(workout::delete),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
