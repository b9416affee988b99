//! Application services: load, reconcile and save aggregates.

mod exercise;
mod routine;
mod workout;

pub use exercise::ExerciseService;
pub use routine::RoutineService;
pub use workout::{DEFAULT_DAY_OFFSET_SECONDS, WorkoutService, default_day_offset};
