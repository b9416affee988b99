//! Exercise catalog, routine and workout aggregates.

pub mod exercise;
pub mod routine;
pub mod set;
pub mod workout;

pub use exercise::{
    Exercise, ExerciseInstruction, InstructionDraft, MetricRequirement, MetricStatus,
    validate_exercise_header,
};
pub use routine::{
    ExerciseRef, Routine, RoutineExercise, RoutineExerciseDraft, validate_routine_name,
};
pub use set::{ExerciseSet, SetDraft};
pub use workout::{
    Workout, WorkoutExercise, WorkoutExerciseDraft, day_bounds, validate_workout_title,
};
