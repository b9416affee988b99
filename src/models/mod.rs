//! Wire types: request bodies, their mapping to child specs, and views.

pub mod exercise;
pub mod routine;
pub mod workout;

pub use exercise::{
    ActivationStatesRequest, ActivationStatesResponse, ExerciseCreateRequest,
    ExerciseDetailResponse, ExerciseIdsRequest, ExercisePatchRequest, ExerciseSummary,
    ExerciseUpdateRequest, InstructionRequest, InstructionResponse, instruction_specs,
};
pub use routine::{
    RoutineCreateRequest, RoutineDetailResponse, RoutineExerciseRequest, RoutineExerciseResponse,
    RoutineHeaderRequest, RoutineOrderEntry, RoutineSetRequest, RoutineSetResponse,
    RoutineSummary, RoutineUpdateRequest, routine_exercise_specs,
};
pub use workout::{
    WorkoutCreateRequest, WorkoutDetailResponse, WorkoutExerciseRequest,
    WorkoutExerciseResponse, WorkoutSetRequest, WorkoutSetResponse, WorkoutSummary,
    WorkoutUpdateRequest, workout_exercise_specs,
};
