use crate::core::{Patch, RecordId};
use crate::domain::{ExerciseSet, SetDraft, Workout, WorkoutExercise, WorkoutExerciseDraft};
use crate::reconcile::ChildSpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSetRequest {
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub reps: Option<i32>,
    #[serde(default)]
    pub distance_meter: Option<i32>,
    #[serde(default)]
    pub duration_second: Option<i32>,
}

impl WorkoutSetRequest {
    pub fn to_spec(&self) -> ChildSpec<SetDraft> {
        ChildSpec::new(SetDraft {
            weight_kg: self.weight_kg.into(),
            reps: self.reps.into(),
            distance_meter: self.distance_meter.into(),
            duration_second: self.duration_second.into(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutExerciseRequest {
    #[serde(default)]
    pub exercise_id: Option<RecordId>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default, alias = "workoutSets")]
    pub sets: Vec<WorkoutSetRequest>,
}

impl WorkoutExerciseRequest {
    pub fn to_spec(&self) -> ChildSpec<WorkoutExerciseDraft> {
        ChildSpec {
            id: None,
            order: None,
            reference: self.exercise_id,
            payload: WorkoutExerciseDraft {
                memo: self.memo.clone().into(),
                sets: self.sets.iter().map(WorkoutSetRequest::to_spec).collect(),
            },
        }
    }
}

pub fn workout_exercise_specs(
    requests: &[WorkoutExerciseRequest],
) -> Vec<ChildSpec<WorkoutExerciseDraft>> {
    requests.iter().map(WorkoutExerciseRequest::to_spec).collect()
}

/// A workout is recorded once with everything performed; afterwards only
/// its title and memo change.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutCreateRequest {
    pub owner_id: RecordId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub routine_snapshot: Option<serde_json::Value>,
    #[serde(default, alias = "workoutExercises")]
    pub exercises: Vec<WorkoutExerciseRequest>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutUpdateRequest {
    #[serde(default)]
    pub title: Patch<String>,
    #[serde(default)]
    pub memo: Patch<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSetResponse {
    pub id: Option<RecordId>,
    pub display_order: i32,
    pub weight_kg: Option<f64>,
    pub reps: Option<i32>,
    pub distance_meter: Option<i32>,
    pub duration_second: Option<i32>,
}

impl From<&ExerciseSet> for WorkoutSetResponse {
    fn from(set: &ExerciseSet) -> Self {
        Self {
            id: set.id(),
            display_order: set.display_order(),
            weight_kg: set.weight_kg(),
            reps: set.reps(),
            distance_meter: set.distance_meter(),
            duration_second: set.duration_second(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutExerciseResponse {
    pub id: Option<RecordId>,
    pub display_order: i32,
    pub exercise_id: Option<RecordId>,
    pub exercise_name: String,
    pub memo: Option<String>,
    pub sets: Vec<WorkoutSetResponse>,
}

impl From<&WorkoutExercise> for WorkoutExerciseResponse {
    fn from(performed: &WorkoutExercise) -> Self {
        Self {
            id: performed.id(),
            display_order: performed.display_order(),
            exercise_id: performed.exercise_id(),
            exercise_name: performed.exercise_name().to_string(),
            memo: performed.memo().map(str::to_string),
            sets: performed.sets().iter().map(WorkoutSetResponse::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutDetailResponse {
    pub id: Option<RecordId>,
    pub owner_id: RecordId,
    pub title: Option<String>,
    pub memo: Option<String>,
    pub routine_snapshot: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub exercises: Vec<WorkoutExerciseResponse>,
}

impl From<&Workout> for WorkoutDetailResponse {
    fn from(workout: &Workout) -> Self {
        Self {
            id: workout.id(),
            owner_id: workout.owner_id(),
            title: workout.title().map(str::to_string),
            memo: workout.memo().map(str::to_string),
            routine_snapshot: workout.routine_snapshot().cloned(),
            created_at: workout.created_at(),
            exercises: workout
                .exercises()
                .iter()
                .map(WorkoutExerciseResponse::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSummary {
    pub id: RecordId,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
}
