use crate::core::{Patch, RecordId};
use crate::domain::{
    ExerciseSet, MetricRequirement, Routine, RoutineExercise, RoutineExerciseDraft, SetDraft,
};
use crate::reconcile::ChildSpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineSetRequest {
    #[serde(default)]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub display_order: Option<i32>,
    #[serde(default)]
    pub weight_kg: Patch<f64>,
    #[serde(default)]
    pub reps: Patch<i32>,
    #[serde(default)]
    pub distance_meter: Patch<i32>,
    #[serde(default)]
    pub duration_second: Patch<i32>,
}

impl RoutineSetRequest {
    pub fn to_spec(&self) -> ChildSpec<SetDraft> {
        ChildSpec {
            id: self.id,
            order: self.display_order,
            reference: None,
            payload: SetDraft {
                weight_kg: self.weight_kg.clone(),
                reps: self.reps.clone(),
                distance_meter: self.distance_meter.clone(),
                duration_second: self.duration_second.clone(),
            },
        }
    }
}

/// One exercise slot. `exerciseId` is required for new slots and rebinds the
/// slot when sent for an existing one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineExerciseRequest {
    #[serde(default)]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub exercise_id: Option<RecordId>,
    #[serde(default)]
    pub display_order: Option<i32>,
    #[serde(default)]
    pub memo: Patch<String>,
    #[serde(default)]
    pub sets: Patch<Vec<RoutineSetRequest>>,
}

impl RoutineExerciseRequest {
    pub fn to_spec(&self) -> ChildSpec<RoutineExerciseDraft> {
        let sets = match &self.sets {
            Patch::Value(sets) => Patch::Value(sets.iter().map(RoutineSetRequest::to_spec).collect()),
            Patch::Null => Patch::Null,
            Patch::Missing => Patch::Missing,
        };
        ChildSpec {
            id: self.id,
            order: self.display_order,
            reference: self.exercise_id,
            payload: RoutineExerciseDraft {
                memo: self.memo.clone(),
                sets,
            },
        }
    }
}

pub fn routine_exercise_specs(
    requests: &[RoutineExerciseRequest],
) -> Vec<ChildSpec<RoutineExerciseDraft>> {
    requests.iter().map(RoutineExerciseRequest::to_spec).collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineCreateRequest {
    pub owner_id: RecordId,
    pub name: String,
    #[serde(default)]
    pub display_order: Option<i32>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default, alias = "routineExercises")]
    pub exercises: Vec<RoutineExerciseRequest>,
}

/// Header fields follow patch rules; `routineExercises` omitted or `null`
/// leaves the slots untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineUpdateRequest {
    #[serde(default)]
    pub name: Patch<String>,
    #[serde(default)]
    pub display_order: Patch<i32>,
    #[serde(default)]
    pub memo: Patch<String>,
    #[serde(default)]
    pub routine_exercises: Patch<Vec<RoutineExerciseRequest>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineHeaderRequest {
    #[serde(default)]
    pub name: Patch<String>,
    #[serde(default)]
    pub display_order: Patch<i32>,
    #[serde(default)]
    pub memo: Patch<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineOrderEntry {
    pub id: RecordId,
    pub display_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineSetResponse {
    pub id: Option<RecordId>,
    pub display_order: i32,
    pub weight_kg: Option<f64>,
    pub reps: Option<i32>,
    pub distance_meter: Option<i32>,
    pub duration_second: Option<i32>,
}

impl From<&ExerciseSet> for RoutineSetResponse {
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
pub struct RoutineExerciseResponse {
    pub id: Option<RecordId>,
    pub display_order: i32,
    pub memo: Option<String>,
    pub exercise_id: RecordId,
    pub exercise_name: String,
    pub exercise_category: String,
    #[serde(flatten)]
    pub metric_requirement: MetricRequirement,
    pub sets: Vec<RoutineSetResponse>,
}

impl From<&RoutineExercise> for RoutineExerciseResponse {
    fn from(slot: &RoutineExercise) -> Self {
        let exercise = slot.exercise();
        Self {
            id: slot.id(),
            display_order: slot.display_order(),
            memo: slot.memo().map(str::to_string),
            exercise_id: exercise.id,
            exercise_name: exercise.name.clone(),
            exercise_category: exercise.category.clone(),
            metric_requirement: exercise.metric_requirement,
            sets: slot.sets().iter().map(RoutineSetResponse::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineDetailResponse {
    pub id: Option<RecordId>,
    pub owner_id: RecordId,
    pub name: String,
    pub display_order: i32,
    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub exercises: Vec<RoutineExerciseResponse>,
}

impl From<&Routine> for RoutineDetailResponse {
    fn from(routine: &Routine) -> Self {
        Self {
            id: routine.id(),
            owner_id: routine.owner_id(),
            name: routine.name().to_string(),
            display_order: routine.display_order(),
            memo: routine.memo().map(str::to_string),
            created_at: routine.created_at(),
            updated_at: routine.updated_at(),
            exercises: routine
                .exercises()
                .iter()
                .map(RoutineExerciseResponse::from)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineSummary {
    pub id: RecordId,
    pub owner_id: RecordId,
    pub name: String,
    pub display_order: i32,
    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_sets_keep_field_presence() {
        let request: RoutineExerciseRequest = serde_json::from_str(
            r#"{"id":3,"exerciseId":11,"sets":[{"id":8,"reps":null,"weightKg":42.5}]}"#,
        )
        .unwrap();
        let spec = request.to_spec();

        assert_eq!(spec.id, Some(3));
        assert_eq!(spec.reference, Some(11));
        assert!(spec.payload.memo.is_missing());

        let sets = spec.payload.sets.as_value().unwrap();
        assert_eq!(sets[0].id, Some(8));
        assert!(sets[0].payload.reps.is_null());
        assert_eq!(sets[0].payload.weight_kg.as_value(), Some(&42.5));
        assert!(sets[0].payload.duration_second.is_missing());
    }

    #[test]
    fn omitted_slot_sets_stay_missing() {
        let request: RoutineExerciseRequest = serde_json::from_str(r#"{"id":3}"#).unwrap();
        assert!(request.to_spec().payload.sets.is_missing());
    }

    #[test]
    fn create_accepts_routine_exercises_alias() {
        let request: RoutineCreateRequest = serde_json::from_str(
            r#"{"ownerId":1,"name":"Pull","routineExercises":[{"exerciseId":2}]}"#,
        )
        .unwrap();
        assert_eq!(request.exercises.len(), 1);
    }

    #[test]
    fn slot_response_flattens_metric_statuses() {
        let response = RoutineExerciseResponse {
            id: Some(1),
            display_order: 1,
            memo: None,
            exercise_id: 2,
            exercise_name: "Row".to_string(),
            exercise_category: "Back".to_string(),
            metric_requirement: MetricRequirement::strength(),
            sets: Vec::new(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["repsStatus"], "REQUIRED");
        assert_eq!(json["exerciseName"], "Row");
    }
}
