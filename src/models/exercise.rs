use crate::core::{Patch, RecordId};
use crate::domain::{Exercise, ExerciseInstruction, InstructionDraft, MetricRequirement};
use crate::reconcile::ChildSpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionRequest {
    #[serde(default)]
    pub id: Option<RecordId>,
    #[serde(default)]
    pub step_order: Option<i32>,
    pub description: String,
}

impl InstructionRequest {
    pub fn to_spec(&self) -> ChildSpec<InstructionDraft> {
        ChildSpec {
            id: self.id,
            order: self.step_order,
            reference: None,
            payload: InstructionDraft::new(self.description.clone()),
        }
    }
}

pub fn instruction_specs(requests: &[InstructionRequest]) -> Vec<ChildSpec<InstructionDraft>> {
    requests.iter().map(InstructionRequest::to_spec).collect()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseCreateRequest {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub instructions: Vec<InstructionRequest>,
    #[serde(default)]
    pub metric_requirement: Option<MetricRequirement>,
}

/// Full update. `instructions` omitted or `null` leaves the steps alone,
/// `[]` deletes all of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseUpdateRequest {
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub is_hidden: Option<bool>,
    #[serde(default)]
    pub instructions: Patch<Vec<InstructionRequest>>,
    #[serde(default)]
    pub metric_requirement: Option<MetricRequirement>,
}

/// Header-only update; instructions are never touched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExercisePatchRequest {
    #[serde(default)]
    pub name: Patch<String>,
    #[serde(default)]
    pub category: Patch<String>,
    #[serde(default)]
    pub description: Patch<String>,
    #[serde(default)]
    pub is_hidden: Patch<bool>,
    #[serde(default)]
    pub metric_requirement: Patch<MetricRequirement>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseIdsRequest {
    #[serde(default)]
    pub exercise_ids: Vec<RecordId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivationStatesRequest {
    #[serde(default)]
    pub activate: Option<ExerciseIdsRequest>,
    #[serde(default)]
    pub deactivate: Option<ExerciseIdsRequest>,
}

impl ActivationStatesRequest {
    pub fn activate_ids(&self) -> &[RecordId] {
        self.activate
            .as_ref()
            .map(|request| request.exercise_ids.as_slice())
            .unwrap_or_default()
    }

    pub fn deactivate_ids(&self) -> &[RecordId] {
        self.deactivate
            .as_ref()
            .map(|request| request.exercise_ids.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionResponse {
    pub id: Option<RecordId>,
    pub step_order: i32,
    pub description: String,
}

impl From<&ExerciseInstruction> for InstructionResponse {
    fn from(instruction: &ExerciseInstruction) -> Self {
        Self {
            id: instruction.id(),
            step_order: instruction.step_order(),
            description: instruction.description().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseDetailResponse {
    pub id: Option<RecordId>,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub is_hidden: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub instructions: Vec<InstructionResponse>,
    pub metric_requirement: MetricRequirement,
}

impl From<&Exercise> for ExerciseDetailResponse {
    fn from(exercise: &Exercise) -> Self {
        Self {
            id: exercise.id(),
            name: exercise.name().to_string(),
            category: exercise.category().to_string(),
            description: exercise.description().map(str::to_string),
            is_hidden: exercise.is_hidden(),
            created_at: exercise.created_at(),
            updated_at: exercise.updated_at(),
            instructions: exercise
                .instructions()
                .iter()
                .map(InstructionResponse::from)
                .collect(),
            metric_requirement: *exercise.metric_requirement(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseSummary {
    pub id: RecordId,
    pub name: String,
    pub category: String,
    pub is_hidden: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationStatesResponse {
    pub activated: usize,
    pub deactivated: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_distinguishes_omitted_and_empty_instructions() {
        let omitted: ExerciseUpdateRequest =
            serde_json::from_str(r#"{"name":"Squat","category":"Legs"}"#).unwrap();
        assert!(omitted.instructions.is_missing());

        let emptied: ExerciseUpdateRequest =
            serde_json::from_str(r#"{"name":"Squat","category":"Legs","instructions":[]}"#)
                .unwrap();
        assert_eq!(emptied.instructions.as_value().map(Vec::len), Some(0));
    }

    #[test]
    fn instruction_request_maps_step_order_to_order_hint() {
        let request: InstructionRequest =
            serde_json::from_str(r#"{"id":4,"stepOrder":2,"description":"Brace"}"#).unwrap();
        let spec = request.to_spec();
        assert_eq!(spec.id, Some(4));
        assert_eq!(spec.order, Some(2));
        assert_eq!(spec.payload.description, "Brace");
    }

    #[test]
    fn activation_states_default_to_empty_lists() {
        let request: ActivationStatesRequest =
            serde_json::from_str(r#"{"activate":{"exerciseIds":[1,2]}}"#).unwrap();
        assert_eq!(request.activate_ids(), &[1, 2]);
        assert!(request.deactivate_ids().is_empty());
    }
}
