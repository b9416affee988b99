use crate::core::RecordId;
use crate::reconcile::{
    ChildEntity, ChildSpec, NoReferences, OwnedChildren, OwnerKey, ParentAggregate,
    ReconcileError, ReconcileResult, Reconciler,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const EXERCISE_NAME_MAX_LEN: usize = 100;
pub const EXERCISE_CATEGORY_MAX_LEN: usize = 50;

/// Whether a set of this exercise may record a given metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricStatus {
    Required,
    Optional,
    #[default]
    Forbidden,
}

/// Which of weight, reps, distance and duration an exercise tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricRequirement {
    #[serde(default)]
    pub weight_kg_status: MetricStatus,
    #[serde(default)]
    pub reps_status: MetricStatus,
    #[serde(default)]
    pub distance_meter_status: MetricStatus,
    #[serde(default)]
    pub duration_second_status: MetricStatus,
}

impl MetricRequirement {
    pub fn strength() -> Self {
        Self {
            weight_kg_status: MetricStatus::Required,
            reps_status: MetricStatus::Required,
            ..Self::default()
        }
    }

    pub fn cardio() -> Self {
        Self {
            distance_meter_status: MetricStatus::Optional,
            duration_second_status: MetricStatus::Required,
            ..Self::default()
        }
    }
}

/// Payload of an instruction spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionDraft {
    pub description: String,
}

impl InstructionDraft {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }

    fn validated(&self) -> Result<&str, ReconcileError> {
        if self.description.trim().is_empty() {
            return Err(ReconcileError::InvalidPayload(
                "instruction description must not be blank".to_string(),
            ));
        }
        Ok(&self.description)
    }
}

/// One numbered step of an exercise's how-to.
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseInstruction {
    pub(crate) id: Option<RecordId>,
    pub(crate) owner: Option<OwnerKey>,
    pub(crate) step_order: i32,
    pub(crate) description: String,
}

impl ExerciseInstruction {
    /// Rebuilds an already persisted instruction, detached from any exercise.
    pub fn restore(id: RecordId, step_order: i32, description: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            owner: None,
            step_order,
            description: description.into(),
        }
    }

    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    pub fn step_order(&self) -> i32 {
        self.step_order
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl ChildEntity for ExerciseInstruction {
    type Payload = InstructionDraft;
    type Reference = ();

    fn id(&self) -> Option<RecordId> {
        self.id
    }

    fn owner(&self) -> Option<OwnerKey> {
        self.owner
    }

    fn set_owner(&mut self, owner: Option<OwnerKey>) {
        self.owner = owner;
    }

    fn order(&self) -> i32 {
        self.step_order
    }

    fn set_order(&mut self, order: i32) {
        self.step_order = order;
    }

    fn create(payload: &InstructionDraft, _reference: Option<&()>) -> Result<Self, ReconcileError> {
        Ok(Self {
            id: None,
            owner: None,
            step_order: 0,
            description: payload.validated()?.to_string(),
        })
    }

    fn apply(&mut self, payload: &InstructionDraft, _reference: Option<&()>) -> Result<(), ReconcileError> {
        self.description = payload.validated()?.to_string();
        Ok(())
    }
}

/// Catalog exercise: the parent of its instructions.
#[derive(Debug, Clone, PartialEq)]
pub struct Exercise {
    pub(crate) id: Option<RecordId>,
    pub(crate) name: String,
    pub(crate) category: String,
    pub(crate) description: Option<String>,
    pub(crate) is_hidden: bool,
    pub(crate) metric_requirement: MetricRequirement,
    pub(crate) instructions: OwnedChildren<ExerciseInstruction>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl Exercise {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            name: name.into(),
            category: category.into(),
            description: None,
            is_hidden: false,
            metric_requirement: MetricRequirement::default(),
            instructions: OwnedChildren::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_hidden(&self) -> bool {
        self.is_hidden
    }

    pub fn metric_requirement(&self) -> &MetricRequirement {
        &self.metric_requirement
    }

    pub fn instructions(&self) -> &OwnedChildren<ExerciseInstruction> {
        &self.instructions
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn recategorize(&mut self, category: impl Into<String>) {
        self.category = category.into();
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.is_hidden = hidden;
    }

    /// Updated in place; the requirement has no identity of its own.
    pub fn set_metric_requirement(&mut self, requirement: MetricRequirement) {
        self.metric_requirement = requirement;
    }

    pub fn sync_instructions(
        &mut self,
        specs: &[ChildSpec<InstructionDraft>],
    ) -> Result<ReconcileResult, ReconcileError> {
        Reconciler::reconcile(&mut self.instructions, specs, &NoReferences)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl ParentAggregate<ExerciseInstruction> for Exercise {
    fn children(&self) -> &OwnedChildren<ExerciseInstruction> {
        &self.instructions
    }

    fn children_mut(&mut self) -> &mut OwnedChildren<ExerciseInstruction> {
        &mut self.instructions
    }
}

/// Header check shared by create and update paths.
pub fn validate_exercise_header(name: &str, category: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("exercise name must not be blank".to_string());
    }
    if name.chars().count() > EXERCISE_NAME_MAX_LEN {
        return Err(format!(
            "exercise name must be at most {EXERCISE_NAME_MAX_LEN} characters"
        ));
    }
    if category.trim().is_empty() {
        return Err("exercise category must not be blank".to_string());
    }
    if category.chars().count() > EXERCISE_CATEGORY_MAX_LEN {
        return Err(format!(
            "exercise category must be at most {EXERCISE_CATEGORY_MAX_LEN} characters"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_instruction_is_rejected() {
        let err = ExerciseInstruction::create(&InstructionDraft::new("   "), None).unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidPayload(_)));
    }

    #[test]
    fn metric_status_uses_screaming_case_on_the_wire() {
        let json = serde_json::to_string(&MetricRequirement::strength()).unwrap();
        assert!(json.contains(r#""weightKgStatus":"REQUIRED""#));
        assert!(json.contains(r#""distanceMeterStatus":"FORBIDDEN""#));
    }

    #[test]
    fn header_limits() {
        assert!(validate_exercise_header("Deadlift", "Back").is_ok());
        assert!(validate_exercise_header("", "Back").is_err());
        assert!(validate_exercise_header(&"x".repeat(101), "Back").is_err());
        assert!(validate_exercise_header("Deadlift", &"y".repeat(51)).is_err());
    }
}
