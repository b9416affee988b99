use crate::core::{Patch, RecordId};
use crate::reconcile::{ChildEntity, OwnerKey, ReconcileError};

/// Payload of a set spec. `Null` clears a metric, `Missing` keeps it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SetDraft {
    pub weight_kg: Patch<f64>,
    pub reps: Patch<i32>,
    pub distance_meter: Patch<i32>,
    pub duration_second: Patch<i32>,
}

impl SetDraft {
    fn validate(&self) -> Result<(), ReconcileError> {
        if let Some(weight) = self.weight_kg.as_value()
            && (!weight.is_finite() || *weight < 0.0)
        {
            return Err(ReconcileError::InvalidPayload(format!(
                "weightKg must be a non-negative number, got {weight}"
            )));
        }
        for (field, value) in [
            ("reps", &self.reps),
            ("distanceMeter", &self.distance_meter),
            ("durationSecond", &self.duration_second),
        ] {
            if let Some(value) = value.as_value()
                && *value < 0
            {
                return Err(ReconcileError::InvalidPayload(format!(
                    "{field} must not be negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// One set of a routine slot (planned) or of a workout exercise (performed).
#[derive(Debug, Clone, PartialEq)]
pub struct ExerciseSet {
    pub(crate) id: Option<RecordId>,
    pub(crate) owner: Option<OwnerKey>,
    pub(crate) display_order: i32,
    pub(crate) weight_kg: Option<f64>,
    pub(crate) reps: Option<i32>,
    pub(crate) distance_meter: Option<i32>,
    pub(crate) duration_second: Option<i32>,
}

impl ExerciseSet {
    /// Rebuilds an already persisted set, detached from any slot.
    pub fn restore(id: RecordId, display_order: i32) -> Self {
        Self {
            id: Some(id),
            owner: None,
            display_order,
            weight_kg: None,
            reps: None,
            distance_meter: None,
            duration_second: None,
        }
    }

    pub fn with_metrics(
        mut self,
        weight_kg: Option<f64>,
        reps: Option<i32>,
        distance_meter: Option<i32>,
        duration_second: Option<i32>,
    ) -> Self {
        self.weight_kg = weight_kg;
        self.reps = reps;
        self.distance_meter = distance_meter;
        self.duration_second = duration_second;
        self
    }

    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    pub fn display_order(&self) -> i32 {
        self.display_order
    }

    pub fn weight_kg(&self) -> Option<f64> {
        self.weight_kg
    }

    pub fn reps(&self) -> Option<i32> {
        self.reps
    }

    pub fn distance_meter(&self) -> Option<i32> {
        self.distance_meter
    }

    pub fn duration_second(&self) -> Option<i32> {
        self.duration_second
    }
}

impl ChildEntity for ExerciseSet {
    type Payload = SetDraft;
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
        self.display_order
    }

    fn set_order(&mut self, order: i32) {
        self.display_order = order;
    }

    fn create(payload: &SetDraft, _reference: Option<&()>) -> Result<Self, ReconcileError> {
        payload.validate()?;
        Ok(Self {
            id: None,
            owner: None,
            display_order: 0,
            weight_kg: payload.weight_kg.as_value().copied(),
            reps: payload.reps.as_value().copied(),
            distance_meter: payload.distance_meter.as_value().copied(),
            duration_second: payload.duration_second.as_value().copied(),
        })
    }

    fn apply(&mut self, payload: &SetDraft, _reference: Option<&()>) -> Result<(), ReconcileError> {
        payload.validate()?;
        payload.weight_kg.apply_to(&mut self.weight_kg);
        payload.reps.apply_to(&mut self.reps);
        payload.distance_meter.apply_to(&mut self.distance_meter);
        payload.duration_second.apply_to(&mut self.duration_second);
        Ok(())
    }
}
