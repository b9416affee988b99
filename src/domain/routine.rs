use super::exercise::{Exercise, MetricRequirement};
use super::set::{ExerciseSet, SetDraft};
use crate::core::{Patch, RecordId};
use crate::reconcile::{
    ChildEntity, ChildSpec, NoReferences, OwnedChildren, OwnerKey, ParentAggregate,
    ReconcileCounts, ReconcileError, ReconcileResult, Reconciler, ReferenceResolver,
};
use chrono::{DateTime, Utc};

pub const ROUTINE_NAME_MAX_LEN: usize = 100;

/// Catalog exercise as seen from a routine slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExerciseRef {
    pub id: RecordId,
    pub name: String,
    pub category: String,
    pub metric_requirement: MetricRequirement,
}

impl ExerciseRef {
    /// `None` for an exercise that was never saved.
    pub fn of(exercise: &Exercise) -> Option<Self> {
        Some(Self {
            id: exercise.id()?,
            name: exercise.name().to_string(),
            category: exercise.category().to_string(),
            metric_requirement: *exercise.metric_requirement(),
        })
    }
}

/// Payload of a routine-exercise spec; the catalog exercise travels as the
/// spec's reference.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoutineExerciseDraft {
    pub memo: Patch<String>,
    /// `Missing`/`Null` keep the slot's sets, a list reconciles them.
    pub sets: Patch<Vec<ChildSpec<SetDraft>>>,
}

/// An exercise slot of a routine; owns its sets.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutineExercise {
    pub(crate) id: Option<RecordId>,
    pub(crate) owner: Option<OwnerKey>,
    pub(crate) exercise: ExerciseRef,
    pub(crate) display_order: i32,
    pub(crate) memo: Option<String>,
    pub(crate) sets: OwnedChildren<ExerciseSet>,
}

impl RoutineExercise {
    /// Rebuilds an already persisted slot, detached from any routine.
    pub fn restore(
        id: RecordId,
        display_order: i32,
        exercise: ExerciseRef,
        sets: Vec<ExerciseSet>,
    ) -> Result<Self, ReconcileError> {
        Ok(Self {
            id: Some(id),
            owner: None,
            exercise,
            display_order,
            memo: None,
            sets: OwnedChildren::with_children(sets)?,
        })
    }

    pub fn with_memo(mut self, memo: Option<String>) -> Self {
        self.memo = memo;
        self
    }

    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    pub fn exercise(&self) -> &ExerciseRef {
        &self.exercise
    }

    pub fn display_order(&self) -> i32 {
        self.display_order
    }

    pub fn memo(&self) -> Option<&str> {
        self.memo.as_deref()
    }

    pub fn sets(&self) -> &OwnedChildren<ExerciseSet> {
        &self.sets
    }

    pub(crate) fn sets_mut(&mut self) -> &mut OwnedChildren<ExerciseSet> {
        &mut self.sets
    }
}

impl ChildEntity for RoutineExercise {
    type Payload = RoutineExerciseDraft;
    type Reference = ExerciseRef;

    const REFERENCE_REQUIRED_ON_CREATE: bool = true;

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

    fn create(
        payload: &RoutineExerciseDraft,
        reference: Option<&ExerciseRef>,
    ) -> Result<Self, ReconcileError> {
        let exercise = reference.cloned().ok_or_else(|| {
            ReconcileError::InvalidPayload("a new routine exercise needs an exerciseId".to_string())
        })?;
        Ok(Self {
            id: None,
            owner: None,
            exercise,
            display_order: 0,
            memo: payload.memo.as_value().cloned(),
            sets: OwnedChildren::new(),
        })
    }

    fn apply(
        &mut self,
        payload: &RoutineExerciseDraft,
        reference: Option<&ExerciseRef>,
    ) -> Result<(), ReconcileError> {
        payload.memo.apply_to(&mut self.memo);
        if let Some(exercise) = reference {
            self.exercise = exercise.clone();
        }
        Ok(())
    }

    fn reconcile_nested(
        &mut self,
        payload: &RoutineExerciseDraft,
    ) -> Result<ReconcileCounts, ReconcileError> {
        let result = Reconciler::reconcile_patch(&mut self.sets, &payload.sets, &NoReferences)?;
        Ok(result.map(|result| result.total()).unwrap_or_default())
    }
}

impl ParentAggregate<ExerciseSet> for RoutineExercise {
    fn children(&self) -> &OwnedChildren<ExerciseSet> {
        &self.sets
    }

    fn children_mut(&mut self) -> &mut OwnedChildren<ExerciseSet> {
        &mut self.sets
    }
}

/// A user's training routine: the parent of exercise slots.
#[derive(Debug, Clone, PartialEq)]
pub struct Routine {
    pub(crate) id: Option<RecordId>,
    pub(crate) owner_id: RecordId,
    pub(crate) name: String,
    pub(crate) display_order: i32,
    pub(crate) memo: Option<String>,
    pub(crate) exercises: OwnedChildren<RoutineExercise>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl Routine {
    pub fn new(owner_id: RecordId, name: impl Into<String>, display_order: i32) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            owner_id,
            name: name.into(),
            display_order,
            memo: None,
            exercises: OwnedChildren::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    pub fn owner_id(&self) -> RecordId {
        self.owner_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_order(&self) -> i32 {
        self.display_order
    }

    pub fn memo(&self) -> Option<&str> {
        self.memo.as_deref()
    }

    pub fn exercises(&self) -> &OwnedChildren<RoutineExercise> {
        &self.exercises
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

    pub fn reorder(&mut self, display_order: i32) {
        self.display_order = display_order;
    }

    pub fn set_memo(&mut self, memo: Option<String>) {
        self.memo = memo;
    }

    /// Header update where omitted fields stay unchanged.
    pub fn update_basic(
        &mut self,
        name: &Patch<String>,
        display_order: &Patch<i32>,
        memo: &Patch<String>,
    ) {
        name.apply_required(&mut self.name);
        display_order.apply_required(&mut self.display_order);
        memo.apply_to(&mut self.memo);
    }

    /// Two-level sync: slots first, then each slot's sets.
    pub fn sync_exercises<R>(
        &mut self,
        specs: &[ChildSpec<RoutineExerciseDraft>],
        catalog: &R,
    ) -> Result<ReconcileResult, ReconcileError>
    where
        R: ReferenceResolver<Target = ExerciseRef> + ?Sized,
    {
        Reconciler::reconcile(&mut self.exercises, specs, catalog)
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

impl ParentAggregate<RoutineExercise> for Routine {
    fn children(&self) -> &OwnedChildren<RoutineExercise> {
        &self.exercises
    }

    fn children_mut(&mut self) -> &mut OwnedChildren<RoutineExercise> {
        &mut self.exercises
    }
}

pub fn validate_routine_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("routine name must not be blank".to_string());
    }
    if name.chars().count() > ROUTINE_NAME_MAX_LEN {
        return Err(format!(
            "routine name must be at most {ROUTINE_NAME_MAX_LEN} characters"
        ));
    }
    Ok(())
}
