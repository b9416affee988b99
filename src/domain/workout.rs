use super::routine::ExerciseRef;
use super::set::{ExerciseSet, SetDraft};
use crate::core::{Patch, RecordId};
use crate::reconcile::{
    ChildEntity, ChildSpec, NoReferences, OwnedChildren, OwnerKey, ParentAggregate,
    ReconcileCounts, ReconcileError, ReconcileResult, Reconciler, ReferenceResolver,
};
use chrono::{DateTime, Days, FixedOffset, Utc};

pub const WORKOUT_TITLE_MAX_LEN: usize = 120;

/// Payload of a workout-exercise spec. A workout is a record of what was
/// performed, so its sets are always given in full.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkoutExerciseDraft {
    pub memo: Patch<String>,
    pub sets: Vec<ChildSpec<SetDraft>>,
}

/// One performed exercise of a workout.
///
/// The exercise name is copied from the catalog when the workout is
/// recorded; `exercise_id` becomes `None` once that catalog entry is deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkoutExercise {
    pub(crate) id: Option<RecordId>,
    pub(crate) owner: Option<OwnerKey>,
    pub(crate) exercise_id: Option<RecordId>,
    pub(crate) exercise_name: String,
    pub(crate) display_order: i32,
    pub(crate) memo: Option<String>,
    pub(crate) sets: OwnedChildren<ExerciseSet>,
}

impl WorkoutExercise {
    pub fn restore(
        id: RecordId,
        display_order: i32,
        exercise_id: Option<RecordId>,
        exercise_name: impl Into<String>,
        sets: Vec<ExerciseSet>,
    ) -> Result<Self, ReconcileError> {
        Ok(Self {
            id: Some(id),
            owner: None,
            exercise_id,
            exercise_name: exercise_name.into(),
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

    pub fn exercise_id(&self) -> Option<RecordId> {
        self.exercise_id
    }

    pub fn exercise_name(&self) -> &str {
        &self.exercise_name
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

impl ChildEntity for WorkoutExercise {
    type Payload = WorkoutExerciseDraft;
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
        payload: &WorkoutExerciseDraft,
        reference: Option<&ExerciseRef>,
    ) -> Result<Self, ReconcileError> {
        let exercise = reference.ok_or_else(|| {
            ReconcileError::InvalidPayload("a workout exercise needs an exerciseId".to_string())
        })?;
        Ok(Self {
            id: None,
            owner: None,
            exercise_id: Some(exercise.id),
            exercise_name: exercise.name.clone(),
            display_order: 0,
            memo: payload.memo.as_value().cloned(),
            sets: OwnedChildren::new(),
        })
    }

    fn apply(
        &mut self,
        payload: &WorkoutExerciseDraft,
        reference: Option<&ExerciseRef>,
    ) -> Result<(), ReconcileError> {
        payload.memo.apply_to(&mut self.memo);
        if let Some(exercise) = reference {
            self.exercise_id = Some(exercise.id);
            self.exercise_name = exercise.name.clone();
        }
        Ok(())
    }

    fn reconcile_nested(
        &mut self,
        payload: &WorkoutExerciseDraft,
    ) -> Result<ReconcileCounts, ReconcileError> {
        let result = Reconciler::reconcile(&mut self.sets, &payload.sets, &NoReferences)?;
        Ok(result.total())
    }
}

impl ParentAggregate<ExerciseSet> for WorkoutExercise {
    fn children(&self) -> &OwnedChildren<ExerciseSet> {
        &self.sets
    }

    fn children_mut(&mut self) -> &mut OwnedChildren<ExerciseSet> {
        &mut self.sets
    }
}

/// A completed training session of one user.
#[derive(Debug, Clone, PartialEq)]
pub struct Workout {
    pub(crate) id: Option<RecordId>,
    pub(crate) owner_id: RecordId,
    pub(crate) title: Option<String>,
    pub(crate) memo: Option<String>,
    /// Routine the session followed, as the client saw it at the time.
    pub(crate) routine_snapshot: Option<serde_json::Value>,
    pub(crate) exercises: OwnedChildren<WorkoutExercise>,
    pub(crate) created_at: DateTime<Utc>,
}

impl Workout {
    pub fn new(owner_id: RecordId) -> Self {
        Self {
            id: None,
            owner_id,
            title: None,
            memo: None,
            routine_snapshot: None,
            exercises: OwnedChildren::new(),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Option<RecordId> {
        self.id
    }

    pub fn owner_id(&self) -> RecordId {
        self.owner_id
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn memo(&self) -> Option<&str> {
        self.memo.as_deref()
    }

    pub fn routine_snapshot(&self) -> Option<&serde_json::Value> {
        self.routine_snapshot.as_ref()
    }

    pub fn exercises(&self) -> &OwnedChildren<WorkoutExercise> {
        &self.exercises
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn set_title(&mut self, title: Option<String>) {
        self.title = title;
    }

    pub fn set_memo(&mut self, memo: Option<String>) {
        self.memo = memo;
    }

    pub fn set_routine_snapshot(&mut self, snapshot: Option<serde_json::Value>) {
        self.routine_snapshot = snapshot;
    }

    /// Title and memo are the only fields editable after recording.
    pub fn update_basic(&mut self, title: &Patch<String>, memo: &Patch<String>) {
        title.apply_to(&mut self.title);
        memo.apply_to(&mut self.memo);
    }

    /// Builds the performed exercises and their sets in one reconciliation.
    pub fn record_exercises<R>(
        &mut self,
        specs: &[ChildSpec<WorkoutExerciseDraft>],
        catalog: &R,
    ) -> Result<ReconcileResult, ReconcileError>
    where
        R: ReferenceResolver<Target = ExerciseRef> + ?Sized,
    {
        Reconciler::reconcile(&mut self.exercises, specs, catalog)
    }
}

impl ParentAggregate<WorkoutExercise> for Workout {
    fn children(&self) -> &OwnedChildren<WorkoutExercise> {
        &self.exercises
    }

    fn children_mut(&mut self) -> &mut OwnedChildren<WorkoutExercise> {
        &mut self.exercises
    }
}

pub fn validate_workout_title(title: Option<&str>) -> Result<(), String> {
    match title {
        Some(title) if title.chars().count() > WORKOUT_TITLE_MAX_LEN => Err(format!(
            "workout title must be at most {WORKOUT_TITLE_MAX_LEN} characters"
        )),
        _ => Ok(()),
    }
}

/// Start and end (exclusive) of the calendar day containing `now`, as seen
/// from `offset`.
pub fn day_bounds(now: DateTime<Utc>, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
    let local_day = now.with_timezone(&offset).date_naive();
    let start = local_day
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| midnight.and_local_timezone(offset).single())
        .map(|start| start.with_timezone(&Utc))
        .unwrap_or(now);
    let end = start.checked_add_days(Days::new(1)).unwrap_or(DateTime::<Utc>::MAX_UTC);
    (start, end)
}
