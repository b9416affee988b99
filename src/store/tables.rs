use crate::core::{AppError, RecordId, Result};
use crate::domain::{
    Exercise, ExerciseInstruction, ExerciseRef, ExerciseSet, MetricRequirement, Routine,
    RoutineExercise, Workout, WorkoutExercise,
};
use crate::reconcile::OwnedChildren;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ExerciseRow {
    pub id: RecordId,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub is_hidden: bool,
    pub metric_requirement: MetricRequirement,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct InstructionRow {
    pub id: RecordId,
    pub exercise_id: RecordId,
    pub step_order: i32,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct RoutineRow {
    pub id: RecordId,
    pub owner_id: RecordId,
    pub name: String,
    pub display_order: i32,
    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct RoutineExerciseRow {
    pub id: RecordId,
    pub routine_id: RecordId,
    pub exercise_id: RecordId,
    pub display_order: i32,
    pub memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct RoutineSetRow {
    pub id: RecordId,
    pub routine_exercise_id: RecordId,
    pub display_order: i32,
    pub weight_kg: Option<f64>,
    pub reps: Option<i32>,
    pub distance_meter: Option<i32>,
    pub duration_second: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct WorkoutRow {
    pub id: RecordId,
    pub owner_id: RecordId,
    pub title: Option<String>,
    pub memo: Option<String>,
    pub routine_snapshot: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct WorkoutExerciseRow {
    pub id: RecordId,
    pub workout_id: RecordId,
    pub exercise_id: Option<RecordId>,
    pub exercise_name: String,
    pub display_order: i32,
    pub memo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct WorkoutSetRow {
    pub id: RecordId,
    pub workout_exercise_id: RecordId,
    pub display_order: i32,
    pub weight_kg: Option<f64>,
    pub reps: Option<i32>,
    pub distance_meter: Option<i32>,
    pub duration_second: Option<i32>,
}

/// Row counts touched by one aggregate flush, parent row included.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushSummary {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// Every table plus the shared id sequence; this is the snapshot payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Tables {
    pub next_id: RecordId,
    pub exercises: BTreeMap<RecordId, ExerciseRow>,
    pub exercise_instructions: BTreeMap<RecordId, InstructionRow>,
    pub routines: BTreeMap<RecordId, RoutineRow>,
    pub routine_exercises: BTreeMap<RecordId, RoutineExerciseRow>,
    pub routine_sets: BTreeMap<RecordId, RoutineSetRow>,
    pub workouts: BTreeMap<RecordId, WorkoutRow>,
    pub workout_exercises: BTreeMap<RecordId, WorkoutExerciseRow>,
    pub workout_sets: BTreeMap<RecordId, WorkoutSetRow>,
}

impl Tables {
    fn allocate_id(&mut self) -> RecordId {
        self.next_id += 1;
        self.next_id
    }

    pub fn exercise_ref(&self, id: RecordId) -> Option<ExerciseRef> {
        self.exercises.get(&id).map(|row| ExerciseRef {
            id: row.id,
            name: row.name.clone(),
            category: row.category.clone(),
            metric_requirement: row.metric_requirement,
        })
    }

    pub fn load_exercise(&self, id: RecordId) -> Result<Option<Exercise>> {
        let Some(row) = self.exercises.get(&id) else {
            return Ok(None);
        };

        let mut steps: Vec<&InstructionRow> = self
            .exercise_instructions
            .values()
            .filter(|step| step.exercise_id == id)
            .collect();
        steps.sort_by_key(|step| (step.step_order, step.id));
        let instructions = OwnedChildren::with_children(steps.into_iter().map(|step| {
            ExerciseInstruction::restore(step.id, step.step_order, step.description.clone())
        }))?;

        Ok(Some(Exercise {
            id: Some(row.id),
            name: row.name.clone(),
            category: row.category.clone(),
            description: row.description.clone(),
            is_hidden: row.is_hidden,
            metric_requirement: row.metric_requirement,
            instructions,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    pub fn load_routine(&self, id: RecordId) -> Result<Option<Routine>> {
        let Some(row) = self.routines.get(&id) else {
            return Ok(None);
        };

        let mut slot_rows: Vec<&RoutineExerciseRow> = self
            .routine_exercises
            .values()
            .filter(|slot| slot.routine_id == id)
            .collect();
        slot_rows.sort_by_key(|slot| (slot.display_order, slot.id));

        let mut slots = Vec::with_capacity(slot_rows.len());
        for slot in slot_rows {
            let exercise = self.exercise_ref(slot.exercise_id).ok_or_else(|| {
                AppError::Internal(format!(
                    "routine exercise {} points at missing exercise {}",
                    slot.id, slot.exercise_id
                ))
            })?;
            let mut set_rows: Vec<&RoutineSetRow> = self
                .routine_sets
                .values()
                .filter(|set| set.routine_exercise_id == slot.id)
                .collect();
            set_rows.sort_by_key(|set| (set.display_order, set.id));
            let sets = set_rows
                .into_iter()
                .map(|set| {
                    ExerciseSet::restore(set.id, set.display_order).with_metrics(
                        set.weight_kg,
                        set.reps,
                        set.distance_meter,
                        set.duration_second,
                    )
                })
                .collect();
            slots.push(
                RoutineExercise::restore(slot.id, slot.display_order, exercise, sets)?
                    .with_memo(slot.memo.clone()),
            );
        }

        Ok(Some(Routine {
            id: Some(row.id),
            owner_id: row.owner_id,
            name: row.name.clone(),
            display_order: row.display_order,
            memo: row.memo.clone(),
            exercises: OwnedChildren::with_children(slots)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    pub fn load_workout(&self, id: RecordId) -> Result<Option<Workout>> {
        let Some(row) = self.workouts.get(&id) else {
            return Ok(None);
        };

        let mut exercise_rows: Vec<&WorkoutExerciseRow> = self
            .workout_exercises
            .values()
            .filter(|performed| performed.workout_id == id)
            .collect();
        exercise_rows.sort_by_key(|performed| (performed.display_order, performed.id));

        let mut performed = Vec::with_capacity(exercise_rows.len());
        for exercise in exercise_rows {
            let mut set_rows: Vec<&WorkoutSetRow> = self
                .workout_sets
                .values()
                .filter(|set| set.workout_exercise_id == exercise.id)
                .collect();
            set_rows.sort_by_key(|set| (set.display_order, set.id));
            let sets = set_rows
                .into_iter()
                .map(|set| {
                    ExerciseSet::restore(set.id, set.display_order).with_metrics(
                        set.weight_kg,
                        set.reps,
                        set.distance_meter,
                        set.duration_second,
                    )
                })
                .collect();
            performed.push(
                WorkoutExercise::restore(
                    exercise.id,
                    exercise.display_order,
                    exercise.exercise_id,
                    exercise.exercise_name.clone(),
                    sets,
                )?
                .with_memo(exercise.memo.clone()),
            );
        }

        Ok(Some(Workout {
            id: Some(row.id),
            owner_id: row.owner_id,
            title: row.title.clone(),
            memo: row.memo.clone(),
            routine_snapshot: row.routine_snapshot.clone(),
            exercises: OwnedChildren::with_children(performed)?,
            created_at: row.created_at,
        }))
    }

    /// Writes the exercise and its instructions; instruction rows of this
    /// exercise that are no longer in the aggregate are deleted.
    pub fn flush_exercise(&mut self, exercise: &mut Exercise) -> Result<FlushSummary> {
        if let Some(id) = exercise.id
            && !self.exercises.contains_key(&id)
        {
            return Err(AppError::not_found("exercise", id));
        }
        if self
            .exercises
            .values()
            .any(|row| row.name == exercise.name && Some(row.id) != exercise.id)
        {
            return Err(AppError::conflict(format!(
                "an exercise named '{}' already exists",
                exercise.name
            )));
        }
        for step in exercise.instructions.iter() {
            if let Some(step_id) = step.id {
                ensure_child_of(
                    self.exercise_instructions.get(&step_id).map(|row| row.exercise_id),
                    exercise.id,
                    "instruction",
                    step_id,
                )?;
            }
        }

        let mut summary = FlushSummary::default();
        let exercise_id = match exercise.id {
            Some(id) => {
                summary.updated += 1;
                id
            }
            None => {
                let id = self.allocate_id();
                exercise.id = Some(id);
                summary.inserted += 1;
                id
            }
        };
        self.exercises.insert(
            exercise_id,
            ExerciseRow {
                id: exercise_id,
                name: exercise.name.clone(),
                category: exercise.category.clone(),
                description: exercise.description.clone(),
                is_hidden: exercise.is_hidden,
                metric_requirement: exercise.metric_requirement,
                created_at: exercise.created_at,
                updated_at: exercise.updated_at,
            },
        );

        let mut kept = HashSet::new();
        for step in exercise.instructions.iter_mut() {
            let id = self.assign(&mut step.id, &mut summary);
            kept.insert(id);
            self.exercise_instructions.insert(
                id,
                InstructionRow {
                    id,
                    exercise_id,
                    step_order: step.step_order,
                    description: step.description.clone(),
                },
            );
        }

        let orphans: Vec<RecordId> = self
            .exercise_instructions
            .values()
            .filter(|row| row.exercise_id == exercise_id && !kept.contains(&row.id))
            .map(|row| row.id)
            .collect();
        for id in orphans {
            self.exercise_instructions.remove(&id);
            summary.deleted += 1;
        }

        debug!("flushed exercise {exercise_id}: {summary:?}");
        Ok(summary)
    }

    /// Writes the routine, its slots and their sets. Removed slots take their
    /// sets with them.
    pub fn flush_routine(&mut self, routine: &mut Routine) -> Result<FlushSummary> {
        if let Some(id) = routine.id
            && !self.routines.contains_key(&id)
        {
            return Err(AppError::not_found("routine", id));
        }
        for slot in routine.exercises.iter() {
            if !self.exercises.contains_key(&slot.exercise.id) {
                return Err(AppError::conflict(format!(
                    "exercise {} no longer exists",
                    slot.exercise.id
                )));
            }
            if let Some(slot_id) = slot.id {
                ensure_child_of(
                    self.routine_exercises.get(&slot_id).map(|row| row.routine_id),
                    routine.id,
                    "routine exercise",
                    slot_id,
                )?;
            }
            for set in slot.sets.iter() {
                if let Some(set_id) = set.id {
                    ensure_child_of(
                        self.routine_sets
                            .get(&set_id)
                            .map(|row| row.routine_exercise_id),
                        slot.id,
                        "routine set",
                        set_id,
                    )?;
                }
            }
        }

        let mut summary = FlushSummary::default();
        let routine_id = match routine.id {
            Some(id) => {
                summary.updated += 1;
                id
            }
            None => {
                let id = self.allocate_id();
                routine.id = Some(id);
                summary.inserted += 1;
                id
            }
        };
        self.routines.insert(
            routine_id,
            RoutineRow {
                id: routine_id,
                owner_id: routine.owner_id,
                name: routine.name.clone(),
                display_order: routine.display_order,
                memo: routine.memo.clone(),
                created_at: routine.created_at,
                updated_at: routine.updated_at,
            },
        );

        let mut kept_slots = BTreeSet::new();
        let mut kept_sets = HashSet::new();
        for slot in routine.exercises.iter_mut() {
            let slot_id = self.assign(&mut slot.id, &mut summary);
            kept_slots.insert(slot_id);
            self.routine_exercises.insert(
                slot_id,
                RoutineExerciseRow {
                    id: slot_id,
                    routine_id,
                    exercise_id: slot.exercise.id,
                    display_order: slot.display_order,
                    memo: slot.memo.clone(),
                },
            );
            for set in slot.sets_mut().iter_mut() {
                let set_id = self.assign(&mut set.id, &mut summary);
                kept_sets.insert(set_id);
                self.routine_sets.insert(
                    set_id,
                    RoutineSetRow {
                        id: set_id,
                        routine_exercise_id: slot_id,
                        display_order: set.display_order,
                        weight_kg: set.weight_kg,
                        reps: set.reps,
                        distance_meter: set.distance_meter,
                        duration_second: set.duration_second,
                    },
                );
            }
        }

        let slot_ids: BTreeSet<RecordId> = self
            .routine_exercises
            .values()
            .filter(|row| row.routine_id == routine_id)
            .map(|row| row.id)
            .collect();
        let orphan_sets: Vec<RecordId> = self
            .routine_sets
            .values()
            .filter(|row| slot_ids.contains(&row.routine_exercise_id) && !kept_sets.contains(&row.id))
            .map(|row| row.id)
            .collect();
        for id in orphan_sets {
            self.routine_sets.remove(&id);
            summary.deleted += 1;
        }
        for id in slot_ids.difference(&kept_slots) {
            self.routine_exercises.remove(id);
            summary.deleted += 1;
        }

        debug!("flushed routine {routine_id}: {summary:?}");
        Ok(summary)
    }

    /// Writes the workout, its exercises and their sets. A newly recorded
    /// exercise must still exist in the catalog; persisted rows keep the
    /// exercise link they were stored with.
    pub fn flush_workout(&mut self, workout: &mut Workout) -> Result<FlushSummary> {
        if let Some(id) = workout.id
            && !self.workouts.contains_key(&id)
        {
            return Err(AppError::not_found("workout", id));
        }
        for performed in workout.exercises.iter() {
            match performed.id {
                Some(performed_id) => ensure_child_of(
                    self.workout_exercises
                        .get(&performed_id)
                        .map(|row| row.workout_id),
                    workout.id,
                    "workout exercise",
                    performed_id,
                )?,
                None => {
                    if let Some(exercise_id) = performed.exercise_id
                        && !self.exercises.contains_key(&exercise_id)
                    {
                        return Err(AppError::conflict(format!(
                            "exercise {exercise_id} no longer exists"
                        )));
                    }
                }
            }
            for set in performed.sets.iter() {
                if let Some(set_id) = set.id {
                    ensure_child_of(
                        self.workout_sets
                            .get(&set_id)
                            .map(|row| row.workout_exercise_id),
                        performed.id,
                        "workout set",
                        set_id,
                    )?;
                }
            }
        }

        let mut summary = FlushSummary::default();
        let workout_id = match workout.id {
            Some(id) => {
                summary.updated += 1;
                id
            }
            None => {
                let id = self.allocate_id();
                workout.id = Some(id);
                summary.inserted += 1;
                id
            }
        };
        self.workouts.insert(
            workout_id,
            WorkoutRow {
                id: workout_id,
                owner_id: workout.owner_id,
                title: workout.title.clone(),
                memo: workout.memo.clone(),
                routine_snapshot: workout.routine_snapshot.clone(),
                created_at: workout.created_at,
            },
        );

        let mut kept_exercises = BTreeSet::new();
        let mut kept_sets = HashSet::new();
        for performed in workout.exercises.iter_mut() {
            let performed_id = self.assign(&mut performed.id, &mut summary);
            kept_exercises.insert(performed_id);
            let exercise_id = match self.workout_exercises.get(&performed_id) {
                Some(stored) => stored.exercise_id,
                None => performed.exercise_id,
            };
            performed.exercise_id = exercise_id;
            self.workout_exercises.insert(
                performed_id,
                WorkoutExerciseRow {
                    id: performed_id,
                    workout_id,
                    exercise_id,
                    exercise_name: performed.exercise_name.clone(),
                    display_order: performed.display_order,
                    memo: performed.memo.clone(),
                },
            );
            for set in performed.sets_mut().iter_mut() {
                let set_id = self.assign(&mut set.id, &mut summary);
                kept_sets.insert(set_id);
                self.workout_sets.insert(
                    set_id,
                    WorkoutSetRow {
                        id: set_id,
                        workout_exercise_id: performed_id,
                        display_order: set.display_order,
                        weight_kg: set.weight_kg,
                        reps: set.reps,
                        distance_meter: set.distance_meter,
                        duration_second: set.duration_second,
                    },
                );
            }
        }

        let exercise_ids: BTreeSet<RecordId> = self
            .workout_exercises
            .values()
            .filter(|row| row.workout_id == workout_id)
            .map(|row| row.id)
            .collect();
        let orphan_sets: Vec<RecordId> = self
            .workout_sets
            .values()
            .filter(|row| {
                exercise_ids.contains(&row.workout_exercise_id) && !kept_sets.contains(&row.id)
            })
            .map(|row| row.id)
            .collect();
        for id in orphan_sets {
            self.workout_sets.remove(&id);
            summary.deleted += 1;
        }
        for id in exercise_ids.difference(&kept_exercises) {
            self.workout_exercises.remove(id);
            summary.deleted += 1;
        }

        debug!("flushed workout {workout_id}: {summary:?}");
        Ok(summary)
    }

    /// Deletes an exercise with its instructions. Returns `false` when absent.
    pub fn delete_exercise(&mut self, id: RecordId) -> Result<bool> {
        if !self.exercises.contains_key(&id) {
            return Ok(false);
        }
        let referenced_by = self
            .routine_exercises
            .values()
            .filter(|slot| slot.exercise_id == id)
            .count();
        if referenced_by > 0 {
            return Err(AppError::conflict(format!(
                "exercise {id} is used by {referenced_by} routine exercise(s)"
            )));
        }
        self.exercises.remove(&id);
        self.exercise_instructions.retain(|_, row| row.exercise_id != id);
        // Recorded workouts keep the name they were stored with.
        for performed in self.workout_exercises.values_mut() {
            if performed.exercise_id == Some(id) {
                performed.exercise_id = None;
            }
        }
        Ok(true)
    }

    /// Deletes a routine with its slots and their sets. Returns `false` when absent.
    pub fn delete_routine(&mut self, id: RecordId) -> bool {
        if self.routines.remove(&id).is_none() {
            return false;
        }
        let slot_ids: HashSet<RecordId> = self
            .routine_exercises
            .values()
            .filter(|slot| slot.routine_id == id)
            .map(|slot| slot.id)
            .collect();
        self.routine_sets
            .retain(|_, set| !slot_ids.contains(&set.routine_exercise_id));
        self.routine_exercises.retain(|_, slot| slot.routine_id != id);
        true
    }

    /// Deletes a workout with its exercises and their sets. Returns `false` when absent.
    pub fn delete_workout(&mut self, id: RecordId) -> bool {
        if self.workouts.remove(&id).is_none() {
            return false;
        }
        let performed_ids: HashSet<RecordId> = self
            .workout_exercises
            .values()
            .filter(|performed| performed.workout_id == id)
            .map(|performed| performed.id)
            .collect();
        self.workout_sets
            .retain(|_, set| !performed_ids.contains(&set.workout_exercise_id));
        self.workout_exercises
            .retain(|_, performed| performed.workout_id != id);
        true
    }

    pub fn missing_exercises<'a>(&self, ids: impl IntoIterator<Item = &'a RecordId>) -> Vec<RecordId> {
        ids.into_iter()
            .filter(|id| !self.exercises.contains_key(id))
            .copied()
            .collect()
    }

    fn assign(&mut self, id: &mut Option<RecordId>, summary: &mut FlushSummary) -> RecordId {
        match *id {
            Some(existing) => {
                summary.updated += 1;
                existing
            }
            None => {
                let fresh = self.allocate_id();
                *id = Some(fresh);
                summary.inserted += 1;
                fresh
            }
        }
    }
}

/// A persisted child may only be written back under the parent that owns its row.
fn ensure_child_of(
    stored_parent: Option<RecordId>,
    parent: Option<RecordId>,
    kind: &str,
    id: RecordId,
) -> Result<()> {
    match stored_parent {
        Some(stored) if Some(stored) == parent => Ok(()),
        Some(stored) => Err(AppError::Internal(format!(
            "{kind} {id} belongs to parent {stored}, not {parent:?}"
        ))),
        None => Err(AppError::Internal(format!("{kind} {id} has no stored row"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::InstructionDraft;
    use crate::reconcile::{ChildEntity, ChildSpec};

    fn saved_exercise(tables: &mut Tables, name: &str, steps: &[&str]) -> Exercise {
        let mut exercise = Exercise::new(name, "Legs");
        let specs: Vec<_> = steps
            .iter()
            .map(|step| ChildSpec::new(InstructionDraft::new(*step)))
            .collect();
        exercise.sync_instructions(&specs).unwrap();
        tables.flush_exercise(&mut exercise).unwrap();
        exercise
    }

    #[test]
    fn flush_assigns_ids_from_one_sequence() {
        let mut tables = Tables::default();
        let exercise = saved_exercise(&mut tables, "Squat", &["Brace", "Descend"]);

        assert_eq!(exercise.id(), Some(1));
        assert_eq!(exercise.instructions().ids(), vec![2, 3]);
        assert_eq!(tables.next_id, 3);
    }

    #[test]
    fn duplicate_exercise_name_is_a_conflict() {
        let mut tables = Tables::default();
        saved_exercise(&mut tables, "Squat", &[]);

        let mut twin = Exercise::new("Squat", "Legs");
        let err = tables.flush_exercise(&mut twin).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(twin.id(), None);
    }

    #[test]
    fn loaded_children_are_attached_and_ordered() {
        let mut tables = Tables::default();
        let exercise = saved_exercise(&mut tables, "Lunge", &["Step", "Drop", "Drive"]);

        let loaded = tables.load_exercise(exercise.id().unwrap()).unwrap().unwrap();
        let key = loaded.instructions().owner_key();
        assert!(loaded.instructions().iter().all(|step| step.owner() == Some(key)));
        let orders: Vec<i32> = loaded.instructions().iter().map(|step| step.step_order()).collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }
}
