use fitsync::core::{Patch, RecordId};
use fitsync::domain::{
    Exercise, ExerciseRef, MetricRequirement, Routine, RoutineExerciseDraft, SetDraft,
};
use fitsync::reconcile::{ChildSpec, ReconcileCounts, ReconcileError, ReferenceResolver};
use fitsync::store::MemoryStore;
use std::cell::Cell;
use std::collections::{BTreeSet, HashMap};

fn catalog_entry(id: RecordId, name: &str) -> ExerciseRef {
    ExerciseRef {
        id,
        name: name.to_string(),
        category: "Strength".to_string(),
        metric_requirement: MetricRequirement::strength(),
    }
}

fn catalog() -> HashMap<RecordId, ExerciseRef> {
    HashMap::from([
        (1, catalog_entry(1, "Bench Press")),
        (2, catalog_entry(2, "Overhead Press")),
        (3, catalog_entry(3, "Dip")),
    ])
}

/// Counts how many batches the reconciler asked for.
struct CountingCatalog {
    inner: HashMap<RecordId, ExerciseRef>,
    calls: Cell<usize>,
    last_batch: Cell<usize>,
}

impl ReferenceResolver for CountingCatalog {
    type Target = ExerciseRef;

    fn resolve_all(&self, ids: &BTreeSet<RecordId>) -> HashMap<RecordId, ExerciseRef> {
        self.calls.set(self.calls.get() + 1);
        self.last_batch.set(ids.len());
        self.inner.resolve_all(ids)
    }
}

fn set(weight_kg: f64, reps: i32) -> ChildSpec<SetDraft> {
    ChildSpec::new(SetDraft {
        weight_kg: Patch::Value(weight_kg),
        reps: Patch::Value(reps),
        ..SetDraft::default()
    })
}

fn slot(sets: Vec<ChildSpec<SetDraft>>) -> ChildSpec<RoutineExerciseDraft> {
    ChildSpec::new(RoutineExerciseDraft {
        memo: Patch::Missing,
        sets: Patch::Value(sets),
    })
}

fn set_rows(routine: &Routine) -> Vec<Vec<(Option<RecordId>, i32, Option<f64>, Option<i32>)>> {
    routine
        .exercises()
        .iter()
        .map(|slot| {
            slot.sets()
                .iter()
                .map(|set| (set.id(), set.display_order(), set.weight_kg(), set.reps()))
                .collect()
        })
        .collect()
}

/// Persists a push routine: Bench (2 sets) then Overhead Press (1 set).
async fn saved_push_routine(store: &MemoryStore) -> Routine {
    for name in ["Bench Press", "Overhead Press", "Dip"] {
        let mut exercise = Exercise::new(name, "Strength");
        exercise.set_metric_requirement(MetricRequirement::strength());
        store.save_exercise(&mut exercise).await.unwrap();
    }

    let mut routine = Routine::new(7, "Push", 1);
    {
        let catalog = store.catalog().await;
        routine
            .sync_exercises(
                &[
                    slot(vec![set(60.0, 8), set(70.0, 6)]).with_reference(1),
                    slot(vec![set(40.0, 10)]).with_reference(2),
                ],
                &catalog,
            )
            .unwrap();
    }
    store.save_routine(&mut routine).await.unwrap();
    routine
}

#[test]
fn create_builds_both_levels_with_contiguous_order() {
    let mut routine = Routine::new(7, "Push", 1);

    let result = routine
        .sync_exercises(
            &[
                slot(vec![set(60.0, 8), set(70.0, 6).with_order(1)]).with_reference(1),
                slot(Vec::new()).with_reference(3).with_order(1),
            ],
            &catalog(),
        )
        .unwrap();

    assert_eq!(result.children, ReconcileCounts::new(2, 0, 0));
    assert_eq!(result.nested, ReconcileCounts::new(2, 0, 0));

    let names: Vec<&str> = routine
        .exercises()
        .iter()
        .map(|slot| slot.exercise().name.as_str())
        .collect();
    assert_eq!(names, vec!["Dip", "Bench Press"]);
    assert_eq!(
        set_rows(&routine)[1],
        vec![(None, 1, Some(70.0), Some(6)), (None, 2, Some(60.0), Some(8))]
    );
    let key = routine.exercises().owner_key();
    assert!(routine.exercises().iter().all(|slot| {
        fitsync::ChildEntity::owner(slot) == Some(key)
    }));
}

#[test]
fn references_are_resolved_in_a_single_batch() {
    let resolver = CountingCatalog {
        inner: catalog(),
        calls: Cell::new(0),
        last_batch: Cell::new(0),
    };
    let mut routine = Routine::new(7, "Push", 1);

    routine
        .sync_exercises(
            &[
                slot(Vec::new()).with_reference(1),
                slot(Vec::new()).with_reference(2),
                slot(Vec::new()).with_reference(1),
                slot(Vec::new()).with_reference(3),
            ],
            &resolver,
        )
        .unwrap();

    assert_eq!(resolver.calls.get(), 1);
    assert_eq!(resolver.last_batch.get(), 3);
    assert_eq!(routine.exercises().len(), 4);
}

#[test]
fn specs_without_references_skip_the_resolver() {
    let resolver = CountingCatalog {
        inner: catalog(),
        calls: Cell::new(0),
        last_batch: Cell::new(0),
    };
    let mut routine = Routine::new(7, "Empty", 1);

    routine.sync_exercises(&[], &resolver).unwrap();

    assert_eq!(resolver.calls.get(), 0);
}

#[test]
fn new_slot_without_exercise_is_rejected() {
    let mut routine = Routine::new(7, "Push", 1);

    let err = routine
        .sync_exercises(
            &[slot(Vec::new()).with_reference(1), slot(Vec::new())],
            &catalog(),
        )
        .unwrap_err();

    assert_eq!(err, ReconcileError::MissingReference { position: 1 });
    assert!(routine.exercises().is_empty());
}

#[test]
fn first_unresolved_reference_in_submission_order_is_reported() {
    let mut routine = Routine::new(7, "Push", 1);

    let err = routine
        .sync_exercises(
            &[
                slot(Vec::new()).with_reference(1),
                slot(Vec::new()).with_reference(30),
                slot(Vec::new()).with_reference(20),
            ],
            &catalog(),
        )
        .unwrap_err();

    assert_eq!(err, ReconcileError::UnresolvedReference(30));
    assert!(routine.exercises().is_empty());
}

#[tokio::test]
async fn nested_update_reconciles_slots_then_sets() {
    let store = MemoryStore::in_memory();
    let mut routine = saved_push_routine(&store).await;
    let bench = &routine.exercises().as_slice()[0];
    let bench_id = bench.id().unwrap();
    let first_set = bench.sets().as_slice()[0].id().unwrap();

    let catalog = store.catalog().await;
    let result = routine
        .sync_exercises(
            &[
                slot(vec![
                    set(62.5, 8).with_id(first_set),
                    set(80.0, 3),
                ])
                .with_id(bench_id),
                slot(vec![set(0.0, 12)]).with_reference(3),
            ],
            &catalog,
        )
        .unwrap();
    drop(catalog);

    // Overhead Press slot removed; bench keeps set 1, drops set 2, gains one.
    assert_eq!(result.children, ReconcileCounts::new(1, 1, 1));
    assert_eq!(result.nested, ReconcileCounts::new(2, 1, 1));
    assert_eq!(
        set_rows(&routine),
        vec![
            vec![(Some(first_set), 1, Some(62.5), Some(8)), (None, 2, Some(80.0), Some(3))],
            vec![(None, 1, Some(0.0), Some(12))],
        ]
    );
    assert_eq!(routine.exercises().as_slice()[1].exercise().name, "Dip");
}

#[tokio::test]
async fn omitted_sets_leave_a_slot_untouched() {
    let store = MemoryStore::in_memory();
    let mut routine = saved_push_routine(&store).await;
    let slot_ids = routine.exercises().ids();
    let before = set_rows(&routine);

    let specs: Vec<ChildSpec<RoutineExerciseDraft>> = slot_ids
        .iter()
        .map(|id| {
            ChildSpec::new(RoutineExerciseDraft {
                memo: Patch::Value("keep sets".to_string()),
                sets: Patch::Missing,
            })
            .with_id(*id)
        })
        .collect();
    let catalog = store.catalog().await;
    let result = routine.sync_exercises(&specs, &catalog).unwrap();

    assert_eq!(result.nested, ReconcileCounts::default());
    assert_eq!(set_rows(&routine), before);
    assert!(routine.exercises().iter().all(|slot| slot.memo() == Some("keep sets")));
}

#[tokio::test]
async fn inner_failure_leaves_the_whole_routine_unchanged() {
    let store = MemoryStore::in_memory();
    let mut routine = saved_push_routine(&store).await;
    let before = routine.clone();
    let slot_ids = routine.exercises().ids();
    let foreign_set = routine.exercises().as_slice()[1].sets().ids()[0];

    let catalog = store.catalog().await;
    let err = routine
        .sync_exercises(
            &[
                slot(vec![set(100.0, 1)]).with_id(slot_ids[1]).with_order(1),
                // A set of the second slot submitted under the first one.
                slot(vec![set(1.0, 1).with_id(foreign_set)]).with_id(slot_ids[0]),
                slot(Vec::new()).with_reference(3),
            ],
            &catalog,
        )
        .unwrap_err();

    assert_eq!(err, ReconcileError::UnknownChildIdentity(foreign_set));
    assert_eq!(routine, before);
}

#[tokio::test]
async fn set_identity_under_a_new_slot_is_unknown() {
    let store = MemoryStore::in_memory();
    let mut routine = saved_push_routine(&store).await;
    let before = routine.clone();
    let existing_set = routine.exercises().as_slice()[0].sets().ids()[0];

    let catalog = store.catalog().await;
    let err = routine
        .sync_exercises(
            &[slot(vec![set(60.0, 8).with_id(existing_set)]).with_reference(2)],
            &catalog,
        )
        .unwrap_err();

    assert_eq!(err, ReconcileError::UnknownChildIdentity(existing_set));
    assert_eq!(routine, before);
}

#[tokio::test]
async fn rebinding_a_slot_keeps_its_sets() {
    let store = MemoryStore::in_memory();
    let mut routine = saved_push_routine(&store).await;
    let press = routine.exercises().as_slice()[1].id().unwrap();
    let before = set_rows(&routine)[1].clone();

    let catalog = store.catalog().await;
    routine
        .sync_exercises(
            &[ChildSpec::new(RoutineExerciseDraft::default())
                .with_id(press)
                .with_reference(3)],
            &catalog,
        )
        .unwrap();

    let rebound = &routine.exercises().as_slice()[0];
    assert_eq!(rebound.exercise().id, 3);
    assert_eq!(set_rows(&routine)[0], before);
}
