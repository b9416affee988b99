use fitsync::domain::{ExerciseInstruction, InstructionDraft};
use fitsync::reconcile::{
    ChildEntity, ChildSpec, NoReferences, OwnedChildren, ReconcileCounts, ReconcileError,
    Reconciler,
};

fn instructions(steps: &[(i64, &str)]) -> OwnedChildren<ExerciseInstruction> {
    OwnedChildren::with_children(steps.iter().enumerate().map(|(index, (id, text))| {
        ExerciseInstruction::restore(*id, index as i32 + 1, *text)
    }))
    .unwrap()
}

fn step(text: &str) -> ChildSpec<InstructionDraft> {
    ChildSpec::new(InstructionDraft::new(text))
}

fn snapshot(collection: &OwnedChildren<ExerciseInstruction>) -> Vec<(Option<i64>, i32, String)> {
    collection
        .iter()
        .map(|child| (child.id(), child.step_order(), child.description().to_string()))
        .collect()
}

#[test]
fn revised_step_moves_up_new_step_appended_and_missing_step_removed() {
    let mut steps = instructions(&[(1, "step A"), (2, "step B")]);

    let result = Reconciler::reconcile(
        &mut steps,
        &[step("step B revised").with_id(2), step("step C")],
        &NoReferences,
    )
    .unwrap();

    assert_eq!(result.children, ReconcileCounts::new(1, 1, 1));
    assert_eq!(
        snapshot(&steps),
        vec![
            (Some(2), 1, "step B revised".to_string()),
            (None, 2, "step C".to_string()),
        ]
    );
    let key = steps.owner_key();
    assert!(steps.iter().all(|child| child.owner() == Some(key)));
}

#[test]
fn duplicate_identity_fails_and_leaves_parent_untouched() {
    let mut steps = instructions(&[(5, "hinge"), (6, "lockout")]);
    let before = steps.clone();

    let err = Reconciler::reconcile(
        &mut steps,
        &[step("x").with_id(5), step("y").with_id(5)],
        &NoReferences,
    )
    .unwrap_err();

    assert_eq!(err, ReconcileError::DuplicateChildIdentity(5));
    assert_eq!(steps, before);
}

#[test]
fn identity_owned_by_another_parent_is_unknown_here() {
    let mut parent_a = instructions(&[(1, "a1")]);
    let parent_b = instructions(&[(9, "b9")]);
    let before = parent_a.clone();

    let err =
        Reconciler::reconcile(&mut parent_a, &[step("stolen").with_id(9)], &NoReferences)
            .unwrap_err();

    assert_eq!(err, ReconcileError::UnknownChildIdentity(9));
    assert_eq!(parent_a, before);
    assert_eq!(parent_b.get(9).unwrap().description(), "b9");
}

#[test]
fn empty_spec_list_removes_every_child() {
    let mut steps = instructions(&[(1, "a"), (2, "b"), (3, "c")]);

    let result = Reconciler::reconcile(&mut steps, &[], &NoReferences).unwrap();

    assert_eq!(result.removed(), 3);
    assert!(steps.is_empty());
}

#[test]
fn second_identical_reconcile_is_structurally_a_noop() {
    let mut steps = instructions(&[(1, "a"), (2, "b"), (3, "c")]);
    let specs = vec![
        step("c").with_id(3),
        step("a").with_id(1).with_order(2),
        step("b").with_id(2).with_order(1),
    ];

    Reconciler::reconcile(&mut steps, &specs, &NoReferences).unwrap();
    let after_first = snapshot(&steps);
    let second = Reconciler::reconcile(&mut steps, &specs, &NoReferences).unwrap();

    assert!(second.children.is_structurally_unchanged());
    assert_eq!(second.updated(), 3);
    assert_eq!(snapshot(&steps), after_first);
}

#[test]
fn order_hints_sort_first_and_unhinted_specs_keep_submission_order() {
    let mut steps: OwnedChildren<ExerciseInstruction> = OwnedChildren::new();

    Reconciler::reconcile(
        &mut steps,
        &[
            step("third").with_order(30),
            step("fourth"),
            step("first").with_order(-4),
            step("fifth"),
            step("second").with_order(30),
        ],
        &NoReferences,
    )
    .unwrap();

    let texts: Vec<&str> = steps.iter().map(ExerciseInstruction::description).collect();
    assert_eq!(texts, vec!["first", "third", "second", "fourth", "fifth"]);
    let orders: Vec<i32> = steps.iter().map(ExerciseInstruction::step_order).collect();
    assert_eq!(orders, vec![1, 2, 3, 4, 5]);
}

#[test]
fn result_matches_spec_list_one_to_one() {
    let mut steps = instructions(&[(10, "a"), (11, "b"), (12, "c"), (13, "d")]);
    let specs = vec![
        step("d").with_id(13),
        step("new 1"),
        step("b").with_id(11),
        step("new 2"),
    ];

    Reconciler::reconcile(&mut steps, &specs, &NoReferences).unwrap();

    assert_eq!(steps.len(), specs.len());
    assert_eq!(steps.ids(), vec![13, 11]);
    for (child, spec) in steps.iter().zip(&specs) {
        assert_eq!(child.id(), spec.id);
        assert_eq!(child.description(), spec.payload.description);
    }
}

#[test]
fn invalid_payload_mid_list_leaves_parent_untouched() {
    let mut steps = instructions(&[(1, "a"), (2, "b")]);
    let before = steps.clone();

    let err = Reconciler::reconcile(
        &mut steps,
        &[step("a2").with_id(1), step("   ")],
        &NoReferences,
    )
    .unwrap_err();

    assert!(matches!(err, ReconcileError::InvalidPayload(_)));
    assert_eq!(steps, before);
}

#[test]
fn unflushed_children_cannot_be_addressed_and_are_dropped() {
    let mut steps: OwnedChildren<ExerciseInstruction> = OwnedChildren::new();
    Reconciler::reconcile(&mut steps, &[step("draft")], &NoReferences).unwrap();
    assert_eq!(steps.ids(), Vec::<i64>::new());

    let result = Reconciler::reconcile(&mut steps, &[step("replacement")], &NoReferences).unwrap();

    assert_eq!(result.children, ReconcileCounts::new(1, 0, 1));
    assert_eq!(steps.len(), 1);
    assert_eq!(steps.iter().next().unwrap().description(), "replacement");
}

#[test]
fn absent_patch_does_not_invoke_reconciler() {
    let mut steps = instructions(&[(1, "a")]);
    let before = steps.clone();

    let missing = Reconciler::reconcile_patch(&mut steps, &fitsync::Patch::Missing, &NoReferences)
        .unwrap();
    let null = Reconciler::reconcile_patch(&mut steps, &fitsync::Patch::Null, &NoReferences)
        .unwrap();

    assert!(missing.is_none());
    assert!(null.is_none());
    assert_eq!(steps, before);

    let emptied =
        Reconciler::reconcile_patch(&mut steps, &fitsync::Patch::Value(Vec::new()), &NoReferences)
            .unwrap();
    assert_eq!(emptied.map(|result| result.removed()), Some(1));
}
