use super::collection::{ChildEntity, ParentAggregate};
use super::error::ReconcileError;
use super::resolver::ReferenceResolver;
use super::result::{ReconcileCounts, ReconcileResult};
use super::spec::ChildSpec;
use crate::core::{Patch, RecordId};
use log::debug;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Stateless owned-collection reconciler.
///
/// Pipeline: validate → resolve references → walk → nested pass → renumber →
/// commit. Everything before the commit works on detached copies of the
/// children, so any error leaves the parent exactly as it was.
pub struct Reconciler;

struct Placed<'s, C: ChildEntity> {
    position: usize,
    spec: &'s ChildSpec<C::Payload>,
    child: C,
}

impl Reconciler {
    /// Makes `parent`'s children match `specs` exactly.
    ///
    /// An empty `specs` deletes every child. Callers that mean "leave the
    /// collection alone" must not call this at all; see [`Self::reconcile_patch`].
    pub fn reconcile<P, C, R>(
        parent: &mut P,
        specs: &[ChildSpec<C::Payload>],
        resolver: &R,
    ) -> Result<ReconcileResult, ReconcileError>
    where
        P: ParentAggregate<C> + ?Sized,
        C: ChildEntity,
        R: ReferenceResolver<Target = C::Reference> + ?Sized,
    {
        validate_identities(specs)?;
        validate_required_references::<C>(specs)?;

        let mut existing_by_id: HashMap<RecordId, C> = HashMap::new();
        let mut unaddressable = 0usize;
        for child in parent.children() {
            match child.id() {
                Some(id) => {
                    existing_by_id.insert(id, child.clone());
                }
                None => unaddressable += 1,
            }
        }

        let refs_by_id = resolve_references(specs, resolver)?;

        let mut counts = ReconcileCounts::default();
        let mut next: Vec<Placed<'_, C>> = Vec::with_capacity(specs.len());
        for (position, spec) in specs.iter().enumerate() {
            let reference = spec.reference.and_then(|id| refs_by_id.get(&id));
            let child = match spec.id {
                None => {
                    counts.inserted += 1;
                    C::create(&spec.payload, reference)?
                }
                Some(id) => {
                    let mut child = existing_by_id
                        .remove(&id)
                        .ok_or(ReconcileError::UnknownChildIdentity(id))?;
                    child.apply(&spec.payload, reference)?;
                    counts.updated += 1;
                    child
                }
            };
            next.push(Placed {
                position,
                spec,
                child,
            });
        }

        // Outer identities are settled; only now descend one level.
        let mut nested = ReconcileCounts::default();
        for placed in &mut next {
            nested += placed.child.reconcile_nested(&placed.spec.payload)?;
        }

        let mut removed_ids: Vec<RecordId> = existing_by_id.into_keys().collect();
        removed_ids.sort_unstable();
        counts.removed = removed_ids.len() + unaddressable;

        next.sort_by_key(|placed| (placed.spec.order.is_none(), placed.spec.order, placed.position));
        let next: Vec<C> = next
            .into_iter()
            .enumerate()
            .map(|(index, placed)| {
                let mut child = placed.child;
                child.set_order(i32::try_from(index + 1).unwrap_or(i32::MAX));
                child
            })
            .collect();

        let children = parent.children_mut();
        for child in &next {
            children.ensure_attachable(child)?;
        }
        for id in &removed_ids {
            children.remove_child(*id);
        }
        children.replace_all(next)?;

        debug!(
            "reconciled collection {}: inserted={} updated={} removed={} nested={:?}",
            children.owner_key().get(),
            counts.inserted,
            counts.updated,
            counts.removed,
            nested
        );

        Ok(ReconcileResult {
            children: counts,
            nested,
        })
    }

    /// Reconciles only when the collection field was actually sent.
    ///
    /// `Missing` and `Null` leave the collection untouched and return `None`;
    /// an empty list deletes every child.
    pub fn reconcile_patch<P, C, R>(
        parent: &mut P,
        specs: &Patch<Vec<ChildSpec<C::Payload>>>,
        resolver: &R,
    ) -> Result<Option<ReconcileResult>, ReconcileError>
    where
        P: ParentAggregate<C> + ?Sized,
        C: ChildEntity,
        R: ReferenceResolver<Target = C::Reference> + ?Sized,
    {
        match specs {
            Patch::Value(specs) => Self::reconcile(parent, specs, resolver).map(Some),
            Patch::Missing | Patch::Null => Ok(None),
        }
    }
}

fn validate_identities<P>(specs: &[ChildSpec<P>]) -> Result<(), ReconcileError> {
    let mut seen = HashSet::with_capacity(specs.len());
    for id in specs.iter().filter_map(|spec| spec.id) {
        if !seen.insert(id) {
            return Err(ReconcileError::DuplicateChildIdentity(id));
        }
    }
    Ok(())
}

fn validate_required_references<C: ChildEntity>(
    specs: &[ChildSpec<C::Payload>],
) -> Result<(), ReconcileError> {
    if !C::REFERENCE_REQUIRED_ON_CREATE {
        return Ok(());
    }
    match specs
        .iter()
        .position(|spec| spec.is_new() && spec.reference.is_none())
    {
        Some(position) => Err(ReconcileError::MissingReference { position }),
        None => Ok(()),
    }
}

fn resolve_references<P, R>(
    specs: &[ChildSpec<P>],
    resolver: &R,
) -> Result<HashMap<RecordId, R::Target>, ReconcileError>
where
    R: ReferenceResolver + ?Sized,
{
    let wanted: BTreeSet<RecordId> = specs.iter().filter_map(|spec| spec.reference).collect();
    if wanted.is_empty() {
        return Ok(HashMap::new());
    }

    let resolved = resolver.resolve_all(&wanted);
    if let Some(missing) = specs
        .iter()
        .filter_map(|spec| spec.reference)
        .find(|id| !resolved.contains_key(id))
    {
        return Err(ReconcileError::UnresolvedReference(missing));
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_duplicate_identity_is_reported() {
        let specs = vec![
            ChildSpec::new(()).with_id(3),
            ChildSpec::new(()).with_id(5),
            ChildSpec::new(()),
            ChildSpec::new(()).with_id(5),
            ChildSpec::new(()).with_id(3),
        ];
        assert_eq!(
            validate_identities(&specs),
            Err(ReconcileError::DuplicateChildIdentity(5))
        );
    }

    #[test]
    fn absent_identities_never_collide() {
        let specs = vec![ChildSpec::new(()), ChildSpec::new(())];
        assert!(validate_identities(&specs).is_ok());
    }

    #[test]
    fn unresolved_reference_follows_submission_order() {
        let known: HashMap<RecordId, &str> = HashMap::from([(1, "Bench Press")]);
        let specs = vec![
            ChildSpec::new(()).with_reference(1),
            ChildSpec::new(()).with_reference(30),
            ChildSpec::new(()).with_reference(20),
        ];
        assert_eq!(
            resolve_references(&specs, &known).unwrap_err(),
            ReconcileError::UnresolvedReference(30)
        );
    }
}
