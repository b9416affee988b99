use crate::core::RecordId;
use std::collections::{BTreeSet, HashMap};

/// Batched lookup of cross-aggregate references named by child specs.
///
/// Ids that do not exist are simply absent from the returned map; the
/// reconciler turns absence into `UnresolvedReference`. Implementations must
/// answer the whole set with one underlying lookup.
pub trait ReferenceResolver {
    type Target: Clone;

    fn resolve_all(&self, ids: &BTreeSet<RecordId>) -> HashMap<RecordId, Self::Target>;
}

/// Resolver for child types without foreign references.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReferences;

impl ReferenceResolver for NoReferences {
    type Target = ();

    fn resolve_all(&self, _ids: &BTreeSet<RecordId>) -> HashMap<RecordId, ()> {
        HashMap::new()
    }
}

/// A prefetched id map is itself a resolver.
impl<T: Clone> ReferenceResolver for HashMap<RecordId, T> {
    type Target = T;

    fn resolve_all(&self, ids: &BTreeSet<RecordId>) -> HashMap<RecordId, T> {
        ids.iter()
            .filter_map(|id| self.get(id).map(|target| (*id, target.clone())))
            .collect()
    }
}

impl<R: ReferenceResolver + ?Sized> ReferenceResolver for &R {
    type Target = R::Target;

    fn resolve_all(&self, ids: &BTreeSet<RecordId>) -> HashMap<RecordId, Self::Target> {
        (**self).resolve_all(ids)
    }
}
