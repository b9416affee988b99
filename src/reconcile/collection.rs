use super::error::ReconcileError;
use super::result::ReconcileCounts;
use crate::core::RecordId;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of one owned collection, used as the child's back-reference.
///
/// Keys are minted per process and never persisted: they link a child to the
/// collection holding it even before either side has a database id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerKey(u64);

impl OwnerKey {
    pub fn mint() -> Self {
        static NEXT_OWNER_KEY: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_OWNER_KEY.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// A record owned by exactly one parent collection.
pub trait ChildEntity: Clone {
    /// Scalar fields supplied by a `ChildSpec`.
    type Payload;
    /// Live object a spec's foreign reference resolves to.
    type Reference: Clone;

    /// Whether a new child must carry a foreign reference.
    const REFERENCE_REQUIRED_ON_CREATE: bool = false;

    fn id(&self) -> Option<RecordId>;

    fn owner(&self) -> Option<OwnerKey>;

    /// Only `OwnedChildren` should call this; it keeps both link halves in sync.
    fn set_owner(&mut self, owner: Option<OwnerKey>);

    fn order(&self) -> i32;

    fn set_order(&mut self, order: i32);

    /// Builds a detached child from a spec payload.
    fn create(
        payload: &Self::Payload,
        reference: Option<&Self::Reference>,
    ) -> Result<Self, ReconcileError>;

    /// Updates scalar fields in place; `reference` is `Some` only when the
    /// spec named one.
    fn apply(
        &mut self,
        payload: &Self::Payload,
        reference: Option<&Self::Reference>,
    ) -> Result<(), ReconcileError>;

    /// Second-level pass, run after every identity at this level is resolved.
    fn reconcile_nested(&mut self, _payload: &Self::Payload) -> Result<ReconcileCounts, ReconcileError> {
        Ok(ReconcileCounts::default())
    }
}

/// Ordered child collection owned by a parent aggregate.
///
/// `add_child`, `remove_child` and `replace_all` are the only mutation paths,
/// so every member always points back at this collection and no persisted id
/// appears twice.
///
/// A clone is a snapshot of the same collection: it keeps the owner key, so
/// its children still point at the original. Aggregates are cloned to compare
/// or roll back state, never to fork a second live owner.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedChildren<C> {
    key: OwnerKey,
    items: Vec<C>,
}

impl<C: ChildEntity> Default for OwnedChildren<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ChildEntity> OwnedChildren<C> {
    pub fn new() -> Self {
        Self {
            key: OwnerKey::mint(),
            items: Vec::new(),
        }
    }

    /// Builds a collection from already materialized children (store loads).
    pub fn with_children<I>(children: I) -> Result<Self, ReconcileError>
    where
        I: IntoIterator<Item = C>,
    {
        let mut collection = Self::new();
        for child in children {
            collection.add_child(child)?;
        }
        Ok(collection)
    }

    pub fn owner_key(&self) -> OwnerKey {
        self.key
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, C> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[C] {
        &self.items
    }

    pub fn get(&self, id: RecordId) -> Option<&C> {
        self.items.iter().find(|child| child.id() == Some(id))
    }

    pub fn ids(&self) -> Vec<RecordId> {
        self.items.iter().filter_map(ChildEntity::id).collect()
    }

    /// Mutable access for persistence bookkeeping (id assignment on flush).
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, C> {
        self.items.iter_mut()
    }

    pub fn add_child(&mut self, mut child: C) -> Result<(), ReconcileError> {
        self.ensure_attachable(&child)?;
        if let Some(id) = child.id()
            && self.get(id).is_some()
        {
            return Err(ReconcileError::ChildIdentityTaken(id));
        }
        child.set_owner(Some(self.key));
        self.items.push(child);
        Ok(())
    }

    /// Detaches and returns the child with `id`; absent ids are a no-op.
    pub fn remove_child(&mut self, id: RecordId) -> Option<C> {
        let index = self.items.iter().position(|child| child.id() == Some(id))?;
        let mut child = self.items.remove(index);
        child.set_owner(None);
        Some(child)
    }

    /// Replaces the whole content in one step: clear, then add in order.
    ///
    /// Every incoming child is checked before anything is cleared, so a
    /// failure leaves the collection as it was.
    pub fn replace_all(&mut self, next: Vec<C>) -> Result<(), ReconcileError> {
        let mut seen = HashSet::new();
        for child in &next {
            self.ensure_attachable(child)?;
            if let Some(id) = child.id()
                && !seen.insert(id)
            {
                return Err(ReconcileError::ChildIdentityTaken(id));
            }
        }

        for mut dropped in std::mem::take(&mut self.items) {
            dropped.set_owner(None);
        }
        for mut child in next {
            child.set_owner(Some(self.key));
            self.items.push(child);
        }
        Ok(())
    }

    pub(crate) fn ensure_attachable(&self, child: &C) -> Result<(), ReconcileError> {
        match child.owner() {
            Some(owner) if owner != self.key => {
                Err(ReconcileError::AlreadyOwned { child: child.id() })
            }
            _ => Ok(()),
        }
    }
}

impl<'a, C> IntoIterator for &'a OwnedChildren<C> {
    type Item = &'a C;
    type IntoIter = std::slice::Iter<'a, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// An aggregate that owns one reconcilable child collection.
pub trait ParentAggregate<C: ChildEntity> {
    fn children(&self) -> &OwnedChildren<C>;

    fn children_mut(&mut self) -> &mut OwnedChildren<C>;
}

impl<C: ChildEntity> ParentAggregate<C> for OwnedChildren<C> {
    fn children(&self) -> &OwnedChildren<C> {
        self
    }

    fn children_mut(&mut self) -> &mut OwnedChildren<C> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Note {
        id: Option<RecordId>,
        owner: Option<OwnerKey>,
        order: i32,
        text: String,
    }

    impl Note {
        fn persisted(id: RecordId, text: &str) -> Self {
            Self {
                id: Some(id),
                owner: None,
                order: 0,
                text: text.to_string(),
            }
        }
    }

    impl ChildEntity for Note {
        type Payload = String;
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
            self.order
        }

        fn set_order(&mut self, order: i32) {
            self.order = order;
        }

        fn create(payload: &String, _reference: Option<&()>) -> Result<Self, ReconcileError> {
            Ok(Self {
                id: None,
                owner: None,
                order: 0,
                text: payload.clone(),
            })
        }

        fn apply(&mut self, payload: &String, _reference: Option<&()>) -> Result<(), ReconcileError> {
            self.text = payload.clone();
            Ok(())
        }
    }

    #[test]
    fn add_child_sets_back_reference() {
        let mut notes = OwnedChildren::new();
        notes.add_child(Note::persisted(1, "a")).unwrap();

        let child = notes.get(1).unwrap();
        assert_eq!(child.owner(), Some(notes.owner_key()));
    }

    #[test]
    fn add_child_owned_elsewhere_is_rejected() {
        let mut first = OwnedChildren::new();
        first.add_child(Note::persisted(1, "a")).unwrap();
        let stolen = first.get(1).cloned().unwrap();

        let mut second = OwnedChildren::new();
        let err = second.add_child(stolen).unwrap_err();
        assert_eq!(err, ReconcileError::AlreadyOwned { child: Some(1) });
        assert!(second.is_empty());
    }

    #[test]
    fn remove_child_clears_back_reference() {
        let mut notes = OwnedChildren::with_children([Note::persisted(1, "a")]).unwrap();
        let removed = notes.remove_child(1).unwrap();
        assert_eq!(removed.owner(), None);
        assert!(notes.is_empty());
    }

    #[test]
    fn remove_absent_child_is_noop() {
        let mut notes = OwnedChildren::with_children([Note::persisted(1, "a")]).unwrap();
        assert!(notes.remove_child(42).is_none());
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn replace_all_checks_every_child_before_clearing() {
        let mut other = OwnedChildren::new();
        other.add_child(Note::persisted(9, "foreign")).unwrap();
        let foreign = other.get(9).cloned().unwrap();

        let mut notes = OwnedChildren::with_children([Note::persisted(1, "a")]).unwrap();
        let err = notes
            .replace_all(vec![Note::persisted(2, "b"), foreign])
            .unwrap_err();

        assert!(matches!(err, ReconcileError::AlreadyOwned { .. }));
        assert_eq!(notes.ids(), vec![1]);
    }

    #[test]
    fn with_children_rejects_repeated_id() {
        let err = OwnedChildren::with_children([Note::persisted(1, "a"), Note::persisted(1, "b")])
            .unwrap_err();
        assert_eq!(err, ReconcileError::ChildIdentityTaken(1));
    }

    #[test]
    fn add_child_rejects_id_already_held() {
        let mut notes = OwnedChildren::with_children([Note::persisted(1, "a")]).unwrap();

        let err = notes.add_child(Note::persisted(1, "again")).unwrap_err();

        assert_eq!(err, ReconcileError::ChildIdentityTaken(1));
        assert_eq!(notes.len(), 1);
        assert_eq!(notes.get(1).map(|note| note.text.as_str()), Some("a"));
    }

    #[test]
    fn unsaved_children_never_collide() {
        let mut notes = OwnedChildren::new();
        notes.add_child(Note::create(&"x".to_string(), None).unwrap()).unwrap();
        notes.add_child(Note::create(&"y".to_string(), None).unwrap()).unwrap();
        assert_eq!(notes.len(), 2);
    }

    #[test]
    fn replace_all_rejects_repeated_id() {
        let mut notes = OwnedChildren::with_children([Note::persisted(1, "a")]).unwrap();

        let err = notes
            .replace_all(vec![Note::persisted(2, "b"), Note::persisted(2, "c")])
            .unwrap_err();

        assert_eq!(err, ReconcileError::ChildIdentityTaken(2));
        assert_eq!(notes.ids(), vec![1]);
    }

    #[test]
    fn clone_is_a_snapshot_sharing_the_owner_key() {
        let notes = OwnedChildren::with_children([Note::persisted(1, "a")]).unwrap();

        let copy = notes.clone();

        assert_eq!(copy, notes);
        assert_eq!(copy.owner_key(), notes.owner_key());
        assert_eq!(copy.get(1).and_then(|note| note.owner()), Some(notes.owner_key()));
    }
}
