//! Owned-collection reconciliation.
//!
//! Given a parent aggregate with an ordered child collection and a submitted
//! list of [`ChildSpec`]s, [`Reconciler::reconcile`] inserts new children,
//! updates existing ones by identity, deletes the ones no longer listed and
//! renumbers display order to `1..N`. Malformed input (duplicate identities,
//! identities owned by another parent, unknown references) is rejected before
//! the parent is modified.

mod collection;
mod error;
mod reconciler;
mod resolver;
mod result;
mod spec;

pub use collection::{ChildEntity, OwnedChildren, OwnerKey, ParentAggregate};
pub use error::ReconcileError;
pub use reconciler::Reconciler;
pub use resolver::{NoReferences, ReferenceResolver};
pub use result::{ReconcileCounts, ReconcileResult};
pub use spec::ChildSpec;
