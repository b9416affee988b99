use crate::core::RecordId;
use thiserror::Error;

/// Validation and consistency failures of one reconciliation call.
///
/// None of these are transient. Every variant except `AlreadyOwned` and
/// `ChildIdentityTaken` is raised before the parent collection is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("Duplicate child identity in request: id={0}")]
    DuplicateChildIdentity(RecordId),

    #[error("Child does not belong to this parent: id={0}")]
    UnknownChildIdentity(RecordId),

    #[error("Referenced entity not found: id={0}")]
    UnresolvedReference(RecordId),

    #[error("New child at position {position} requires a reference")]
    MissingReference { position: usize },

    #[error("Invalid child payload: {0}")]
    InvalidPayload(String),

    /// Caller bug: a child attached to one collection was handed to another.
    #[error("Child is already owned by another parent (child id={child:?})")]
    AlreadyOwned { child: Option<RecordId> },

    /// Caller bug: a second child with the same persisted id was attached.
    #[error("Collection already holds a child with id={0}")]
    ChildIdentityTaken(RecordId),
}

impl ReconcileError {
    /// True for errors caused by request input rather than a programming error.
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            Self::AlreadyOwned { .. } | Self::ChildIdentityTaken(_)
        )
    }
}
