use std::ops::{Add, AddAssign};

/// Insert/update/remove counters for one collection level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileCounts {
    pub inserted: usize,
    pub updated: usize,
    pub removed: usize,
}

impl ReconcileCounts {
    pub fn new(inserted: usize, updated: usize, removed: usize) -> Self {
        Self {
            inserted,
            updated,
            removed,
        }
    }

    /// True when no child was created or deleted.
    pub fn is_structurally_unchanged(&self) -> bool {
        self.inserted == 0 && self.removed == 0
    }
}

impl Add for ReconcileCounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            inserted: self.inserted + rhs.inserted,
            updated: self.updated + rhs.updated,
            removed: self.removed + rhs.removed,
        }
    }
}

impl AddAssign for ReconcileCounts {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// Outcome of a successful reconciliation.
///
/// `children` counts the reconciled collection itself; `nested` sums every
/// second-level pass (sets inside routine-exercise slots).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileResult {
    pub children: ReconcileCounts,
    pub nested: ReconcileCounts,
}

impl ReconcileResult {
    pub fn inserted(&self) -> usize {
        self.children.inserted
    }

    pub fn updated(&self) -> usize {
        self.children.updated
    }

    pub fn removed(&self) -> usize {
        self.children.removed
    }

    pub fn total(&self) -> ReconcileCounts {
        self.children + self.nested
    }
}
