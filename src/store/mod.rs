//! In-memory persistence for exercises, routines and workouts.
//!
//! Aggregates are loaded as detached values, reconciled by the caller and
//! handed back to `save_*`, which flushes parent and children under one write
//! lock and deletes child rows the aggregate no longer holds. With a data
//! directory configured, all tables are snapshotted to JSON every
//! `snapshot_every_ops` committed writes.

mod catalog;
mod locks;
mod snapshot;
mod tables;

pub use catalog::CatalogView;
pub use locks::{AggregateKey, AggregateLocks};
pub use tables::FlushSummary;

use crate::core::{AppError, Page, RecordId, Result};
use crate::domain::{Exercise, Routine, Workout};
use crate::models::{ExerciseSummary, RoutineSummary, WorkoutSummary};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tables::Tables;
use tokio::sync::{RwLock, RwLockWriteGuard};

pub const DEFAULT_SNAPSHOT_EVERY_OPS: u64 = 50;

#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub data_dir: Option<PathBuf>,
    pub snapshot_every_ops: u64,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            data_dir: None,
            snapshot_every_ops: DEFAULT_SNAPSHOT_EVERY_OPS,
        }
    }
}

pub(crate) struct StoreState {
    tables: Tables,
    ops_since_snapshot: u64,
}

/// Point-in-time counters of a `MemoryStore`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub exercises: usize,
    pub routines: usize,
    pub workouts: usize,
    pub flushes: u64,
    /// Number of `resolve_all` calls served by catalog views.
    pub reference_batches: u64,
    pub snapshots_written: u64,
    pub snapshot_failures: u64,
    pub ops_since_snapshot: u64,
}

impl fmt::Display for StoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StoreStats {{ exercises: {}, routines: {}, workouts: {}, flushes: {}, reference_batches: {}, snapshots: {} ({} failed) }}",
            self.exercises,
            self.routines,
            self.workouts,
            self.flushes,
            self.reference_batches,
            self.snapshots_written,
            self.snapshot_failures
        )
    }
}

pub struct MemoryStore {
    state: RwLock<StoreState>,
    locks: AggregateLocks,
    options: StoreOptions,
    flushes: AtomicU64,
    reference_batches: AtomicU64,
    snapshots_written: AtomicU64,
    snapshot_failures: AtomicU64,
}

impl MemoryStore {
    /// Store without a data directory; nothing survives the process.
    pub fn in_memory() -> Self {
        Self::with_tables(Tables::default(), StoreOptions::default())
    }

    /// Opens the store, loading the snapshot from `options.data_dir` if present.
    pub async fn open(options: StoreOptions) -> Result<Self> {
        let tables = match &options.data_dir {
            Some(dir) => snapshot::load_tables(dir).await?,
            None => Tables::default(),
        };
        Ok(Self::with_tables(tables, options))
    }

    fn with_tables(tables: Tables, options: StoreOptions) -> Self {
        Self {
            state: RwLock::new(StoreState {
                tables,
                ops_since_snapshot: 0,
            }),
            locks: AggregateLocks::new(),
            options,
            flushes: AtomicU64::new(0),
            reference_batches: AtomicU64::new(0),
            snapshots_written: AtomicU64::new(0),
            snapshot_failures: AtomicU64::new(0),
        }
    }

    pub fn locks(&self) -> &AggregateLocks {
        &self.locks
    }

    /// Batched exercise lookup for routine and workout reconciliation.
    pub async fn catalog(&self) -> CatalogView<'_> {
        CatalogView {
            state: self.state.read().await,
            batches: &self.reference_batches,
        }
    }

    pub async fn load_exercise(&self, id: RecordId) -> Result<Option<Exercise>> {
        self.state.read().await.tables.load_exercise(id)
    }

    pub async fn load_routine(&self, id: RecordId) -> Result<Option<Routine>> {
        self.state.read().await.tables.load_routine(id)
    }

    pub async fn load_workout(&self, id: RecordId) -> Result<Option<Workout>> {
        self.state.read().await.tables.load_workout(id)
    }

    pub async fn save_exercise(&self, exercise: &mut Exercise) -> Result<FlushSummary> {
        let mut state = self.state.write().await;
        let summary = state.tables.flush_exercise(exercise)?;
        self.after_commit(&mut state).await;
        Ok(summary)
    }

    pub async fn save_routine(&self, routine: &mut Routine) -> Result<FlushSummary> {
        let mut state = self.state.write().await;
        let summary = state.tables.flush_routine(routine)?;
        self.after_commit(&mut state).await;
        Ok(summary)
    }

    pub async fn save_workout(&self, workout: &mut Workout) -> Result<FlushSummary> {
        let mut state = self.state.write().await;
        let summary = state.tables.flush_workout(workout)?;
        self.after_commit(&mut state).await;
        Ok(summary)
    }

    pub async fn delete_exercise(&self, id: RecordId) -> Result<bool> {
        let mut state = self.state.write().await;
        let deleted = state.tables.delete_exercise(id)?;
        if deleted {
            self.after_commit(&mut state).await;
        }
        Ok(deleted)
    }

    pub async fn delete_routine(&self, id: RecordId) -> Result<bool> {
        let mut state = self.state.write().await;
        let deleted = state.tables.delete_routine(id);
        if deleted {
            self.after_commit(&mut state).await;
        }
        Ok(deleted)
    }

    pub async fn delete_workout(&self, id: RecordId) -> Result<bool> {
        let mut state = self.state.write().await;
        let deleted = state.tables.delete_workout(id);
        if deleted {
            self.after_commit(&mut state).await;
        }
        Ok(deleted)
    }

    /// Shows `activate` and hides `deactivate` in one write. Fails with
    /// `NotFound` before any change if an id does not exist.
    pub async fn set_hidden(
        &self,
        activate: &[RecordId],
        deactivate: &[RecordId],
    ) -> Result<(usize, usize)> {
        let mut state = self.state.write().await;
        let missing = state
            .tables
            .missing_exercises(activate.iter().chain(deactivate));
        if let Some(first) = missing.first() {
            return Err(AppError::not_found("exercise", first));
        }

        let now = Utc::now();
        for (ids, hidden) in [(activate, false), (deactivate, true)] {
            for id in ids {
                if let Some(row) = state.tables.exercises.get_mut(id)
                    && row.is_hidden != hidden
                {
                    row.is_hidden = hidden;
                    row.updated_at = now;
                }
            }
        }
        self.after_commit(&mut state).await;

        let distinct = |ids: &[RecordId]| ids.iter().collect::<HashSet<_>>().len();
        Ok((distinct(activate), distinct(deactivate)))
    }

    /// Applies `(routine id, display order)` pairs in one write. Fails with
    /// `NotFound` before any change if a routine does not exist.
    pub async fn reorder_routines(&self, entries: &[(RecordId, i32)]) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some((id, _)) = entries
            .iter()
            .find(|(id, _)| !state.tables.routines.contains_key(id))
        {
            return Err(AppError::not_found("routine", id));
        }

        let now = Utc::now();
        for (id, display_order) in entries {
            if let Some(row) = state.tables.routines.get_mut(id) {
                row.display_order = *display_order;
                row.updated_at = now;
            }
        }
        self.after_commit(&mut state).await;
        Ok(())
    }

    /// Exercise summaries sorted by name.
    pub async fn list_exercises(&self, page: u32, size: u32) -> Page<ExerciseSummary> {
        let state = self.state.read().await;
        let mut items: Vec<ExerciseSummary> = state
            .tables
            .exercises
            .values()
            .map(|row| ExerciseSummary {
                id: row.id,
                name: row.name.clone(),
                category: row.category.clone(),
                is_hidden: row.is_hidden,
            })
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Page::from_sorted(items, page, size)
    }

    /// Routine summaries of one owner sorted by display order.
    pub async fn list_routines(&self, owner_id: RecordId, page: u32, size: u32) -> Page<RoutineSummary> {
        let state = self.state.read().await;
        let mut items: Vec<RoutineSummary> = state
            .tables
            .routines
            .values()
            .filter(|row| row.owner_id == owner_id)
            .map(|row| RoutineSummary {
                id: row.id,
                owner_id: row.owner_id,
                name: row.name.clone(),
                display_order: row.display_order,
                memo: row.memo.clone(),
                created_at: row.created_at,
                updated_at: row.updated_at,
            })
            .collect();
        items.sort_by_key(|routine| (routine.display_order, routine.id));
        Page::from_sorted(items, page, size)
    }

    /// Workout summaries of one owner, newest first.
    pub async fn list_workouts(&self, owner_id: RecordId, page: u32, size: u32) -> Page<WorkoutSummary> {
        let items = self.workout_summaries(owner_id, |_| true).await;
        Page::from_sorted(items, page, size)
    }

    /// Workouts of one owner created in `[start, end)`, newest first.
    pub async fn list_workouts_between(
        &self,
        owner_id: RecordId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<WorkoutSummary> {
        self.workout_summaries(owner_id, |created_at| start <= created_at && created_at < end)
            .await
    }

    async fn workout_summaries(
        &self,
        owner_id: RecordId,
        created_in: impl Fn(DateTime<Utc>) -> bool,
    ) -> Vec<WorkoutSummary> {
        let state = self.state.read().await;
        let mut items: Vec<WorkoutSummary> = state
            .tables
            .workouts
            .values()
            .filter(|row| row.owner_id == owner_id && created_in(row.created_at))
            .map(|row| WorkoutSummary {
                id: row.id,
                title: row.title.clone(),
                created_at: row.created_at,
            })
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        items
    }

    /// Writes a snapshot now, regardless of the operation counter.
    pub async fn flush_snapshot(&self) -> Result<()> {
        let Some(dir) = &self.options.data_dir else {
            return Ok(());
        };
        let mut state = self.state.write().await;
        snapshot::write_tables(dir, &state.tables).await?;
        state.ops_since_snapshot = 0;
        self.snapshots_written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub async fn stats(&self) -> StoreStats {
        let state = self.state.read().await;
        StoreStats {
            exercises: state.tables.exercises.len(),
            routines: state.tables.routines.len(),
            workouts: state.tables.workouts.len(),
            flushes: self.flushes.load(Ordering::Relaxed),
            reference_batches: self.reference_batches.load(Ordering::Relaxed),
            snapshots_written: self.snapshots_written.load(Ordering::Relaxed),
            snapshot_failures: self.snapshot_failures.load(Ordering::Relaxed),
            ops_since_snapshot: state.ops_since_snapshot,
        }
    }

    /// Counts the committed write and snapshots when due. A failed snapshot
    /// does not undo the write; it is retried on the next commit.
    async fn after_commit(&self, state: &mut RwLockWriteGuard<'_, StoreState>) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
        state.ops_since_snapshot += 1;

        let Some(dir) = &self.options.data_dir else {
            return;
        };
        if state.ops_since_snapshot < self.options.snapshot_every_ops.max(1) {
            return;
        }
        match snapshot::write_tables(dir, &state.tables).await {
            Ok(()) => {
                debug!("snapshot written after {} ops", state.ops_since_snapshot);
                state.ops_since_snapshot = 0;
                self.snapshots_written.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) => {
                warn!("snapshot to {} failed: {err}", dir.display());
                self.snapshot_failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
