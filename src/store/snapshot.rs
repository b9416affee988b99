use super::tables::Tables;
use crate::core::{AppError, Result};
use log::{debug, info};
use std::path::{Path, PathBuf};
use tokio::fs;

pub(crate) const SNAPSHOT_FILE_NAME: &str = "fitsync.snapshot.json";

pub(crate) fn snapshot_path(data_dir: &Path) -> PathBuf {
    data_dir.join(SNAPSHOT_FILE_NAME)
}

/// Reads the snapshot in `data_dir`, or empty tables when none was written yet.
pub(crate) async fn load_tables(data_dir: &Path) -> Result<Tables> {
    let path = snapshot_path(data_dir);
    if !fs::try_exists(&path).await? {
        debug!("no snapshot at {}, starting empty", path.display());
        return Ok(Tables::default());
    }

    let bytes = fs::read(&path).await.map_err(|err| {
        AppError::IoError(format!("failed to read snapshot '{}': {err}", path.display()))
    })?;
    let tables: Tables = serde_json::from_slice(&bytes).map_err(|err| {
        AppError::Internal(format!("corrupt snapshot '{}': {err}", path.display()))
    })?;
    info!(
        "loaded snapshot {}: {} exercises, {} routines",
        path.display(),
        tables.exercises.len(),
        tables.routines.len()
    );
    Ok(tables)
}

pub(crate) async fn write_tables(data_dir: &Path, tables: &Tables) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(tables)?;
    atomic_write(&snapshot_path(data_dir), &bytes).await
}

async fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.map_err(|err| {
            AppError::IoError(format!(
                "failed to create data directory '{}': {err}",
                parent.display()
            ))
        })?;
    }

    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).await.map_err(|err| {
        AppError::IoError(format!("failed to write '{}': {err}", tmp.display()))
    })?;
    fs::rename(&tmp, path).await.map_err(|err| {
        AppError::IoError(format!(
            "failed to move '{}' to '{}': {err}",
            tmp.display(),
            path.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_snapshot_loads_empty_tables() {
        let dir = tempfile::tempdir().unwrap();
        let tables = load_tables(dir.path()).await.unwrap();
        assert!(tables.exercises.is_empty());
        assert_eq!(tables.next_id, 0);
    }

    #[tokio::test]
    async fn written_snapshot_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let tables = Tables {
            next_id: 41,
            ..Tables::default()
        };
        write_tables(dir.path(), &tables).await.unwrap();

        assert!(!snapshot_path(dir.path()).with_extension("tmp").exists());
        assert_eq!(load_tables(dir.path()).await.unwrap().next_id, 41);
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(snapshot_path(dir.path()), b"{not json").unwrap();
        let err = load_tables(dir.path()).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(message) if message.contains("corrupt")));
    }

    #[tokio::test]
    async fn snapshot_without_workout_tables_still_loads() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            snapshot_path(dir.path()),
            br#"{"next_id":7,"exercises":{},"exercise_instructions":{},"routines":{},"routine_exercises":{},"routine_sets":{}}"#,
        )
        .unwrap();

        let tables = load_tables(dir.path()).await.unwrap();
        assert_eq!(tables.next_id, 7);
        assert!(tables.workouts.is_empty());
    }
}
