//! Tasks-file load/save.
//!
//! A missing or unreadable-as-JSON file loads as an empty repository so a
//! fresh or damaged workspace still starts. A file that parses but carries
//! an unknown schema version fails closed instead, so a newer tool's data
//! is never silently rewritten.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use deck_core::{Repository, SCHEMA_VERSION};

use crate::error::StoreError;

pub fn load_repository(path: &Path) -> Result<Repository, StoreError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Ok(Repository::default());
        }
        Err(err) => return Err(StoreError::io(path, err)),
    };

    let value: serde_json::Value = match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "tasks file is not valid JSON, starting empty");
            return Ok(Repository::default());
        }
    };

    let Some(found) = value.get("version").and_then(serde_json::Value::as_u64) else {
        tracing::warn!(path = %path.display(), "tasks file has no version field, starting empty");
        return Ok(Repository::default());
    };
    if found != u64::from(SCHEMA_VERSION) {
        return Err(StoreError::UnsupportedVersion { found });
    }

    match serde_json::from_value::<Repository>(value) {
        Ok(mut repository) => {
            repository.normalize_ranks();
            Ok(repository)
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "tasks file does not match the schema, starting empty");
            Ok(Repository::default())
        }
    }
}

/// Write the full repository via a temp file in the same directory, fsync,
/// then rename over the target. Readers never observe a partial file.
pub fn save_repository(path: &Path, repository: &Repository) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|err| StoreError::io(parent, err))?;
    }

    let payload = serde_json::to_vec_pretty(repository)?;
    write_atomic(path, &payload)
}

/// Atomic whole-file replacement, also used for requirement documents.
pub fn write_atomic(path: &Path, payload: &[u8]) -> Result<(), StoreError> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| StoreError::Validation(format!("invalid file path: {}", path.display())))?;
    let tmp = path.with_file_name(format!("{file_name}.tmp.{}", std::process::id()));

    let mut file = File::create(&tmp).map_err(|err| StoreError::io(&tmp, err))?;
    file.write_all(payload)
        .map_err(|err| StoreError::io(&tmp, err))?;
    file.sync_all().map_err(|err| StoreError::io(&tmp, err))?;
    drop(file);

    fs::rename(&tmp, path).map_err(|err| StoreError::io(path, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::TaskStatus;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_as_empty_repository() {
        let tmp = TempDir::new().unwrap();
        let repo = load_repository(&tmp.path().join("tasks.json")).unwrap();
        assert!(repo.tasks.is_empty());
        assert_eq!(repo.version, SCHEMA_VERSION);
    }

    #[test]
    fn corrupt_file_loads_as_empty_repository() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tasks.json");
        fs::write(&path, "{ not json").unwrap();
        let repo = load_repository(&path).unwrap();
        assert!(repo.tasks.is_empty());
    }

    #[test]
    fn future_version_fails_closed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tasks.json");
        fs::write(&path, r#"{"version": 2, "tasks": [], "features": []}"#).unwrap();
        let err = load_repository(&path).expect_err("must fail closed");
        assert!(matches!(err, StoreError::UnsupportedVersion { found: 2 }));
    }

    #[test]
    fn save_then_load_round_trips() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("tasks.json");

        let mut repo = Repository::default();
        repo.create_task("Fix header", None, None, None);
        repo.create_task("Add logout", Some("session teardown".to_string()), None, None);
        save_repository(&path, &repo).unwrap();

        let loaded = load_repository(&path).unwrap();
        assert_eq!(loaded, repo);
        assert_eq!(loaded.tasks[0].status, TaskStatus::Todo);
    }

    #[test]
    fn save_leaves_no_temp_file_behind() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tasks.json");
        save_repository(&path, &Repository::default()).unwrap();

        let names = fs::read_dir(tmp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["tasks.json".to_string()]);
    }

    #[test]
    fn load_normalizes_foreign_rank_gaps() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tasks.json");
        fs::write(
            &path,
            r#"{
                "version": 1,
                "tasks": [
                    {"id": "T2", "title": "b", "status": "todo", "rank": 10,
                     "created_at": "2026-01-02T00:00:00Z", "updated_at": "2026-01-02T00:00:00Z"},
                    {"id": "T1", "title": "a", "status": "todo", "rank": 3,
                     "created_at": "2026-01-01T00:00:00Z", "updated_at": "2026-01-01T00:00:00Z"}
                ],
                "features": []
            }"#,
        )
        .unwrap();

        let repo = load_repository(&path).unwrap();
        let ordered = repo
            .tasks_sorted(None, None)
            .into_iter()
            .map(|task| (task.id.0, task.rank))
            .collect::<Vec<_>>();
        assert_eq!(ordered, vec![("T1".to_string(), 0), ("T2".to_string(), 1)]);
    }
}
