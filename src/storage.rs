//! JSON persistence adapter for the snapshot.
//!
//! One pretty-printed JSON document at a configurable path holds the whole
//! application state. Loading is tolerant: a missing or corrupt file falls
//! back to the seed snapshot. Writing is atomic (temp file + rename) and
//! write failures are returned to the caller, never swallowed.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use log::warn;
use serde_json::Value;
use thiserror::Error;

use crate::snapshot::{Snapshot, SCHEMA_VERSION};

/// Failures the adapter surfaces to callers.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("import rejected: {0}")]
    InvalidImport(String),
}

/// File-backed store for a single [`Snapshot`].
#[derive(Debug, Clone)]
pub struct JsonStorage {
    path: PathBuf,
}

impl JsonStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonStorage { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted snapshot. A missing, unreadable or unparsable file
    /// yields the seed snapshot; an older schema version is migrated before
    /// returning.
    pub fn load(&self) -> Snapshot {
        if !self.path.exists() {
            return Snapshot::seed();
        }
        let mut buf = String::new();
        match File::open(&self.path).and_then(|mut f| f.read_to_string(&mut buf)) {
            Ok(_) => match serde_json::from_str::<Snapshot>(&buf) {
                Ok(snapshot) if snapshot.version < SCHEMA_VERSION => migrate(snapshot),
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(
                        "snapshot at {} is not parsable ({e}); starting from seed data",
                        self.path.display()
                    );
                    Snapshot::seed()
                }
            },
            Err(e) => {
                warn!(
                    "could not read snapshot at {} ({e}); starting from seed data",
                    self.path.display()
                );
                Snapshot::seed()
            }
        }
    }

    /// Serialize and write the whole snapshot, replacing any prior value.
    /// The write goes through a temp file and a rename so a crash cannot
    /// leave a half-written document behind.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        let data = serde_json::to_string_pretty(snapshot).map_err(StorageError::Serialize)?;
        let tmp = self.path.with_extension("json.tmp");
        let write_tmp = || -> std::io::Result<()> {
            let mut f = File::create(&tmp)?;
            f.write_all(data.as_bytes())?;
            f.flush()?;
            Ok(())
        };
        write_tmp().map_err(|source| StorageError::Write {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &self.path).map_err(|source| StorageError::Write {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Pretty-printed serialization of the *persisted* snapshot. Reads
    /// through [`JsonStorage::load`], not any in-memory copy.
    pub fn export_text(&self) -> Result<String, StorageError> {
        serde_json::to_string_pretty(&self.load()).map_err(StorageError::Serialize)
    }

    /// Parse `text` as a snapshot document and persist it wholesale, with the
    /// version forced to current. Rejects documents missing any of the
    /// `tasks`, `projects` or `settings` collections; nothing is persisted on
    /// failure.
    pub fn import_text(&self, text: &str) -> Result<Snapshot, StorageError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| StorageError::InvalidImport(format!("not valid JSON: {e}")))?;
        for key in ["tasks", "projects", "settings"] {
            if value.get(key).is_none() {
                return Err(StorageError::InvalidImport(format!(
                    "missing `{key}` collection"
                )));
            }
        }
        let mut snapshot: Snapshot = serde_json::from_value(value)
            .map_err(|e| StorageError::InvalidImport(format!("unexpected document shape: {e}")))?;
        snapshot.version = SCHEMA_VERSION;
        self.save(&snapshot)?;
        Ok(snapshot)
    }

    /// Delete the stored document entirely. Missing file counts as cleared.
    pub fn clear(&self) -> Result<(), StorageError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Schema upgrade hook. Nothing to rewrite between the versions that exist
/// so far; normalizes the version stamp.
fn migrate(snapshot: Snapshot) -> Snapshot {
    Snapshot {
        version: SCHEMA_VERSION,
        ..snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{TaskPriority, TaskStatus};
    use crate::project::DEFAULT_PROJECT_ID;
    use crate::task::Task;
    use tempfile::TempDir;

    fn storage_in(dir: &TempDir) -> JsonStorage {
        JsonStorage::new(dir.path().join("data.json"))
    }

    fn sample_snapshot() -> Snapshot {
        let mut snapshot = Snapshot::seed();
        snapshot.tasks.push(Task {
            id: "t1".to_string(),
            title: "带提示词的任务".to_string(),
            description: Some("desc".to_string()),
            status: TaskStatus::InProgress,
            priority: TaskPriority::High,
            prompt: Some("please {{do}}".to_string()),
            project_id: Some(DEFAULT_PROJECT_ID.to_string()),
            parent_id: None,
            order: 0,
            created_at: 100,
            updated_at: 200,
            completed_at: None,
        });
        snapshot
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().expect("temp dir");
        let storage = storage_in(&dir);
        let snapshot = sample_snapshot();
        storage.save(&snapshot).expect("save succeeds");
        assert_eq!(storage.load(), snapshot);
    }

    #[test]
    fn load_missing_file_yields_seed() {
        let dir = TempDir::new().expect("temp dir");
        let storage = storage_in(&dir);
        let loaded = storage.load();
        assert_eq!(loaded.projects[0].id, DEFAULT_PROJECT_ID);
        assert_eq!(loaded.templates.len(), 3);
    }

    #[test]
    fn load_corrupt_file_yields_seed() {
        let dir = TempDir::new().expect("temp dir");
        let storage = storage_in(&dir);
        fs::write(storage.path(), "{not json").expect("write corrupt file");
        let loaded = storage.load();
        assert_eq!(loaded.projects[0].id, DEFAULT_PROJECT_ID);
    }

    #[test]
    fn load_migrates_older_versions_to_current() {
        let dir = TempDir::new().expect("temp dir");
        let storage = storage_in(&dir);
        let mut snapshot = sample_snapshot();
        snapshot.version = 0;
        let data = serde_json::to_string(&snapshot).expect("serialize");
        fs::write(storage.path(), data).expect("write old snapshot");
        let loaded = storage.load();
        assert_eq!(loaded.version, SCHEMA_VERSION);
        assert_eq!(loaded.tasks, snapshot.tasks);
    }

    #[test]
    fn import_rejects_document_missing_projects_and_keeps_prior_data() {
        let dir = TempDir::new().expect("temp dir");
        let storage = storage_in(&dir);
        let before = sample_snapshot();
        storage.save(&before).expect("save succeeds");

        let result = storage.import_text(r#"{"tasks": [], "settings": {}}"#);
        assert!(matches!(result, Err(StorageError::InvalidImport(_))));
        assert_eq!(storage.load(), before);
    }

    #[test]
    fn import_rejects_non_json_text() {
        let dir = TempDir::new().expect("temp dir");
        let storage = storage_in(&dir);
        assert!(storage.import_text("definitely not json").is_err());
        assert!(!storage.path().exists());
    }

    #[test]
    fn import_forces_version_to_current_and_persists() {
        let dir = TempDir::new().expect("temp dir");
        let storage = storage_in(&dir);
        let text = r#"{"tasks": [], "projects": [], "templates": [], "settings": {"themeMode": "dark", "colorTheme": "teal", "activeProjectId": null}, "version": 0}"#;
        let imported = storage.import_text(text).expect("import succeeds");
        assert_eq!(imported.version, SCHEMA_VERSION);
        assert_eq!(storage.load().version, SCHEMA_VERSION);
    }

    #[test]
    fn export_reads_through_the_persisted_state() {
        let dir = TempDir::new().expect("temp dir");
        let storage = storage_in(&dir);
        storage.save(&sample_snapshot()).expect("save succeeds");
        let text = storage.export_text().expect("export succeeds");
        assert!(text.contains("带提示词的任务"));
        assert!(text.contains("\"settings\""));
    }

    #[test]
    fn clear_removes_the_stored_file_and_tolerates_absence() {
        let dir = TempDir::new().expect("temp dir");
        let storage = storage_in(&dir);
        storage.save(&sample_snapshot()).expect("save succeeds");
        storage.clear().expect("clear succeeds");
        assert!(!storage.path().exists());
        storage.clear().expect("clearing again is fine");
    }
}
