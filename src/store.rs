//! File-backed persistence for the task list.
//!
//! The whole list is read on every load and rewritten on every save. Saves go
//! through a temp file in the same directory followed by a rename, so the task
//! file is always either the old or the new document.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::Level;

use crate::db::TaskList;
use crate::error::StoreError;
use crate::logging::Diagnostics;

pub struct TaskStore<'a> {
    path: PathBuf,
    diag: &'a dyn Diagnostics,
}

impl<'a> TaskStore<'a> {
    pub fn new(path: impl Into<PathBuf>, diag: &'a dyn Diagnostics) -> Self {
        TaskStore {
            path: path.into(),
            diag,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the task list. A missing file is an empty list, not an error.
    pub fn load(&self) -> Result<TaskList, StoreError> {
        let path = self.path.display();
        let exists = self.path.try_exists().map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        });
        let exists = match exists {
            Ok(exists) => exists,
            Err(e) => {
                self.diag.log(Level::ERROR, "Failed to load tasks", &[("error", &e)]);
                return Err(e);
            }
        };
        if !exists {
            self.diag.log(
                Level::INFO,
                "Task file does not exist, starting with an empty list",
                &[("path", &path)],
            );
            return Ok(TaskList::default());
        }

        match self.read() {
            Ok(tasks) => {
                let count = tasks.len();
                self.diag.log(
                    Level::INFO,
                    "Tasks loaded",
                    &[("path", &path), ("count", &count)],
                );
                Ok(tasks)
            }
            Err(e) => {
                self.diag.log(Level::ERROR, "Failed to load tasks", &[("error", &e)]);
                Err(e)
            }
        }
    }

    fn read(&self) -> Result<TaskList, StoreError> {
        let mut buf = String::new();
        File::open(&self.path)
            .and_then(|mut f| f.read_to_string(&mut buf))
            .map_err(|source| StoreError::Read {
                path: self.path.clone(),
                source,
            })?;

        if buf.trim().is_empty() {
            return Ok(TaskList::default());
        }

        let tasks: Option<TaskList> =
            serde_json::from_str(&buf).map_err(|source| StoreError::Parse {
                path: self.path.clone(),
                source,
            })?;
        let tasks = tasks.unwrap_or_default();

        if tasks.has_zero_id() {
            return Err(StoreError::ZeroId {
                path: self.path.clone(),
            });
        }
        if let Some(id) = tasks.duplicate_id() {
            return Err(StoreError::DuplicateId {
                path: self.path.clone(),
                id,
            });
        }
        Ok(tasks)
    }

    /// Overwrite the task file with the full list, pretty-printed.
    pub fn save(&self, tasks: &TaskList) -> Result<(), StoreError> {
        match self.write(tasks) {
            Ok(()) => {
                let count = tasks.len();
                self.diag.log(
                    Level::INFO,
                    "Tasks saved",
                    &[("path", &self.path.display()), ("count", &count)],
                );
                Ok(())
            }
            Err(e) => {
                self.diag.log(Level::ERROR, "Failed to save tasks", &[("error", &e)]);
                Err(e)
            }
        }
    }

    fn write(&self, tasks: &TaskList) -> Result<(), StoreError> {
        let data = serde_json::to_string_pretty(tasks).map_err(StoreError::Encode)?;
        let write_err = |source| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir).map_err(write_err)?;
            }
        }

        let tmp = self.tmp_path();
        let result = File::create(&tmp)
            .and_then(|mut f| {
                f.write_all(data.as_bytes())?;
                f.flush()?;
                f.sync_all()
            })
            .and_then(|_| fs::rename(&tmp, &self.path));

        if let Err(source) = result {
            let _ = fs::remove_file(&tmp);
            return Err(write_err(source));
        }
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Run one command as a load, mutate, save cycle.
    ///
    /// `f` returns its result plus whether it changed the list; the file is
    /// only rewritten when it did. If the save fails the change is dropped.
    pub fn modify<T>(
        &self,
        f: impl FnOnce(&mut TaskList) -> (T, bool),
    ) -> Result<T, StoreError> {
        let mut tasks = self.load()?;
        let (out, changed) = f(&mut tasks);
        if changed {
            self.save(&tasks)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Completion;
    use crate::logging::testing::Recorder;
    use crate::task::Task;
    use tempfile::TempDir;

    fn sample() -> TaskList {
        let mut list = TaskList::new(vec![
            Task::new(1, "Buy milk"),
            Task::new(3, "Call mom"),
            Task::new(2, "Пойти в магазин"),
        ]);
        list.complete(3);
        list
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let rec = Recorder::default();
        let store = TaskStore::new(dir.path().join("Tasks.json"), &rec);

        let tasks = store.load().unwrap();
        assert!(tasks.is_empty());
        assert!(!store.path().exists());
        assert_eq!(
            rec.events()[0].message,
            "Task file does not exist, starting with an empty list"
        );
    }

    #[test]
    fn test_empty_and_null_content_load_empty() {
        let dir = TempDir::new().unwrap();
        let rec = Recorder::default();
        let store = TaskStore::new(dir.path().join("Tasks.json"), &rec);

        for content in ["", "  \n", "null"] {
            fs::write(store.path(), content).unwrap();
            assert!(store.load().unwrap().is_empty(), "content {content:?}");
        }
    }

    #[test]
    fn test_round_trip_preserves_everything() {
        let dir = TempDir::new().unwrap();
        let rec = Recorder::default();
        let store = TaskStore::new(dir.path().join("Tasks.json"), &rec);

        let tasks = sample();
        store.save(&tasks).unwrap();
        assert_eq!(store.load().unwrap(), tasks);
        assert!(!dir.path().join("Tasks.json.tmp").exists());
    }

    #[test]
    fn test_saved_file_is_indented_array() {
        let dir = TempDir::new().unwrap();
        let rec = Recorder::default();
        let store = TaskStore::new(dir.path().join("Tasks.json"), &rec);

        store.save(&TaskList::new(vec![Task::new(1, "Buy milk")])).unwrap();
        let text = fs::read_to_string(store.path()).unwrap();
        assert!(text.starts_with("[\n  {\n"));
        assert!(text.contains("\"Id\": 1"));
        assert!(text.contains("\"Name\": \"Buy milk\""));
        assert!(text.contains("\"IsCompleted\": false"));
    }

    #[test]
    fn test_reads_pascal_case_files_with_nulls() {
        let dir = TempDir::new().unwrap();
        let rec = Recorder::default();
        let store = TaskStore::new(dir.path().join("Tasks.json"), &rec);
        fs::write(
            store.path(),
            r#"[
  { "Id": 1, "Name": "Buy milk", "IsCompleted": true },
  { "Id": 2, "Name": null, "IsCompleted": false }
]"#,
        )
        .unwrap();

        let tasks = store.load().unwrap();
        assert_eq!(tasks.len(), 2);
        assert!(tasks.find(1).unwrap().completed);
        assert_eq!(tasks.find(2).unwrap().name, "");
    }

    #[test]
    fn test_corrupt_file_is_load_failure() {
        let dir = TempDir::new().unwrap();
        let rec = Recorder::default();
        let store = TaskStore::new(dir.path().join("Tasks.json"), &rec);

        for content in ["[{\"Id\": 1,", "{\"Id\": 1}", "[{\"Id\": \"one\"}]"] {
            fs::write(store.path(), content).unwrap();
            let err = store.load().unwrap_err();
            assert!(matches!(err, StoreError::Parse { .. }), "content {content:?}");
            assert!(err.is_load_failure());
        }
        let failure = rec.find("Failed to load tasks").unwrap();
        assert_eq!(failure.level, Level::ERROR);
    }

    #[test]
    fn test_duplicate_ids_are_load_failure() {
        let dir = TempDir::new().unwrap();
        let rec = Recorder::default();
        let store = TaskStore::new(dir.path().join("Tasks.json"), &rec);
        fs::write(
            store.path(),
            r#"[{"Id": 5, "Name": "a"}, {"Id": 5, "Name": "b"}]"#,
        )
        .unwrap();

        match store.load() {
            Err(StoreError::DuplicateId { id, .. }) => assert_eq!(id, 5),
            other => panic!("expected duplicate id error, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_id_is_load_failure() {
        let dir = TempDir::new().unwrap();
        let rec = Recorder::default();
        let store = TaskStore::new(dir.path().join("Tasks.json"), &rec);
        fs::write(store.path(), r#"[{"Id": 0, "Name": "a"}]"#).unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, StoreError::ZeroId { .. }));
        assert!(err.is_load_failure());
    }

    #[test]
    fn test_uninspectable_path_is_read_failure() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "plain file").unwrap();
        let rec = Recorder::default();
        let store = TaskStore::new(blocker.join("Tasks.json"), &rec);

        assert!(matches!(store.load(), Err(StoreError::Read { .. })));
        assert!(rec.find("Failed to load tasks").is_some());
        assert!(rec
            .find("Task file does not exist, starting with an empty list")
            .is_none());
    }

    #[test]
    fn test_add_after_largest_id_keeps_file() {
        let dir = TempDir::new().unwrap();
        let rec = Recorder::default();
        let store = TaskStore::new(dir.path().join("Tasks.json"), &rec);
        let original = r#"[{"Id": 18446744073709551615, "Name": "last", "IsCompleted": false}]"#;
        fs::write(store.path(), original).unwrap();

        let res = store
            .modify(|tasks| {
                let added = tasks.add("y").map(|t| t.id);
                let changed = added.is_ok();
                (added, changed)
            })
            .unwrap();
        assert_eq!(
            res,
            Err(crate::error::TaskError::IdSpaceExhausted { last: u64::MAX })
        );
        assert_eq!(fs::read_to_string(store.path()).unwrap(), original);
    }

    #[test]
    fn test_unreadable_path_is_read_failure() {
        let dir = TempDir::new().unwrap();
        let rec = Recorder::default();
        let store = TaskStore::new(dir.path(), &rec);

        assert!(matches!(store.load(), Err(StoreError::Read { .. })));
    }

    #[test]
    fn test_write_failure_is_save_failure() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("taken");
        fs::create_dir(&target).unwrap();
        let rec = Recorder::default();
        let store = TaskStore::new(&target, &rec);

        let err = store.save(&sample()).unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
        assert!(err.is_save_failure());
        assert!(target.is_dir());
        assert!(!dir.path().join("taken.tmp").exists());
        assert!(rec.find("Failed to save tasks").is_some());
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let rec = Recorder::default();
        let store = TaskStore::new(dir.path().join("nested/deeper/Tasks.json"), &rec);

        store.save(&sample()).unwrap();
        assert_eq!(store.load().unwrap(), sample());
    }

    #[test]
    fn test_modify_without_change_does_not_write() {
        let dir = TempDir::new().unwrap();
        let rec = Recorder::default();
        let store = TaskStore::new(dir.path().join("Tasks.json"), &rec);
        let original = "[{\"Id\":1,\"Name\":\"Buy milk\",\"IsCompleted\":false}]";
        fs::write(store.path(), original).unwrap();

        let removed = store
            .modify(|tasks| {
                let removed = tasks.delete(99);
                let changed = removed.is_some();
                (removed, changed)
            })
            .unwrap();
        assert!(removed.is_none());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), original);

        let outcome = store
            .modify(|tasks| {
                let outcome = tasks.complete(99);
                (outcome, outcome == Completion::Marked)
            })
            .unwrap();
        assert_eq!(outcome, Completion::NotFound);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), original);
        assert!(rec.find("Tasks saved").is_none());
    }

    #[test]
    fn test_modify_persists_changes() {
        let dir = TempDir::new().unwrap();
        let rec = Recorder::default();
        let store = TaskStore::new(dir.path().join("Tasks.json"), &rec);

        let id = store.modify(|tasks| (tasks.add("Buy milk").unwrap().id, true)).unwrap();
        assert_eq!(id, 1);
        let id = store.modify(|tasks| (tasks.add("Walk dog").unwrap().id, true)).unwrap();
        assert_eq!(id, 2);

        let tasks = store.load().unwrap();
        let names: Vec<&str> = tasks.list().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Buy milk", "Walk dog"]);
    }

    #[test]
    fn test_modify_aborts_on_load_failure() {
        let dir = TempDir::new().unwrap();
        let rec = Recorder::default();
        let store = TaskStore::new(dir.path().join("Tasks.json"), &rec);
        fs::write(store.path(), "not json").unwrap();

        let mut called = false;
        let res = store.modify(|tasks| {
            called = true;
            tasks.add("x").unwrap();
            ((), true)
        });
        assert!(res.unwrap_err().is_load_failure());
        assert!(!called);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "not json");
    }
}
