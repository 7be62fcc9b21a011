use std::collections::HashSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::NaiveDate;
use serde_json::Value;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{PrioError, Result};
use crate::model::{NewTask, Task, TaskPatch};
use crate::schedule;
use crate::store::legacy;
use crate::store::lock::StoreLock;
use crate::store::records::normalize_records;
use crate::timestamp;

/// Smallest positive integer not used as a task id.
pub fn next_id(tasks: &[Task]) -> u64 {
    let used: HashSet<u64> = tasks.iter().map(|t| t.id).collect();
    let mut candidate = 1;
    while used.contains(&candidate) {
        candidate += 1;
    }
    candidate
}

/// Listing order: highest score first, then title, then id.
pub fn sort_by_priority(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| {
        b.priority_score
            .cmp(&a.priority_score)
            .then_with(|| a.title.cmp(&b.title))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// The task collection, cached in memory after first access and mirrored to
/// a single pretty-printed JSON file.
///
/// Every mutation runs inside one exclusive section: the in-process mutex
/// plus an advisory lock file beside the store. Mutations re-read the file
/// under that lock and work on the fresh copy, which replaces the cache only
/// once it has been written to disk, so readers never see a half-applied
/// change and writers in other processes are not overwritten.
pub struct TaskStore {
    path: PathBuf,
    legacy_path: PathBuf,
    cache: Mutex<Option<Vec<Task>>>,
}

impl TaskStore {
    pub fn new(path: impl Into<PathBuf>, legacy_path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            legacy_path: legacy_path.into(),
            cache: Mutex::new(None),
        }
    }

    pub fn open(config: &Config) -> Self {
        Self::new(config.store_path.clone(), config.legacy_path.clone())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        StoreLock::path_for(&self.path)
    }

    // Mutations never leave the cache half-written, so a poisoned mutex is safe to reuse.
    fn guard(&self) -> MutexGuard<'_, Option<Vec<Task>>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Best-effort lock for read paths; reads proceed unlocked if it cannot be taken.
    fn read_lock(&self) -> Option<StoreLock> {
        match StoreLock::acquire(&self.lock_path()) {
            Ok(lock) => Some(lock),
            Err(err) => {
                tracing::warn!(error = %err, "reading task store without lock");
                None
            }
        }
    }

    /// The whole collection, reading (or bootstrapping) the file on first use.
    /// Never fails: storage defects degrade to an empty collection.
    pub fn load(&self) -> Vec<Task> {
        let mut cache = self.guard();
        if cache.is_none() {
            let _lock = self.read_lock();
            *cache = Some(self.read_disk());
        }
        cache.clone().unwrap_or_default()
    }

    /// Drop the cache and re-read the file.
    pub fn reload(&self) -> Vec<Task> {
        let mut cache = self.guard();
        let _lock = self.read_lock();
        let tasks = self.read_disk();
        *cache = Some(tasks.clone());
        tasks
    }

    /// All tasks in listing order.
    pub fn list(&self) -> Vec<Task> {
        let mut tasks = self.load();
        sort_by_priority(&mut tasks);
        tasks
    }

    pub fn get(&self, id: u64) -> Result<Task> {
        self.load()
            .into_iter()
            .find(|t| t.id == id)
            .ok_or(PrioError::TaskNotFound(id))
    }

    /// Create a task. An explicit id is honoured only if positive and unused.
    pub fn create(&self, new: NewTask, note: &str) -> Result<Task> {
        self.mutate(|tasks| {
            let id = new
                .id
                .filter(|id| *id > 0 && tasks.iter().all(|t| t.id != *id))
                .unwrap_or_else(|| next_id(tasks));
            let task = new.into_task(id, timestamp::now(), note)?;
            tasks.push(task.clone());
            Ok(task)
        })
    }

    pub fn update(&self, id: u64, patch: TaskPatch) -> Result<Task> {
        self.mutate(|tasks| {
            let task = tasks
                .iter_mut()
                .find(|t| t.id == id)
                .ok_or(PrioError::TaskNotFound(id))?;
            task.apply_update(patch, timestamp::now())?;
            Ok(task.clone())
        })
    }

    /// Place a task into the first free slot of the workday on `date`.
    pub fn auto_schedule(&self, id: u64, minutes: Option<u32>, date: NaiveDate) -> Result<Task> {
        self.mutate(|tasks| schedule::auto_schedule(tasks, id, minutes, date, timestamp::now()))
    }

    pub fn delete(&self, id: u64) -> Result<Task> {
        self.mutate(|tasks| {
            let index = tasks
                .iter()
                .position(|t| t.id == id)
                .ok_or(PrioError::TaskNotFound(id))?;
            Ok(tasks.remove(index))
        })
    }

    /// Write the current collection back to disk unchanged.
    pub fn save(&self) -> Result<()> {
        self.mutate(|_| Ok(()))
    }

    fn mutate<R>(&self, op: impl FnOnce(&mut Vec<Task>) -> Result<R>) -> Result<R> {
        let mut cache = self.guard();
        let _lock = StoreLock::acquire(&self.lock_path())?;
        // Another process may have written since the cache was filled.
        let mut working = self.read_disk();
        let out = op(&mut working)?;
        self.persist(&working)?;
        *cache = Some(working);
        Ok(out)
    }

    fn read_disk(&self) -> Vec<Task> {
        let now = timestamp::now();
        if !self.path.exists() {
            let tasks = legacy::bootstrap(&self.legacy_path, now);
            if let Err(err) = self.persist(&tasks) {
                tracing::warn!(path = %self.path.display(), error = %err, "cannot create task store");
            }
            return tasks;
        }

        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "cannot read task store; starting empty");
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<Value>>(&data) {
            Ok(values) => {
                let tasks = normalize_records(values, now);
                tracing::debug!(path = %self.path.display(), count = tasks.len(), "loaded task store");
                tasks
            }
            Err(err) => {
                self.set_aside_corrupt();
                tracing::warn!(path = %self.path.display(), error = %err, "task store is not a JSON array; starting empty");
                Vec::new()
            }
        }
    }

    // Keep a copy of an unreadable store before the next persist overwrites it.
    fn set_aside_corrupt(&self) {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".corrupt");
        let backup = PathBuf::from(name);
        if let Err(err) = fs::copy(&self.path, &backup) {
            tracing::warn!(path = %backup.display(), error = %err, "cannot back up corrupt task store");
        }
    }

    /// Write the collection to a temp file in the same directory, then rename
    /// it over the store so a crash never leaves a truncated file.
    fn persist(&self, tasks: &[Task]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tasks_store.json".to_string());
        let staging = dir.join(format!(".{file_name}.{}.tmp", Uuid::new_v4().simple()));

        let json = serde_json::to_string_pretty(tasks)?;
        let written = File::create(&staging).and_then(|mut file| {
            file.write_all(json.as_bytes())?;
            file.sync_all()
        });
        if let Err(err) = written.and_then(|()| fs::rename(&staging, &self.path)) {
            let _ = fs::remove_file(&staging);
            return Err(err.into());
        }

        tracing::debug!(path = %self.path.display(), count = tasks.len(), "persisted task store");
        Ok(())
    }
}
