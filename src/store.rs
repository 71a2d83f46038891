use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::models::{default_tasks_key, DateKey, Task, TaskId, TaskMap};
use crate::storage::{decode_json, KeyValueStore, StorageError};

/// The full date -> task list mapping, the unit of persistence.
///
/// Every mutation keeps the invariant that a present date key has at least one task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskStore {
    dates: TaskMap,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a raw mapping, dropping dates whose list is empty.
    pub fn from_map(mut dates: TaskMap) -> Self {
        dates.retain(|_, tasks| !tasks.is_empty());
        Self { dates }
    }

    /// The example content shown on a first launch.
    pub fn seeded() -> Self {
        let mut dates = TaskMap::new();
        if let (Some(first), Some(second)) = (
            DateKey::from_ymd(2025, 4, 1),
            DateKey::from_ymd(2025, 4, 2),
        ) {
            dates.insert(first, vec![Task::new(1, "Test task 01")]);
            dates.insert(
                second,
                vec![Task::new(1, "Test task 02"), Task::new(2, "Test task 03")],
            );
        }
        Self { dates }
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn as_map(&self) -> &TaskMap {
        &self.dates
    }

    pub fn tasks_for(&self, date: &DateKey) -> &[Task] {
        self.dates.get(date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find(&self, date: &DateKey, id: TaskId) -> Option<&Task> {
        self.tasks_for(date).iter().find(|task| task.id == id)
    }

    pub fn task_count(&self) -> usize {
        self.dates.values().map(Vec::len).sum()
    }

    /// Ids grow monotonically across the whole store, so rapid inserts never collide.
    ///
    /// Once the largest id is `u64::MAX` the lowest id not in use is handed out instead.
    pub fn next_id(&self) -> TaskId {
        match self.ids().max().unwrap_or(0).checked_add(1) {
            Some(id) => TaskId(id),
            None => {
                let used: BTreeSet<u64> = self.ids().collect();
                // Every id in 1..=u64::MAX would have to be live for this to miss.
                TaskId((1..=u64::MAX).find(|id| !used.contains(id)).unwrap_or(0))
            }
        }
    }

    fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.dates.values().flatten().map(|task| task.id.0)
    }

    /// Appends `text` under `date`, creating the list if needed.
    pub fn add(&mut self, date: DateKey, text: impl Into<String>) -> Task {
        let task = Task {
            id: self.next_id(),
            task: text.into(),
        };
        self.dates.entry(date).or_default().push(task.clone());
        task
    }

    /// Replaces the text of one task in place. Returns false when the task is not there.
    pub fn edit(&mut self, date: &DateKey, id: TaskId, text: impl Into<String>) -> bool {
        match self
            .dates
            .get_mut(date)
            .and_then(|tasks| tasks.iter_mut().find(|task| task.id == id))
        {
            Some(task) => {
                task.task = text.into();
                true
            }
            None => false,
        }
    }

    /// Removes one task, and the date itself once its list is empty.
    pub fn remove(&mut self, date: &DateKey, id: TaskId) -> Option<Task> {
        let tasks = self.dates.get_mut(date)?;
        let index = tasks.iter().position(|task| task.id == id)?;
        let removed = tasks.remove(index);
        if tasks.is_empty() {
            self.dates.remove(date);
        }
        Some(removed)
    }

    /// Dates that get a marker dot on the calendar.
    pub fn marked_dates(&self) -> BTreeSet<DateKey> {
        self.dates
            .iter()
            .filter(|(_, tasks)| !tasks.is_empty())
            .map(|(date, _)| *date)
            .collect()
    }

    /// Newest date first.
    pub fn entries_desc(&self) -> impl Iterator<Item = (&DateKey, &[Task])> {
        self.dates
            .iter()
            .rev()
            .map(|(date, tasks)| (date, tasks.as_slice()))
    }
}

/// Identifies which persisted blob a local copy was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Revision {
    /// Nothing was persisted yet.
    Missing,
    /// The last read failed; a save is only accepted onto an empty slot.
    Unknown,
    Fingerprint(u64),
}

impl Revision {
    fn of(bytes: Option<&[u8]>) -> Self {
        match bytes {
            None => Revision::Missing,
            Some(bytes) => {
                let mut hasher = DefaultHasher::new();
                bytes.hash(&mut hasher);
                Revision::Fingerprint(hasher.finish())
            }
        }
    }
}

#[derive(Debug)]
pub enum StoreError {
    Load(StorageError),
    Save(StorageError),
    /// The blob changed since this copy was loaded.
    Conflict,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Load(err) => write!(f, "failed to load tasks: {err}"),
            StoreError::Save(err) => write!(f, "failed to save tasks: {err}"),
            StoreError::Conflict => write!(f, "tasks were changed elsewhere"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Load(err) | StoreError::Save(err) => Some(err),
            StoreError::Conflict => None,
        }
    }
}

/// Result of reading the blob. Reads never fail outright: problems land in `error`.
#[derive(Debug)]
pub struct Loaded {
    /// `None` when no blob exists or it could not be read.
    pub tasks: Option<TaskStore>,
    pub revision: Revision,
    pub error: Option<StoreError>,
}

/// Load/save port over the single persisted task blob.
#[derive(Clone)]
pub struct TaskRepository {
    kv: Arc<dyn KeyValueStore>,
    key: String,
    write_lock: Arc<Mutex<()>>,
}

impl TaskRepository {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(kv, default_tasks_key())
    }

    pub fn with_key(kv: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn load(&self) -> Loaded {
        let bytes = match self.kv.get(&self.key) {
            Ok(bytes) => bytes,
            Err(err) => {
                log::error!("failed to read tasks key={} err={err}", self.key);
                return Loaded {
                    tasks: None,
                    revision: Revision::Unknown,
                    error: Some(StoreError::Load(err)),
                };
            }
        };
        let revision = Revision::of(bytes.as_deref());
        let Some(bytes) = bytes else {
            log::debug!("no tasks persisted yet key={}", self.key);
            return Loaded {
                tasks: None,
                revision,
                error: None,
            };
        };
        match decode_json::<TaskMap>(&bytes) {
            Ok(map) => Loaded {
                tasks: Some(TaskStore::from_map(map)),
                revision,
                error: None,
            },
            Err(err) => {
                // Keep the revision of the corrupt blob so the next save replaces it.
                log::error!("failed to parse tasks key={} err={err}", self.key);
                Loaded {
                    tasks: None,
                    revision,
                    error: Some(StoreError::Load(err)),
                }
            }
        }
    }

    /// Writes the whole store, refusing to overwrite a blob written since `expected` was read.
    pub fn save(&self, tasks: &TaskStore, expected: Revision) -> Result<Revision, StoreError> {
        let json = serde_json::to_vec(tasks).map_err(|err| StoreError::Save(err.into()))?;
        let _guard = self.write_lock.lock().expect("task repository poisoned");

        let current = self.kv.get(&self.key).map_err(StoreError::Save)?;
        let found = Revision::of(current.as_deref());
        let fresh = match expected {
            Revision::Unknown => found == Revision::Missing,
            _ => found == expected,
        };
        if !fresh {
            log::warn!(
                "stale task store rejected key={} expected={expected:?} found={found:?}",
                self.key
            );
            return Err(StoreError::Conflict);
        }

        if let Err(err) = self.kv.set(&self.key, &json) {
            log::error!("failed to save tasks key={} err={err}", self.key);
            return Err(StoreError::Save(err));
        }
        log::debug!(
            "saved tasks key={} dates={} tasks={}",
            self.key,
            tasks.as_map().len(),
            tasks.task_count()
        );
        Ok(Revision::of(Some(json.as_slice())))
    }
}

/// Non-blocking message for the screen to show once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum Notice {
    LoadFailed(String),
    SaveFailed(String),
    Conflict(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    Saved,
    /// Kept in memory but not persisted.
    Unsaved,
    /// Dropped in favour of the newer persisted store.
    Reloaded,
}

/// A screen's own copy of the store, bound to the repository it came from.
pub struct TaskSession {
    repo: TaskRepository,
    tasks: TaskStore,
    revision: Revision,
    notice: Option<Notice>,
}

impl TaskSession {
    /// Loads the persisted store, using `fallback` when none can be read.
    pub fn open(repo: TaskRepository, fallback: impl FnOnce() -> TaskStore) -> Self {
        let Loaded {
            tasks,
            revision,
            error,
        } = repo.load();
        let notice = error.map(|err| Notice::LoadFailed(err.to_string()));
        Self {
            repo,
            tasks: tasks.unwrap_or_else(fallback),
            revision,
            notice,
        }
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    pub fn revision(&self) -> Revision {
        self.revision
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Re-reads the blob. A failed read keeps the current copy.
    pub fn reload(&mut self) {
        let Loaded {
            tasks,
            revision,
            error,
        } = self.repo.load();
        match (tasks, error) {
            (_, Some(err)) => self.notice = Some(Notice::LoadFailed(err.to_string())),
            (Some(tasks), None) => self.tasks = tasks,
            (None, None) => self.tasks = TaskStore::new(),
        }
        self.revision = revision;
    }

    /// Applies `change` to a copy of the store and persists the copy whole.
    pub fn commit(&mut self, change: impl FnOnce(&mut TaskStore)) -> Commit {
        let mut next = self.tasks.clone();
        change(&mut next);
        match self.repo.save(&next, self.revision) {
            Ok(revision) => {
                self.tasks = next;
                self.revision = revision;
                Commit::Saved
            }
            Err(StoreError::Conflict) => {
                self.reload();
                self.notice = Some(Notice::Conflict(StoreError::Conflict.to_string()));
                Commit::Reloaded
            }
            Err(err) => {
                self.tasks = next;
                self.notice = Some(Notice::SaveFailed(err.to_string()));
                Commit::Unsaved
            }
        }
    }
}
