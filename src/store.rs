// src/store.rs
//! Persisted snapshot store: load once, rewrite on every mutation.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::events::{Event, EventBus};
use crate::types::{default_starter_tasks, AppState, StatePatch, StarterTask};

/// Bump together with [`STATE_KEY`]; data under an older key is orphaned.
pub const SCHEMA_VERSION: u32 = 4;
pub const STATE_KEY: &str = "taskswap_state_v4";

/// Minimal string key-value persistence, one value per key.
pub trait KeyValueStore: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn write(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Stores each key as `<dir>/<key>.json`.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for JsonFileStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: impl Into<String>) -> Self {
        let store = Self::default();
        lock_or_recover(&store.values).insert(key.to_string(), value.into());
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(lock_or_recover(&self.values).get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StoreError> {
        lock_or_recover(&self.values).insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// How the startup snapshot was obtained.
#[derive(Clone, Debug, PartialEq)]
pub enum LoadOutcome {
    /// Nothing usable was stored; the hard-coded defaults are in effect.
    Defaults(DefaultReason),
    /// A stored snapshot was merged over the defaults.
    Migrated(AppState),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DefaultReason {
    Missing,
    Unreadable,
    Corrupt,
}

impl LoadOutcome {
    pub fn into_state(self) -> AppState {
        match self {
            LoadOutcome::Defaults(_) => AppState::default(),
            LoadOutcome::Migrated(state) => state,
        }
    }
}

/// Reads the snapshot stored under [`STATE_KEY`]. Never fails.
pub fn load(backend: &dyn KeyValueStore) -> LoadOutcome {
    let raw = match backend.read(STATE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!(target: "store::load", "no stored snapshot, using defaults");
            return LoadOutcome::Defaults(DefaultReason::Missing);
        }
        Err(e) => {
            warn!(target: "store::load", error = %e, "failed to read snapshot, using defaults");
            return LoadOutcome::Defaults(DefaultReason::Unreadable);
        }
    };
    match migrate(&raw) {
        Some(state) => LoadOutcome::Migrated(state),
        None => {
            warn!(target: "store::load", "stored snapshot is corrupt, using defaults");
            LoadOutcome::Defaults(DefaultReason::Corrupt)
        }
    }
}

/// Merges a stored v4 document over the defaults field by field. Returns
/// `None` when the document is not a JSON object.
///
/// A field that is present but of the wrong shape keeps its default;
/// `completedJobs` must be a non-negative integer and `starterTasks` a
/// well-formed sequence, otherwise they are replaced wholesale.
pub fn migrate(raw: &str) -> Option<AppState> {
    let Ok(Value::Object(doc)) = serde_json::from_str::<Value>(raw) else {
        return None;
    };
    let mut state = AppState::default();
    merge(&doc, "tokens", &mut state.tokens);
    merge(&doc, "reputation", &mut state.reputation);
    merge(&doc, "streak", &mut state.streak);
    merge(&doc, "completedJobs", &mut state.completed_jobs);
    merge(&doc, "premiumHintDismissed", &mut state.premium_hint_dismissed);
    merge(&doc, "starterRewarded", &mut state.starter_rewarded);
    merge(&doc, "myAccepted", &mut state.my_accepted);
    merge(&doc, "taskFiles", &mut state.task_files);
    merge(&doc, "premiumActivated", &mut state.premium_activated);
    merge(&doc, "premiumLastTrigger", &mut state.premium_last_trigger);
    merge::<Vec<StarterTask>>(&doc, "starterTasks", &mut state.starter_tasks);
    backfill_starter_titles(&mut state.starter_tasks);
    Some(state)
}

fn backfill_starter_titles(tasks: &mut [StarterTask]) {
    let templates = default_starter_tasks();
    for task in tasks.iter_mut().filter(|t| t.title.is_empty()) {
        if let Some(template) = templates.iter().find(|t| t.id == task.id) {
            task.title = template.title.clone();
        }
    }
}

fn merge<T: DeserializeOwned>(doc: &Map<String, Value>, key: &str, slot: &mut T) {
    let Some(value) = doc.get(key) else {
        return;
    };
    match serde_json::from_value::<T>(value.clone()) {
        Ok(parsed) => *slot = parsed,
        Err(e) => debug!(target: "store::load", key, error = %e, "ignoring malformed field"),
    }
}

/// Owner of the single mutable snapshot.
///
/// Writers are serialized: the snapshot lock is held while the next state is
/// computed and persisted. Committed snapshots are queued and broadcast in
/// commit order by whichever writer holds the publishing slot, so handlers
/// run without the snapshot lock and may call back into the store.
pub struct StateStore {
    backend: Box<dyn KeyValueStore>,
    state: Mutex<AppState>,
    pending: Mutex<VecDeque<AppState>>,
    publishing: Mutex<()>,
    bus: Arc<EventBus>,
}

impl StateStore {
    pub fn open(backend: Box<dyn KeyValueStore>, bus: Arc<EventBus>) -> (Self, LoadOutcome) {
        let outcome = load(backend.as_ref());
        let state = outcome.clone().into_state();
        info!(
            target: "store",
            tokens = state.tokens,
            completed_jobs = state.completed_jobs,
            restored = matches!(outcome, LoadOutcome::Migrated(_)),
            "state loaded"
        );
        let store = Self {
            backend,
            state: Mutex::new(state),
            pending: Mutex::new(VecDeque::new()),
            publishing: Mutex::new(()),
            bus,
        };
        (store, outcome)
    }

    pub fn get(&self) -> AppState {
        self.lock().clone()
    }

    /// Applies `f` to the snapshot, persists and broadcasts the result.
    ///
    /// Without contention the broadcast completes before this returns. A
    /// `set` issued from a state handler, or racing another thread's
    /// broadcast, is delivered by the writer already publishing, right after
    /// the snapshots committed before it.
    ///
    /// On a persistence failure the in-memory snapshot has still advanced,
    /// but nothing is broadcast.
    pub fn set<F>(&self, f: F) -> Result<AppState, StoreError>
    where
        F: FnOnce(&mut AppState),
    {
        let next = {
            let mut state = self.lock();
            let mut next = state.clone();
            f(&mut next);
            *state = next.clone();
            self.persist(&next)?;
            lock_or_recover(&self.pending).push_back(next.clone());
            next
        };
        self.flush_broadcasts();
        Ok(next)
    }

    pub fn patch(&self, patch: StatePatch) -> Result<AppState, StoreError> {
        self.set(|state| patch.apply(state))
    }

    pub fn reset(&self) -> Result<AppState, StoreError> {
        info!(target: "store", "resetting state to defaults");
        self.set(|state| *state = AppState::default())
    }

    /// Resets when an external reset signal is present.
    pub fn apply_reset_signal(&self, reset: bool) -> Result<bool, StoreError> {
        if !reset {
            return Ok(false);
        }
        self.reset()?;
        info!(target: "store", "state reset via startup reset flag");
        Ok(true)
    }

    fn persist(&self, state: &AppState) -> Result<(), StoreError> {
        let serialized = serde_json::to_string_pretty(state)?;
        self.backend.write(STATE_KEY, &serialized).map_err(|e| {
            warn!(target: "store", error = %e, "failed to persist state");
            e
        })
    }

    fn flush_broadcasts(&self) {
        loop {
            let publishing = match self.publishing.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(e)) => e.into_inner(),
                Err(TryLockError::WouldBlock) => return,
            };
            while let Some(next) = self.next_pending() {
                self.bus.publish(Event::State(next));
            }
            drop(publishing);
            // A writer may have queued after the last pop but before the
            // slot was released.
            if lock_or_recover(&self.pending).is_empty() {
                return;
            }
        }
    }

    fn next_pending(&self) -> Option<AppState> {
        lock_or_recover(&self.pending).pop_front()
    }

    fn lock(&self) -> MutexGuard<'_, AppState> {
        lock_or_recover(&self.state)
    }
}

fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
