// src/lifecycle.rs
//! Demo task lifecycle.
//!
//! ```text
//! Open --accept--> InProgress --deliver--> Delivered --confirm--> Done
//!                                                   \--dispute--> Disputed
//! ```
//!
//! The task list lives in memory only and is rebuilt from the seed catalog on
//! every start. Token rewards happen on `confirm`; the delivery counter that
//! drives the premium cadence moves on `deliver`.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::attachments::{BlobAllocator, BlobLease, Clock};
use crate::cadence;
use crate::error::StoreError;
use crate::events::{EventBus, Toast};
use crate::store::StateStore;
use crate::types::{FileRef, PremiumTrigger, TaskId};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Open,
    InProgress,
    Delivered,
    Done,
    Disputed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Open,
        TaskStatus::InProgress,
        TaskStatus::Delivered,
        TaskStatus::Done,
        TaskStatus::Disputed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Open => "Open",
            TaskStatus::InProgress => "In progress",
            TaskStatus::Delivered => "Delivered",
            TaskStatus::Done => "Done",
            TaskStatus::Disputed => "Disputed",
        }
    }

    pub fn parse(s: &str) -> Option<TaskStatus> {
        let wanted = s.trim().to_ascii_lowercase().replace(['-', '_', ' '], "");
        Self::ALL
            .into_iter()
            .find(|status| status.label().to_ascii_lowercase().replace(' ', "") == wanted)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Design,
    Coding,
    Music,
    Video,
    Study,
    Writing,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Design,
        Category::Coding,
        Category::Music,
        Category::Video,
        Category::Study,
        Category::Writing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Design => "design",
            Category::Coding => "coding",
            Category::Music => "music",
            Category::Video => "video",
            Category::Study => "study",
            Category::Writing => "writing",
        }
    }

    pub fn parse(s: &str) -> Option<Category> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|c| c.as_str() == wanted)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub tokens: u32,
    pub tags: Vec<String>,
    pub category: Category,
    pub reputation: f64,
    pub eta_hours: u32,
    pub status: TaskStatus,
}

#[allow(clippy::too_many_arguments)]
fn seed(
    id: TaskId,
    status: TaskStatus,
    title: &str,
    description: &str,
    tokens: u32,
    tags: &[&str],
    category: Category,
    reputation: f64,
    eta_hours: u32,
) -> Task {
    Task {
        id,
        title: title.to_string(),
        description: description.to_string(),
        tokens,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        category,
        reputation,
        eta_hours,
        status,
    }
}

/// The fixed demo catalog every engine starts from.
pub static SEED_TASKS: Lazy<Vec<Task>> = Lazy::new(|| {
    use Category::*;
    use TaskStatus::*;
    vec![
        seed(1, Delivered, "Edit study vlog (8 min)", "Color, subtitles, short intro.", 16, &["video", "edit", "caption"], Video, 4.6, 2),
        seed(2, Delivered, "Short guitar riff", "Funky 10-sec loop in A minor", 12, &["music", "guitar"], Music, 4.2, 1),
        seed(3, Delivered, "Poster layout for science fair", "A3, bold headline, 3 columns", 14, &["design", "poster"], Design, 4.7, 2),
        seed(4, Open, "Logo for robotics club", "Simple robot + initials", 22, &["design", "logo"], Design, 4.8, 3),
        seed(5, InProgress, "Maths tutoring (A-level)", "2 hour calculus revision", 15, &["maths", "tutor"], Study, 4.9, 2),
        seed(6, Open, "Fix React bug in todo app", "Strange rerender loop", 20, &["coding", "react"], Coding, 4.5, 3),
        seed(7, Open, "Essay hook lines", "3 alternatives", 7, &["writing", "hooks"], Writing, 4.0, 1),
        seed(8, InProgress, "Color-grade drone footage", "Cinematic teal/orange mood", 18, &["video", "grade"], Video, 4.6, 2),
        seed(9, Open, "CSS polish for landing page", "Spacing, buttons, cards", 12, &["coding", "css"], Coding, 4.4, 2),
        seed(10, Done, "Sketch mascot for site", "Black & white mascot", 10, &["design", "illustration"], Design, 4.1, 1),
        seed(11, Open, "Thumbnail for vlog", "Bold text, faces, subtle glow", 9, &["design", "thumbnail"], Design, 4.2, 1),
        seed(12, Open, "Python homework help", "Loops and dicts", 13, &["coding", "python"], Coding, 4.7, 2),
        seed(13, Open, "Compose study lofi", "60s loop, 80 BPM", 8, &["music", "lofi"], Music, 4.0, 2),
        seed(14, Open, "TikTok edit", "Cut to beat, captions", 12, &["video", "shorts"], Video, 4.3, 2),
        seed(15, Open, "Biology flashcards", "10 cards on enzymes", 7, &["study", "cards"], Study, 3.9, 1),
        seed(16, Open, "JS debugging", "Find memory leak", 18, &["coding", "js"], Coding, 4.6, 3),
        seed(17, Open, "Poster icons", "Flat 12 icons", 14, &["design", "icons"], Design, 4.2, 2),
        seed(18, Open, "Song mixdown", "Balance vocals/bass", 13, &["music", "mix"], Music, 4.1, 2),
        seed(19, Open, "History essay plan", "Intro + 3 paras", 8, &["writing", "plan"], Writing, 4.4, 1),
        seed(20, Open, "Geometry revision", "Trigonometry basics", 9, &["study", "maths"], Study, 4.5, 2),
    ]
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Accept,
    Deliver,
    Dispute,
}

/// Result of a lifecycle operation. Rejections and unknown ids leave every
/// piece of state untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Rejected { status: TaskStatus, action: Action },
    NotFound,
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

/// A file picked by the user, before it becomes a [`FileRef`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PickedFile {
    pub name: String,
    pub size_bytes: u64,
}

impl PickedFile {
    pub fn new(name: impl Into<String>, size_bytes: u64) -> Self {
        Self { name: name.into(), size_bytes }
    }
}

pub struct TaskEngine {
    tasks: Mutex<Vec<Task>>,
    leases: Mutex<HashMap<String, BlobLease>>,
    next_file: AtomicU64,
    store: Arc<StateStore>,
    bus: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    blobs: Arc<dyn BlobAllocator>,
}

impl TaskEngine {
    pub fn new(
        store: Arc<StateStore>,
        bus: Arc<EventBus>,
        clock: Arc<dyn Clock>,
        blobs: Arc<dyn BlobAllocator>,
    ) -> Self {
        Self::with_tasks(SEED_TASKS.to_vec(), store, bus, clock, blobs)
    }

    pub fn with_tasks(
        tasks: Vec<Task>,
        store: Arc<StateStore>,
        bus: Arc<EventBus>,
        clock: Arc<dyn Clock>,
        blobs: Arc<dyn BlobAllocator>,
    ) -> Self {
        Self {
            tasks: Mutex::new(tasks),
            leases: Mutex::new(HashMap::new()),
            next_file: AtomicU64::new(0),
            store,
            bus,
            clock,
            blobs,
        }
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.lock_tasks().clone()
    }

    pub fn task(&self, id: TaskId) -> Option<Task> {
        self.lock_tasks().iter().find(|t| t.id == id).cloned()
    }

    pub fn status(&self, id: TaskId) -> Option<TaskStatus> {
        self.lock_tasks().iter().find(|t| t.id == id).map(|t| t.status)
    }

    pub fn accept(&self, id: TaskId) -> Result<Outcome, StoreError> {
        if let Some(rejected) = self.transition(id, Action::Accept, TaskStatus::Open, TaskStatus::InProgress) {
            if let Outcome::Rejected { .. } = rejected {
                self.bus.toast(
                    Toast::new("ℹ️", "Already accepted").with_body("This task is not currently open."),
                );
            }
            return Ok(rejected);
        }
        self.store.set(|state| {
            state.my_accepted.insert(id);
        })?;
        info!(target: "lifecycle", task = id, "task accepted");
        self.bus.toast(Toast::new("✅", "Task accepted").with_body("You’re now working on this task."));
        Ok(Outcome::Applied)
    }

    pub fn deliver(&self, id: TaskId) -> Result<Outcome, StoreError> {
        if let Some(rejected) = self.transition(id, Action::Deliver, TaskStatus::InProgress, TaskStatus::Delivered) {
            if let Outcome::Rejected { .. } = rejected {
                self.bus.toast(
                    Toast::new("ℹ️", "Cannot deliver").with_body("Only in-progress tasks can be delivered."),
                );
            }
            return Ok(rejected);
        }
        let state = self.store.set(|state| {
            state.completed_jobs += 1;
            cadence::rearm(state);
            state.premium_activated = true;
            state.premium_last_trigger = Some(PremiumTrigger::Deliver);
        })?;
        info!(
            target: "lifecycle",
            task = id,
            completed_jobs = state.completed_jobs,
            rearmed = cadence::is_rearm_point(state.completed_jobs),
            "task delivered"
        );
        self.bus.toast(Toast::new("📦", "Delivered").with_body("Work sent to client. Awaiting confirmation."));
        Ok(Outcome::Applied)
    }

    /// Marks the task done and grants one token. The caller only offers this
    /// for delivered tasks; any known task is accepted here.
    ///
    /// An unknown id is `NotFound` and grants nothing, unlike the web demo,
    /// which credited the token even when no task matched.
    pub fn confirm(&self, id: TaskId) -> Result<Outcome, StoreError> {
        let previous = {
            let mut tasks = self.lock_tasks();
            let Some(task) = tasks.iter_mut().find(|t| t.id == id) else {
                debug!(target: "lifecycle", task = id, "confirm on unknown task");
                return Ok(Outcome::NotFound);
            };
            std::mem::replace(&mut task.status, TaskStatus::Done)
        };
        let state = self.store.set(|state| state.tokens += 1)?;
        info!(target: "lifecycle", task = id, from = %previous, tokens = state.tokens, "job confirmed");
        self.bus.toast(Toast::new("✅", "Job confirmed").with_body("Great work! Progress saved."));
        Ok(Outcome::Applied)
    }

    pub fn dispute(&self, id: TaskId) -> Result<Outcome, StoreError> {
        if let Some(rejected) = self.transition(id, Action::Dispute, TaskStatus::Delivered, TaskStatus::Disputed) {
            if let Outcome::Rejected { .. } = rejected {
                self.bus.toast(
                    Toast::new("ℹ️", "Cannot dispute").with_body("Only delivered tasks can be disputed."),
                );
            }
            return Ok(rejected);
        }
        info!(target: "lifecycle", task = id, "dispute opened");
        self.bus.toast(Toast::new("⚖️", "Dispute opened").with_body("Moderator will review"));
        Ok(Outcome::Applied)
    }

    pub fn add_files(&self, id: TaskId, files: Vec<PickedFile>) -> Result<Outcome, StoreError> {
        if self.status(id).is_none() {
            return Ok(Outcome::NotFound);
        }
        if files.is_empty() {
            return Ok(Outcome::Applied);
        }
        let now = self.clock.now();
        let count = files.len();
        let mut entries = Vec::with_capacity(count);
        {
            let mut leases = self.lock_leases();
            for file in files {
                let lease = BlobLease::acquire(&self.blobs, &file.name, file.size_bytes);
                // Unique per engine even when the clock does not move.
                let seq = self.next_file.fetch_add(1, Ordering::Relaxed);
                let entry = FileRef {
                    id: format!("{id}-{}-{seq}", now.timestamp_millis()),
                    name: file.name,
                    size_bytes: file.size_bytes,
                    url: lease.url().to_string(),
                    added_at: now,
                };
                leases.insert(entry.id.clone(), lease);
                entries.push(entry);
            }
        }
        self.store.set(|state| state.task_files.entry(id).or_default().extend(entries))?;
        info!(target: "lifecycle", task = id, count, "files attached");
        self.bus.toast(
            Toast::new("📎", "Files attached")
                .with_body(format!("Added {count} file{}.", if count > 1 { "s" } else { "" })),
        );
        Ok(Outcome::Applied)
    }

    pub fn remove_file(&self, id: TaskId, file_id: &str) -> Result<Outcome, StoreError> {
        if !self.store.get().files_for(id).iter().any(|f| f.id == file_id) {
            return Ok(Outcome::NotFound);
        }
        // Released ahead of the write: the in-memory snapshot drops the entry
        // even when persisting fails. Files restored from disk have no lease.
        let lease = self.lock_leases().remove(file_id);
        if let Some(lease) = &lease {
            debug!(target: "lifecycle", task = id, url = lease.url(), "releasing attachment");
        }
        drop(lease);
        self.store.set(|state| {
            if let Some(files) = state.task_files.get_mut(&id) {
                files.retain(|f| f.id != file_id);
            }
        })?;
        Ok(Outcome::Applied)
    }

    /// Releases every blob reference this engine still holds.
    pub fn release_all(&self) {
        let released = self.lock_leases().drain().count();
        if released > 0 {
            debug!(target: "lifecycle", released, "released attachment leases");
        }
    }

    /// Moves `id` from `from` to `to`. Returns `None` when the move happened.
    fn transition(&self, id: TaskId, action: Action, from: TaskStatus, to: TaskStatus) -> Option<Outcome> {
        let mut tasks = self.lock_tasks();
        let Some(task) = tasks.iter_mut().find(|t| t.id == id) else {
            debug!(target: "lifecycle", task = id, ?action, "unknown task");
            return Some(Outcome::NotFound);
        };
        if task.status != from {
            info!(target: "lifecycle", task = id, ?action, status = %task.status, "transition rejected");
            return Some(Outcome::Rejected { status: task.status, action });
        }
        task.status = to;
        None
    }

    fn lock_tasks(&self) -> MutexGuard<'_, Vec<Task>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_leases(&self) -> MutexGuard<'_, HashMap<String, BlobLease>> {
        self.leases.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_catalog_shape() {
        assert_eq!(SEED_TASKS.len(), 20);
        let count = |s| SEED_TASKS.iter().filter(|t| t.status == s).count();
        assert_eq!(count(TaskStatus::Delivered), 3);
        assert_eq!(count(TaskStatus::InProgress), 2);
        assert_eq!(count(TaskStatus::Done), 1);
        assert_eq!(count(TaskStatus::Open), 14);
        assert!(SEED_TASKS.iter().all(|t| t.tokens > 0));
    }

    #[test]
    fn status_labels_round_trip_through_parse() {
        for status in TaskStatus::ALL {
            assert_eq!(TaskStatus::parse(status.label()), Some(status));
        }
        assert_eq!(TaskStatus::parse("in-progress"), Some(TaskStatus::InProgress));
        assert_eq!(Category::parse("Coding"), Some(Category::Coding));
    }
}
