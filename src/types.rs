// src/types.rs
use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a marketplace task.
pub type TaskId = u32;

/// One onboarding task. Only `id`, `title` and `done` are persisted; the
/// description is derived from the id. A missing title is restored from the
/// template on load.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct StarterTask {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub done: bool,
}

impl StarterTask {
    fn new(id: &str, title: &str) -> Self {
        Self { id: id.to_string(), title: title.to_string(), done: false }
    }

    pub fn description(&self) -> &'static str {
        match self.id.as_str() {
            "s1" => "Fill out your skills and bio on the Profile page.",
            "s2" => "Use the Post Task page to create a small request.",
            "s3" => "Comment or like a post in the Community feed.",
            _ => "",
        }
    }
}

/// The fixed starter set every fresh snapshot begins with.
pub fn default_starter_tasks() -> Vec<StarterTask> {
    vec![
        StarterTask::new("s1", "Complete your profile"),
        StarterTask::new("s2", "Post your first task"),
        StarterTask::new("s3", "Reply in the community"),
    ]
}

/// An attachment on a task. `url` points at a transient blob reference that
/// does not survive a restart.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    pub id: String,
    pub name: String,
    #[serde(rename = "size")]
    pub size_bytes: u64,
    pub url: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub added_at: DateTime<Utc>,
}

/// What last activated the premium prompt.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PremiumTrigger {
    Deliver,
}

/// The persisted application snapshot.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub tokens: u64,
    pub reputation: f64,
    pub streak: u32,
    /// Counts deliveries, not confirmations.
    pub completed_jobs: u64,
    pub premium_hint_dismissed: bool,
    pub starter_tasks: Vec<StarterTask>,
    pub starter_rewarded: bool,
    #[serde(default)]
    pub my_accepted: BTreeSet<TaskId>,
    #[serde(default)]
    pub task_files: BTreeMap<TaskId, Vec<FileRef>>,
    #[serde(default)]
    pub premium_activated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub premium_last_trigger: Option<PremiumTrigger>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            tokens: 121,
            reputation: 4.7,
            streak: 6,
            completed_jobs: 0,
            premium_hint_dismissed: false,
            starter_tasks: default_starter_tasks(),
            starter_rewarded: false,
            my_accepted: BTreeSet::new(),
            task_files: BTreeMap::new(),
            premium_activated: false,
            premium_last_trigger: None,
        }
    }
}

impl AppState {
    pub fn starter_done(&self, id: &str) -> bool {
        self.starter_tasks.iter().any(|t| t.id == id && t.done)
    }

    pub fn files_for(&self, task: TaskId) -> &[FileRef] {
        self.task_files.get(&task).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A shallow patch over [`AppState`]; `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatePatch {
    pub tokens: Option<u64>,
    pub reputation: Option<f64>,
    pub streak: Option<u32>,
    pub completed_jobs: Option<u64>,
    pub premium_hint_dismissed: Option<bool>,
    pub starter_tasks: Option<Vec<StarterTask>>,
    pub starter_rewarded: Option<bool>,
    pub my_accepted: Option<BTreeSet<TaskId>>,
    pub task_files: Option<BTreeMap<TaskId, Vec<FileRef>>>,
}

impl StatePatch {
    pub fn apply(self, state: &mut AppState) {
        if let Some(v) = self.tokens {
            state.tokens = v;
        }
        if let Some(v) = self.reputation {
            state.reputation = v;
        }
        if let Some(v) = self.streak {
            state.streak = v;
        }
        if let Some(v) = self.completed_jobs {
            state.completed_jobs = v;
        }
        if let Some(v) = self.premium_hint_dismissed {
            state.premium_hint_dismissed = v;
        }
        if let Some(v) = self.starter_tasks {
            state.starter_tasks = v;
        }
        if let Some(v) = self.starter_rewarded {
            state.starter_rewarded = v;
        }
        if let Some(v) = self.my_accepted {
            state.my_accepted = v;
        }
        if let Some(v) = self.task_files {
            state.task_files = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_snapshot_serializes_with_camel_case_keys() {
        let json = serde_json::to_value(AppState::default()).unwrap();
        assert_eq!(json["tokens"], 121);
        assert_eq!(json["completedJobs"], 0);
        assert_eq!(json["premiumHintDismissed"], false);
        assert_eq!(json["starterTasks"][0]["id"], "s1");
        assert!(json.get("premiumLastTrigger").is_none());
    }

    #[test]
    fn file_ref_uses_size_and_millisecond_timestamp() {
        let file = FileRef {
            id: "5-1700000000000-0".into(),
            name: "notes.pdf".into(),
            size_bytes: 2048,
            url: "blob:taskswap/00".into(),
            added_at: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
        };
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["size"], 2048);
        assert_eq!(json["addedAt"], 1_700_000_000_000i64);
    }

    #[test]
    fn patch_only_touches_given_fields() {
        let mut state = AppState::default();
        StatePatch { tokens: Some(3), ..Default::default() }.apply(&mut state);
        assert_eq!(state.tokens, 3);
        assert_eq!(state.streak, 6);
    }
}
