//! Starter gating: which sections stay locked until onboarding is finished.

use std::fmt;

use crate::types::StarterTask;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Section {
    StarterTasks,
    Overview,
    Marketplace,
    PostTask,
    Profile,
    Community,
    Safety,
    Faq,
    Premium,
}

impl Section {
    /// Navigation order of the regular tabs.
    pub const TABS: [Section; 8] = [
        Section::Overview,
        Section::Marketplace,
        Section::PostTask,
        Section::Profile,
        Section::Community,
        Section::Safety,
        Section::Faq,
        Section::Premium,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Section::StarterTasks => "Starter Tasks",
            Section::Overview => "Overview",
            Section::Marketplace => "Marketplace",
            Section::PostTask => "Post Task",
            Section::Profile => "Profile",
            Section::Community => "Community",
            Section::Safety => "Safety",
            Section::Faq => "FAQ",
            Section::Premium => "Premium",
        }
    }

    pub fn parse(s: &str) -> Option<Section> {
        let wanted = s.trim().to_ascii_lowercase().replace(['-', '_', ' '], "");
        [Section::StarterTasks].into_iter().chain(Section::TABS).find(|section| {
            section.label().to_ascii_lowercase().replace(' ', "") == wanted
        })
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Unlock flags derived from the starter list. Recompute on every render;
/// never store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StarterGates {
    pub s1_done: bool,
    pub s2_done: bool,
    pub s3_done: bool,
}

impl StarterGates {
    pub fn evaluate(tasks: &[StarterTask]) -> Self {
        // A missing id counts as not done.
        let done = |id: &str| tasks.iter().find(|t| t.id == id).is_some_and(|t| t.done);
        Self { s1_done: done("s1"), s2_done: done("s2"), s3_done: done("s3") }
    }

    pub fn all_done(&self) -> bool {
        self.s1_done && self.s2_done && self.s3_done
    }

    pub fn starter_active(&self) -> bool {
        !self.all_done()
    }

    pub fn is_locked(&self, section: Section) -> bool {
        let active = self.starter_active();
        match section {
            Section::Overview | Section::Marketplace => active,
            Section::PostTask => active && !self.s1_done,
            Section::Community => active && !self.s2_done,
            // Only reachable while onboarding is still running.
            Section::StarterTasks => !active,
            Section::Profile | Section::Safety | Section::Faq | Section::Premium => false,
        }
    }

    pub fn landing(&self) -> Section {
        if self.starter_active() {
            Section::StarterTasks
        } else {
            Section::Overview
        }
    }

    /// The tab that should be highlighted as the next onboarding step.
    pub fn highlighted(&self) -> Option<Section> {
        if !self.s1_done {
            Some(Section::Profile)
        } else if !self.s2_done {
            Some(Section::PostTask)
        } else if !self.s3_done {
            Some(Section::Community)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::default_starter_tasks;

    fn with_done(ids: &[&str]) -> Vec<StarterTask> {
        let mut tasks = default_starter_tasks();
        for t in &mut tasks {
            t.done = ids.contains(&t.id.as_str());
        }
        tasks
    }

    #[test]
    fn fresh_onboarding_locks_everything_but_profile_and_static_pages() {
        let gates = StarterGates::evaluate(&with_done(&[]));
        assert!(gates.starter_active());
        for locked in [Section::Overview, Section::Marketplace, Section::PostTask, Section::Community] {
            assert!(gates.is_locked(locked), "{locked}");
        }
        for open in [Section::Profile, Section::Safety, Section::Faq, Section::Premium, Section::StarterTasks] {
            assert!(!gates.is_locked(open), "{open}");
        }
        assert_eq!(gates.landing(), Section::StarterTasks);
        assert_eq!(gates.highlighted(), Some(Section::Profile));
    }

    #[test]
    fn partial_progress_unlocks_early_tabs() {
        let gates = StarterGates::evaluate(&with_done(&["s1"]));
        assert!(!gates.is_locked(Section::PostTask));
        assert!(gates.is_locked(Section::Community));
        assert!(gates.is_locked(Section::Marketplace));
        assert_eq!(gates.highlighted(), Some(Section::PostTask));

        let gates = StarterGates::evaluate(&with_done(&["s2"]));
        assert!(gates.is_locked(Section::PostTask));
        assert!(!gates.is_locked(Section::Community));
    }

    #[test]
    fn completing_all_three_unlocks_everything() {
        let gates = StarterGates::evaluate(&with_done(&["s1", "s2", "s3"]));
        assert!(!gates.starter_active());
        assert!(Section::TABS.iter().all(|s| !gates.is_locked(*s)));
        assert!(gates.is_locked(Section::StarterTasks));
        assert_eq!(gates.landing(), Section::Overview);
        assert_eq!(gates.highlighted(), None);
    }

    #[test]
    fn missing_ids_count_as_not_done() {
        let tasks = vec![StarterTask { id: "s1".into(), title: "Profile".into(), done: true }];
        let gates = StarterGates::evaluate(&tasks);
        assert!(gates.s1_done);
        assert!(!gates.s2_done && !gates.s3_done);
        assert!(gates.starter_active());
    }

    #[test]
    fn sections_parse_from_labels() {
        assert_eq!(Section::parse("post task"), Some(Section::PostTask));
        assert_eq!(Section::parse("FAQ"), Some(Section::Faq));
        assert_eq!(Section::parse("starter-tasks"), Some(Section::StarterTasks));
        assert_eq!(Section::parse("billing"), None);
    }
}
