//! Marketplace listing: filter, sort, paginate and per-status counters.

use std::cmp::Ordering;

use crate::lifecycle::{Category, Task, TaskStatus};

pub const DEFAULT_PAGE_SIZE: usize = 6;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortKey {
    Tokens,
    #[default]
    Newest,
    Reputation,
    Title,
}

impl SortKey {
    pub fn parse(s: &str) -> Option<SortKey> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tokens" => Some(SortKey::Tokens),
            "newest" => Some(SortKey::Newest),
            "reputation" => Some(SortKey::Reputation),
            "title" => Some(SortKey::Title),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TaskFilter {
    /// `None` lists every status.
    pub status: Option<TaskStatus>,
    /// `None` lists every category.
    pub category: Option<Category>,
    pub min_tokens: u32,
    pub max_tokens: u32,
    pub sort: SortKey,
}

impl Default for TaskFilter {
    fn default() -> Self {
        Self {
            status: Some(TaskStatus::Open),
            category: None,
            min_tokens: 0,
            max_tokens: 60,
            sort: SortKey::Newest,
        }
    }
}

impl TaskFilter {
    fn matches(&self, task: &Task) -> bool {
        self.status.map_or(true, |s| task.status == s)
            && self.category.map_or(true, |c| task.category == c)
            && (self.min_tokens..=self.max_tokens).contains(&task.tokens)
    }
}

pub fn apply_filters(tasks: &[Task], filter: &TaskFilter) -> Vec<Task> {
    let mut out: Vec<Task> = tasks.iter().filter(|t| filter.matches(t)).cloned().collect();
    match filter.sort {
        SortKey::Tokens => out.sort_by(|a, b| b.tokens.cmp(&a.tokens)),
        SortKey::Newest => out.sort_by(|a, b| b.id.cmp(&a.id)),
        SortKey::Reputation => out.sort_by(|a, b| b.reputation.total_cmp(&a.reputation)),
        SortKey::Title => out.sort_by(|a, b| compare_titles(&a.title, &b.title)),
    }
    out
}

fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    pub page: usize,
    pub pages: usize,
    pub total: usize,
    pub items: Vec<T>,
}

/// `page` is 1-based. A page past the end comes back empty.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total = items.len();
    let pages = total.div_ceil(per_page).max(1);
    let start = page.saturating_sub(1).saturating_mul(per_page).min(total);
    let end = start.saturating_add(per_page).min(total);
    Page { page, pages, total, items: items[start..end].to_vec() }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusCounters {
    pub open: usize,
    pub in_progress: usize,
    pub delivered: usize,
    pub done: usize,
}

impl StatusCounters {
    pub fn tally(tasks: &[Task]) -> Self {
        tasks.iter().fold(Self::default(), |mut c, t| {
            match t.status {
                TaskStatus::Open => c.open += 1,
                TaskStatus::InProgress => c.in_progress += 1,
                TaskStatus::Delivered => c.delivered += 1,
                TaskStatus::Done => c.done += 1,
                TaskStatus::Disputed => {}
            }
            c
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::SEED_TASKS;

    #[test]
    fn default_filter_lists_open_tasks_newest_first() {
        let out = apply_filters(&SEED_TASKS, &TaskFilter::default());
        assert_eq!(out.len(), 14);
        assert_eq!(out.first().map(|t| t.id), Some(20));
        assert!(out.windows(2).all(|w| w[0].id > w[1].id));
    }

    #[test]
    fn category_and_token_range() {
        let filter = TaskFilter {
            status: None,
            category: Some(Category::Coding),
            min_tokens: 13,
            max_tokens: 20,
            sort: SortKey::Tokens,
        };
        let ids: Vec<_> = apply_filters(&SEED_TASKS, &filter).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![6, 16, 12]);
    }

    #[test]
    fn reputation_and_title_sorts() {
        let all = TaskFilter { status: None, ..Default::default() };
        let by_rep = apply_filters(&SEED_TASKS, &TaskFilter { sort: SortKey::Reputation, ..all.clone() });
        assert_eq!(by_rep[0].id, 5);

        let by_title = apply_filters(&SEED_TASKS, &TaskFilter { sort: SortKey::Title, ..all });
        assert_eq!(by_title[0].title, "Biology flashcards");
        assert_eq!(by_title.last().map(|t| t.title.as_str()), Some("TikTok edit"));
    }

    #[test]
    fn pagination() {
        let items: Vec<u32> = (1..=14).collect();
        let p = paginate(&items, 1, DEFAULT_PAGE_SIZE);
        assert_eq!((p.pages, p.total, p.items.len()), (3, 14, 6));
        let p = paginate(&items, 3, DEFAULT_PAGE_SIZE);
        assert_eq!(p.items, vec![13, 14]);
        let p = paginate(&items, 9, DEFAULT_PAGE_SIZE);
        assert!(p.items.is_empty());
        let p = paginate::<u32>(&[], 1, DEFAULT_PAGE_SIZE);
        assert_eq!(p.pages, 1);
    }

    #[test]
    fn counters_cover_the_whole_list() {
        let c = StatusCounters::tally(&SEED_TASKS);
        assert_eq!(c, StatusCounters { open: 14, in_progress: 2, delivered: 3, done: 1 });
    }
}
