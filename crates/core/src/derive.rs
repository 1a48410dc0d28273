//! Pure views over a task collection: grouping, deadline windows, filtering,
//! the canonical display order, and dashboard statistics.

use std::borrow::Borrow;
use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};

use crate::model::{Category, Priority, Task, TaskFilters};

/// How many days ahead a deadline counts as upcoming.
pub const UPCOMING_WINDOW_DAYS: i64 = 3;

pub fn upcoming_window() -> Duration {
    Duration::days(UPCOMING_WINDOW_DAYS)
}

pub fn by_category(tasks: &[Task], category: Category) -> Vec<&Task> {
    tasks.iter().filter(|t| t.category == category).collect()
}

/// Pending tasks due in `(now, now + 3 days]`.
pub fn upcoming(tasks: &[Task], now: DateTime<Utc>) -> Vec<&Task> {
    tasks.iter().filter(|t| is_upcoming(t, now)).collect()
}

/// Pending tasks whose deadline is strictly before `now`.
pub fn overdue(tasks: &[Task], now: DateTime<Utc>) -> Vec<&Task> {
    tasks.iter().filter(|t| is_overdue(t, now)).collect()
}

pub fn is_upcoming(task: &Task, now: DateTime<Utc>) -> bool {
    let horizon = now + upcoming_window();
    !task.completed && task.deadline.is_some_and(|d| d > now && d <= horizon)
}

pub fn is_overdue(task: &Task, now: DateTime<Utc>) -> bool {
    !task.completed && task.deadline.is_some_and(|d| d < now)
}

pub fn filtered<'a>(tasks: &'a [Task], filters: &TaskFilters) -> Vec<&'a Task> {
    tasks.iter().filter(|t| matches_filters(t, filters)).collect()
}

/// Category, priority and status must all match; the search term, when
/// present, then decides on its own.
pub fn matches_filters(task: &Task, filters: &TaskFilters) -> bool {
    if filters.category.is_some_and(|c| c != task.category) {
        return false;
    }
    if filters.priority.is_some_and(|p| p != task.priority) {
        return false;
    }
    if filters.status.is_some_and(|s| !s.matches(task.completed)) {
        return false;
    }
    match filters.search_term() {
        Some(search) => {
            let needle = search.to_lowercase();
            task.title.to_lowercase().contains(&needle)
                || task.description.to_lowercase().contains(&needle)
        }
        None => true,
    }
}

/// Display order: pending first, higher priority first, dated before undated
/// (earliest first), newest created first, then id.
pub fn compare_canonical(a: &Task, b: &Task) -> Ordering {
    a.completed
        .cmp(&b.completed)
        .then_with(|| b.priority.rank().cmp(&a.priority.rank()))
        .then_with(|| match (a.deadline, b.deadline) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn canonical_sort<T: Borrow<Task>>(tasks: &mut [T]) {
    tasks.sort_by(|a, b| compare_canonical(a.borrow(), b.borrow()));
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryStats {
    pub category: Category,
    pub total: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
    pub overdue: usize,
    pub upcoming: usize,
    pub high_priority_pending: usize,
    pub categories: Vec<CategoryStats>,
}

impl TaskStats {
    pub fn collect(tasks: &[Task], now: DateTime<Utc>) -> Self {
        let completed = tasks.iter().filter(|t| t.completed).count();
        let categories = Category::ALL
            .into_iter()
            .map(|category| {
                let group = by_category(tasks, category);
                CategoryStats {
                    category,
                    total: group.len(),
                    completed: group.iter().filter(|t| t.completed).count(),
                }
            })
            .collect();

        Self {
            total: tasks.len(),
            completed,
            pending: tasks.len() - completed,
            overdue: overdue(tasks, now).len(),
            upcoming: upcoming(tasks, now).len(),
            high_priority_pending: tasks
                .iter()
                .filter(|t| t.priority == Priority::High && !t.completed)
                .count(),
            categories,
        }
    }

    /// Completed share in percent; zero for an empty collection.
    pub fn completion_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }

    pub fn category(&self, category: Category) -> Option<&CategoryStats> {
        self.categories.iter().find(|c| c.category == category)
    }
}
