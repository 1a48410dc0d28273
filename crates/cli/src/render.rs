use chrono::{DateTime, Duration, Utc};

use crate::core::derive;
use crate::core::TaskStats;
use crate::model::{Category, Task};

pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(10) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// Deadline label relative to `now`, by calendar day in UTC.
pub fn deadline_label(task: &Task, now: DateTime<Utc>) -> Option<String> {
    let deadline = task.deadline?;
    let today = now.date_naive();
    let day = deadline.date_naive();
    let label = if derive::is_overdue(task, now) && day != today {
        "Overdue".to_string()
    } else if day == today {
        "Due today".to_string()
    } else if day == today + Duration::days(1) {
        "Due tomorrow".to_string()
    } else {
        format!("Due {}", deadline.format("%b %-d, %Y"))
    };
    Some(label)
}

pub fn task_line(task: &Task, now: DateTime<Utc>) -> String {
    let mark = if task.completed { "[x]" } else { "[ ]" };
    let mut line = format!(
        "{} {:<10} {:<6} {:<8} {}",
        mark,
        short_id(&task.id),
        task.priority.as_str(),
        task.category.as_str(),
        task.title
    );
    if let Some(label) = deadline_label(task, now) {
        line.push_str(&format!("  ({label})"));
    }
    line
}

pub fn task_detail(task: &Task, now: DateTime<Utc>) -> Vec<String> {
    let mut lines = vec![
        format!("{}  {}", task.id, task.title),
        format!(
            "  status: {}   category: {}   priority: {}",
            if task.completed { "completed" } else { "pending" },
            task.category,
            task.priority
        ),
    ];
    if !task.description.is_empty() {
        lines.push(format!("  {}", task.description));
    }
    if let Some(label) = deadline_label(task, now) {
        lines.push(format!("  {label}"));
    }
    lines.push(format!(
        "  created {}   updated {}",
        task.created_at.format("%Y-%m-%d %H:%M"),
        task.updated_at.format("%Y-%m-%d %H:%M")
    ));
    lines
}

pub fn count_line(count: usize, filtered: bool) -> String {
    format!(
        "{} task{} found{}",
        count,
        if count == 1 { "" } else { "s" },
        if filtered { " (filtered)" } else { "" }
    )
}

pub fn stats_lines(stats: &TaskStats) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Total: {}   Completed: {}   Pending: {}   Overdue: {}",
            stats.total, stats.completed, stats.pending, stats.overdue
        ),
        format!("Completion: {:.0}%", stats.completion_rate()),
    ];
    for category in Category::ALL {
        if let Some(entry) = stats.category(category) {
            lines.push(format!(
                "  {:<8} {} task{}, {} completed",
                category.as_str(),
                entry.total,
                if entry.total == 1 { "" } else { "s" },
                entry.completed
            ));
        }
    }
    lines.push(format!("High priority pending: {}", stats.high_priority_pending));
    lines
}
