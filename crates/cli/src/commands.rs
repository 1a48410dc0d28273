use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::cli::{AddArgs, CliCommand, DeleteArgs, IdArgs, ListArgs, UpdateArgs};
use crate::core::{derive, Outcome, TaskStore};
use crate::model::{Task, TaskFilters};
use crate::render;

/// Run one command against an initialized store. Returns `false` when the
/// command did not achieve what was asked (failures are already reported as
/// notices).
pub async fn execute<W: Write>(
    store: &TaskStore,
    command: CliCommand,
    mut writer: W,
    now: DateTime<Utc>,
) -> Result<bool> {
    match command {
        CliCommand::List(args) => handle_list(store, &args, &mut writer, now),
        CliCommand::Show(args) => handle_show(store, &args, &mut writer, now).await,
        CliCommand::Add(args) => handle_add(store, &args, &mut writer, now).await,
        CliCommand::Update(args) => handle_update(store, &args, &mut writer, now).await,
        CliCommand::Toggle(args) => handle_toggle(store, &args, &mut writer, now).await,
        CliCommand::Delete(args) => handle_delete(store, &args, &mut writer).await,
        CliCommand::Dashboard => handle_dashboard(store, &mut writer, now),
    }
}

fn handle_list<W: Write>(
    store: &TaskStore,
    args: &ListArgs,
    mut writer: W,
    now: DateTime<Utc>,
) -> Result<bool> {
    let filters = TaskFilters::from(args);
    let summary = filters.summary();
    store.set_filters(filters);
    let visible = store.visible_tasks();

    writeln!(writer, "{}", render::count_line(visible.len(), summary.is_some()))?;
    if let Some(summary) = summary {
        writeln!(writer, "Filters: {}", summary)?;
    }
    if visible.is_empty() {
        if store.is_empty() {
            writeln!(writer, "No tasks yet. Add one with `taskdeck add <TITLE>`.")?;
        } else {
            writeln!(writer, "Try adjusting your filters to see more tasks.")?;
        }
    }
    for task in &visible {
        writeln!(writer, "{}", render::task_line(task, now))?;
    }
    Ok(true)
}

async fn handle_show<W: Write>(
    store: &TaskStore,
    args: &IdArgs,
    mut writer: W,
    now: DateTime<Utc>,
) -> Result<bool> {
    let id = resolve_id(store, &args.id);
    match store.fetch(&id).await {
        Outcome::Applied(task) => {
            for line in render::task_detail(&task, now) {
                writeln!(writer, "{}", line)?;
            }
            Ok(true)
        }
        outcome => report_unapplied(outcome, &id, writer),
    }
}

async fn handle_add<W: Write>(
    store: &TaskStore,
    args: &AddArgs,
    mut writer: W,
    now: DateTime<Utc>,
) -> Result<bool> {
    let draft = args.to_draft()?;
    match store.add(draft).await {
        Ok(task) => {
            writeln!(writer, "Created {}", render::task_line(&task, now))?;
            Ok(true)
        }
        Err(_) => Ok(false),
    }
}

async fn handle_update<W: Write>(
    store: &TaskStore,
    args: &UpdateArgs,
    mut writer: W,
    now: DateTime<Utc>,
) -> Result<bool> {
    let patch = args.to_patch()?;
    let id = resolve_id(store, &args.id);
    match store.update(&id, patch).await {
        Outcome::Applied(task) => {
            writeln!(writer, "Updated {}", render::task_line(&task, now))?;
            Ok(true)
        }
        outcome => report_unapplied(outcome, &id, writer),
    }
}

async fn handle_toggle<W: Write>(
    store: &TaskStore,
    args: &IdArgs,
    mut writer: W,
    now: DateTime<Utc>,
) -> Result<bool> {
    let id = resolve_id(store, &args.id);
    match store.toggle_completion(&id).await {
        Outcome::Applied(task) => {
            let verb = if task.completed { "Completed" } else { "Reopened" };
            writeln!(writer, "{} {}", verb, render::task_line(&task, now))?;
            Ok(true)
        }
        outcome => report_unapplied(outcome, &id, writer),
    }
}

async fn handle_delete<W: Write>(
    store: &TaskStore,
    args: &DeleteArgs,
    mut writer: W,
) -> Result<bool> {
    let mut summary = DeleteSummary::default();
    for raw in &args.ids {
        let id = resolve_id(store, raw);
        match store.delete(&id).await {
            Outcome::Applied(_) => summary.deleted += 1,
            Outcome::NotFound(id) => summary.missing.push(id),
            Outcome::Failed(_) => summary.failed.push(id),
        }
    }
    summary.write_to(&mut writer)?;
    Ok(summary.failed.is_empty())
}

fn handle_dashboard<W: Write>(
    store: &TaskStore,
    mut writer: W,
    now: DateTime<Utc>,
) -> Result<bool> {
    for line in render::stats_lines(&store.stats(now)) {
        writeln!(writer, "{}", line)?;
    }

    let sections: [(&str, Vec<Task>); 2] = [
        ("Overdue", store.overdue(now)),
        ("Upcoming", store.upcoming(now)),
    ];
    for (title, mut tasks) in sections {
        if tasks.is_empty() {
            continue;
        }
        derive::canonical_sort(&mut tasks);
        writeln!(writer)?;
        writeln!(writer, "{} ({})", title, tasks.len())?;
        for task in &tasks {
            writeln!(writer, "  {}", render::task_line(task, now))?;
        }
    }
    Ok(true)
}

fn report_unapplied<W: Write>(outcome: Outcome<Task>, id: &str, mut writer: W) -> Result<bool> {
    if outcome.is_not_found() {
        writeln!(writer, "Task not found: {}", id)?;
    }
    Ok(false)
}

/// Exact id, or a unique prefix of one (as printed by `list`). A blank id is
/// never treated as a prefix.
fn resolve_id(store: &TaskStore, raw: &str) -> String {
    if raw.trim().is_empty() {
        return raw.to_string();
    }
    let tasks = store.tasks();
    if tasks.iter().any(|t| t.id == raw) {
        return raw.to_string();
    }
    let mut matches = tasks.iter().filter(|t| t.id.starts_with(raw));
    match (matches.next(), matches.next()) {
        (Some(task), None) => task.id.clone(),
        _ => raw.to_string(),
    }
}

#[derive(Default)]
struct DeleteSummary {
    deleted: usize,
    missing: Vec<String>,
    failed: Vec<String>,
}

impl DeleteSummary {
    fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        match self.deleted {
            0 => writeln!(writer, "No tasks deleted")?,
            1 => writeln!(writer, "Deleted 1 task")?,
            n => writeln!(writer, "Deleted {} tasks", n)?,
        }
        if !self.missing.is_empty() {
            writeln!(writer, "Not found: {}", self.missing.join(", "))?;
        }
        if !self.failed.is_empty() {
            writeln!(writer, "Failed: {}", self.failed.join(", "))?;
        }
        Ok(())
    }
}
