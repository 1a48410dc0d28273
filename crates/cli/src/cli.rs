use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{value_parser, Args, Parser, Subcommand};

use crate::model::{
    Category, DeadlineChange, Priority, TaskDraft, TaskFilters, TaskPatch, TaskStatus,
};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "taskdeck",
    version,
    about = "Track personal tasks with categories, priorities and deadlines.",
    after_help = "Examples:\n  taskdeck                      List tasks (same as `taskdeck list`)\n  taskdeck list --status pending --category work\n  taskdeck add Write quarterly report --priority high --deadline 2025-07-01\n  taskdeck toggle 01J9Z3\n  taskdeck --offline dashboard"
)]
pub struct Cli {
    /// Base URL of the task API (defaults to $TASKDECK_API_URL or http://localhost:8082/api)
    #[arg(long = "api-url", value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Request timeout in milliseconds (defaults to $TASKDECK_TIMEOUT_MS or 5000)
    #[arg(long = "timeout-ms", value_name = "MS", global = true, value_parser = value_parser!(u64))]
    pub timeout_ms: Option<u64>,

    /// Override the tracing filter (e.g. "info", "debug", or full directives)
    #[arg(long = "log", value_name = "DIRECTIVE", global = true)]
    pub log_filter: Option<String>,

    /// Run against an in-process sample server instead of the API
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// List tasks in display order (default command)
    List(ListArgs),
    /// Show a single task, refreshed from the server
    Show(IdArgs),
    /// Create a task
    Add(AddArgs),
    /// Change fields of an existing task
    Update(UpdateArgs),
    /// Flip a task between pending and completed
    Toggle(IdArgs),
    /// Delete one or more tasks by id
    Delete(DeleteArgs),
    /// Summary counts plus overdue and upcoming tasks
    Dashboard,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Only tasks in this category
    #[arg(long, value_enum, ignore_case = true)]
    pub category: Option<Category>,

    /// Only tasks with this priority
    #[arg(long, value_enum, ignore_case = true)]
    pub priority: Option<Priority>,

    /// Only pending or only completed tasks
    #[arg(long, value_enum, ignore_case = true)]
    pub status: Option<TaskStatus>,

    /// Case-insensitive text to look for in title or description
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct IdArgs {
    #[arg(value_name = "ID")]
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Task title
    #[arg(value_name = "TITLE", required = true)]
    pub title: Vec<String>,

    /// Optional longer description
    #[arg(long)]
    pub description: Option<String>,

    #[arg(long, value_enum, ignore_case = true, default_value_t = Category::Work)]
    pub category: Category,

    #[arg(long, value_enum, ignore_case = true, default_value_t = Priority::Medium)]
    pub priority: Priority,

    /// Deadline (ISO date e.g. 2025-07-01, or RFC 3339 timestamp)
    #[arg(long, value_name = "DATE", value_parser = parse_deadline)]
    pub deadline: Option<DateTime<Utc>>,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    #[arg(value_name = "ID")]
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long, value_enum, ignore_case = true)]
    pub category: Option<Category>,

    #[arg(long, value_enum, ignore_case = true)]
    pub priority: Option<Priority>,

    /// New deadline (ISO date or RFC 3339 timestamp)
    #[arg(
        long,
        value_name = "DATE",
        value_parser = parse_deadline,
        conflicts_with = "clear_deadline"
    )]
    pub deadline: Option<DateTime<Utc>>,

    /// Remove the deadline
    #[arg(long = "clear-deadline")]
    pub clear_deadline: bool,

    /// Set completion explicitly (true or false)
    #[arg(long, value_name = "BOOL", value_parser = value_parser!(bool))]
    pub completed: Option<bool>,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    /// One or more task ids to delete
    #[arg(value_name = "ID", required = true)]
    pub ids: Vec<String>,
}

impl From<&ListArgs> for TaskFilters {
    fn from(args: &ListArgs) -> Self {
        TaskFilters {
            category: args.category,
            priority: args.priority,
            status: args.status,
            search: args.search.clone(),
        }
    }
}

impl AddArgs {
    pub fn to_draft(&self) -> Result<TaskDraft> {
        let title = self.title.join(" ");
        if title.trim().is_empty() {
            return Err(anyhow!("Task title cannot be empty"));
        }
        let mut draft = TaskDraft::new(title.trim(), self.category, self.priority);
        if let Some(description) = &self.description {
            draft = draft.with_description(description.clone());
        }
        if let Some(deadline) = self.deadline {
            draft = draft.with_deadline(deadline);
        }
        Ok(draft)
    }
}

impl UpdateArgs {
    pub fn to_patch(&self) -> Result<TaskPatch> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(anyhow!("Task title cannot be empty"));
            }
        }
        let deadline = match (self.deadline, self.clear_deadline) {
            (Some(deadline), _) => DeadlineChange::Set(deadline),
            (None, true) => DeadlineChange::Clear,
            (None, false) => DeadlineChange::Keep,
        };
        Ok(TaskPatch {
            title: self.title.as_ref().map(|t| t.trim().to_string()),
            description: self.description.clone(),
            category: self.category,
            priority: self.priority,
            deadline,
            completed: self.completed,
        })
    }
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
pub fn parse_deadline(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|naive| naive.and_utc())
            .ok_or_else(|| anyhow!("Invalid deadline '{}'", raw));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| anyhow!("Invalid deadline '{}': expected YYYY-MM-DD or RFC 3339", raw))
}
