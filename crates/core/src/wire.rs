//! Wire representation of tasks as exchanged with the remote API.
//!
//! Enumerations travel in their uppercase form and timestamps as ISO-8601
//! strings. The server emits deadlines as bare dates and audit timestamps as
//! local date-times without an offset, so [`parse_timestamp`] accepts those
//! alongside RFC 3339 and reads offset-less values as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Category, Priority, Task, TaskDraft};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("invalid {field} timestamp '{value}'")]
    Timestamp { field: &'static str, value: String },
}

/// Request body for create and (full replacement) update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub title: String,
    pub description: String,
    pub category: Category,
    pub priority: Priority,
    pub deadline: Option<String>,
    pub completed: bool,
}

impl From<&TaskDraft> for TaskRequest {
    fn from(draft: &TaskDraft) -> Self {
        Self {
            title: draft.title.clone(),
            description: draft.description.clone(),
            category: draft.category,
            priority: draft.priority,
            deadline: draft.deadline.as_ref().map(format_timestamp),
            completed: draft.completed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: Category,
    pub priority: Priority,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<TaskResponse> for Task {
    type Error = WireError;

    fn try_from(wire: TaskResponse) -> Result<Self, Self::Error> {
        let deadline = wire
            .deadline
            .as_deref()
            .map(|raw| parse_field("deadline", raw))
            .transpose()?;
        Ok(Task {
            created_at: parse_field("createdAt", &wire.created_at)?,
            updated_at: parse_field("updatedAt", &wire.updated_at)?,
            id: wire.id,
            title: wire.title,
            description: wire.description.unwrap_or_default(),
            category: wire.category,
            priority: wire.priority,
            deadline,
            completed: wire.completed,
        })
    }
}

impl From<&Task> for TaskResponse {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            description: Some(task.description.clone()),
            category: task.category,
            priority: task.priority,
            deadline: task.deadline.as_ref().map(format_timestamp),
            completed: task.completed,
            created_at: format_timestamp(&task.created_at),
            updated_at: format_timestamp(&task.updated_at),
        }
    }
}

/// One page of a listing. Only `content` is consumed; the rest is informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    #[serde(default)]
    pub total_elements: u64,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub number: u32,
    #[serde(default)]
    pub size: u32,
}

impl<T> Page<T> {
    pub fn single(content: Vec<T>) -> Self {
        let len = content.len();
        Self {
            content,
            total_elements: len as u64,
            total_pages: 1,
            number: 0,
            size: len as u32,
        }
    }
}

pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = raw.parse::<NaiveDateTime>() {
        return Some(naive.and_utc());
    }
    raw.parse::<NaiveDate>()
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_field(field: &'static str, raw: &str) -> Result<DateTime<Utc>, WireError> {
    parse_timestamp(raw).ok_or_else(|| WireError::Timestamp {
        field,
        value: raw.to_string(),
    })
}
