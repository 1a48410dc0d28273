use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use ulid::Ulid;

use super::{GatewayError, TaskGateway};
use crate::model::{ListQuery, Task};
use crate::wire::{format_timestamp, Page, TaskRequest, TaskResponse};

/// A gateway call as observed by [`MemoryGateway`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    List,
    Get(String),
    Create(String),
    Update(String),
    Delete(String),
}

#[derive(Debug, Default)]
struct MemoryState {
    tasks: Vec<TaskResponse>,
    failures: VecDeque<GatewayError>,
    delays: VecDeque<Duration>,
    calls: Vec<GatewayCall>,
}

/// In-process stand-in for the task API.
///
/// Assigns ULID ids and timestamps the way the server would. Failures and
/// response delays can be queued; each call consumes at most one of each.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    state: Mutex<MemoryState>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: &[Task]) -> Self {
        let gateway = Self::new();
        gateway.state.lock().tasks = tasks.iter().map(TaskResponse::from).collect();
        gateway
    }

    /// Fail the next call with `error`.
    pub fn fail_next(&self, error: GatewayError) {
        self.state.lock().failures.push_back(error);
    }

    /// Delay the response of the next call by `delay`.
    pub fn delay_next(&self, delay: Duration) {
        self.state.lock().delays.push_back(delay);
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.state.lock().calls.clone()
    }

    /// Server-side copy of a task, bypassing the call log.
    pub fn stored(&self, id: &str) -> Option<TaskResponse> {
        self.state.lock().tasks.iter().find(|t| t.id == id).cloned()
    }

    pub fn stored_len(&self) -> usize {
        self.state.lock().tasks.len()
    }

    async fn begin(&self, call: GatewayCall) -> Result<(), GatewayError> {
        let (delay, failure) = {
            let mut state = self.state.lock();
            state.calls.push(call);
            (state.delays.pop_front(), state.failures.pop_front())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TaskGateway for MemoryGateway {
    async fn list(&self, query: &ListQuery) -> Result<Page<TaskResponse>, GatewayError> {
        self.begin(GatewayCall::List).await?;
        let state = self.state.lock();
        let search = query.search.as_deref().map(str::to_lowercase);
        let content = state
            .tasks
            .iter()
            .filter(|t| query.category.map_or(true, |c| t.category == c))
            .filter(|t| query.priority.map_or(true, |p| t.priority == p))
            .filter(|t| query.completed.map_or(true, |c| t.completed == c))
            .filter(|t| {
                search.as_deref().map_or(true, |s| {
                    t.title.to_lowercase().contains(s)
                        || t.description
                            .as_deref()
                            .is_some_and(|d| d.to_lowercase().contains(s))
                })
            })
            .cloned()
            .collect();
        Ok(Page::single(content))
    }

    async fn get(&self, id: &str) -> Result<TaskResponse, GatewayError> {
        self.begin(GatewayCall::Get(id.to_string())).await?;
        self.stored(id).ok_or_else(|| GatewayError::not_found(id))
    }

    async fn create(&self, request: &TaskRequest) -> Result<TaskResponse, GatewayError> {
        self.begin(GatewayCall::Create(request.title.clone())).await?;
        let now = format_timestamp(&Utc::now());
        let created = TaskResponse {
            id: Ulid::new().to_string(),
            title: request.title.clone(),
            description: Some(request.description.clone()),
            category: request.category,
            priority: request.priority,
            deadline: request.deadline.clone(),
            completed: request.completed,
            created_at: now.clone(),
            updated_at: now,
        };
        self.state.lock().tasks.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: &str, request: &TaskRequest) -> Result<TaskResponse, GatewayError> {
        self.begin(GatewayCall::Update(id.to_string())).await?;
        let mut state = self.state.lock();
        let stored = state
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| GatewayError::not_found(id))?;
        stored.title = request.title.clone();
        stored.description = Some(request.description.clone());
        stored.category = request.category;
        stored.priority = request.priority;
        stored.deadline = request.deadline.clone();
        stored.completed = request.completed;
        stored.updated_at = format_timestamp(&Utc::now());
        Ok(stored.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), GatewayError> {
        self.begin(GatewayCall::Delete(id.to_string())).await?;
        let mut state = self.state.lock();
        let before = state.tasks.len();
        state.tasks.retain(|t| t.id != id);
        if state.tasks.len() == before {
            return Err(GatewayError::not_found(id));
        }
        Ok(())
    }
}
