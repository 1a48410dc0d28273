//! The in-memory task collection and the single choke-point for mutations.
//!
//! Every mutation goes to the gateway first and touches local state only once
//! the server has answered successfully. The collection lock is never held
//! across an `.await`, so two mutations on the same task may overlap: both
//! merge against the same snapshot and whichever response is reconciled last
//! wins. Callers needing single-writer semantics must serialize themselves.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use thiserror::Error;

use crate::derive::{self, TaskStats};
use crate::gateway::{GatewayError, TaskGateway};
use crate::model::{Category, ListQuery, Task, TaskDraft, TaskFilters, TaskPatch};
use crate::notify::{Notice, Notifier};
use crate::wire::{TaskRequest, TaskResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
    Fetch,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Create => "create",
            MutationKind::Update => "update",
            MutationKind::Delete => "delete",
            MutationKind::Fetch => "fetch",
        }
    }

    fn error_title(&self) -> &'static str {
        match self {
            MutationKind::Create => "Error creating task",
            MutationKind::Update => "Error updating task",
            MutationKind::Delete => "Error deleting task",
            MutationKind::Fetch => "Error loading task",
        }
    }

    fn fallback_detail(&self) -> &'static str {
        match self {
            MutationKind::Create => "Could not create task.",
            MutationKind::Update => "Could not update task.",
            MutationKind::Delete => "Could not delete task.",
            MutationKind::Fetch => "Could not load task.",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to load tasks: {0}")]
    Load(#[source] GatewayError),
    #[error("failed to {action} task: {source}")]
    Mutation {
        action: MutationKind,
        #[source]
        source: GatewayError,
    },
}

impl StoreError {
    pub fn gateway_error(&self) -> &GatewayError {
        match self {
            StoreError::Load(source) | StoreError::Mutation { source, .. } => source,
        }
    }
}

/// Result of an operation that targets a task by id.
#[must_use]
#[derive(Debug)]
pub enum Outcome<T> {
    Applied(T),
    /// The id is not in the local collection; nothing was sent.
    NotFound(String),
    Failed(StoreError),
}

impl<T> Outcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Outcome::NotFound(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            Outcome::NotFound(_) | Outcome::Failed(_) => None,
        }
    }
}

pub struct TaskStore {
    gateway: Arc<dyn TaskGateway>,
    notifier: Arc<dyn Notifier>,
    tasks: Mutex<Vec<Task>>,
    filters: Mutex<TaskFilters>,
}

impl fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskStore")
            .field("tasks", &self.tasks.lock().len())
            .field("filters", &*self.filters.lock())
            .finish()
    }
}

impl TaskStore {
    /// Create an empty store. Call [`TaskStore::initialize`] to load the collection.
    pub fn new(gateway: Arc<dyn TaskGateway>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            gateway,
            notifier,
            tasks: Mutex::new(Vec::new()),
            filters: Mutex::new(TaskFilters::default()),
        }
    }

    /// Replace the collection with the first page from the server. On failure
    /// the collection is left empty.
    pub async fn initialize(&self) -> Result<usize, StoreError> {
        let result = self.load(&ListQuery::default()).await;
        if result.is_err() {
            self.tasks.lock().clear();
        }
        result
    }

    /// Reload with optional passthrough query. On failure the current
    /// collection is kept.
    pub async fn refresh(&self, query: &ListQuery) -> Result<usize, StoreError> {
        self.load(query).await
    }

    async fn load(&self, query: &ListQuery) -> Result<usize, StoreError> {
        let result = match self.gateway.list(query).await {
            Ok(page) => page
                .content
                .into_iter()
                .map(to_local)
                .collect::<Result<Vec<_>, _>>(),
            Err(err) => Err(err),
        };

        match result {
            Ok(mut tasks) => {
                dedup_by_id(&mut tasks);
                let count = tasks.len();
                *self.tasks.lock() = tasks;
                tracing::debug!(count, "loaded tasks");
                Ok(count)
            }
            Err(err) => {
                tracing::warn!(error = %err, status = ?err.status(), "failed to load tasks");
                self.notifier.notify(Notice::error(
                    "Error loading tasks",
                    detail_for(&err, "Could not load tasks."),
                ));
                Err(StoreError::Load(err))
            }
        }
    }

    /// Create a task and put it at the front of the collection.
    pub async fn add(&self, draft: TaskDraft) -> Result<Task, StoreError> {
        let request = TaskRequest::from(&draft);
        let result = match self.gateway.create(&request).await {
            Ok(wire) => to_local(wire),
            Err(err) => Err(err),
        };

        match result {
            Ok(task) => {
                {
                    let mut tasks = self.tasks.lock();
                    tasks.retain(|t| t.id != task.id);
                    tasks.insert(0, task.clone());
                }
                tracing::debug!(task_id = task.id.as_str(), "task created");
                self.notifier.notify(Notice::success(
                    "Task created",
                    format!("\"{}\" added.", task.title),
                ));
                Ok(task)
            }
            Err(err) => Err(self.mutation_failed(MutationKind::Create, None, err)),
        }
    }

    /// Merge `patch` over the local copy and send the full result. Omitted
    /// patch fields keep their current values.
    pub async fn update(&self, id: &str, patch: TaskPatch) -> Outcome<Task> {
        let Some(existing) = self.get(id) else {
            tracing::debug!(task_id = id, "update skipped: task not in collection");
            return Outcome::NotFound(id.to_string());
        };

        let merged = patch.merge_onto(&existing);
        let request = TaskRequest::from(&merged);
        let result = match self.gateway.update(id, &request).await {
            Ok(wire) => to_local(wire),
            Err(err) => Err(err),
        };

        match result {
            Ok(task) => {
                {
                    let mut tasks = self.tasks.lock();
                    if let Some(slot) = tasks.iter_mut().find(|t| t.id == id) {
                        *slot = task.clone();
                    } else {
                        tracing::debug!(task_id = id, "updated task no longer in collection");
                    }
                }
                tracing::debug!(task_id = id, "task updated");
                self.notifier.notify(Notice::success(
                    "Task updated",
                    format!("\"{}\" saved.", task.title),
                ));
                Outcome::Applied(task)
            }
            Err(err) => Outcome::Failed(self.mutation_failed(MutationKind::Update, Some(id), err)),
        }
    }

    /// Delete on the server, then drop the local copy. Returns the removed task.
    pub async fn delete(&self, id: &str) -> Outcome<Task> {
        let Some(existing) = self.get(id) else {
            tracing::debug!(task_id = id, "delete skipped: task not in collection");
            return Outcome::NotFound(id.to_string());
        };

        match self.gateway.delete(id).await {
            Ok(()) => {
                self.tasks.lock().retain(|t| t.id != id);
                tracing::debug!(task_id = id, "task deleted");
                self.notifier.notify(Notice::success("Task deleted", "Task removed."));
                Outcome::Applied(existing)
            }
            Err(err) => Outcome::Failed(self.mutation_failed(MutationKind::Delete, Some(id), err)),
        }
    }

    pub async fn toggle_completion(&self, id: &str) -> Outcome<Task> {
        let Some(existing) = self.get(id) else {
            return Outcome::NotFound(id.to_string());
        };
        self.update(id, TaskPatch::completed(!existing.completed)).await
    }

    /// Pull one task from the server and upsert it. A 404 drops any stale
    /// local copy and reports `NotFound`.
    pub async fn fetch(&self, id: &str) -> Outcome<Task> {
        let result = match self.gateway.get(id).await {
            Ok(wire) => to_local(wire),
            Err(err) => Err(err),
        };

        match result {
            Ok(task) => {
                let mut tasks = self.tasks.lock();
                match tasks.iter_mut().find(|t| t.id == task.id) {
                    Some(slot) => *slot = task.clone(),
                    None => tasks.insert(0, task.clone()),
                }
                Outcome::Applied(task)
            }
            Err(err) if err.status() == Some(404) => {
                let removed = {
                    let mut tasks = self.tasks.lock();
                    let before = tasks.len();
                    tasks.retain(|t| t.id != id);
                    before != tasks.len()
                };
                tracing::debug!(task_id = id, removed, "task missing on server");
                Outcome::NotFound(id.to_string())
            }
            Err(err) => Outcome::Failed(self.mutation_failed(MutationKind::Fetch, Some(id), err)),
        }
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.lock().clone()
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        self.tasks.lock().iter().find(|t| t.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.lock().is_empty()
    }

    pub fn filters(&self) -> TaskFilters {
        self.filters.lock().clone()
    }

    pub fn set_filters(&self, filters: TaskFilters) {
        *self.filters.lock() = filters;
    }

    pub fn clear_filters(&self) {
        *self.filters.lock() = TaskFilters::default();
    }

    /// Current filters applied, in canonical display order.
    pub fn visible_tasks(&self) -> Vec<Task> {
        let filters = self.filters();
        let tasks = self.tasks.lock();
        let mut visible: Vec<Task> = derive::filtered(&tasks, &filters)
            .into_iter()
            .cloned()
            .collect();
        drop(tasks);
        derive::canonical_sort(&mut visible);
        visible
    }

    pub fn by_category(&self, category: Category) -> Vec<Task> {
        let tasks = self.tasks.lock();
        derive::by_category(&tasks, category).into_iter().cloned().collect()
    }

    pub fn upcoming(&self, now: DateTime<Utc>) -> Vec<Task> {
        let tasks = self.tasks.lock();
        derive::upcoming(&tasks, now).into_iter().cloned().collect()
    }

    pub fn overdue(&self, now: DateTime<Utc>) -> Vec<Task> {
        let tasks = self.tasks.lock();
        derive::overdue(&tasks, now).into_iter().cloned().collect()
    }

    pub fn stats(&self, now: DateTime<Utc>) -> TaskStats {
        TaskStats::collect(&self.tasks.lock(), now)
    }

    fn mutation_failed(
        &self,
        action: MutationKind,
        id: Option<&str>,
        err: GatewayError,
    ) -> StoreError {
        tracing::warn!(
            action = action.as_str(),
            task_id = id.unwrap_or_default(),
            status = ?err.status(),
            error = %err,
            "task mutation failed"
        );
        self.notifier.notify(Notice::error(
            action.error_title(),
            detail_for(&err, action.fallback_detail()),
        ));
        StoreError::Mutation {
            action,
            source: err,
        }
    }
}

fn to_local(wire: TaskResponse) -> Result<Task, GatewayError> {
    Task::try_from(wire).map_err(GatewayError::from)
}

fn detail_for(err: &GatewayError, fallback: &str) -> String {
    err.server_message().unwrap_or(fallback).to_string()
}

fn dedup_by_id(tasks: &mut Vec<Task>) {
    let mut seen = std::collections::HashSet::new();
    tasks.retain(|t| seen.insert(t.id.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    use chrono::{Duration, TimeZone};
    use pretty_assertions::assert_eq;

    use crate::gateway::{GatewayCall, MemoryGateway};
    use crate::model::{DeadlineChange, Priority, TaskStatus};
    use crate::notify::{NoticeLevel, RecordingNotifier};

    fn seed(id: &str, title: &str, category: Category, priority: Priority) -> Task {
        let created = Utc.with_ymd_and_hms(2025, 2, 1, 9, 0, 0).unwrap();
        Task {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            category,
            priority,
            deadline: None,
            completed: false,
            created_at: created,
            updated_at: created,
        }
    }

    async fn store_with(
        seeds: &[Task],
    ) -> (TaskStore, Arc<MemoryGateway>, Arc<RecordingNotifier>) {
        let gateway = Arc::new(MemoryGateway::with_tasks(seeds));
        let notifier = Arc::new(RecordingNotifier::new());
        let store = TaskStore::new(gateway.clone(), notifier.clone());
        store.initialize().await.expect("initialize");
        notifier.drain();
        (store, gateway, notifier)
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    #[tokio::test]
    async fn initialize_loads_server_collection() {
        let (store, gateway, _) = store_with(&[
            seed("1", "Write proposal", Category::Work, Priority::High),
            seed("2", "Groceries", Category::Personal, Priority::Low),
        ])
        .await;
        assert_eq!(ids(&store.tasks()), vec!["1", "2"]);
        assert_eq!(gateway.calls(), vec![GatewayCall::List]);
    }

    #[tokio::test]
    async fn initialize_failure_leaves_collection_empty() {
        let gateway = Arc::new(MemoryGateway::with_tasks(&[seed(
            "1",
            "Write proposal",
            Category::Work,
            Priority::High,
        )]));
        gateway.fail_next(GatewayError::Transport("connection refused".into()));
        let notifier = Arc::new(RecordingNotifier::new());
        let store = TaskStore::new(gateway.clone(), notifier.clone());

        let err = store.initialize().await.unwrap_err();
        assert!(matches!(err, StoreError::Load(GatewayError::Transport(_))));
        assert!(store.is_empty());
        assert_eq!(
            notifier.last(),
            Some(Notice::error("Error loading tasks", "Could not load tasks."))
        );
    }

    #[tokio::test]
    async fn refresh_failure_keeps_existing_collection() {
        let (store, gateway, _) =
            store_with(&[seed("1", "Write proposal", Category::Work, Priority::High)]).await;
        gateway.fail_next(GatewayError::Status {
            status: 500,
            message: Some("database unavailable".into()),
        });
        assert!(store.refresh(&ListQuery::default()).await.is_err());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn add_prepends_created_task() {
        let (store, gateway, notifier) =
            store_with(&[seed("1", "Write proposal", Category::Work, Priority::High)]).await;

        let created = store
            .add(TaskDraft::new("Learn lifetimes", Category::Learning, Priority::Medium))
            .await
            .expect("create");

        assert_eq!(store.len(), 2);
        assert_eq!(store.tasks()[0], created);
        assert!(gateway.stored(&created.id).is_some());
        assert_eq!(
            notifier.last(),
            Some(Notice::success("Task created", "\"Learn lifetimes\" added."))
        );
    }

    #[tokio::test]
    async fn add_failure_leaves_collection_unchanged() {
        let (store, gateway, notifier) =
            store_with(&[seed("1", "Write proposal", Category::Work, Priority::High)]).await;
        gateway.fail_next(GatewayError::Transport("network unreachable".into()));

        let before = store.len();
        let result = store
            .add(TaskDraft::new("Never stored", Category::Work, Priority::Low))
            .await;

        assert!(matches!(
            result,
            Err(StoreError::Mutation {
                action: MutationKind::Create,
                ..
            })
        ));
        assert_eq!(store.len(), before);
        let notice = notifier.last().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.detail, "Could not create task.");
    }

    #[tokio::test]
    async fn server_message_is_used_as_notice_detail() {
        let (store, gateway, notifier) = store_with(&[]).await;
        gateway.fail_next(GatewayError::Status {
            status: 400,
            message: Some("title must not be blank".into()),
        });
        let _ = store
            .add(TaskDraft::new("", Category::Work, Priority::Low))
            .await;
        assert_eq!(
            notifier.last(),
            Some(Notice::error("Error creating task", "title must not be blank"))
        );
    }

    #[tokio::test]
    async fn update_replaces_in_place() {
        let (store, _, notifier) = store_with(&[
            seed("1", "First", Category::Work, Priority::High),
            seed("2", "Second", Category::Work, Priority::High),
            seed("3", "Third", Category::Work, Priority::High),
        ])
        .await;

        let patch = TaskPatch {
            title: Some("Second, revised".into()),
            priority: Some(Priority::Low),
            ..TaskPatch::default()
        };
        let updated = store.update("2", patch).await.applied().expect("applied");

        assert_eq!(ids(&store.tasks()), vec!["1", "2", "3"]);
        assert_eq!(store.get("2"), Some(updated.clone()));
        assert_eq!(updated.title, "Second, revised");
        assert_eq!(updated.priority, Priority::Low);
        assert_eq!(
            notifier.last(),
            Some(Notice::success("Task updated", "\"Second, revised\" saved."))
        );
    }

    #[tokio::test]
    async fn explicit_deadline_clear_differs_from_omitted_deadline() {
        let deadline = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let mut dated = seed("1", "Taxes", Category::Personal, Priority::High);
        dated.deadline = Some(deadline);
        let (store, _, _) = store_with(&[dated]).await;

        let kept = store
            .update("1", TaskPatch::default())
            .await
            .applied()
            .unwrap();
        assert_eq!(kept.deadline, Some(deadline));
        assert_eq!(kept.title, "Taxes");
        assert_eq!(kept.priority, Priority::High);

        let cleared = store
            .update(
                "1",
                TaskPatch {
                    deadline: DeadlineChange::Clear,
                    ..TaskPatch::default()
                },
            )
            .await
            .applied()
            .unwrap();
        assert_eq!(cleared.deadline, None);
    }

    #[tokio::test]
    async fn update_failure_keeps_local_copy() {
        let (store, gateway, _) =
            store_with(&[seed("1", "Write proposal", Category::Work, Priority::High)]).await;
        let before = store.tasks();
        gateway.fail_next(GatewayError::Status {
            status: 500,
            message: None,
        });

        let outcome = store.update("1", TaskPatch::completed(true)).await;
        assert!(outcome.is_failed());
        assert_eq!(store.tasks(), before);
    }

    #[tokio::test]
    async fn missing_ids_are_reported_without_gateway_calls() {
        let (store, gateway, notifier) =
            store_with(&[seed("1", "Write proposal", Category::Work, Priority::High)]).await;

        assert!(store.delete("nope").await.is_not_found());
        assert!(store.update("nope", TaskPatch::completed(true)).await.is_not_found());
        assert!(store.toggle_completion("nope").await.is_not_found());

        assert_eq!(store.len(), 1);
        assert_eq!(gateway.calls(), vec![GatewayCall::List]);
        assert!(notifier.notices().is_empty());
    }

    #[tokio::test]
    async fn delete_removes_entry_after_server_confirms() {
        let (store, gateway, notifier) = store_with(&[
            seed("1", "Write proposal", Category::Work, Priority::High),
            seed("2", "Groceries", Category::Personal, Priority::Low),
        ])
        .await;

        let removed = store.delete("1").await.applied().expect("deleted");
        assert_eq!(removed.id, "1");
        assert_eq!(ids(&store.tasks()), vec!["2"]);
        assert_eq!(gateway.stored_len(), 1);
        assert_eq!(
            notifier.last(),
            Some(Notice::success("Task deleted", "Task removed."))
        );
    }

    #[tokio::test]
    async fn delete_failure_keeps_entry() {
        let (store, gateway, notifier) =
            store_with(&[seed("1", "Write proposal", Category::Work, Priority::High)]).await;
        gateway.fail_next(GatewayError::Transport("timeout".into()));

        assert!(store.delete("1").await.is_failed());
        assert_eq!(store.len(), 1);
        assert_eq!(notifier.last().unwrap().title, "Error deleting task");
    }

    #[tokio::test]
    async fn toggle_flips_completion() {
        let (store, _, _) =
            store_with(&[seed("1", "Write proposal", Category::Work, Priority::High)]).await;

        let done = store.toggle_completion("1").await.applied().unwrap();
        assert!(done.completed);
        let reopened = store.toggle_completion("1").await.applied().unwrap();
        assert!(!reopened.completed);
    }

    #[tokio::test]
    async fn fetch_upserts_and_drops_tasks_gone_from_server() {
        let (store, gateway, _) =
            store_with(&[seed("1", "Write proposal", Category::Work, Priority::High)]).await;

        // Created behind the store's back.
        let draft = TaskDraft::new("Elsewhere", Category::Work, Priority::Low);
        let request = TaskRequest::from(&draft);
        let remote = gateway.create(&request).await.unwrap();
        let fetched = store.fetch(&remote.id).await.applied().expect("fetched");
        assert_eq!(store.tasks()[0], fetched);

        gateway.delete("1").await.unwrap();
        assert!(store.fetch("1").await.is_not_found());
        assert_eq!(ids(&store.tasks()), vec![remote.id.as_str()]);
    }

    #[tokio::test]
    async fn overlapping_updates_keep_the_last_reconciled_response() {
        let (store, gateway, _) =
            store_with(&[seed("1", "Original", Category::Work, Priority::Medium)]).await;

        // The rename answers last, so its stale snapshot (completed = false) wins.
        gateway.delay_next(StdDuration::from_millis(60));
        gateway.delay_next(StdDuration::from_millis(5));
        let rename = TaskPatch {
            title: Some("Renamed".into()),
            ..TaskPatch::default()
        };
        let (first, second) = tokio::join!(
            store.update("1", rename),
            store.update("1", TaskPatch::completed(true)),
        );
        assert!(first.is_applied());
        assert!(second.is_applied());

        let local = store.get("1").unwrap();
        assert_eq!(local.title, "Renamed");
        assert!(!local.completed);
        let remote = gateway.stored("1").unwrap();
        assert_eq!(remote.title, "Renamed");
        assert!(!remote.completed);
    }

    #[tokio::test]
    async fn visible_tasks_apply_filters_and_canonical_order() {
        let mut done = seed("done", "Finished thing", Category::Work, Priority::High);
        done.completed = true;
        let (store, _, _) = store_with(&[
            seed("low", "Low work", Category::Work, Priority::Low),
            done,
            seed("high", "High work", Category::Work, Priority::High),
            seed("home", "High home", Category::Personal, Priority::High),
        ])
        .await;

        assert_eq!(ids(&store.visible_tasks()), vec!["high", "home", "low", "done"]);

        store.set_filters(TaskFilters {
            category: Some(Category::Work),
            status: Some(TaskStatus::Pending),
            ..TaskFilters::default()
        });
        assert_eq!(ids(&store.visible_tasks()), vec!["high", "low"]);

        store.clear_filters();
        assert!(store.filters().is_empty());
        assert_eq!(store.visible_tasks().len(), 4);
    }

    #[tokio::test]
    async fn derived_views_read_current_collection() {
        let now = Utc.with_ymd_and_hms(2025, 2, 10, 12, 0, 0).unwrap();
        let mut late = seed("late", "Late", Category::Work, Priority::High);
        late.deadline = Some(now - Duration::days(1));
        let mut soon = seed("soon", "Soon", Category::Learning, Priority::Low);
        soon.deadline = Some(now + Duration::days(1));
        let (store, _, _) = store_with(&[late, soon]).await;

        assert_eq!(ids(&store.overdue(now)), vec!["late"]);
        assert_eq!(ids(&store.upcoming(now)), vec!["soon"]);
        assert_eq!(ids(&store.by_category(Category::Learning)), vec!["soon"]);
        assert_eq!(store.stats(now).high_priority_pending, 1);
    }
}
