//! Task rules on top of the [`Store`].
//!
//! Callers are expected to have passed the ownership guard for `owner_id`
//! (the path-declared owner) before calling in. These functions additionally
//! confirm the stored task belongs to that owner and hide soft-deleted rows.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use crate::models::task::{Task, TaskPage, TaskPriority, TaskQuery, TaskStatus};
use crate::store::{Store, StoreError};
use crate::uuid::new_id;
use crate::validation;

/// Default page size for listings.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;

/// Largest page size accepted.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Task operation errors.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing, or soft-deleted.
    #[error("Task not found")]
    NotFound,

    #[error("Access denied: Task does not belong to the specified user")]
    Forbidden,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Fields accepted when creating a task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Listing filter as supplied by the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

fn check(result: Result<(), String>) -> Result<(), TaskError> {
    result.map_err(TaskError::Validation)
}

fn page_limit(limit: Option<u32>) -> Result<u32, TaskError> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(TaskError::Validation(format!(
            "Limit must be between 1 and {MAX_PAGE_LIMIT}"
        )));
    }
    Ok(limit)
}

/// Create a task owned by `owner_id`.
pub async fn create_task(
    store: &dyn Store,
    owner_id: &str,
    new: NewTask,
) -> Result<Task, TaskError> {
    let now = Utc::now();
    check(validation::validate_title(&new.title))?;
    check(validation::validate_description(new.description.as_deref()))?;
    check(validation::validate_due_date(new.due_date, now))?;

    let status = new.status.unwrap_or_default();
    let task = Task {
        id: new_id(),
        user_id: owner_id.to_string(),
        title: new.title,
        description: new.description,
        status,
        priority: new.priority.unwrap_or_default(),
        due_date: new.due_date,
        completed_at: (status == TaskStatus::Completed).then_some(now),
        deleted_at: None,
        created_at: now,
        updated_at: now,
    };
    let task = store.create_task(task).await?;
    debug!(task_id = %task.id, owner_id, "task created");
    Ok(task)
}

/// Fetch a visible task belonging to `owner_id`.
pub async fn get_task(store: &dyn Store, owner_id: &str, task_id: &str) -> Result<Task, TaskError> {
    let task = store.get_task(task_id).await?.ok_or(TaskError::NotFound)?;
    if task.user_id != owner_id {
        return Err(TaskError::Forbidden);
    }
    if task.is_deleted() {
        return Err(TaskError::NotFound);
    }
    Ok(task)
}

/// Apply `changes`, keeping `completed_at` coupled to the status.
pub async fn update_task(
    store: &dyn Store,
    owner_id: &str,
    task_id: &str,
    changes: TaskChanges,
) -> Result<Task, TaskError> {
    let now = Utc::now();
    if let Some(title) = &changes.title {
        check(validation::validate_title(title))?;
    }
    check(validation::validate_description(changes.description.as_deref()))?;
    check(validation::validate_due_date(changes.due_date, now))?;

    let mut task = get_task(store, owner_id, task_id).await?;
    if let Some(title) = changes.title {
        task.title = title;
    }
    if let Some(description) = changes.description {
        task.description = Some(description);
    }
    if let Some(priority) = changes.priority {
        task.priority = priority;
    }
    if let Some(due_date) = changes.due_date {
        task.due_date = Some(due_date);
    }
    if let Some(status) = changes.status {
        task.transition_to(status, now);
    }
    task.updated_at = now;

    // A delete that lands between the read above and this write wins.
    store.update_task(&task).await.map_err(|e| match e {
        StoreError::NotFound(_) => TaskError::NotFound,
        other => TaskError::Store(other),
    })
}

/// Soft-delete: sets `deleted_at`. A second delete is `NotFound`.
pub async fn delete_task(store: &dyn Store, owner_id: &str, task_id: &str) -> Result<(), TaskError> {
    get_task(store, owner_id, task_id).await?;
    if !store.soft_delete_task(task_id, owner_id, Utc::now()).await? {
        return Err(TaskError::NotFound);
    }
    debug!(task_id, owner_id, "task soft deleted");
    Ok(())
}

/// Visible tasks for `owner_id`, newest first.
pub async fn list_tasks(
    store: &dyn Store,
    owner_id: &str,
    filter: TaskFilter,
) -> Result<TaskPage, TaskError> {
    let query = TaskQuery {
        user_id: owner_id.to_string(),
        status: filter.status,
        priority: filter.priority,
        overdue_at: None,
        limit: page_limit(filter.limit)?,
        offset: filter.offset.unwrap_or(0),
    };
    Ok(store.query_tasks(&query).await?)
}

/// Visible, non-completed tasks whose due date has passed.
pub async fn list_overdue(
    store: &dyn Store,
    owner_id: &str,
    limit: Option<u32>,
    offset: Option<u32>,
) -> Result<TaskPage, TaskError> {
    let query = TaskQuery {
        user_id: owner_id.to_string(),
        overdue_at: Some(Utc::now()),
        limit: page_limit(limit)?,
        offset: offset.unwrap_or(0),
        ..Default::default()
    };
    Ok(store.query_tasks(&query).await?)
}
