//! Persistence boundary for identities and tasks.
//!
//! The core only needs create/get/query/update keyed by opaque string ids.
//! [`MemoryStore`] backs tests and single-process runs; [`PgStore`] persists
//! to PostgreSQL.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::auth::{NewUser, User, UserWithPassword};
use crate::models::task::{Task, TaskPage, TaskQuery};

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated (e.g. duplicate email).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The row to update does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value could not be mapped back onto the domain model.
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Repository for identities and tasks.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a new identity. Duplicate email → [`StoreError::Conflict`].
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    /// Identity plus credential record by exact (case-sensitive) email.
    async fn find_user_by_email(&self, email: &str)
    -> Result<Option<UserWithPassword>, StoreError>;

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError>;

    /// Persist profile fields, `is_active` and `updated_at` as given.
    async fn update_user(&self, user: &User) -> Result<User, StoreError>;

    async fn create_task(&self, task: Task) -> Result<Task, StoreError>;

    /// Fetch by id regardless of owner or soft-delete state; callers filter.
    async fn get_task(&self, task_id: &str) -> Result<Option<Task>, StoreError>;

    /// Visible (not soft-deleted) tasks matching `query`, newest first.
    async fn query_tasks(&self, query: &TaskQuery) -> Result<TaskPage, StoreError>;

    /// Persist the editable fields and `updated_at` of a visible task owned by
    /// `task.user_id`. `deleted_at` is never written here; a soft-deleted or
    /// foreign row is [`StoreError::NotFound`].
    async fn update_task(&self, task: &Task) -> Result<Task, StoreError>;

    /// Set `deleted_at` on a visible task owned by `owner_id`. Returns `false`
    /// when no such row exists, including when it is already deleted.
    async fn soft_delete_task(
        &self,
        task_id: &str,
        owner_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
}
