//! PostgreSQL store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{Store, StoreError};
use crate::models::auth::{HashedCredential, NewUser, User, UserWithPassword};
use crate::models::task::{Task, TaskPage, TaskQuery};
use crate::uuid::uuidv7;

const USER_COLUMNS: &str =
    "id::text, email, first_name, last_name, is_active, created_at, updated_at";

const TASK_COLUMNS: &str = "id::text, user_id::text, title, description, status, priority, \
     due_date, completed_at, deleted_at, created_at, updated_at";

/// Row returned by user queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// User row joined with its credential record.
#[derive(Debug, sqlx::FromRow)]
struct UserCredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// Row returned by task queries. Enums are stored as text.
#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: String,
    user_id: String,
    title: String,
    description: Option<String>,
    status: String,
    priority: String,
    due_date: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            priority: row.priority.parse().map_err(StoreError::Corrupt)?,
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            due_date: row.due_date,
            completed_at: row.completed_at,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Store backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Ids that are not UUIDs cannot exist in the tables; treat them as absent
/// instead of letting the `::uuid` cast fail.
fn parse_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id).ok()
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let result = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users (id, email, first_name, last_name, password_hash) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(uuidv7())
        .bind(&new.email)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(new.password_hash.as_str())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => Ok(row.into()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(
                StoreError::Conflict(format!("User with email {} already exists", new.email)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserWithPassword>, StoreError> {
        let row = sqlx::query_as::<_, UserCredentialRow>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| UserWithPassword {
            user: row.user.into(),
            password_hash: HashedCredential::from_stored(row.password_hash),
        }))
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let Some(id) = parse_id(user_id) else {
            return Ok(None);
        };
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    async fn update_user(&self, user: &User) -> Result<User, StoreError> {
        let id = parse_id(&user.id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user.id)))?;
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET first_name = $2, last_name = $3, is_active = $4, updated_at = $5 \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_active)
        .bind(user.updated_at)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::from)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user.id)))
    }

    async fn create_task(&self, task: Task) -> Result<Task, StoreError> {
        let id = parse_id(&task.id)
            .ok_or_else(|| StoreError::Corrupt(format!("task id {} is not a UUID", task.id)))?;
        let owner = parse_id(&task.user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", task.user_id)))?;
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "INSERT INTO tasks (id, user_id, title, description, status, priority, due_date, \
                                completed_at, deleted_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(id)
        .bind(owner)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.due_date)
        .bind(task.completed_at)
        .bind(task.deleted_at)
        .bind(task.created_at)
        .bind(task.updated_at)
        .fetch_one(&self.pool)
        .await?;
        row.try_into()
    }

    async fn get_task(&self, task_id: &str) -> Result<Option<Task>, StoreError> {
        let Some(id) = parse_id(task_id) else {
            return Ok(None);
        };
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Task::try_from).transpose()
    }

    async fn query_tasks(&self, query: &TaskQuery) -> Result<TaskPage, StoreError> {
        let Some(owner) = parse_id(&query.user_id) else {
            return Ok(TaskPage::default());
        };
        let filter = "WHERE user_id = $1 AND deleted_at IS NULL \
               AND ($2::text IS NULL OR status = $2) \
               AND ($3::text IS NULL OR priority = $3) \
               AND ($4::timestamptz IS NULL OR (status <> 'completed' AND due_date < $4))";
        let status = query.status.map(|s| s.as_str());
        let priority = query.priority.map(|p| p.as_str());

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM tasks {filter}"))
            .bind(owner)
            .bind(status)
            .bind(priority)
            .bind(query.overdue_at)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks {filter} \
             ORDER BY created_at DESC, id DESC \
             LIMIT $5 OFFSET $6"
        ))
        .bind(owner)
        .bind(status)
        .bind(priority)
        .bind(query.overdue_at)
        .bind(i64::from(query.limit))
        .bind(i64::from(query.offset))
        .fetch_all(&self.pool)
        .await?;

        Ok(TaskPage {
            tasks: rows
                .into_iter()
                .map(Task::try_from)
                .collect::<Result<_, _>>()?,
            total_count: u64::try_from(total).unwrap_or_default(),
        })
    }

    async fn update_task(&self, task: &Task) -> Result<Task, StoreError> {
        let not_found = || StoreError::NotFound(format!("task {}", task.id));
        let (Some(id), Some(owner)) = (parse_id(&task.id), parse_id(&task.user_id)) else {
            return Err(not_found());
        };
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            "UPDATE tasks SET title = $3, description = $4, status = $5, priority = $6, \
                 due_date = $7, completed_at = $8, updated_at = $9 \
             WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL \
             RETURNING {TASK_COLUMNS}"
        ))
        .bind(id)
        .bind(owner)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.due_date)
        .bind(task.completed_at)
        .bind(task.updated_at)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Task::try_from).transpose()?.ok_or_else(not_found)
    }

    async fn soft_delete_task(
        &self,
        task_id: &str,
        owner_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let (Some(id), Some(owner)) = (parse_id(task_id), parse_id(owner_id)) else {
            return Ok(false);
        };
        let result = sqlx::query(
            "UPDATE tasks SET deleted_at = $3, updated_at = $3 \
             WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL",
        )
        .bind(id)
        .bind(owner)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}
