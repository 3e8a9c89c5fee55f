//! In-process store backed by hash maps.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{Store, StoreError};
use crate::models::auth::{HashedCredential, NewUser, User, UserWithPassword};
use crate::models::task::{Task, TaskPage, TaskQuery};
use crate::uuid::new_id;

#[derive(Debug, Default)]
struct Users {
    by_id: HashMap<String, (User, HashedCredential)>,
    /// email → id
    emails: HashMap<String, String>,
}

/// Store that lives in process memory. Contents vanish on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<Users>,
    tasks: RwLock<HashMap<String, Task>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if users.emails.contains_key(&new.email) {
            return Err(StoreError::Conflict(format!(
                "User with email {} already exists",
                new.email
            )));
        }
        let now = Utc::now();
        let user = User {
            id: new_id(),
            email: new.email,
            first_name: new.first_name,
            last_name: new.last_name,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        users.emails.insert(user.email.clone(), user.id.clone());
        users
            .by_id
            .insert(user.id.clone(), (user.clone(), new.password_hash));
        Ok(user)
    }

    async fn find_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserWithPassword>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .emails
            .get(email)
            .and_then(|id| users.by_id.get(id))
            .map(|(user, hash)| UserWithPassword {
                user: user.clone(),
                password_hash: hash.clone(),
            }))
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.by_id.get(user_id).map(|(user, _)| user.clone()))
    }

    async fn update_user(&self, user: &User) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        let (stored, _) = users
            .by_id
            .get_mut(&user.id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user.id)))?;
        stored.first_name = user.first_name.clone();
        stored.last_name = user.last_name.clone();
        stored.is_active = user.is_active;
        stored.updated_at = user.updated_at;
        Ok(stored.clone())
    }

    async fn create_task(&self, task: Task) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        if tasks.contains_key(&task.id) {
            return Err(StoreError::Conflict(format!("task {} already exists", task.id)));
        }
        tasks.insert(task.id.clone(), task.clone());
        Ok(task)
    }

    async fn get_task(&self, task_id: &str) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.read().await.get(task_id).cloned())
    }

    async fn query_tasks(&self, query: &TaskQuery) -> Result<TaskPage, StoreError> {
        let tasks = self.tasks.read().await;
        let mut matching: Vec<&Task> = tasks
            .values()
            .filter(|t| t.user_id == query.user_id && !t.is_deleted())
            .filter(|t| query.status.is_none_or(|s| t.status == s))
            .filter(|t| query.priority.is_none_or(|p| t.priority == p))
            .filter(|t| query.overdue_at.is_none_or(|now| t.is_overdue(now)))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

        let total_count = matching.len() as u64;
        let tasks = matching
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .cloned()
            .collect();
        Ok(TaskPage { tasks, total_count })
    }

    async fn update_task(&self, task: &Task) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().await;
        let stored = tasks
            .get_mut(&task.id)
            .filter(|t| t.user_id == task.user_id && !t.is_deleted())
            .ok_or_else(|| StoreError::NotFound(format!("task {}", task.id)))?;
        stored.title.clone_from(&task.title);
        stored.description.clone_from(&task.description);
        stored.status = task.status;
        stored.priority = task.priority;
        stored.due_date = task.due_date;
        stored.completed_at = task.completed_at;
        stored.updated_at = task.updated_at;
        Ok(stored.clone())
    }

    async fn soft_delete_task(
        &self,
        task_id: &str,
        owner_id: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(task_id) {
            Some(t) if t.user_id == owner_id && !t.is_deleted() => {
                t.deleted_at = Some(at);
                t.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
