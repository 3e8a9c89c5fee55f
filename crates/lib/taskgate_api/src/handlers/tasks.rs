//! Task request handlers under `/users/{user_id}/tasks`.
//!
//! Every handler checks the path-declared owner against the caller before
//! touching the store.

use axum::Json;
use axum::extract::{Path, State};
use taskgate_core::auth::Identity;
use taskgate_core::auth::guard::{Access, authorize_identity};
use taskgate_core::tasks;
use tracing::warn;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::middleware::auth::CurrentUser;
use crate::models::{
    MessageResponse, PageQuery, TaskCreateRequest, TaskListQuery, TaskListResponse,
    TaskResponse, TaskUpdateRequest,
};

fn ensure_owner(caller: &Identity, owner_id: &str) -> AppResult<()> {
    match authorize_identity(caller, owner_id) {
        Access::Allowed => Ok(()),
        Access::Denied => {
            warn!(caller = %caller.subject, owner_id, "cross-user task access denied");
            Err(AppError::Forbidden(
                "Access denied: You can only access your own resources".into(),
            ))
        }
    }
}

/// `GET /users/{user_id}/tasks`
pub async fn list_tasks_handler(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(user_id): Path<String>,
    ApiQuery(query): ApiQuery<TaskListQuery>,
) -> AppResult<Json<TaskListResponse>> {
    ensure_owner(&caller, &user_id)?;
    let page = tasks::list_tasks(state.store.as_ref(), &user_id, query.into()).await?;
    Ok(Json(page.into()))
}

/// `GET /users/{user_id}/tasks/overdue`
pub async fn list_overdue_handler(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(user_id): Path<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> AppResult<Json<TaskListResponse>> {
    ensure_owner(&caller, &user_id)?;
    let page =
        tasks::list_overdue(state.store.as_ref(), &user_id, query.limit, query.offset).await?;
    Ok(Json(page.into()))
}

/// `POST /users/{user_id}/tasks`
pub async fn create_task_handler(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(user_id): Path<String>,
    ApiJson(body): ApiJson<TaskCreateRequest>,
) -> AppResult<Json<TaskResponse>> {
    ensure_owner(&caller, &user_id)?;
    let task = tasks::create_task(state.store.as_ref(), &user_id, body.into()).await?;
    Ok(Json(task.into()))
}

/// `GET /users/{user_id}/tasks/{task_id}`
pub async fn get_task_handler(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path((user_id, task_id)): Path<(String, String)>,
) -> AppResult<Json<TaskResponse>> {
    ensure_owner(&caller, &user_id)?;
    let task = tasks::get_task(state.store.as_ref(), &user_id, &task_id).await?;
    Ok(Json(task.into()))
}

/// `PUT /users/{user_id}/tasks/{task_id}`
pub async fn update_task_handler(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path((user_id, task_id)): Path<(String, String)>,
    ApiJson(body): ApiJson<TaskUpdateRequest>,
) -> AppResult<Json<TaskResponse>> {
    ensure_owner(&caller, &user_id)?;
    let task = tasks::update_task(state.store.as_ref(), &user_id, &task_id, body.into()).await?;
    Ok(Json(task.into()))
}

/// `DELETE /users/{user_id}/tasks/{task_id}`: soft delete.
pub async fn delete_task_handler(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path((user_id, task_id)): Path<(String, String)>,
) -> AppResult<Json<MessageResponse>> {
    ensure_owner(&caller, &user_id)?;
    tasks::delete_task(state.store.as_ref(), &user_id, &task_id).await?;
    Ok(Json(MessageResponse {
        message: "Task soft deleted successfully".into(),
    }))
}
