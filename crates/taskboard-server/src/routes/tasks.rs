//! Handlers for `/api/tasks`.
//!
//! List endpoints load the full set from the service and apply the query
//! filters as predicate conjunctions in memory; an omitted parameter
//! matches everything.

use std::collections::{BTreeSet, HashSet};

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

use taskboard_core::{Task, TaskPayload, TaskStatus, UserDto};

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListQuery {
    pub status: Option<TaskStatus>,
    pub title: Option<String>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUsersQuery {
    pub task_id: Option<i64>,
    pub task_title: Option<String>,
}

pub async fn list_tasks(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<TaskListQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = state
        .tasks
        .find_all()?
        .into_iter()
        .filter(|t| q.status.is_none_or(|s| t.status == s))
        .filter(|t| q.title.as_deref().is_none_or(|needle| t.title.contains(needle)))
        .filter(|t| q.due_date.is_none_or(|d| t.due_date == d))
        .collect();
    Ok(Json(tasks))
}

pub async fn get_task(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.tasks.find_by_id(id)?))
}

pub async fn create_task(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<TaskPayload>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.tasks.add(payload)?))
}

pub async fn update_task(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<TaskPayload>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.tasks.update(id, payload)?))
}

pub async fn patch_task(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<TaskPayload>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.tasks.patch(id, payload)?))
}

pub async fn delete_task(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    state.tasks.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_users(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(user_ids): ApiJson<BTreeSet<i64>>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.tasks.assign_users(id, &user_ids)?))
}

pub async fn update_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(status): ApiJson<TaskStatus>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.tasks.update_status(id, status)?))
}

/// Users assigned to the matching tasks, deduplicated by user id and
/// projected to the lightweight view.
pub async fn list_task_users(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<TaskUsersQuery>,
) -> ApiResult<Json<Vec<UserDto>>> {
    let tasks = state.tasks.find_all()?;

    let mut seen = HashSet::new();
    let mut users = Vec::new();
    for task in tasks
        .iter()
        .filter(|t| q.task_id.is_none_or(|id| t.id == id))
        .filter(|t| {
            q.task_title
                .as_deref()
                .is_none_or(|title| t.title.eq_ignore_ascii_case(title))
        })
    {
        for user in &task.assigned_users {
            if seen.insert(user.id) {
                users.push(UserDto::from(user));
            }
        }
    }
    Ok(Json(users))
}
