//! Handlers for `/api/users`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use taskboard_core::{TaskDto, User, UserPayload};

use crate::error::ApiResult;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListQuery {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTasksQuery {
    pub user_id: Option<i64>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

/// Name filters are substring matches; the email filter is exact but
/// case-insensitive.
pub async fn list_users(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<UserListQuery>,
) -> ApiResult<Json<Vec<User>>> {
    let users = state
        .users
        .find_all()?
        .into_iter()
        .filter(|u| {
            q.first_name
                .as_deref()
                .is_none_or(|needle| u.first_name.contains(needle))
        })
        .filter(|u| {
            q.last_name
                .as_deref()
                .is_none_or(|needle| u.last_name.contains(needle))
        })
        .filter(|u| {
            q.email
                .as_deref()
                .is_none_or(|email| u.email.eq_ignore_ascii_case(email))
        })
        .collect();
    Ok(Json(users))
}

pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<UserPayload>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.users.add(payload)?))
}

pub async fn update_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<UserPayload>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.users.update(id, payload)?))
}

pub async fn patch_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(payload): ApiJson<UserPayload>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.users.patch(id, payload)?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    state.users.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Tasks of the users matching the equality filters; 404 when no user
/// matches at all.
pub async fn list_user_tasks(
    State(state): State<AppState>,
    ApiQuery(q): ApiQuery<UserTasksQuery>,
) -> ApiResult<Json<Vec<TaskDto>>> {
    let tasks =
        state
            .users
            .find_tasks_by_user(q.user_id, q.last_name.as_deref(), q.email.as_deref())?;
    Ok(Json(tasks))
}
