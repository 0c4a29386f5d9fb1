use std::collections::BTreeSet;

use tracing::instrument;

use taskboard_core::payload::text;
use taskboard_core::{Task, TaskPayload, TaskStatus};
use taskboard_store::{Database, StoreError, TaskRepo};

use crate::error::{ApiError, ApiResult};

pub struct TaskService {
    tasks: TaskRepo,
}

fn task_error(err: StoreError, id: i64) -> ApiError {
    match err {
        StoreError::NotFound(_) => ApiError::task_not_found(id),
        other => other.into(),
    }
}

impl TaskService {
    pub fn new(db: Database) -> Self {
        Self {
            tasks: TaskRepo::new(db),
        }
    }

    /// Every task, each with its assigned users attached. Callers apply
    /// their own filters.
    pub fn find_all(&self) -> ApiResult<Vec<Task>> {
        Ok(self.tasks.list_with_users()?)
    }

    #[instrument(skip(self, payload))]
    pub fn add(&self, payload: TaskPayload) -> ApiResult<Task> {
        let fields = payload.validate().map_err(ApiError::validation)?;
        Ok(self.tasks.create(
            &fields.title,
            &fields.description,
            fields.status,
            fields.due_date,
        )?)
    }

    pub fn find_by_id(&self, id: i64) -> ApiResult<Task> {
        self.tasks.get_with_users(id).map_err(|e| task_error(e, id))
    }

    #[instrument(skip(self, payload), fields(task_id = id))]
    pub fn update(&self, id: i64, payload: TaskPayload) -> ApiResult<Task> {
        let fields = payload.validate().map_err(ApiError::validation)?;
        self.tasks
            .update(id, &fields.title, &fields.description, fields.status, fields.due_date)
            .map_err(|e| task_error(e, id))
    }

    /// Overwrite only the supplied fields: non-blank strings, present
    /// status and due date. Everything else keeps its previous value.
    #[instrument(skip(self, partial), fields(task_id = id))]
    pub fn patch(&self, id: i64, partial: TaskPayload) -> ApiResult<Task> {
        let current = self.find_by_id(id)?;

        let title = text(&partial.title).unwrap_or(&current.title);
        let description = text(&partial.description).unwrap_or(&current.description);
        let status = partial.status.unwrap_or(current.status);
        let due_date = partial.due_date.unwrap_or(current.due_date);

        self.tasks
            .update(id, title, description, status, due_date)
            .map_err(|e| task_error(e, id))
    }

    #[instrument(skip(self), fields(task_id = id))]
    pub fn delete(&self, id: i64) -> ApiResult<()> {
        self.tasks.delete(id).map_err(|e| task_error(e, id))
    }

    /// Replace the task's assigned-user set. Every id must resolve; a
    /// single unknown id rejects the whole request and leaves the
    /// existing assignment untouched. Resolution and replacement happen
    /// in one store transaction.
    #[instrument(skip(self, user_ids), fields(task_id = id))]
    pub fn assign_users(&self, id: i64, user_ids: &BTreeSet<i64>) -> ApiResult<Task> {
        let ids: Vec<i64> = user_ids.iter().copied().collect();
        self.tasks
            .replace_assignments(id, &ids)
            .map_err(|e| match e {
                StoreError::UnknownUsers(_) => ApiError::users_not_found(),
                other => task_error(other, id),
            })?;
        self.find_by_id(id)
    }

    #[instrument(skip(self), fields(task_id = id, status = %status))]
    pub fn update_status(&self, id: i64, status: TaskStatus) -> ApiResult<Task> {
        self.tasks.set_status(id, status).map_err(|e| task_error(e, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use axum::http::StatusCode;
    use chrono::NaiveDate;
    use taskboard_core::UserPayload;

    use crate::service::users::UserService;

    fn services() -> (TaskService, UserService) {
        let db = Database::in_memory().unwrap();
        (TaskService::new(db.clone()), UserService::new(db))
    }

    fn task_payload(title: &str) -> TaskPayload {
        TaskPayload {
            title: Some(title.into()),
            description: Some("desc".into()),
            status: Some(TaskStatus::Pending),
            due_date: NaiveDate::from_ymd_opt(2026, 4, 1),
        }
    }

    fn user_payload(email: &str) -> UserPayload {
        UserPayload {
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
            email: Some(email.into()),
        }
    }

    #[test]
    fn add_rejects_blank_fields() {
        let (tasks, _) = services();
        let err = tasks.add(TaskPayload::default()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ValidationError);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn add_and_find_by_id() {
        let (tasks, _) = services();
        let created = tasks.add(task_payload("report")).unwrap();
        let found = tasks.find_by_id(created.id).unwrap();
        assert_eq!(found.title, "report");
    }

    #[test]
    fn find_by_id_missing_is_task_not_found() {
        let (tasks, _) = services();
        let err = tasks.find_by_id(123).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TaskNotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn patch_keeps_unsupplied_fields() {
        let (tasks, _) = services();
        let created = tasks.add(task_payload("before")).unwrap();

        let patched = tasks
            .patch(
                created.id,
                TaskPayload {
                    status: Some(TaskStatus::Completed),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(patched.status, TaskStatus::Completed);
        assert_eq!(patched.title, "before");
        assert_eq!(patched.due_date, created.due_date);
    }

    #[test]
    fn patch_ignores_blank_strings() {
        let (tasks, _) = services();
        let created = tasks.add(task_payload("keep me")).unwrap();

        let patched = tasks
            .patch(
                created.id,
                TaskPayload {
                    title: Some("   ".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(patched.title, "keep me");
    }

    #[test]
    fn assign_users_replaces_set() {
        let (tasks, users) = services();
        let task = tasks.add(task_payload("t")).unwrap();
        let a = users.add(user_payload("a@example.com")).unwrap();
        let b = users.add(user_payload("b@example.com")).unwrap();

        let assigned = tasks
            .assign_users(task.id, &BTreeSet::from([a.id, b.id]))
            .unwrap();
        assert_eq!(assigned.assigned_users.len(), 2);

        let assigned = tasks.assign_users(task.id, &BTreeSet::from([b.id])).unwrap();
        let ids: Vec<i64> = assigned.assigned_users.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![b.id]);
    }

    #[test]
    fn assign_users_unknown_id_is_bad_request_and_keeps_assignment() {
        let (tasks, users) = services();
        let task = tasks.add(task_payload("t")).unwrap();
        let a = users.add(user_payload("a@example.com")).unwrap();
        tasks.assign_users(task.id, &BTreeSet::from([a.id])).unwrap();

        let err = tasks
            .assign_users(task.id, &BTreeSet::from([a.id, 999]))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UserNotFound);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let unchanged = tasks.find_by_id(task.id).unwrap();
        assert_eq!(unchanged.assigned_users.len(), 1);
        assert_eq!(unchanged.assigned_users[0].id, a.id);
    }

    #[test]
    fn assign_users_deleted_user_is_bad_request() {
        let (tasks, users) = services();
        let task = tasks.add(task_payload("t")).unwrap();
        let a = users.add(user_payload("a@example.com")).unwrap();
        users.delete(a.id).unwrap();

        let err = tasks
            .assign_users(task.id, &BTreeSet::from([a.id]))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UserNotFound);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn assign_users_missing_task_is_not_found() {
        let (tasks, _) = services();
        let err = tasks.assign_users(55, &BTreeSet::new()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TaskNotFound);
    }

    #[test]
    fn update_status_missing_task_is_not_found() {
        let (tasks, _) = services();
        let err = tasks.update_status(55, TaskStatus::Completed).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TaskNotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn delete_detaches_from_users() {
        let (tasks, users) = services();
        let task = tasks.add(task_payload("t")).unwrap();
        let a = users.add(user_payload("a@example.com")).unwrap();
        tasks.assign_users(task.id, &BTreeSet::from([a.id])).unwrap();

        tasks.delete(task.id).unwrap();
        let remaining = users
            .find_tasks_by_user(Some(a.id), None, None)
            .unwrap();
        assert!(remaining.is_empty());
    }
}
