use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::instrument;

use taskboard_core::{Task, TaskStatus, User};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;
use crate::users::row_to_user;

pub struct TaskRepo {
    db: Database,
}

impl TaskRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a new task. The store assigns the id.
    #[instrument(skip(self, description))]
    pub fn create(
        &self,
        title: &str,
        description: &str,
        status: TaskStatus,
        due_date: NaiveDate,
    ) -> Result<Task, StoreError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (title, description, status, due_date) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![title, description, status.to_string(), due_date.to_string()],
            )?;
            let id = conn.last_insert_rowid();

            Ok(Task {
                id,
                title: title.to_string(),
                description: description.to_string(),
                status,
                due_date,
                assigned_users: Vec::new(),
            })
        })
    }

    /// Get a task by id, without its assigned users.
    #[instrument(skip(self), fields(task_id = id))]
    pub fn get(&self, id: i64) -> Result<Task, StoreError> {
        self.db.with_conn(|conn| get_task(conn, id))
    }

    /// Get a task by id together with its assigned users.
    #[instrument(skip(self), fields(task_id = id))]
    pub fn get_with_users(&self, id: i64) -> Result<Task, StoreError> {
        self.db.with_conn(|conn| {
            let mut task = get_task(conn, id)?;
            task.assigned_users = users_for_task(conn, id)?;
            Ok(task)
        })
    }

    /// List every task with its assigned users attached, ordered by id.
    #[instrument(skip(self))]
    pub fn list_with_users(&self) -> Result<Vec<Task>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, description, status, due_date FROM tasks ORDER BY id",
            )?;
            let mut rows = stmt.query([])?;
            let mut tasks = Vec::new();
            while let Some(row) = rows.next()? {
                tasks.push(row_to_task(row)?);
            }

            let mut stmt = conn.prepare(
                "SELECT tu.task_id, u.id, u.first_name, u.last_name, u.email
                 FROM task_users tu JOIN users u ON u.id = tu.user_id
                 ORDER BY tu.task_id, u.id",
            )?;
            let mut rows = stmt.query([])?;
            let mut by_task: HashMap<i64, Vec<User>> = HashMap::new();
            while let Some(row) = rows.next()? {
                let task_id: i64 = row_helpers::get(row, 0, "task_users", "task_id")?;
                let user = User {
                    id: row_helpers::get(row, 1, "users", "id")?,
                    first_name: row_helpers::get(row, 2, "users", "first_name")?,
                    last_name: row_helpers::get(row, 3, "users", "last_name")?,
                    email: row_helpers::get(row, 4, "users", "email")?,
                };
                by_task.entry(task_id).or_default().push(user);
            }

            for task in &mut tasks {
                if let Some(users) = by_task.remove(&task.id) {
                    task.assigned_users = users;
                }
            }
            Ok(tasks)
        })
    }

    /// Overwrite title, description, status and due date.
    #[instrument(skip(self), fields(task_id = id))]
    pub fn update(
        &self,
        id: i64,
        title: &str,
        description: &str,
        status: TaskStatus,
        due_date: NaiveDate,
    ) -> Result<Task, StoreError> {
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE tasks SET title = ?1, description = ?2, status = ?3, due_date = ?4
                 WHERE id = ?5",
                rusqlite::params![title, description, status.to_string(), due_date.to_string(), id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("task {id}")));
            }
            let mut task = get_task(conn, id)?;
            task.assigned_users = users_for_task(conn, id)?;
            Ok(task)
        })
    }

    /// Overwrite only the status.
    #[instrument(skip(self), fields(task_id = id, status = %status))]
    pub fn set_status(&self, id: i64, status: TaskStatus) -> Result<Task, StoreError> {
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE tasks SET status = ?1 WHERE id = ?2",
                rusqlite::params![status.to_string(), id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("task {id}")));
            }
            let mut task = get_task(conn, id)?;
            task.assigned_users = users_for_task(conn, id)?;
            Ok(task)
        })
    }

    /// Delete a task and its join rows in one transaction, so no user is
    /// left referencing a removed task.
    #[instrument(skip(self), fields(task_id = id))]
    pub fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.db.with_tx(|tx| {
            get_task(tx, id)?;
            tx.execute("DELETE FROM task_users WHERE task_id = ?1", [id])?;
            tx.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Replace the task's assigned-user set. The ids are resolved and the
    /// old join rows swapped for the new ones inside a single transaction,
    /// so a user deleted mid-request still yields UnknownUsers rather than
    /// a constraint failure.
    #[instrument(skip(self, user_ids), fields(task_id = id, users = user_ids.len()))]
    pub fn replace_assignments(&self, id: i64, user_ids: &[i64]) -> Result<(), StoreError> {
        self.db.with_tx(|tx| {
            get_task(tx, id)?;
            let missing = missing_users(tx, user_ids)?;
            if !missing.is_empty() {
                return Err(StoreError::UnknownUsers(missing));
            }
            tx.execute("DELETE FROM task_users WHERE task_id = ?1", [id])?;
            let mut stmt =
                tx.prepare("INSERT INTO task_users (task_id, user_id) VALUES (?1, ?2)")?;
            for user_id in user_ids {
                stmt.execute(rusqlite::params![id, user_id])?;
            }
            Ok(())
        })
    }
}

fn get_task(conn: &Connection, id: i64) -> Result<Task, StoreError> {
    let mut stmt =
        conn.prepare("SELECT id, title, description, status, due_date FROM tasks WHERE id = ?1")?;
    let mut rows = stmt.query([id])?;
    match rows.next()? {
        Some(row) => row_to_task(row),
        None => Err(StoreError::NotFound(format!("task {id}"))),
    }
}

/// Ids in `ids` that resolve to no user row.
fn missing_users(conn: &Connection, ids: &[i64]) -> Result<Vec<i64>, StoreError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = (1..=ids.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("SELECT id FROM users WHERE id IN ({placeholders})");
    let params: Vec<&dyn rusqlite::types::ToSql> =
        ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params.as_slice())?;
    let mut found = HashSet::new();
    while let Some(row) = rows.next()? {
        found.insert(row_helpers::get::<i64>(row, 0, "users", "id")?);
    }
    Ok(ids.iter().copied().filter(|id| !found.contains(id)).collect())
}

fn users_for_task(conn: &Connection, task_id: i64) -> Result<Vec<User>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT u.id, u.first_name, u.last_name, u.email
         FROM task_users tu JOIN users u ON u.id = tu.user_id
         WHERE tu.task_id = ?1 ORDER BY u.id",
    )?;
    let mut rows = stmt.query([task_id])?;
    let mut users = Vec::new();
    while let Some(row) = rows.next()? {
        users.push(row_to_user(row)?);
    }
    Ok(users)
}

fn row_to_task(row: &rusqlite::Row<'_>) -> Result<Task, StoreError> {
    let status_raw: String = row_helpers::get(row, 3, "tasks", "status")?;
    let due_raw: String = row_helpers::get(row, 4, "tasks", "due_date")?;

    Ok(Task {
        id: row_helpers::get(row, 0, "tasks", "id")?,
        title: row_helpers::get(row, 1, "tasks", "title")?,
        description: row_helpers::get(row, 2, "tasks", "description")?,
        status: row_helpers::parse_enum(&status_raw, "tasks", "status")?,
        due_date: row_helpers::parse_date(&due_raw, "tasks", "due_date")?,
        assigned_users: Vec::new(),
    })
}
