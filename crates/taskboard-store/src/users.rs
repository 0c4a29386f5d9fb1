use rusqlite::Connection;
use tracing::instrument;

use taskboard_core::{Task, User};

use crate::database::Database;
use crate::error::StoreError;
use crate::row_helpers;

pub struct UserRepo {
    db: Database,
}

impl UserRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert a new user. The store assigns the id.
    #[instrument(skip(self))]
    pub fn create(&self, first_name: &str, last_name: &str, email: &str) -> Result<User, StoreError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (first_name, last_name, email) VALUES (?1, ?2, ?3)",
                rusqlite::params![first_name, last_name, email],
            )?;
            let id = conn.last_insert_rowid();

            Ok(User {
                id,
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                email: email.to_string(),
            })
        })
    }

    /// Get a user by id.
    #[instrument(skip(self), fields(user_id = id))]
    pub fn get(&self, id: i64) -> Result<User, StoreError> {
        self.db.with_conn(|conn| get_user(conn, id))
    }

    /// List every user, ordered by id.
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<User>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, first_name, last_name, email FROM users ORDER BY id")?;
            let mut rows = stmt.query([])?;
            let mut users = Vec::new();
            while let Some(row) = rows.next()? {
                users.push(row_to_user(row)?);
            }
            Ok(users)
        })
    }

    /// Case-insensitive existence check on email.
    #[instrument(skip(self))]
    pub fn exists_by_email(&self, email: &str) -> Result<bool, StoreError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE lower(email) = lower(?1)",
                [email],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    /// Overwrite first name, last name and email.
    #[instrument(skip(self), fields(user_id = id))]
    pub fn update(
        &self,
        id: i64,
        first_name: &str,
        last_name: &str,
        email: &str,
    ) -> Result<User, StoreError> {
        self.db.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET first_name = ?1, last_name = ?2, email = ?3 WHERE id = ?4",
                rusqlite::params![first_name, last_name, email, id],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(format!("user {id}")));
            }
            get_user(conn, id)
        })
    }

    /// Delete a user and their join rows in one transaction, so no task
    /// is left referencing a removed user.
    #[instrument(skip(self), fields(user_id = id))]
    pub fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.db.with_tx(|tx| {
            get_user(tx, id)?;
            tx.execute("DELETE FROM task_users WHERE user_id = ?1", [id])?;
            tx.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(())
        })
    }

    /// Tasks assigned to the given user, ordered by task id.
    #[instrument(skip(self), fields(user_id = id))]
    pub fn tasks_for_user(&self, id: i64) -> Result<Vec<Task>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT t.id, t.title, t.description, t.status, t.due_date
                 FROM task_users tu JOIN tasks t ON t.id = tu.task_id
                 WHERE tu.user_id = ?1 ORDER BY t.id",
            )?;
            let mut rows = stmt.query([id])?;
            let mut tasks = Vec::new();
            while let Some(row) = rows.next()? {
                let status_raw: String = row_helpers::get(row, 3, "tasks", "status")?;
                let due_raw: String = row_helpers::get(row, 4, "tasks", "due_date")?;
                tasks.push(Task {
                    id: row_helpers::get(row, 0, "tasks", "id")?,
                    title: row_helpers::get(row, 1, "tasks", "title")?,
                    description: row_helpers::get(row, 2, "tasks", "description")?,
                    status: row_helpers::parse_enum(&status_raw, "tasks", "status")?,
                    due_date: row_helpers::parse_date(&due_raw, "tasks", "due_date")?,
                    assigned_users: Vec::new(),
                });
            }
            Ok(tasks)
        })
    }
}

fn get_user(conn: &Connection, id: i64) -> Result<User, StoreError> {
    let mut stmt =
        conn.prepare("SELECT id, first_name, last_name, email FROM users WHERE id = ?1")?;
    let mut rows = stmt.query([id])?;
    match rows.next()? {
        Some(row) => row_to_user(row),
        None => Err(StoreError::NotFound(format!("user {id}"))),
    }
}

pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> Result<User, StoreError> {
    Ok(User {
        id: row_helpers::get(row, 0, "users", "id")?,
        first_name: row_helpers::get(row, 1, "users", "first_name")?,
        last_name: row_helpers::get(row, 2, "users", "last_name")?,
        email: row_helpers::get(row, 3, "users", "email")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::TaskRepo;
    use chrono::NaiveDate;
    use taskboard_core::TaskStatus;

    fn setup() -> (UserRepo, TaskRepo) {
        let db = Database::in_memory().unwrap();
        (UserRepo::new(db.clone()), TaskRepo::new(db))
    }

    fn due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    #[test]
    fn create_assigns_id() {
        let (repo, _) = setup();
        let user = repo.create("Ada", "Lovelace", "ada@example.com").unwrap();
        assert!(user.id > 0);
        assert_eq!(user.email, "ada@example.com");
    }

    #[test]
    fn get_by_id() {
        let (repo, _) = setup();
        let created = repo.create("Ada", "Lovelace", "ada@example.com").unwrap();
        let fetched = repo.get(created.id).unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn get_nonexistent_fails() {
        let (repo, _) = setup();
        assert!(matches!(repo.get(404), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn list_returns_all() {
        let (repo, _) = setup();
        repo.create("A", "One", "a@example.com").unwrap();
        repo.create("B", "Two", "b@example.com").unwrap();
        assert_eq!(repo.list().unwrap().len(), 2);
    }

    #[test]
    fn exists_by_email_is_case_insensitive() {
        let (repo, _) = setup();
        repo.create("A", "One", "Ada@Example.com").unwrap();
        assert!(repo.exists_by_email("ada@example.COM").unwrap());
        assert!(!repo.exists_by_email("other@example.com").unwrap());
    }

    #[test]
    fn update_overwrites_fields() {
        let (repo, _) = setup();
        let created = repo.create("A", "One", "a@example.com").unwrap();
        let updated = repo.update(created.id, "B", "Two", "b@example.com").unwrap();
        assert_eq!(updated.first_name, "B");
        assert_eq!(updated.email, "b@example.com");
    }

    #[test]
    fn update_nonexistent_fails() {
        let (repo, _) = setup();
        let result = repo.update(9, "B", "Two", "b@example.com");
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn delete_removes_user_and_join_rows() {
        let (users, tasks) = setup();
        let user = users.create("A", "One", "a@example.com").unwrap();
        let task = tasks.create("t", "d", TaskStatus::Pending, due()).unwrap();
        tasks.replace_assignments(task.id, &[user.id]).unwrap();

        users.delete(user.id).unwrap();
        assert!(users.get(user.id).is_err());
        let loaded = tasks.get_with_users(task.id).unwrap();
        assert!(loaded.assigned_users.is_empty());
    }

    #[test]
    fn delete_nonexistent_fails() {
        let (repo, _) = setup();
        assert!(matches!(repo.delete(3), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn tasks_for_user_follows_join_table() {
        let (users, tasks) = setup();
        let user = users.create("A", "One", "a@example.com").unwrap();
        let t1 = tasks.create("one", "d", TaskStatus::Pending, due()).unwrap();
        let t2 = tasks.create("two", "d", TaskStatus::Completed, due()).unwrap();
        tasks.replace_assignments(t1.id, &[user.id]).unwrap();
        tasks.replace_assignments(t2.id, &[user.id]).unwrap();

        let assigned = users.tasks_for_user(user.id).unwrap();
        let titles: Vec<&str> = assigned.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["one", "two"]);
    }
}
