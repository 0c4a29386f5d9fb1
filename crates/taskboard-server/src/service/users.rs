use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::instrument;

use taskboard_core::payload::text;
use taskboard_core::{TaskDto, User, UserPayload};
use taskboard_store::{Database, StoreError, UserRepo};

use crate::error::{ApiError, ApiResult};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^[A-Za-z0-9+_.-]+@[A-Za-z0-9.-]+$").expect("email pattern compiles")
});

pub struct UserService {
    users: UserRepo,
}

fn user_error(err: StoreError, id: i64) -> ApiError {
    match err {
        StoreError::NotFound(_) => ApiError::user_not_found(id),
        other => other.into(),
    }
}

impl UserService {
    pub fn new(db: Database) -> Self {
        Self {
            users: UserRepo::new(db),
        }
    }

    pub fn find_all(&self) -> ApiResult<Vec<User>> {
        Ok(self.users.list()?)
    }

    #[instrument(skip(self, payload))]
    pub fn add(&self, payload: UserPayload) -> ApiResult<User> {
        let fields = payload.validate().map_err(ApiError::validation)?;
        self.validate_email(&fields.email)?;
        self.check_email_free(&fields.email)?;
        Ok(self
            .users
            .create(&fields.first_name, &fields.last_name, &fields.email)?)
    }

    pub fn find_by_id(&self, id: i64) -> ApiResult<User> {
        self.users.get(id).map_err(|e| user_error(e, id))
    }

    /// Full overwrite. The uniqueness check only runs when the email
    /// actually changes (case-insensitively), so resubmitting the
    /// current email is always allowed.
    #[instrument(skip(self, payload), fields(user_id = id))]
    pub fn update(&self, id: i64, payload: UserPayload) -> ApiResult<User> {
        let fields = payload.validate().map_err(ApiError::validation)?;
        let current = self.find_by_id(id)?;

        if !current.email.eq_ignore_ascii_case(&fields.email) {
            self.check_email_free(&fields.email)?;
        }
        self.validate_email(&fields.email)?;

        self.users
            .update(id, &fields.first_name, &fields.last_name, &fields.email)
            .map_err(|e| user_error(e, id))
    }

    /// Overwrite only the supplied non-blank fields. A new email goes
    /// through the same uniqueness and format checks as a full update.
    #[instrument(skip(self, partial), fields(user_id = id))]
    pub fn patch(&self, id: i64, partial: UserPayload) -> ApiResult<User> {
        let current = self.find_by_id(id)?;

        let first_name = text(&partial.first_name).unwrap_or(&current.first_name);
        let last_name = text(&partial.last_name).unwrap_or(&current.last_name);

        let email = match text(&partial.email) {
            Some(email) => {
                if !current.email.eq_ignore_ascii_case(email) {
                    self.check_email_free(email)?;
                }
                self.validate_email(email)?;
                email
            }
            None => &current.email,
        };

        self.users
            .update(id, first_name, last_name, email)
            .map_err(|e| user_error(e, id))
    }

    #[instrument(skip(self), fields(user_id = id))]
    pub fn delete(&self, id: i64) -> ApiResult<()> {
        self.users.delete(id).map_err(|e| user_error(e, id))
    }

    /// Tasks belonging to every user matching the given equality
    /// predicates, deduplicated by task id and projected to the
    /// read-only view. Fails when no user matches at all.
    #[instrument(skip(self))]
    pub fn find_tasks_by_user(
        &self,
        user_id: Option<i64>,
        last_name: Option<&str>,
        email: Option<&str>,
    ) -> ApiResult<Vec<TaskDto>> {
        let matched: Vec<User> = self
            .users
            .list()?
            .into_iter()
            .filter(|u| user_id.is_none_or(|id| u.id == id))
            .filter(|u| last_name.is_none_or(|n| u.last_name.eq_ignore_ascii_case(n)))
            .filter(|u| email.is_none_or(|e| u.email.eq_ignore_ascii_case(e)))
            .collect();

        if matched.is_empty() {
            return Err(ApiError::no_user_matched());
        }

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for user in &matched {
            for task in self.users.tasks_for_user(user.id)? {
                if seen.insert(task.id) {
                    out.push(TaskDto::from(&task));
                }
            }
        }
        Ok(out)
    }

    fn validate_email(&self, email: &str) -> ApiResult<()> {
        if !EMAIL_PATTERN.is_match(email) {
            return Err(ApiError::invalid_email_format(email));
        }
        Ok(())
    }

    fn check_email_free(&self, email: &str) -> ApiResult<()> {
        if self.users.exists_by_email(email)? {
            return Err(ApiError::email_already_exists(email));
        }
        Ok(())
    }
}
