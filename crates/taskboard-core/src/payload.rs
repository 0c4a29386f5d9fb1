//! Request bodies for the mutating endpoints.
//!
//! The same payload type backs PUT (validated, full overwrite) and PATCH
//! (unvalidated, only supplied fields applied), so every field is
//! optional and validation is an explicit step.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::model::TaskStatus;

/// Returns the value when it is present and not just whitespace.
pub fn text(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<NaiveDate>,
}

/// A fully validated task body.
#[derive(Clone, Debug)]
pub struct TaskFields {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub due_date: NaiveDate,
}

impl TaskPayload {
    /// Enforce the required-field rules for POST and PUT.
    pub fn validate(self) -> Result<TaskFields, BTreeMap<String, String>> {
        let mut errors = BTreeMap::new();
        if text(&self.title).is_none() {
            errors.insert("title".into(), "Title cannot be blank".into());
        }
        if text(&self.description).is_none() {
            errors.insert("description".into(), "Description cannot be blank".into());
        }
        if self.status.is_none() {
            errors.insert("status".into(), "Task status cannot be null".into());
        }
        if self.due_date.is_none() {
            errors.insert("dueDate".into(), "Due date cannot be null".into());
        }
        match (self.title, self.description, self.status, self.due_date) {
            (Some(title), Some(description), Some(status), Some(due_date))
                if errors.is_empty() =>
            {
                Ok(TaskFields {
                    title,
                    description,
                    status,
                    due_date,
                })
            }
            _ => Err(errors),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
}

/// A fully validated user body.
#[derive(Clone, Debug)]
pub struct UserFields {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl UserPayload {
    /// Enforce the required-field rules for POST and PUT.
    pub fn validate(self) -> Result<UserFields, BTreeMap<String, String>> {
        let mut errors = BTreeMap::new();
        if text(&self.first_name).is_none() {
            errors.insert("firstName".into(), "First name cannot be blank".into());
        }
        if text(&self.last_name).is_none() {
            errors.insert("lastName".into(), "Last name cannot be blank".into());
        }
        if text(&self.email).is_none() {
            errors.insert("email".into(), "Email cannot be blank".into());
        }
        match (self.first_name, self.last_name, self.email) {
            (Some(first_name), Some(last_name), Some(email)) if errors.is_empty() => {
                Ok(UserFields {
                    first_name,
                    last_name,
                    email,
                })
            }
            _ => Err(errors),
        }
    }
}
