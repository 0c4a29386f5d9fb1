//! The uniform HTTP error envelope.
//!
//! Every failure leaves the API as `{errorCode, message, [errors]}`;
//! store-level errors are logged and collapsed to a generic 500 so they
//! never leak SQL details to callers.

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use taskboard_store::StoreError;

/// Machine-readable error codes, as they appear on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    TaskNotFound,
    UserNotFound,
    InvalidRequest,
    InvalidEmailFormat,
    EmailAlreadyExists,
    ValidationError,
    InternalServerError,
}

/// A domain failure carrying its HTTP status. The code alone does not
/// determine the status: USER_NOT_FOUND is 404 on a direct lookup but
/// 400 when an assignment names an unknown user.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: ErrorCode,
    message: String,
    errors: Option<BTreeMap<String, String>>,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    fn new(status: StatusCode, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            errors: None,
        }
    }

    pub fn task_not_found(id: i64) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            ErrorCode::TaskNotFound,
            format!("Task with ID {id} not found"),
        )
    }

    pub fn user_not_found(id: i64) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            ErrorCode::UserNotFound,
            format!("User with ID {id} not found"),
        )
    }

    /// Raised when a user filter matches nobody.
    pub fn no_user_matched() -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorCode::UserNotFound, "User not found")
    }

    /// Raised when an assignment request names at least one unknown user.
    pub fn users_not_found() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ErrorCode::UserNotFound,
            "Some users were not found",
        )
    }

    pub fn invalid_email_format(email: &str) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ErrorCode::InvalidEmailFormat,
            format!("Email {email} has an invalid format"),
        )
    }

    pub fn email_already_exists(email: &str) -> Self {
        Self::new(
            StatusCode::CONFLICT,
            ErrorCode::EmailAlreadyExists,
            format!("Email {email} is already in use"),
        )
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorCode::InvalidRequest, message)
    }

    pub fn validation(errors: BTreeMap<String, String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: ErrorCode::ValidationError,
            message: "Validation failed".into(),
            errors: Some(errors),
        }
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::InternalServerError,
            "An unexpected error occurred",
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        error!(error = %e, "store failure surfaced as internal error");
        ApiError::internal()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody<'a> {
    error_code: ErrorCode,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a BTreeMap<String, String>>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error_code: self.code,
            message: &self.message,
            errors: self.errors.as_ref(),
        };
        (self.status, Json(&body)).into_response()
    }
}
