// src/error.rs

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

use crate::services::window::WindowState;

/// One rejected input field, e.g. `questions[2].correct_answer`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, code: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 400 Bad Request, with per-field detail
    Validation(Vec<FieldError>),

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden (wrong role)
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict: a finished attempt already exists for (quiz, student)
    AlreadySubmitted,

    // 403 Forbidden: attempt outside the delivery window
    WindowClosed(WindowState),

    // 503 Service Unavailable: storage failure or timeout, retryable
    Persistence(String),

    // 500 Internal Server Error
    InternalServerError(String),
}

impl AppError {
    /// Stable machine-readable tag sent alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::BadRequest(_) => "bad_request",
            AppError::AuthError(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::AlreadySubmitted => "already_submitted",
            AppError::WindowClosed(_) => "window_closed",
            AppError::Persistence(_) => "persistence",
            AppError::InternalServerError(_) => "internal",
        }
    }

    /// Single-field validation failure.
    pub fn invalid(field: impl Into<String>, code: &str, message: impl Into<String>) -> Self {
        AppError::Validation(vec![FieldError::new(field, code, message)])
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(fields) => {
                let names: Vec<&str> = fields.iter().map(|e| e.field.as_str()).collect();
                write!(f, "validation failed: {}", names.join(", "))
            }
            AppError::AlreadySubmitted => write!(f, "You have already finished the quiz."),
            AppError::WindowClosed(state) => write!(f, "Quiz is {}", state.describe()),
            AppError::BadRequest(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Persistence(msg)
            | AppError::InternalServerError(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let (status, error_message, fields) = match self {
            AppError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                "Validation failed".to_string(),
                Some(fields),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::AlreadySubmitted => (
                StatusCode::CONFLICT,
                AppError::AlreadySubmitted.to_string(),
                None,
            ),
            AppError::WindowClosed(state) => (
                StatusCode::FORBIDDEN,
                AppError::WindowClosed(state).to_string(),
                None,
            ),
            AppError::Persistence(msg) => {
                tracing::error!("Persistence failure: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Storage temporarily unavailable".to_string(),
                    None,
                )
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                    None,
                )
            }
        };

        let body = match fields {
            Some(fields) => json!({ "error": error_message, "kind": kind, "fields": fields }),
            None => json!({ "error": error_message, "kind": kind }),
        };

        (status, Json(body)).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::Persistence`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => {
                AppError::Persistence("database pool timed out".to_string())
            }
            other => AppError::Persistence(other.to_string()),
        }
    }
}

/// Maps a JSON body rejection onto the field it concerns.
///
/// Type mismatches (a bad date, a non-string answer) become validation
/// errors keyed by the serde path, e.g. `answers.12`. Syntax errors with no
/// usable path and missing content types stay plain bad requests.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => {
                let text = e.body_text();
                let (path, message) = rejection_detail(&text);
                AppError::invalid(path.unwrap_or("body"), "invalid_type", message)
            }
            JsonRejection::JsonSyntaxError(e) => {
                let text = e.body_text();
                match rejection_detail(&text) {
                    (Some(path), message) => AppError::invalid(path, "invalid_json", message),
                    (None, _) => AppError::BadRequest(text),
                }
            }
            other => AppError::BadRequest(other.body_text()),
        }
    }
}

/// Splits axum's `"<summary>: <path>: <message>"` rejection text.
fn rejection_detail(text: &str) -> (Option<&str>, &str) {
    let detail = text.split_once(": ").map_or(text, |(_, rest)| rest);
    match detail.split_once(": ") {
        Some((path, message)) if !path.is_empty() && !path.contains(char::is_whitespace) => {
            (Some(path), message)
        }
        _ => (None, detail),
    }
}

/// Flattens `validator` derive output into field errors, prefixing nested paths.
impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(field_errors("", &errors))
    }
}

pub(crate) fn field_errors(prefix: &str, errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    for (field, errs) in errors.field_errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        for err in errs {
            let message = err
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| err.code.to_string());
            out.push(FieldError::new(path.clone(), &err.code, message));
        }
    }
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (AppError::invalid("title", "required", "missing"), StatusCode::BAD_REQUEST),
            (AppError::AlreadySubmitted, StatusCode::CONFLICT),
            (AppError::WindowClosed(WindowState::Closed), StatusCode::FORBIDDEN),
            (AppError::Persistence("down".into()), StatusCode::SERVICE_UNAVAILABLE),
            (AppError::NotFound("quiz".into()), StatusCode::NOT_FOUND),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_rejection_detail_extracts_serde_path() {
        let text = "Failed to deserialize the JSON body into the target type: \
                    answers.3: invalid type: integer `5`, expected a string at line 1 column 17";
        let (path, message) = rejection_detail(text);
        assert_eq!(path, Some("answers.3"));
        assert!(message.starts_with("invalid type"));

        let text = "Failed to parse the request body as JSON: EOF while parsing a value";
        assert_eq!(rejection_detail(text), (None, "EOF while parsing a value"));

        let text = "Failed to deserialize the JSON body into the target type: \
                    invalid type: map, expected a string";
        assert_eq!(rejection_detail(text).0, None);
    }

    #[test]
    fn test_sqlx_timeout_is_persistence() {
        let err: AppError = sqlx::Error::PoolTimedOut.into();
        assert_eq!(err.kind(), "persistence");
    }
}
