//! JSON error envelope returned by every failing endpoint.
//!
//! Body shape: `{"error": {"code": "...", "message": "..."}}`.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use habitdraw_core::{HabitId, HabitServiceError};
use log::error;
use serde::Serialize;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: ErrorPayload<'a>,
}

#[derive(Debug, Serialize)]
struct ErrorPayload<'a> {
    code: &'static str,
    message: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn habit_not_found(id: HabitId) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "habit_not_found",
            format!("Habit {id} not found"),
        )
    }

    pub fn no_habits() -> Self {
        Self::new(StatusCode::NOT_FOUND, "no_habits", "No habits found")
    }

    /// Internal detail goes to the log, not to the client.
    pub fn store_failure(detail: impl Display) -> Self {
        error!("event=http_request module=api status=error error_code=store_failure detail={detail}");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_failure",
            "The habit store could not complete the request",
        )
    }

    /// Well-formed JSON with missing or mistyped fields is a validation
    /// failure; anything else keeps axum's status.
    pub fn invalid_json(rejection: &JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(_) => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                rejection.body_text(),
            ),
            _ => Self::new(rejection.status(), "invalid_json", rejection.body_text()),
        }
    }

    pub fn invalid_path(rejection: &PathRejection) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "validation_error",
            rejection.body_text(),
        )
    }

    pub fn invalid_query(rejection: &QueryRejection) -> Self {
        Self::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "validation_error",
            rejection.body_text(),
        )
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.status.as_u16(), self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<HabitServiceError> for ApiError {
    fn from(value: HabitServiceError) -> Self {
        match value {
            HabitServiceError::Validation(err) => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                err.to_string(),
            ),
            HabitServiceError::SelectionConflict { .. } => {
                Self::new(StatusCode::CONFLICT, "selection_conflict", value.to_string())
            }
            HabitServiceError::Repo(err) => Self::store_failure(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorPayload {
                code: self.code,
                message: &self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}
