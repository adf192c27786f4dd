// src/error.rs

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::services::QuizError;

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 500, with a message inviting the user to resubmit
    SubmissionFailed,

    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::SubmissionFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to submit quiz attempt. Please try again.".to_string(),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::AuthError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Maps service errors onto HTTP statuses. Persistence detail never reaches the client.
impl From<QuizError> for AppError {
    fn from(err: QuizError) -> Self {
        match err {
            QuizError::Validation(msg) => AppError::BadRequest(msg),
            QuizError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
            QuizError::Forbidden(msg) => AppError::Forbidden(msg),
            QuizError::Persistence(e) => AppError::InternalServerError(e.to_string()),
            QuizError::SubmissionFailed => AppError::SubmissionFailed,
        }
    }
}

/// Malformed or mistyped request bodies become a 400 with the usual JSON error body.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<crate::store::StoreError> for AppError {
    fn from(err: crate::store::StoreError) -> Self {
        QuizError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn store_errors_map_to_statuses() {
        let invalid: AppError = StoreError::InvalidRecord("bad type".to_string()).into();
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);

        let conflict: AppError = StoreError::Conflict("lost race".to_string()).into();
        assert_eq!(
            conflict.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn quiz_errors_map_to_statuses() {
        let cases = [
            (QuizError::NotFound("Quiz".to_string()), StatusCode::NOT_FOUND),
            (QuizError::Forbidden("no".to_string()), StatusCode::FORBIDDEN),
            (QuizError::Validation("bad".to_string()), StatusCode::BAD_REQUEST),
            (QuizError::SubmissionFailed, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).into_response().status(), status);
        }
    }
}
