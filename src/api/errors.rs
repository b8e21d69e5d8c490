use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;

/// Converts AppError into HTTP responses.
///
/// Validation failures carry the offending field so the console can render
/// the message inline.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Validation { field, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                serde_json::json!({ "error": message, "field": field }),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, error_body(msg)),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, error_body(msg)),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, error_body(msg)),
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, error_body(msg)),
            AppError::Database(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body(&format!("Database error: {}", msg)),
            ),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, error_body(msg)),
        };

        (status, axum::Json(body)).into_response()
    }
}

fn error_body(message: &str) -> serde_json::Value {
    serde_json::json!({
        "error": message
    })
}
