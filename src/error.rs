use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::collections::BTreeMap;

/// Field-keyed validation messages, e.g.
/// `{"username": ["Username already exists"]}`.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found")]
    NotFound,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, errors) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, json!("Not found")),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, json!("Unauthorized")),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!(msg)),
            AppError::Validation(fields) => (StatusCode::BAD_REQUEST, json!(fields)),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, json!(msg)),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!("Internal server error"),
                )
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!("Internal server error"),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!("Internal server error"),
                )
            }
        };

        (status, Json(json!({ "errors": errors }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// One field, one message. Convenience for the single-field rejections
/// sprinkled through the handlers.
pub fn field_error(field: &str, message: &str) -> AppError {
    let mut fields = FieldErrors::new();
    fields.insert(field.to_string(), vec![message.to_string()]);
    AppError::Validation(fields)
}
