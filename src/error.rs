use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;

/// Field name -> messages, the contract shared by form validation and
/// storage constraint failures.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(DbErr),

    #[error("Authentication failed")]
    Unauthorized,

    #[error("Not found")]
    NotFound,

    #[error("Forbidden")]
    Forbidden,

    #[error("Validation error: {0:?}")]
    Validation(FieldErrors),

    #[error("Constraint violation: {0:?}")]
    ConstraintViolation(FieldErrors),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Payload too large")]
    PayloadTooLarge,
}

impl AppError {
    /// Single-field validation failure.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation(single_field(field, message))
    }

    /// Single-field constraint failure.
    pub fn constraint(field: &str, message: impl Into<String>) -> Self {
        AppError::ConstraintViolation(single_field(field, message))
    }

    pub fn fields(&self) -> Option<&FieldErrors> {
        match self {
            AppError::Validation(f) | AppError::ConstraintViolation(f) => Some(f),
            _ => None,
        }
    }
}

fn single_field(field: &str, message: impl Into<String>) -> FieldErrors {
    let mut errors = FieldErrors::new();
    push_field_error(&mut errors, field, message);
    errors
}

pub fn push_field_error(errors: &mut FieldErrors, field: &str, message: impl Into<String>) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.into());
}

/// Flatten validator output into the field map, preferring the human message
/// over the error code.
pub fn field_errors(errors: validator::ValidationErrors) -> FieldErrors {
    let mut fields = FieldErrors::new();
    for (field, errs) in errors.field_errors() {
        let messages = errs
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string())
            })
            .collect();
        fields.insert(field.to_string(), messages);
    }
    fields
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(field_errors(errors))
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => {
                AppError::constraint(constraint_field(&detail), "Already exists")
            }
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => {
                AppError::constraint(constraint_field(&detail), "Referenced record does not exist")
            }
            _ => AppError::Database(err),
        }
    }
}

/// Best-effort mapping of a driver constraint message to the form field it
/// belongs to. Falls back to `__all__` when the column can't be recognised.
fn constraint_field(detail: &str) -> &'static str {
    let detail = detail.to_ascii_lowercase();
    if detail.contains("slug") {
        "slug"
    } else if detail.contains("username") {
        "username"
    } else if detail.contains("group_id") {
        "group"
    } else if detail.contains("author_id") {
        "author"
    } else if detail.contains("post_id") {
        "post"
    } else {
        "__all__"
    }
}

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

impl utoipa::ToSchema for AppError {
    fn name() -> std::borrow::Cow<'static, str> {
        "ErrorResponse".into()
    }
}

impl utoipa::PartialSchema for AppError {
    fn schema() -> utoipa::openapi::RefOr<utoipa::openapi::schema::Schema> {
        ErrorResponse::schema()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, fields) = match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                    None,
                )
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string(), None),
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                "Resource not found".to_string(),
                None,
            ),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string(), None),
            AppError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                "Validation failed".to_string(),
                Some(fields),
            ),
            AppError::ConstraintViolation(fields) => (
                StatusCode::CONFLICT,
                "Constraint violation".to_string(),
                Some(fields),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    None,
                )
            }
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "File too large".to_string(),
                None,
            ),
        };

        let body = match fields {
            Some(fields) => json!({ "error": error_message, "fields": fields }),
            None => json!({ "error": error_message }),
        };

        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
