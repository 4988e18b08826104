//! `AppError`: every HTTP failure path collapses to this, per the error
//! codes in spec.md §7/§6.1. `engine_validation_failed` / `llm_unavailable`
//! / `llm_timeout` are deliberately absent here — those are business
//! outcomes carried in `ValidationResult`/`AlertMessage`, not raised as
//! request errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadInput(String),
    #[error("missing or invalid bearer token")]
    Unauthorized,
    #[error("role does not permit this action")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    UnprocessableEntity(String),
    #[error("storage_unavailable: {0}")]
    StorageUnavailable(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::BadInput(_) => "bad_input",
            AppError::Unauthorized => "auth_failed",
            AppError::Forbidden => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::UnprocessableEntity(_) => "unprocessable",
            AppError::StorageUnavailable(_) => "storage_unavailable",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::BadInput(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.code(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<crate::storage::StorageError> for AppError {
    fn from(e: crate::storage::StorageError) -> Self {
        AppError::StorageUnavailable(e.to_string())
    }
}

impl From<crate::identity::IdentityError> for AppError {
    fn from(e: crate::identity::IdentityError) -> Self {
        match e {
            crate::identity::IdentityError::BadCredentials => AppError::Unauthorized,
            other => AppError::BadInput(other.to_string()),
        }
    }
}

impl From<crate::config::SettingsError> for AppError {
    fn from(e: crate::config::SettingsError) -> Self {
        AppError::BadInput(e.to_string())
    }
}
