//! Error handling for the Weather Scheduler server
//!
//! Handler errors render as `{"error": {"code", "message", "field"?}}`.
//! The event CRUD routes keep the flat `{"error": "<message>"}` body their
//! existing clients parse, via `FlatError`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::SchedulerError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Validation { .. } | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateEntry(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DatabaseError(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> ErrorDetail {
        let (code, message, field) = match self {
            AppError::InvalidCredentials => ("INVALID_CREDENTIALS", "Invalid credentials.".to_string(), None),
            AppError::Validation { field, message } => {
                ("VALIDATION_ERROR", message.clone(), Some(field.clone()))
            }
            AppError::BadRequest(msg) => ("BAD_REQUEST", msg.clone(), None),
            AppError::DuplicateEntry(msg) => ("DUPLICATE_ENTRY", msg.clone(), None),
            AppError::NotFound(msg) => ("NOT_FOUND", msg.clone(), None),
            AppError::DatabaseError(_) | AppError::Internal(_) => {
                ("INTERNAL_ERROR", "Server error.".to_string(), None)
            }
        };

        ErrorDetail {
            code: code.to_string(),
            message,
            field,
        }
    }
}

impl From<SchedulerError> for AppError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::Validation { field, message } => AppError::Validation { field, message },
            SchedulerError::NotFound(id) => AppError::NotFound(format!("Event {} not found", id)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Client errors are expected traffic; only server faults are errors
        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: self.detail() })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

/// Flat error body for the event CRUD routes
#[derive(Serialize)]
pub struct FlatErrorResponse {
    pub error: String,
}

/// `AppError` rendered as `{"error": "<message>"}` with the same status
#[derive(Debug)]
pub struct FlatError(pub AppError);

impl From<AppError> for FlatError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for FlatError {
    fn into_response(self) -> Response {
        let status = self.0.status();

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self.0);
        } else {
            tracing::debug!("Request rejected: {}", self.0);
        }

        let body = FlatErrorResponse {
            error: self.0.detail().message,
        };
        (status, Json(body)).into_response()
    }
}

/// Result type alias for the event CRUD handlers
pub type FlatResult<T> = Result<T, FlatError>;
