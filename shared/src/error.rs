//! Errors surfaced to callers of the event store

use thiserror::Error;

use crate::types::EventId;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("event not found: {0}")]
    NotFound(EventId),
}

impl SchedulerError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
