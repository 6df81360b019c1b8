//! Progress-specific error types returned across the use-case boundary.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

/// Errors surfaced by the progress use cases.
///
/// `Display` renders the human-readable message only, so callers can show
/// it to the learner as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgressError {
    /// Request data is malformed or out of range.
    #[error("{message}")]
    Validation { field: String, message: String },

    /// The request conflicts with the stored state (duplicate lesson,
    /// re-completion, status regression, ...).
    #[error("{0}")]
    InvalidState(String),

    /// Storage failed; the caller decides whether to retry.
    #[error("{0}")]
    Infrastructure(String),
}

impl ProgressError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ProgressError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        ProgressError::InvalidState(message.into())
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        ProgressError::Infrastructure(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ProgressError::Validation { .. } => ErrorCode::ValidationFailed,
            ProgressError::InvalidState(_) => ErrorCode::InvalidStateTransition,
            ProgressError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Returns true for failures the caller cannot fix by changing input.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, ProgressError::Infrastructure(_))
    }
}

impl From<DomainError> for ProgressError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed
            | ErrorCode::EmptyField
            | ErrorCode::OutOfRange
            | ErrorCode::InvalidFormat => ProgressError::Validation {
                field: err.field().unwrap_or("unknown").to_string(),
                message: err.message,
            },
            ErrorCode::LessonProgressAlreadyExists
            | ErrorCode::LessonProgressNotFound
            | ErrorCode::LessonAlreadyCompleted
            | ErrorCode::ModuleAlreadyCompleted
            | ErrorCode::InvalidStateTransition => ProgressError::InvalidState(err.message),
            ErrorCode::DatabaseError | ErrorCode::InternalError => {
                ProgressError::Infrastructure(err.message)
            }
        }
    }
}

impl From<ValidationError> for ProgressError {
    fn from(err: ValidationError) -> Self {
        ProgressError::Validation {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}
