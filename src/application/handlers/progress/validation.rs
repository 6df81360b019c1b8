//! Request validation shared by the progress handlers.
//!
//! Handlers accept raw strings from callers; these helpers turn them into
//! domain identifiers, reporting the first problem found.

use crate::domain::foundation::{LessonId, ModuleId, UserId};
use crate::domain::progress::ProgressError;

/// Fails with `message` when `value` is empty or whitespace.
pub(crate) fn require(field: &str, value: &str, message: &str) -> Result<(), ProgressError> {
    if value.trim().is_empty() {
        return Err(ProgressError::validation(field, message));
    }
    Ok(())
}

pub(crate) fn user_id(raw: &str) -> Result<UserId, ProgressError> {
    UserId::new(raw).map_err(ProgressError::from)
}

pub(crate) fn module_id(raw: &str) -> Result<ModuleId, ProgressError> {
    ModuleId::new(raw).map_err(ProgressError::from)
}

pub(crate) fn lesson_id(raw: &str) -> Result<LessonId, ProgressError> {
    LessonId::new(raw).map_err(ProgressError::from)
}

/// Converts a caller-supplied lesson count, which must be positive.
pub(crate) fn total_lessons(field: &str, raw: i64) -> Result<u32, ProgressError> {
    if raw <= 0 {
        return Err(ProgressError::validation(
            field,
            "Total lessons must be greater than 0",
        ));
    }
    u32::try_from(raw).map_err(|_| {
        ProgressError::validation(field, format!("Total lessons cannot exceed {}", u32::MAX))
    })
}
