//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, enums, and error types
//! that form the vocabulary of the progress domain.

mod errors;
mod ids;
mod lesson_status;
mod percentage;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{LessonId, ModuleId, ProgressId, UserId, MIN_USER_ID_LENGTH};
pub use lesson_status::LessonProgressStatus;
pub use percentage::{round_to_two_decimals, Percentage};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
