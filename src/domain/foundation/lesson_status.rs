//! LessonProgressStatus enum for tracking a learner's state on one lesson.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{StateMachine, ValidationError};

/// Progress state of a single lesson.
///
/// Status only ever advances: `NotStarted -> InProgress -> Completed`,
/// with `NotStarted -> Completed` allowed for lessons finished in one sitting.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LessonProgressStatus {
    #[default]
    NotStarted,
    InProgress,
    Completed,
}

impl LessonProgressStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [LessonProgressStatus; 3] = [
        LessonProgressStatus::NotStarted,
        LessonProgressStatus::InProgress,
        LessonProgressStatus::Completed,
    ];

    /// Returns true if work has begun on this lesson.
    pub fn is_started(&self) -> bool {
        !matches!(self, LessonProgressStatus::NotStarted)
    }

    /// Returns true if the lesson is finished.
    pub fn is_completed(&self) -> bool {
        matches!(self, LessonProgressStatus::Completed)
    }

    /// Returns true if the lesson is being worked on.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, LessonProgressStatus::InProgress)
    }

    /// Wire and storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LessonProgressStatus::NotStarted => "NOT_STARTED",
            LessonProgressStatus::InProgress => "IN_PROGRESS",
            LessonProgressStatus::Completed => "COMPLETED",
        }
    }
}

impl StateMachine for LessonProgressStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use LessonProgressStatus::*;
        matches!(
            (self, target),
            (NotStarted, InProgress) | (NotStarted, Completed) | (InProgress, Completed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use LessonProgressStatus::*;
        match self {
            NotStarted => vec![InProgress, Completed],
            InProgress => vec![Completed],
            Completed => vec![],
        }
    }
}

impl fmt::Display for LessonProgressStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LessonProgressStatus {
    type Err = ValidationError;

    /// Parses case-insensitively; `-` and `_` are interchangeable.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        match normalized.as_str() {
            "NOT_STARTED" => Ok(LessonProgressStatus::NotStarted),
            "IN_PROGRESS" => Ok(LessonProgressStatus::InProgress),
            "COMPLETED" => Ok(LessonProgressStatus::Completed),
            _ => Err(ValidationError::invalid_format(
                "status",
                format!("unknown lesson status '{}'", s),
            )),
        }
    }
}
