//! LessonProgress value object - a learner's state on one lesson.

use serde::Serialize;

use crate::domain::foundation::{
    DomainError, ErrorCode, LessonId, LessonProgressStatus, StateMachine, Timestamp,
};

/// A learner's state on a single lesson.
///
/// Mutations never change `self`; they return the updated copy.
///
/// # Invariants
///
/// - `time_spent` is never negative (seconds)
/// - `completed_at` is set if and only if `status` is `Completed`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
    lesson_id: LessonId,
    status: LessonProgressStatus,
    started_at: Timestamp,
    completed_at: Option<Timestamp>,
    time_spent: i64,
    attempts: u32,
    last_attempt_at: Option<Timestamp>,
}

impl LessonProgress {
    /// Creates a lesson progress entry, validating every field.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if `time_spent` is negative
    /// - `ValidationFailed` if `completed_at` disagrees with `status`
    pub fn new(
        lesson_id: LessonId,
        status: LessonProgressStatus,
        started_at: Timestamp,
        completed_at: Option<Timestamp>,
        time_spent: i64,
        attempts: u32,
        last_attempt_at: Option<Timestamp>,
    ) -> Result<Self, DomainError> {
        Self::validate_time_spent(time_spent)?;

        if completed_at.is_some() && !status.is_completed() {
            return Err(DomainError::validation(
                "completed_at",
                "Completed date can only be set when the lesson is completed",
            ));
        }
        if completed_at.is_none() && status.is_completed() {
            return Err(DomainError::validation(
                "completed_at",
                "Completed lessons must have a completion date",
            ));
        }

        Ok(Self {
            lesson_id,
            status,
            started_at,
            completed_at,
            time_spent,
            attempts,
            last_attempt_at,
        })
    }

    /// A lesson the learner has seen but not opened yet.
    pub fn not_started(lesson_id: LessonId, at: Timestamp) -> Self {
        Self {
            lesson_id,
            status: LessonProgressStatus::NotStarted,
            started_at: at,
            completed_at: None,
            time_spent: 0,
            attempts: 0,
            last_attempt_at: None,
        }
    }

    /// A lesson opened for the first time at `at`.
    pub fn started(lesson_id: LessonId, at: Timestamp) -> Self {
        Self {
            lesson_id,
            status: LessonProgressStatus::InProgress,
            started_at: at,
            completed_at: None,
            time_spent: 0,
            attempts: 1,
            last_attempt_at: Some(at),
        }
    }

    /// Reconstitute from persistence (no validation).
    pub fn reconstitute(
        lesson_id: LessonId,
        status: LessonProgressStatus,
        started_at: Timestamp,
        completed_at: Option<Timestamp>,
        time_spent: i64,
        attempts: u32,
        last_attempt_at: Option<Timestamp>,
    ) -> Self {
        Self {
            lesson_id,
            status,
            started_at,
            completed_at,
            time_spent,
            attempts,
            last_attempt_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn lesson_id(&self) -> &LessonId {
        &self.lesson_id
    }

    pub fn status(&self) -> LessonProgressStatus {
        self.status
    }

    pub fn started_at(&self) -> &Timestamp {
        &self.started_at
    }

    pub fn completed_at(&self) -> Option<&Timestamp> {
        self.completed_at.as_ref()
    }

    /// Seconds spent on the lesson.
    pub fn time_spent(&self) -> i64 {
        self.time_spent
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_attempt_at(&self) -> Option<&Timestamp> {
        self.last_attempt_at.as_ref()
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }

    pub fn is_in_progress(&self) -> bool {
        self.status.is_in_progress()
    }

    /// Most recent moment the learner touched this lesson.
    pub fn last_activity_at(&self) -> &Timestamp {
        self.last_attempt_at.as_ref().unwrap_or(&self.started_at)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transitions
    // ─────────────────────────────────────────────────────────────────────────

    /// Moves a not-started lesson to in progress.
    ///
    /// # Errors
    ///
    /// - `InvalidStateTransition` unless the lesson is `NotStarted`
    pub fn start(&self, at: Timestamp) -> Result<Self, DomainError> {
        if self.status != LessonProgressStatus::NotStarted {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Lesson {} has already been started", self.lesson_id),
            ));
        }

        Ok(Self {
            status: LessonProgressStatus::InProgress,
            started_at: at,
            ..self.clone()
        })
    }

    /// Completes the lesson, recording the total time spent on it.
    ///
    /// # Errors
    ///
    /// - `LessonAlreadyCompleted` if the lesson is already completed
    /// - `ValidationFailed` if `time_spent` is negative
    /// - `ValidationFailed` if `at` is before `started_at`
    pub fn complete(&self, at: Timestamp, time_spent: i64) -> Result<Self, DomainError> {
        if self.status.is_completed() {
            return Err(DomainError::new(
                ErrorCode::LessonAlreadyCompleted,
                "Lesson is already completed",
            ));
        }
        Self::validate_time_spent(time_spent)?;
        if at.is_before(&self.started_at) {
            return Err(DomainError::validation(
                "completed_at",
                "Completed date cannot be before the lesson started",
            ));
        }

        let status = self
            .status
            .transition_to(LessonProgressStatus::Completed)
            .map_err(|e| DomainError::new(ErrorCode::InvalidStateTransition, e.to_string()))?;

        Ok(Self {
            status,
            completed_at: Some(at),
            time_spent,
            ..self.clone()
        })
    }

    /// Adds `additional` seconds to the time spent.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if `additional` is negative
    pub fn update_time_spent(&self, additional: i64) -> Result<Self, DomainError> {
        Self::validate_time_spent(additional)?;

        Ok(Self {
            time_spent: self.time_spent.saturating_add(additional),
            ..self.clone()
        })
    }

    /// Replaces the time spent with a reported total.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if `time_spent` is negative
    pub fn with_time_spent(&self, time_spent: i64) -> Result<Self, DomainError> {
        Self::validate_time_spent(time_spent)?;

        Ok(Self {
            time_spent,
            ..self.clone()
        })
    }

    /// Counts one more attempt at `at`. Status is left untouched.
    pub fn record_attempt(&self, at: Timestamp) -> Self {
        Self {
            attempts: self.attempts.saturating_add(1),
            last_attempt_at: Some(at),
            ..self.clone()
        }
    }

    fn validate_time_spent(time_spent: i64) -> Result<(), DomainError> {
        if time_spent < 0 {
            return Err(DomainError::validation(
                "time_spent",
                "Time spent cannot be negative",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson(id: &str) -> LessonId {
        LessonId::new(id).unwrap()
    }

    fn in_progress() -> LessonProgress {
        LessonProgress::started(lesson("lesson-1"), Timestamp::now())
    }

    // Construction

    #[test]
    fn new_rejects_negative_time() {
        let result = LessonProgress::new(
            lesson("lesson-1"),
            LessonProgressStatus::InProgress,
            Timestamp::now(),
            None,
            -1,
            0,
            None,
        );
        let err = result.unwrap_err();
        assert_eq!(err.message, "Time spent cannot be negative");
    }

    #[test]
    fn new_rejects_completed_at_on_unfinished_lesson() {
        let result = LessonProgress::new(
            lesson("lesson-1"),
            LessonProgressStatus::InProgress,
            Timestamp::now(),
            Some(Timestamp::now()),
            0,
            0,
            None,
        );
        assert_eq!(result.unwrap_err().field(), Some("completed_at"));
    }

    #[test]
    fn new_rejects_completed_without_date() {
        let result = LessonProgress::new(
            lesson("lesson-1"),
            LessonProgressStatus::Completed,
            Timestamp::now(),
            None,
            10,
            1,
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn started_counts_first_attempt() {
        let lp = in_progress();
        assert_eq!(lp.status(), LessonProgressStatus::InProgress);
        assert_eq!(lp.attempts(), 1);
        assert!(lp.last_attempt_at().is_some());
    }

    // start

    #[test]
    fn start_moves_not_started_to_in_progress() {
        let lp = LessonProgress::not_started(lesson("lesson-1"), Timestamp::now());
        let started = lp.start(Timestamp::now()).unwrap();
        assert_eq!(started.status(), LessonProgressStatus::InProgress);
        assert_eq!(lp.status(), LessonProgressStatus::NotStarted);
    }

    #[test]
    fn start_rejects_in_progress_lesson() {
        let err = in_progress().start(Timestamp::now()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStateTransition);
    }

    // complete

    #[test]
    fn complete_sets_status_date_and_time() {
        let at = Timestamp::now();
        let done = in_progress().complete(at, 900).unwrap();
        assert!(done.is_completed());
        assert_eq!(done.completed_at(), Some(&at));
        assert_eq!(done.time_spent(), 900);
    }

    #[test]
    fn complete_from_not_started_is_allowed() {
        let lp = LessonProgress::not_started(lesson("lesson-1"), Timestamp::now());
        assert!(lp.complete(Timestamp::now(), 60).unwrap().is_completed());
    }

    #[test]
    fn complete_twice_fails_with_already_completed() {
        let done = in_progress().complete(Timestamp::now(), 10).unwrap();
        let err = done.complete(Timestamp::now(), 10).unwrap_err();
        assert_eq!(err.code, ErrorCode::LessonAlreadyCompleted);
        assert!(err.message.contains("already completed"));
    }

    #[test]
    fn complete_rejects_date_before_start() {
        let lp = in_progress();
        let err = lp.complete(lp.started_at().minus_days(1), 60).unwrap_err();
        assert_eq!(err.field(), Some("completed_at"));
    }

    #[test]
    fn complete_rejects_negative_time() {
        let err = in_progress().complete(Timestamp::now(), -5).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    // time and attempts

    #[test]
    fn update_time_spent_accumulates() {
        let lp = in_progress()
            .update_time_spent(120)
            .unwrap()
            .update_time_spent(30)
            .unwrap();
        assert_eq!(lp.time_spent(), 150);
    }

    #[test]
    fn update_time_spent_rejects_negative() {
        assert!(in_progress().update_time_spent(-1).is_err());
    }

    #[test]
    fn record_attempt_keeps_status() {
        let lp = LessonProgress::not_started(lesson("lesson-1"), Timestamp::now());
        let attempted = lp.record_attempt(Timestamp::now());
        assert_eq!(attempted.attempts(), 1);
        assert_eq!(attempted.status(), LessonProgressStatus::NotStarted);
    }

    #[test]
    fn last_activity_prefers_last_attempt() {
        let start = Timestamp::now();
        let later = start.plus_secs(60);
        let lp = LessonProgress::not_started(lesson("lesson-1"), start);
        assert_eq!(lp.last_activity_at(), &start);
        assert_eq!(lp.record_attempt(later).last_activity_at(), &later);
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let json = serde_json::to_value(in_progress()).unwrap();
        assert_eq!(json["lessonId"], "lesson-1");
        assert_eq!(json["status"], "IN_PROGRESS");
        assert_eq!(json["timeSpent"], 0);
    }
}
