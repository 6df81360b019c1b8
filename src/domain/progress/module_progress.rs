//! ModuleProgress value object - derived completion figures for one module.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, Percentage};

/// Multiplier applied to the tracked lesson count when the module size is
/// unknown.
pub const DEFAULT_ESTIMATED_TOTAL_FACTOR: f64 = 1.25;

/// A snapshot of how far a learner is through a module.
///
/// Recomputed from the lesson entries on every query; never stored.
///
/// # Invariants
///
/// - `total_lessons > 0`
/// - `completed_lessons <= total_lessons`
/// - `completion_percentage == round(completed / total * 100, 2)`
/// - `is_completed == (completed_lessons == total_lessons)`
/// - `total_time_spent >= 0`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ModuleProgressFields")]
pub struct ModuleProgress {
    completed_lessons: u32,
    total_lessons: u32,
    completion_percentage: Percentage,
    is_completed: bool,
    total_time_spent: i64,
}

/// Wire shape of `ModuleProgress`, checked by `ModuleProgress::new` on input.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModuleProgressFields {
    completed_lessons: u32,
    total_lessons: u32,
    completion_percentage: f64,
    is_completed: bool,
    total_time_spent: i64,
}

impl TryFrom<ModuleProgressFields> for ModuleProgress {
    type Error = DomainError;

    fn try_from(fields: ModuleProgressFields) -> Result<Self, Self::Error> {
        Self::new(
            fields.completed_lessons,
            fields.total_lessons,
            fields.completion_percentage,
            fields.is_completed,
            fields.total_time_spent,
        )
    }
}

impl ModuleProgress {
    /// Creates a module progress from already computed figures.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if any cross-field invariant is violated
    pub fn new(
        completed_lessons: u32,
        total_lessons: u32,
        completion_percentage: f64,
        is_completed: bool,
        total_time_spent: i64,
    ) -> Result<Self, DomainError> {
        Self::validate_counts(completed_lessons, total_lessons, total_time_spent)?;

        let completion_percentage = Percentage::try_new(completion_percentage).map_err(|_| {
            DomainError::validation(
                "completion_percentage",
                "Completion percentage must be between 0 and 100",
            )
        })?;

        let expected = Percentage::of(completed_lessons, total_lessons)
            .map_err(|e| DomainError::validation("completion_percentage", e.to_string()))?;
        if completion_percentage != expected {
            return Err(DomainError::validation(
                "completion_percentage",
                "Completion percentage does not match lesson counts",
            ));
        }

        if is_completed != (completed_lessons == total_lessons) {
            return Err(DomainError::validation(
                "is_completed",
                "Completion flag does not match lesson counts",
            ));
        }

        Ok(Self {
            completed_lessons,
            total_lessons,
            completion_percentage,
            is_completed,
            total_time_spent,
        })
    }

    /// Derives percentage and completion from lesson counts.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if `total_lessons` is zero, `completed_lessons`
    ///   exceeds it, or `total_time_spent` is negative
    pub fn calculate_from_lessons(
        completed_lessons: u32,
        total_lessons: u32,
        total_time_spent: i64,
    ) -> Result<Self, DomainError> {
        Self::validate_counts(completed_lessons, total_lessons, total_time_spent)?;

        let completion_percentage = Percentage::of(completed_lessons, total_lessons)
            .map_err(|e| DomainError::validation("completion_percentage", e.to_string()))?;

        Ok(Self {
            completed_lessons,
            total_lessons,
            completion_percentage,
            is_completed: completed_lessons == total_lessons,
            total_time_spent,
        })
    }

    /// Zeroed, non-completed progress for a module of `total_lessons`.
    ///
    /// A zero total is lifted to one so the value stays well-formed.
    pub fn empty(total_lessons: u32) -> Self {
        Self {
            completed_lessons: 0,
            total_lessons: total_lessons.max(1),
            completion_percentage: Percentage::ZERO,
            is_completed: false,
            total_time_spent: 0,
        }
    }

    pub fn completed_lessons(&self) -> u32 {
        self.completed_lessons
    }

    pub fn total_lessons(&self) -> u32 {
        self.total_lessons
    }

    pub fn completion_percentage(&self) -> f64 {
        self.completion_percentage.value()
    }

    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    /// Seconds spent across all lessons of the module.
    pub fn total_time_spent(&self) -> i64 {
        self.total_time_spent
    }

    pub fn remaining_lessons(&self) -> u32 {
        self.total_lessons.saturating_sub(self.completed_lessons)
    }

    fn validate_counts(
        completed_lessons: u32,
        total_lessons: u32,
        total_time_spent: i64,
    ) -> Result<(), DomainError> {
        if total_lessons == 0 {
            return Err(DomainError::validation(
                "total_lessons",
                "Total lessons must be greater than 0",
            ));
        }
        if completed_lessons > total_lessons {
            return Err(DomainError::validation(
                "completed_lessons",
                "Completed lessons cannot exceed total lessons",
            ));
        }
        if total_time_spent < 0 {
            return Err(DomainError::validation(
                "total_time_spent",
                "Total time spent cannot be negative",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn calculate_two_of_five() {
        let mp = ModuleProgress::calculate_from_lessons(2, 5, 2400).unwrap();
        assert_eq!(mp.completed_lessons(), 2);
        assert_eq!(mp.completion_percentage(), 40.0);
        assert_eq!(mp.total_time_spent(), 2400);
        assert_eq!(mp.remaining_lessons(), 3);
        assert!(!mp.is_completed());
    }

    #[test]
    fn calculate_all_done_is_completed() {
        let mp = ModuleProgress::calculate_from_lessons(4, 4, 100).unwrap();
        assert!(mp.is_completed());
        assert_eq!(mp.completion_percentage(), 100.0);
    }

    #[test]
    fn calculate_rejects_zero_total() {
        let err = ModuleProgress::calculate_from_lessons(0, 0, 0).unwrap_err();
        assert_eq!(err.message, "Total lessons must be greater than 0");
    }

    #[test]
    fn calculate_rejects_completed_above_total() {
        assert!(ModuleProgress::calculate_from_lessons(6, 5, 0).is_err());
    }

    #[test]
    fn calculate_rejects_negative_time() {
        assert!(ModuleProgress::calculate_from_lessons(1, 5, -1).is_err());
    }

    #[test]
    fn new_rejects_inconsistent_completion_flag() {
        let err = ModuleProgress::new(2, 5, 40.0, true, 0).unwrap_err();
        assert_eq!(err.field(), Some("is_completed"));
    }

    #[test]
    fn new_rejects_percentage_out_of_range() {
        assert!(ModuleProgress::new(2, 5, 140.0, false, 0).is_err());
    }

    #[test]
    fn new_accepts_consistent_values() {
        let mp = ModuleProgress::new(5, 5, 100.0, true, 3000).unwrap();
        assert!(mp.is_completed());
    }

    #[test]
    fn empty_is_zeroed_and_well_formed() {
        let mp = ModuleProgress::empty(0);
        assert_eq!(mp.total_lessons(), 1);
        assert_eq!(mp.completion_percentage(), 0.0);
        assert!(!mp.is_completed());
    }

    #[test]
    fn serializes_with_camel_case_fields() {
        let json = serde_json::to_value(ModuleProgress::calculate_from_lessons(1, 4, 60).unwrap())
            .unwrap();
        assert_eq!(json["completionPercentage"], 25.0);
        assert_eq!(json["isCompleted"], false);
    }

    #[test]
    fn deserialize_goes_through_validation() {
        let json = r#"{"completedLessons":5,"totalLessons":2,"completionPercentage":10.0,"isCompleted":true,"totalTimeSpent":-7}"#;
        assert!(serde_json::from_str::<ModuleProgress>(json).is_err());

        let json = r#"{"completedLessons":2,"totalLessons":5,"completionPercentage":90.0,"isCompleted":false,"totalTimeSpent":60}"#;
        assert!(serde_json::from_str::<ModuleProgress>(json).is_err());
    }

    #[test]
    fn deserialize_accepts_serialized_value() {
        let original = ModuleProgress::calculate_from_lessons(2, 5, 2400).unwrap();
        let json = serde_json::to_string(&original).unwrap();
        let back: ModuleProgress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, original);
        assert_eq!(back.remaining_lessons(), 3);
    }

    proptest! {
        #[test]
        fn percentage_and_completion_follow_counts(
            (total, completed) in (1u32..500).prop_flat_map(|t| (Just(t), 0..=t)),
            time in 0i64..1_000_000,
        ) {
            let mp = ModuleProgress::calculate_from_lessons(completed, total, time).unwrap();
            let expected = (f64::from(completed) / f64::from(total) * 100.0 * 100.0).round() / 100.0;
            prop_assert_eq!(mp.completion_percentage(), expected);
            prop_assert_eq!(mp.is_completed(), completed == total);
            prop_assert_eq!(mp.total_time_spent(), time);
        }
    }
}
