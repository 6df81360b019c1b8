//! Progress aggregate entity.
//!
//! A Progress records one learner's advancement through one module. It owns
//! the learner's lesson entries for that module and every figure derived
//! from them.
//!
//! # Ownership
//!
//! Exactly one Progress exists per (user, module). The repository enforces
//! this with a uniqueness constraint; the aggregate never references other
//! modules' progress.

use std::collections::HashSet;

use serde::Serialize;

use crate::domain::foundation::{
    DomainError, ErrorCode, LessonId, LessonProgressStatus, ModuleId, ProgressId, Timestamp,
    UserId,
};

use super::{LessonProgress, ModuleProgress};

/// Progress aggregate - one learner's lesson states for one module.
///
/// # Invariants
///
/// - No two lesson entries share a `lesson_id`
/// - `completed_at` is written at most once
/// - `last_accessed_at` moves forward on every mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    id: ProgressId,
    user_id: UserId,
    module_id: ModuleId,
    lessons: Vec<LessonProgress>,
    started_at: Timestamp,
    last_accessed_at: Option<Timestamp>,
    completed_at: Option<Timestamp>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Progress {
    /// Create progress for a module the learner just touched.
    ///
    /// # Errors
    ///
    /// - `LessonProgressAlreadyExists` if `lessons` repeats a lesson id
    pub fn new(
        id: ProgressId,
        user_id: UserId,
        module_id: ModuleId,
        lessons: Vec<LessonProgress>,
        started_at: Timestamp,
    ) -> Result<Self, DomainError> {
        let mut seen = HashSet::with_capacity(lessons.len());
        for lesson in &lessons {
            if !seen.insert(lesson.lesson_id()) {
                return Err(Self::duplicate_lesson(lesson.lesson_id()));
            }
        }

        let now = Timestamp::now();
        Ok(Self {
            id,
            user_id,
            module_id,
            lessons,
            started_at,
            last_accessed_at: Some(started_at),
            completed_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Reconstitute a progress from persistence (no validation).
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: ProgressId,
        user_id: UserId,
        module_id: ModuleId,
        lessons: Vec<LessonProgress>,
        started_at: Timestamp,
        last_accessed_at: Option<Timestamp>,
        completed_at: Option<Timestamp>,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            user_id,
            module_id,
            lessons,
            started_at,
            last_accessed_at,
            completed_at,
            created_at,
            updated_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &ProgressId {
        &self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn module_id(&self) -> &ModuleId {
        &self.module_id
    }

    /// Lesson entries in the order they were first tracked.
    pub fn lessons(&self) -> &[LessonProgress] {
        &self.lessons
    }

    pub fn started_at(&self) -> &Timestamp {
        &self.started_at
    }

    pub fn last_accessed_at(&self) -> Option<&Timestamp> {
        self.last_accessed_at.as_ref()
    }

    pub fn completed_at(&self) -> Option<&Timestamp> {
        self.completed_at.as_ref()
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Returns the entry for `lesson_id`, if the learner has touched it.
    pub fn lesson_progress(&self, lesson_id: &LessonId) -> Option<&LessonProgress> {
        self.lessons.iter().find(|lp| lp.lesson_id() == lesson_id)
    }

    pub fn completed_lesson_count(&self) -> u32 {
        self.count_with_status(LessonProgressStatus::Completed)
    }

    pub fn in_progress_lesson_count(&self) -> u32 {
        self.count_with_status(LessonProgressStatus::InProgress)
    }

    /// Seconds spent across every tracked lesson.
    pub fn total_time_spent(&self) -> i64 {
        self.lessons.iter().map(LessonProgress::time_spent).sum()
    }

    /// Mean seconds per completed lesson, or zero before any completion.
    pub fn average_time_per_completed_lesson(&self) -> f64 {
        match self.completed_lesson_count() {
            0 => 0.0,
            completed => self.total_time_spent() as f64 / f64::from(completed),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Track a lesson for the first time.
    ///
    /// # Errors
    ///
    /// - `LessonProgressAlreadyExists` if the lesson is already tracked
    pub fn add_lesson_progress(&mut self, lesson: LessonProgress) -> Result<(), DomainError> {
        if self.lesson_progress(lesson.lesson_id()).is_some() {
            return Err(Self::duplicate_lesson(lesson.lesson_id()));
        }

        self.lessons.push(lesson);
        self.touch(Timestamp::now());
        Ok(())
    }

    /// Replace the entry of an already tracked lesson.
    ///
    /// # Errors
    ///
    /// - `LessonProgressNotFound` if the lesson is not tracked yet
    pub fn update_lesson_progress(&mut self, lesson: LessonProgress) -> Result<(), DomainError> {
        let slot = self
            .lessons
            .iter_mut()
            .find(|lp| lp.lesson_id() == lesson.lesson_id())
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::LessonProgressNotFound,
                    format!("Lesson progress not found for lesson {}", lesson.lesson_id()),
                )
            })?;

        *slot = lesson;
        self.touch(Timestamp::now());
        Ok(())
    }

    /// Mark the whole module as completed.
    ///
    /// # Errors
    ///
    /// - `ModuleAlreadyCompleted` if the module was completed before
    pub fn complete_module(&mut self, at: Timestamp) -> Result<(), DomainError> {
        if self.completed_at.is_some() {
            return Err(DomainError::new(
                ErrorCode::ModuleAlreadyCompleted,
                format!("Module {} is already completed", self.module_id),
            ));
        }

        self.completed_at = Some(at);
        self.touch(at);
        Ok(())
    }

    /// Record that the learner opened the module without changing lessons.
    pub fn record_access(&mut self, at: Timestamp) {
        self.touch(at);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Derived views
    // ─────────────────────────────────────────────────────────────────────────

    /// Completion figures for a module of `total_lessons` lessons.
    ///
    /// Never fails: impossible inputs (zero total, more completions than
    /// lessons) yield zeroed progress instead of an error.
    pub fn calculate_module_progress(&self, total_lessons: u32) -> ModuleProgress {
        ModuleProgress::calculate_from_lessons(
            self.completed_lesson_count(),
            total_lessons,
            self.total_time_spent(),
        )
        .unwrap_or_else(|_| ModuleProgress::empty(total_lessons))
    }

    /// True if the lesson is untracked or tracked as not started.
    pub fn is_lesson_unstarted(&self, lesson_id: &LessonId) -> bool {
        self.lesson_progress(lesson_id)
            .map_or(true, |lp| lp.status() == LessonProgressStatus::NotStarted)
    }

    /// First lesson in `all_lesson_ids` order the learner has not started.
    pub fn next_lesson_to_start<'a>(&self, all_lesson_ids: &'a [LessonId]) -> Option<&'a LessonId> {
        all_lesson_ids
            .iter()
            .find(|id| self.is_lesson_unstarted(id))
    }

    /// In-progress lesson with the most recent activity.
    pub fn current_lesson(&self) -> Option<&LessonProgress> {
        self.lessons
            .iter()
            .filter(|lp| lp.is_in_progress())
            .max_by_key(|lp| *lp.last_activity_at())
    }

    /// Completed lesson with the most recent completion date.
    pub fn last_completed_lesson(&self) -> Option<&LessonProgress> {
        self.lessons
            .iter()
            .filter(|lp| lp.is_completed())
            .max_by_key(|lp| lp.completed_at().copied())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Private helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn count_with_status(&self, status: LessonProgressStatus) -> u32 {
        self.lessons.iter().filter(|lp| lp.status() == status).count() as u32
    }

    fn touch(&mut self, at: Timestamp) {
        self.last_accessed_at = Some(at);
        self.updated_at = Timestamp::now();
    }

    fn duplicate_lesson(lesson_id: &LessonId) -> DomainError {
        DomainError::new(
            ErrorCode::LessonProgressAlreadyExists,
            format!("Lesson progress already exists for lesson {}", lesson_id),
        )
    }
}
