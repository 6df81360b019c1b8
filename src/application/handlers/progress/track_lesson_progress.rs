//! TrackLessonProgressHandler - Command handler recording lesson activity.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::foundation::{
    LessonId, LessonProgressStatus, ModuleId, ProgressId, StateMachine, Timestamp, UserId,
};
use crate::domain::progress::{LessonProgress, Progress, ProgressError};
use crate::ports::ProgressRepository;

use super::validation;

/// Command reporting a learner's activity on one lesson.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackLessonProgressCommand {
    pub user_id: String,
    pub module_id: String,
    pub lesson_id: String,
    /// `NOT_STARTED`, `IN_PROGRESS` or `COMPLETED`.
    pub status: String,
    /// Total seconds spent on the lesson so far.
    pub time_spent: i64,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Number of lessons in the module, when the caller knows it.
    #[serde(default)]
    pub total_lessons: Option<u32>,
}

/// Result of a tracked lesson.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackLessonProgressResult {
    pub progress_id: ProgressId,
    pub lesson_progress: LessonProgress,
    pub module_completed: bool,
}

/// Handler for tracking lesson progress.
pub struct TrackLessonProgressHandler {
    repository: Arc<dyn ProgressRepository>,
}

impl TrackLessonProgressHandler {
    pub fn new(repository: Arc<dyn ProgressRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(
        &self,
        cmd: TrackLessonProgressCommand,
    ) -> Result<TrackLessonProgressResult, ProgressError> {
        let now = Timestamp::now();
        let request = TrackingRequest::parse(cmd, now).map_err(|e| {
            warn!(error = %e, "Rejected lesson tracking request");
            e
        })?;

        debug!(
            user_id = %request.user_id,
            module_id = %request.module_id,
            lesson_id = %request.lesson_id,
            status = %request.status,
            time_spent = request.time_spent,
            "Tracking lesson progress"
        );

        // 1. Load the module progress, or start it with this lesson
        let existing = self
            .repository
            .find_by_user_and_module(&request.user_id, &request.module_id)
            .await?;

        let (mut progress, lesson) = match existing {
            Some(mut progress) => {
                let lesson = match progress.lesson_progress(&request.lesson_id).cloned() {
                    Some(current) => {
                        let updated = request.apply_to(&current, now)?;
                        progress.update_lesson_progress(updated.clone())?;
                        updated
                    }
                    None => {
                        let created = request.first_entry(now)?;
                        progress.add_lesson_progress(created.clone())?;
                        created
                    }
                };
                (progress, lesson)
            }
            None => {
                let created = request.first_entry(now)?;
                let progress = Progress::new(
                    ProgressId::new(),
                    request.user_id.clone(),
                    request.module_id.clone(),
                    vec![created.clone()],
                    now,
                )?;
                info!(
                    progress_id = %progress.id(),
                    user_id = %request.user_id,
                    module_id = %request.module_id,
                    "Started module progress"
                );
                (progress, created)
            }
        };

        // 2. Complete the module once every lesson is done
        if let Some(total) = request.total_lessons {
            if !progress.is_completed() && progress.completed_lesson_count() >= total {
                progress.complete_module(now)?;
                info!(
                    progress_id = %progress.id(),
                    module_id = %request.module_id,
                    total_lessons = total,
                    "Module completed"
                );
            }
        }

        // 3. Persist
        let progress_id = self.repository.save(&progress).await?;

        Ok(TrackLessonProgressResult {
            progress_id,
            lesson_progress: lesson,
            module_completed: progress.is_completed(),
        })
    }
}

/// A validated tracking command.
struct TrackingRequest {
    user_id: UserId,
    module_id: ModuleId,
    lesson_id: LessonId,
    status: LessonProgressStatus,
    time_spent: i64,
    completed_at: Timestamp,
    total_lessons: Option<u32>,
}

impl TrackingRequest {
    fn parse(cmd: TrackLessonProgressCommand, now: Timestamp) -> Result<Self, ProgressError> {
        validation::require("user_id", &cmd.user_id, "User ID is required")?;
        validation::require("module_id", &cmd.module_id, "Module ID is required")?;
        validation::require("lesson_id", &cmd.lesson_id, "Lesson ID is required")?;

        if cmd.time_spent < 0 {
            return Err(ProgressError::validation(
                "time_spent",
                "Time spent cannot be negative",
            ));
        }

        let status: LessonProgressStatus = cmd.status.parse().map_err(|_| {
            ProgressError::validation("status", format!("Invalid lesson status: {}", cmd.status))
        })?;

        let user_id = validation::user_id(&cmd.user_id)?;
        let module_id = validation::module_id(&cmd.module_id)?;
        let lesson_id = validation::lesson_id(&cmd.lesson_id)?;

        if cmd.completed_at.is_some() && !status.is_completed() {
            return Err(ProgressError::validation(
                "completed_at",
                "Completed date can only be set when status is COMPLETED",
            ));
        }

        let total_lessons = cmd
            .total_lessons
            .map(|total| validation::total_lessons("total_lessons", i64::from(total)))
            .transpose()?;

        Ok(Self {
            user_id,
            module_id,
            lesson_id,
            status,
            time_spent: cmd.time_spent,
            completed_at: cmd.completed_at.map(Timestamp::from_datetime).unwrap_or(now),
            total_lessons,
        })
    }

    /// Entry for a lesson the learner has not been tracked on before.
    fn first_entry(&self, now: Timestamp) -> Result<LessonProgress, ProgressError> {
        let lesson_id = self.lesson_id.clone();
        let entry = match self.status {
            LessonProgressStatus::NotStarted => {
                LessonProgress::not_started(lesson_id, now).with_time_spent(self.time_spent)?
            }
            LessonProgressStatus::InProgress => {
                LessonProgress::started(lesson_id, now).with_time_spent(self.time_spent)?
            }
            LessonProgressStatus::Completed => {
                let started_at = self.completed_at.min(now);
                LessonProgress::started(lesson_id, started_at)
                    .complete(self.completed_at, self.time_spent)?
            }
        };
        Ok(entry)
    }

    /// Applies the report to a tracked lesson.
    ///
    /// `started_at` is kept, the attempt is counted and `time_spent` takes
    /// the reported total. A completed lesson keeps its completion date.
    fn apply_to(
        &self,
        current: &LessonProgress,
        now: Timestamp,
    ) -> Result<LessonProgress, ProgressError> {
        let from = current.status();
        if from != self.status && !from.can_transition_to(&self.status) {
            return Err(ProgressError::invalid_state(format!(
                "Cannot move lesson {} from {} to {}",
                self.lesson_id, from, self.status
            )));
        }

        let attempted = current.record_attempt(now);
        let updated = if from == self.status {
            attempted.with_time_spent(self.time_spent)?
        } else if self.status.is_completed() {
            attempted.complete(self.completed_at, self.time_spent)?
        } else {
            attempted.start(now)?.with_time_spent(self.time_spent)?
        };
        Ok(updated)
    }
}
