//! CalculateModuleProgressHandler - Query handler for one module's completion.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::foundation::{LessonId, ModuleId, ProgressId, UserId};
use crate::domain::progress::{ModuleProgress, Progress, ProgressError, RecommendedAction};
use crate::ports::ProgressRepository;

use super::validation;

/// Query for a learner's completion of one module.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateModuleProgressQuery {
    pub user_id: String,
    pub module_id: String,
    pub total_lessons: i64,
    /// Lesson ids in module order. Without it, `lesson-1..lesson-N` is assumed.
    #[serde(default)]
    pub lesson_ids: Option<Vec<String>>,
}

/// Completion report for one module.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleProgressReport {
    pub progress_id: ProgressId,
    pub user_id: UserId,
    pub module_id: ModuleId,
    pub module_progress: ModuleProgress,
    /// Seconds the remaining lessons should take at the learner's pace.
    pub estimated_time_remaining: i64,
    pub recommended_action: RecommendedAction,
    pub current_lesson_id: Option<LessonId>,
    pub next_lesson_id: Option<LessonId>,
    pub last_completed_lesson_id: Option<LessonId>,
}

/// Handler for module progress queries.
pub struct CalculateModuleProgressHandler {
    repository: Arc<dyn ProgressRepository>,
}

impl CalculateModuleProgressHandler {
    pub fn new(repository: Arc<dyn ProgressRepository>) -> Self {
        Self { repository }
    }

    /// Returns `None` when the learner never touched the module.
    pub async fn handle(
        &self,
        query: CalculateModuleProgressQuery,
    ) -> Result<Option<ModuleProgressReport>, ProgressError> {
        let (user_id, module_id, total_lessons, lesson_ids) =
            Self::validate(&query).map_err(|e| {
                warn!(error = %e, "Rejected module progress query");
                e
            })?;

        debug!(
            user_id = %user_id,
            module_id = %module_id,
            total_lessons,
            "Calculating module progress"
        );

        let progress = match self
            .repository
            .find_by_user_and_module(&user_id, &module_id)
            .await?
        {
            Some(progress) => progress,
            None => return Ok(None),
        };

        let module_progress = progress.calculate_module_progress(total_lessons);
        let in_progress = progress.in_progress_lesson_count();

        let next_lesson_id = match &lesson_ids {
            Some(ids) => progress.next_lesson_to_start(ids).cloned(),
            None => Self::next_generated_lesson(&progress, total_lessons),
        };

        Ok(Some(ModuleProgressReport {
            progress_id: *progress.id(),
            user_id,
            module_id,
            estimated_time_remaining: estimated_time_remaining(&module_progress),
            recommended_action: RecommendedAction::decide(&module_progress, in_progress),
            current_lesson_id: progress.current_lesson().map(|lp| lp.lesson_id().clone()),
            next_lesson_id,
            last_completed_lesson_id: progress
                .last_completed_lesson()
                .map(|lp| lp.lesson_id().clone()),
            module_progress,
        }))
    }

    fn validate(
        query: &CalculateModuleProgressQuery,
    ) -> Result<(UserId, ModuleId, u32, Option<Vec<LessonId>>), ProgressError> {
        validation::require("user_id", &query.user_id, "User ID is required")?;
        validation::require("module_id", &query.module_id, "Module ID is required")?;
        let total_lessons = validation::total_lessons("total_lessons", query.total_lessons)?;

        let user_id = validation::user_id(&query.user_id)?;
        let module_id = validation::module_id(&query.module_id)?;
        let lesson_ids = query
            .lesson_ids
            .as_ref()
            .map(|ids| {
                ids.iter()
                    .map(|id| validation::lesson_id(id))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?;

        Ok((user_id, module_id, total_lessons, lesson_ids))
    }

    /// First of `lesson-1..lesson-N` the learner has not started.
    fn next_generated_lesson(progress: &Progress, total_lessons: u32) -> Option<LessonId> {
        (1..=total_lessons)
            .filter_map(|n| LessonId::new(format!("lesson-{}", n)).ok())
            .find(|id| progress.is_lesson_unstarted(id))
    }
}

/// Remaining lessons times the mean time of a completed lesson.
fn estimated_time_remaining(module_progress: &ModuleProgress) -> i64 {
    match module_progress.completed_lessons() {
        0 => 0,
        completed => {
            let per_lesson = module_progress.total_time_spent() as f64 / f64::from(completed);
            (f64::from(module_progress.remaining_lessons()) * per_lesson).round() as i64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::progress::test_support::MockProgressRepository;
    use crate::domain::foundation::Timestamp;
    use crate::domain::progress::LessonProgress;

    fn lesson(id: &str) -> LessonId {
        LessonId::new(id).unwrap()
    }

    fn query(total_lessons: i64) -> CalculateModuleProgressQuery {
        CalculateModuleProgressQuery {
            user_id: "user-123".to_string(),
            module_id: "module-456".to_string(),
            total_lessons,
            lesson_ids: None,
        }
    }

    fn progress_with(lessons: Vec<LessonProgress>) -> Progress {
        Progress::new(
            ProgressId::new(),
            UserId::new("user-123").unwrap(),
            ModuleId::new("module-456").unwrap(),
            lessons,
            Timestamp::now(),
        )
        .unwrap()
    }

    fn completed(id: &str, secs: i64) -> LessonProgress {
        let now = Timestamp::now();
        LessonProgress::started(lesson(id), now)
            .complete(now, secs)
            .unwrap()
    }

    fn in_progress(id: &str, secs: i64) -> LessonProgress {
        LessonProgress::started(lesson(id), Timestamp::now())
            .with_time_spent(secs)
            .unwrap()
    }

    fn handler(repo: MockProgressRepository) -> CalculateModuleProgressHandler {
        CalculateModuleProgressHandler::new(Arc::new(repo))
    }

    #[tokio::test]
    async fn rejects_zero_total_lessons() {
        let err = handler(MockProgressRepository::new())
            .handle(query(0))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ProgressError::validation("total_lessons", "Total lessons must be greater than 0")
        );
    }

    #[tokio::test]
    async fn rejects_missing_user_before_total() {
        let mut q = query(0);
        q.user_id = String::new();
        let err = handler(MockProgressRepository::new())
            .handle(q)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "User ID is required");
    }

    #[tokio::test]
    async fn returns_none_without_progress() {
        let report = handler(MockProgressRepository::new())
            .handle(query(5))
            .await
            .unwrap();
        assert!(report.is_none());
    }

    #[tokio::test]
    async fn reports_partial_module() {
        let repo = MockProgressRepository::with_progress(vec![progress_with(vec![
            completed("lesson-1", 900),
            completed("lesson-2", 1200),
            in_progress("lesson-3", 300),
        ])]);

        let report = handler(repo).handle(query(5)).await.unwrap().unwrap();

        assert_eq!(report.module_progress.completed_lessons(), 2);
        assert_eq!(report.module_progress.completion_percentage(), 40.0);
        assert_eq!(report.module_progress.total_time_spent(), 2400);
        assert_eq!(report.estimated_time_remaining, 3600);
        assert_eq!(report.recommended_action, RecommendedAction::ContinueCurrentLesson);
        assert_eq!(report.current_lesson_id, Some(lesson("lesson-3")));
        assert_eq!(report.next_lesson_id, Some(lesson("lesson-4")));
    }

    #[tokio::test]
    async fn recommends_next_lesson_when_nothing_in_progress() {
        let repo =
            MockProgressRepository::with_progress(vec![progress_with(vec![completed(
                "lesson-1", 600,
            )])]);

        let report = handler(repo).handle(query(3)).await.unwrap().unwrap();
        assert_eq!(report.recommended_action, RecommendedAction::StartNextLesson);
        assert_eq!(report.next_lesson_id, Some(lesson("lesson-2")));
        assert_eq!(report.last_completed_lesson_id, Some(lesson("lesson-1")));
        assert_eq!(report.estimated_time_remaining, 1200);
    }

    #[tokio::test]
    async fn reports_completed_module() {
        let repo = MockProgressRepository::with_progress(vec![progress_with(vec![
            completed("lesson-1", 300),
            completed("lesson-2", 300),
        ])]);

        let report = handler(repo).handle(query(2)).await.unwrap().unwrap();
        assert!(report.module_progress.is_completed());
        assert_eq!(report.recommended_action, RecommendedAction::ModuleCompleted);
        assert_eq!(report.estimated_time_remaining, 0);
        assert_eq!(report.next_lesson_id, None);
    }

    #[tokio::test]
    async fn estimate_is_zero_before_any_completion() {
        let repo =
            MockProgressRepository::with_progress(vec![progress_with(vec![in_progress(
                "lesson-1", 500,
            )])]);

        let report = handler(repo).handle(query(4)).await.unwrap().unwrap();
        assert_eq!(report.estimated_time_remaining, 0);
    }

    #[tokio::test]
    async fn uses_supplied_lesson_order() {
        let repo = MockProgressRepository::with_progress(vec![progress_with(vec![
            completed("intro", 60),
            in_progress("basics", 60),
        ])]);
        let mut q = query(4);
        q.lesson_ids = Some(
            ["intro", "basics", "advanced", "summary"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        );

        let report = handler(repo).handle(q).await.unwrap().unwrap();
        assert_eq!(report.next_lesson_id, Some(lesson("advanced")));
    }

    #[tokio::test]
    async fn understated_total_falls_back_to_zeroed_progress() {
        let repo = MockProgressRepository::with_progress(vec![progress_with(vec![
            completed("lesson-1", 60),
            completed("lesson-2", 60),
        ])]);

        let report = handler(repo).handle(query(1)).await.unwrap().unwrap();
        assert_eq!(report.module_progress.completed_lessons(), 0);
        assert_eq!(report.module_progress.completion_percentage(), 0.0);
        assert!(!report.module_progress.is_completed());
    }

    #[tokio::test]
    async fn surfaces_repository_failure() {
        let err = handler(MockProgressRepository::failing())
            .handle(query(3))
            .await
            .unwrap_err();
        assert!(err.is_infrastructure());
    }

    #[test]
    fn report_serializes_action_in_snake_case() {
        let progress = progress_with(vec![completed("lesson-1", 60)]);
        let report = ModuleProgressReport {
            progress_id: *progress.id(),
            user_id: progress.user_id().clone(),
            module_id: progress.module_id().clone(),
            module_progress: progress.calculate_module_progress(1),
            estimated_time_remaining: 0,
            recommended_action: RecommendedAction::ModuleCompleted,
            current_lesson_id: None,
            next_lesson_id: None,
            last_completed_lesson_id: Some(lesson("lesson-1")),
        };

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["recommendedAction"], "module_completed");
        assert_eq!(json["moduleProgress"]["isCompleted"], true);
        assert_eq!(json["lastCompletedLessonId"], "lesson-1");
    }
}
