//! GetUserProgressHandler - Query handler for a learner's progress overview.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::foundation::{
    round_to_two_decimals, LessonId, ModuleId, ProgressId, Timestamp, UserId,
};
use crate::domain::progress::{
    ModuleProgress, Progress, ProgressError, UserStatistics, DEFAULT_ESTIMATED_TOTAL_FACTOR,
};
use crate::ports::ProgressRepository;

use super::validation;

/// Query for a learner's progress, across all modules or for one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUserProgressQuery {
    pub user_id: String,
    #[serde(default)]
    pub module_id: Option<String>,
    /// Lesson count of `module_id`; ignored without a module.
    #[serde(default)]
    pub total_lessons_in_module: Option<i64>,
}

/// Progress of one module inside a [`UserProgressReport`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSummary {
    pub progress_id: ProgressId,
    pub module_id: ModuleId,
    pub module_progress: ModuleProgress,
    /// True when the lesson total is a guess rather than a known count.
    pub total_lessons_estimated: bool,
    pub started_at: Timestamp,
    pub last_accessed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub current_lesson_id: Option<LessonId>,
    pub last_completed_lesson_id: Option<LessonId>,
}

/// A learner's progress overview.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgressReport {
    pub user_id: UserId,
    pub modules: Vec<ModuleSummary>,
    pub statistics: UserStatistics,
    pub completed_modules: u32,
    pub in_progress_modules: u32,
    /// Mean completion percentage of the listed modules.
    pub average_completion_rate: f64,
}

/// Handler for user progress queries.
pub struct GetUserProgressHandler {
    repository: Arc<dyn ProgressRepository>,
    estimated_total_factor: f64,
}

impl GetUserProgressHandler {
    pub fn new(repository: Arc<dyn ProgressRepository>) -> Self {
        Self {
            repository,
            estimated_total_factor: DEFAULT_ESTIMATED_TOTAL_FACTOR,
        }
    }

    pub fn with_estimated_total_factor(mut self, factor: f64) -> Self {
        self.estimated_total_factor = factor;
        self
    }

    pub async fn handle(
        &self,
        query: GetUserProgressQuery,
    ) -> Result<UserProgressReport, ProgressError> {
        let (user_id, module_id, known_total) = Self::validate(&query).map_err(|e| {
            warn!(error = %e, "Rejected user progress query");
            e
        })?;

        debug!(
            user_id = %user_id,
            module_id = ?module_id.as_ref().map(ModuleId::as_str),
            "Loading user progress"
        );

        // 1. Load the rows in scope
        let progress: Vec<Progress> = match &module_id {
            Some(module_id) => self
                .repository
                .find_by_user_and_module(&user_id, module_id)
                .await?
                .into_iter()
                .collect(),
            None => self.repository.find_by_user(&user_id).await?,
        };

        // 2. Summarise each module
        let modules: Vec<ModuleSummary> = progress
            .iter()
            .map(|p| self.summarise(p, known_total))
            .collect();

        // 3. Attach cross-module statistics
        let statistics = self.repository.get_user_statistics(&user_id).await?;

        let completed_modules = modules
            .iter()
            .filter(|m| m.module_progress.is_completed())
            .count() as u32;
        let in_progress_modules = modules.len() as u32 - completed_modules;

        Ok(UserProgressReport {
            user_id,
            average_completion_rate: average_completion_rate(&modules),
            modules,
            statistics,
            completed_modules,
            in_progress_modules,
        })
    }

    fn validate(
        query: &GetUserProgressQuery,
    ) -> Result<(UserId, Option<ModuleId>, Option<u32>), ProgressError> {
        validation::require("user_id", &query.user_id, "User ID is required")?;
        let user_id = validation::user_id(&query.user_id)?;

        let module_id = match &query.module_id {
            Some(raw) => {
                validation::require("module_id", raw, "Module ID is required")?;
                Some(validation::module_id(raw)?)
            }
            None => None,
        };

        let known_total = match (&module_id, query.total_lessons_in_module) {
            (Some(_), Some(raw)) => {
                Some(validation::total_lessons("total_lessons_in_module", raw)?)
            }
            _ => None,
        };

        Ok((user_id, module_id, known_total))
    }

    fn summarise(&self, progress: &Progress, known_total: Option<u32>) -> ModuleSummary {
        let (total_lessons, estimated) = self.lesson_total(progress, known_total);

        ModuleSummary {
            progress_id: *progress.id(),
            module_id: progress.module_id().clone(),
            module_progress: progress.calculate_module_progress(total_lessons),
            total_lessons_estimated: estimated,
            started_at: *progress.started_at(),
            last_accessed_at: progress.last_accessed_at().copied(),
            completed_at: progress.completed_at().copied(),
            current_lesson_id: progress.current_lesson().map(|lp| lp.lesson_id().clone()),
            last_completed_lesson_id: progress
                .last_completed_lesson()
                .map(|lp| lp.lesson_id().clone()),
        }
    }

    /// Lesson total for a module and whether it is a guess.
    fn lesson_total(&self, progress: &Progress, known_total: Option<u32>) -> (u32, bool) {
        let seen = progress.lessons().len() as u32;
        if progress.is_completed() {
            return (seen.max(1), false);
        }
        if let Some(total) = known_total {
            return (total, false);
        }
        let scaled = (f64::from(seen) * self.estimated_total_factor).ceil() as u32;
        (seen.max(scaled).max(1), true)
    }
}

fn average_completion_rate(modules: &[ModuleSummary]) -> f64 {
    if modules.is_empty() {
        return 0.0;
    }
    let sum: f64 = modules
        .iter()
        .map(|m| m.module_progress.completion_percentage())
        .sum();
    round_to_two_decimals(sum / modules.len() as f64)
}
