//! Next-step recommendation for a learner within a module.

use serde::{Deserialize, Serialize};

use super::ModuleProgress;

/// What the learner should do next in a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    ModuleCompleted,
    ContinueCurrentLesson,
    StartNextLesson,
    ReviewCompleted,
}

impl RecommendedAction {
    /// Picks the action; the first matching rule wins.
    ///
    /// 1. every lesson done: `ModuleCompleted`
    /// 2. a lesson in progress: `ContinueCurrentLesson`
    /// 3. untouched lessons left: `StartNextLesson`
    /// 4. otherwise: `ReviewCompleted`
    pub fn decide(module_progress: &ModuleProgress, in_progress_lessons: u32) -> Self {
        if module_progress.is_completed() {
            RecommendedAction::ModuleCompleted
        } else if in_progress_lessons > 0 {
            RecommendedAction::ContinueCurrentLesson
        } else if module_progress.completed_lessons() + in_progress_lessons
            < module_progress.total_lessons()
        {
            RecommendedAction::StartNextLesson
        } else {
            RecommendedAction::ReviewCompleted
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendedAction::ModuleCompleted => "module_completed",
            RecommendedAction::ContinueCurrentLesson => "continue_current_lesson",
            RecommendedAction::StartNextLesson => "start_next_lesson",
            RecommendedAction::ReviewCompleted => "review_completed",
        }
    }
}

impl std::fmt::Display for RecommendedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
