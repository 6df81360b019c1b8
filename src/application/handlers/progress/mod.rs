//! Progress handlers - Commands and queries over learner progress.

mod calculate_module_progress;
mod get_user_progress;
mod track_lesson_progress;
mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use calculate_module_progress::{
    CalculateModuleProgressHandler, CalculateModuleProgressQuery, ModuleProgressReport,
};
pub use get_user_progress::{
    GetUserProgressHandler, GetUserProgressQuery, ModuleSummary, UserProgressReport,
};
pub use track_lesson_progress::{
    TrackLessonProgressCommand, TrackLessonProgressHandler, TrackLessonProgressResult,
};
