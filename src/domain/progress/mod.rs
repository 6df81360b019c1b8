//! Progress domain module.
//!
//! Tracks a learner's advancement through the lessons of a module and
//! derives completion figures and learning statistics from it.
//!
//! - `LessonProgress` - per-lesson state (value object)
//! - `ModuleProgress` - derived completion snapshot (value object)
//! - `Progress` - per-(user, module) aggregate root
//! - `UserStatistics`, `TopUser` - cross-module read models
//! - `RecommendedAction` - what the learner should do next

mod aggregate;
mod errors;
mod lesson_progress;
mod module_progress;
mod recommendation;
mod statistics;

pub use aggregate::Progress;
pub use errors::ProgressError;
pub use lesson_progress::LessonProgress;
pub use module_progress::{ModuleProgress, DEFAULT_ESTIMATED_TOTAL_FACTOR};
pub use recommendation::RecommendedAction;
pub use statistics::{activity_days, Streaks, TopUser, UserStatistics};
