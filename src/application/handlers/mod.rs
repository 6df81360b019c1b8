//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod progress;

pub use progress::{
    CalculateModuleProgressHandler, CalculateModuleProgressQuery, GetUserProgressHandler,
    GetUserProgressQuery, ModuleProgressReport, ModuleSummary, TrackLessonProgressCommand,
    TrackLessonProgressHandler, TrackLessonProgressResult, UserProgressReport,
};
