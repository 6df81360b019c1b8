//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, enums, errors)
//! - `progress` - Lesson and module progress, the Progress aggregate and statistics

pub mod foundation;
pub mod progress;
