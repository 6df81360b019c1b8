//! Progress repository port.
//!
//! Defines the contract for persisting and retrieving Progress aggregates
//! together with the statistics read models derived from them.
//!
//! # Design
//!
//! - **Keyed by (user, module)**: `save` is an upsert on that pair, so two
//!   concurrent creations for the same learner and module collapse into one
//! - **Atomic**: a Progress and its lesson entries are written together
//! - **Absence is not an error**: lookups return `None`, `false` or empty

use crate::domain::foundation::{DomainError, ModuleId, ProgressId, UserId};
use crate::domain::progress::{Progress, TopUser, UserStatistics};
use async_trait::async_trait;

/// Repository port for Progress aggregate persistence.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Insert or replace the progress of `(user_id, module_id)`.
    ///
    /// Lesson entries are fully replaced, never merged. Returns the id of the
    /// stored row, which differs from `progress.id()` when another writer
    /// created the row first.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn save(&self, progress: &Progress) -> Result<ProgressId, DomainError>;

    /// Find the progress of a user in one module.
    async fn find_by_user_and_module(
        &self,
        user_id: &UserId,
        module_id: &ModuleId,
    ) -> Result<Option<Progress>, DomainError>;

    /// Find every progress of a user, most recently accessed first.
    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Progress>, DomainError>;

    /// Find a progress by its id.
    async fn find_by_id(&self, id: &ProgressId) -> Result<Option<Progress>, DomainError>;

    /// Delete a progress and its lesson entries.
    ///
    /// Returns `false` if nothing was stored under `id`.
    async fn delete(&self, id: &ProgressId) -> Result<bool, DomainError>;

    /// Aggregate statistics across every module the user started.
    async fn get_user_statistics(&self, user_id: &UserId) -> Result<UserStatistics, DomainError>;

    /// Users with the most completed lessons, best first.
    async fn get_top_users(&self, limit: u32) -> Result<Vec<TopUser>, DomainError>;
}
