//! In-memory ProgressRepository.
//!
//! Applies the same keyed upsert as the PostgreSQL adapter, so tests and
//! local runs see identical semantics.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ModuleId, ProgressId, UserId};
use crate::domain::progress::{Progress, TopUser, UserStatistics};
use crate::ports::ProgressRepository;

/// In-memory implementation of ProgressRepository.
#[derive(Clone, Default)]
pub struct InMemoryProgressRepository {
    progress: Arc<RwLock<HashMap<ProgressId, Progress>>>,
    today: Option<NaiveDate>,
}

impl InMemoryProgressRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pins the day used for streaks.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// Number of stored progress records.
    pub async fn len(&self) -> usize {
        self.progress.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.progress.read().await.is_empty()
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryProgressRepository {
    async fn save(&self, progress: &Progress) -> Result<ProgressId, DomainError> {
        let mut store = self.progress.write().await;

        let existing = store
            .values()
            .find(|p| p.user_id() == progress.user_id() && p.module_id() == progress.module_id());

        let stored = match existing {
            Some(first) => Progress::reconstitute(
                *first.id(),
                progress.user_id().clone(),
                progress.module_id().clone(),
                progress.lessons().to_vec(),
                *first.started_at(),
                progress.last_accessed_at().copied(),
                first.completed_at().or(progress.completed_at()).copied(),
                *first.created_at(),
                *progress.updated_at(),
            ),
            None => progress.clone(),
        };

        let id = *stored.id();
        store.insert(id, stored);
        Ok(id)
    }

    async fn find_by_user_and_module(
        &self,
        user_id: &UserId,
        module_id: &ModuleId,
    ) -> Result<Option<Progress>, DomainError> {
        let store = self.progress.read().await;
        Ok(store
            .values()
            .find(|p| p.user_id() == user_id && p.module_id() == module_id)
            .cloned())
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Progress>, DomainError> {
        let store = self.progress.read().await;
        let mut found: Vec<Progress> = store
            .values()
            .filter(|p| p.user_id() == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.last_accessed_at().cmp(&a.last_accessed_at()));
        Ok(found)
    }

    async fn find_by_id(&self, id: &ProgressId) -> Result<Option<Progress>, DomainError> {
        Ok(self.progress.read().await.get(id).cloned())
    }

    async fn delete(&self, id: &ProgressId) -> Result<bool, DomainError> {
        Ok(self.progress.write().await.remove(id).is_some())
    }

    async fn get_user_statistics(&self, user_id: &UserId) -> Result<UserStatistics, DomainError> {
        let progress = self.find_by_user(user_id).await?;
        Ok(UserStatistics::from_progress(&progress, self.today()))
    }

    async fn get_top_users(&self, limit: u32) -> Result<Vec<TopUser>, DomainError> {
        let store = self.progress.read().await;

        let mut by_user: HashMap<&UserId, TopUser> = HashMap::new();
        for progress in store.values() {
            let entry = by_user
                .entry(progress.user_id())
                .or_insert_with(|| TopUser {
                    user_id: progress.user_id().clone(),
                    lessons_completed: 0,
                    modules_completed: 0,
                    total_time_spent: 0,
                });
            entry.lessons_completed += progress.completed_lesson_count();
            entry.modules_completed += u32::from(progress.is_completed());
            entry.total_time_spent += progress.total_time_spent();
        }

        Ok(TopUser::rank(by_user.into_values().collect(), limit as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{LessonId, Timestamp};
    use crate::domain::progress::LessonProgress;

    fn progress(user: &str, module: &str, lessons: Vec<LessonProgress>) -> Progress {
        Progress::new(
            ProgressId::new(),
            UserId::new(user).unwrap(),
            ModuleId::new(module).unwrap(),
            lessons,
            Timestamp::now(),
        )
        .unwrap()
    }

    fn completed(id: &str, secs: i64) -> LessonProgress {
        let now = Timestamp::now();
        LessonProgress::started(LessonId::new(id).unwrap(), now)
            .complete(now, secs)
            .unwrap()
    }

    #[tokio::test]
    async fn save_then_find_round_trips_lessons() {
        let repo = InMemoryProgressRepository::new();
        let p = progress(
            "user-123",
            "module-1",
            vec![completed("l-1", 60), completed("l-2", 90)],
        );
        let id = repo.save(&p).await.unwrap();

        let loaded = repo
            .find_by_user_and_module(p.user_id(), p.module_id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(id, *p.id());
        assert_eq!(loaded, p);
    }

    #[tokio::test]
    async fn concurrent_creation_collapses_to_first_id() {
        let repo = InMemoryProgressRepository::new();
        let first = progress("user-123", "module-1", vec![completed("l-1", 60)]);
        let second = progress("user-123", "module-1", vec![completed("l-2", 60)]);

        let first_id = repo.save(&first).await.unwrap();
        let second_id = repo.save(&second).await.unwrap();

        assert_eq!(first_id, second_id);
        assert_eq!(repo.len().await, 1);
        let stored = repo.find_by_id(&first_id).await.unwrap().unwrap();
        assert_eq!(stored.lessons(), second.lessons());
    }

    #[tokio::test]
    async fn stale_copy_does_not_clear_completion() {
        let repo = InMemoryProgressRepository::new();
        let stale = progress("user-123", "module-1", vec![completed("l-1", 60)]);
        repo.save(&stale).await.unwrap();

        let mut finished = stale.clone();
        finished.complete_module(Timestamp::now()).unwrap();
        repo.save(&finished).await.unwrap();
        let completed_at = finished.completed_at().copied();

        repo.save(&stale).await.unwrap();

        let stored = repo.find_by_id(stale.id()).await.unwrap().unwrap();
        assert!(completed_at.is_some());
        assert_eq!(stored.completed_at().copied(), completed_at);
    }

    #[tokio::test]
    async fn find_by_user_orders_by_last_access() {
        let repo = InMemoryProgressRepository::new();
        let mut older = progress("user-123", "module-1", vec![]);
        older.record_access(Timestamp::now().minus_days(2));
        let mut newer = progress("user-123", "module-2", vec![]);
        newer.record_access(Timestamp::now());
        repo.save(&older).await.unwrap();
        repo.save(&newer).await.unwrap();
        repo.save(&progress("user-999", "module-1", vec![])).await.unwrap();

        let found = repo
            .find_by_user(&UserId::new("user-123").unwrap())
            .await
            .unwrap();
        let modules: Vec<&str> = found.iter().map(|p| p.module_id().as_str()).collect();
        assert_eq!(modules, vec!["module-2", "module-1"]);
    }

    #[tokio::test]
    async fn delete_reports_whether_removed() {
        let repo = InMemoryProgressRepository::new();
        let p = progress("user-123", "module-1", vec![]);
        let id = repo.save(&p).await.unwrap();

        assert!(repo.delete(&id).await.unwrap());
        assert!(!repo.delete(&id).await.unwrap());
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn top_users_ranked_by_lessons() {
        let repo = InMemoryProgressRepository::new();
        repo.save(&progress("ann", "m-1", vec![completed("l-1", 10)]))
            .await
            .unwrap();
        repo.save(&progress(
            "bob",
            "m-1",
            vec![completed("l-1", 10), completed("l-2", 10)],
        ))
        .await
        .unwrap();
        repo.save(&progress("bob", "m-2", vec![completed("l-1", 10)]))
            .await
            .unwrap();

        let top = repo.get_top_users(1).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].user_id.as_str(), "bob");
        assert_eq!(top[0].lessons_completed, 3);
        assert_eq!(top[0].total_time_spent, 30);
    }

    #[tokio::test]
    async fn statistics_use_pinned_day() {
        let today = Timestamp::now().date();
        let repo = InMemoryProgressRepository::new().with_today(today);
        repo.save(&progress("user-123", "m-1", vec![completed("l-1", 120)]))
            .await
            .unwrap();

        let stats = repo
            .get_user_statistics(&UserId::new("user-123").unwrap())
            .await
            .unwrap();
        assert_eq!(stats.total_lessons_completed, 1);
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.average_time_per_lesson, 120.0);
    }
}
