//! Mock repository shared by the progress handler tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::foundation::{DomainError, ErrorCode, ModuleId, ProgressId, UserId};
use crate::domain::progress::{Progress, TopUser, UserStatistics};
use crate::ports::ProgressRepository;

pub(crate) struct MockProgressRepository {
    stored: Mutex<Vec<Progress>>,
    save_calls: Mutex<u32>,
    fail: bool,
}

impl MockProgressRepository {
    pub(crate) fn new() -> Self {
        Self {
            stored: Mutex::new(Vec::new()),
            save_calls: Mutex::new(0),
            fail: false,
        }
    }

    pub(crate) fn with_progress(progress: Vec<Progress>) -> Self {
        Self {
            stored: Mutex::new(progress),
            save_calls: Mutex::new(0),
            fail: false,
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            stored: Mutex::new(Vec::new()),
            save_calls: Mutex::new(0),
            fail: true,
        }
    }

    pub(crate) fn stored(&self) -> Vec<Progress> {
        self.stored.lock().unwrap().clone()
    }

    pub(crate) fn save_calls(&self) -> u32 {
        *self.save_calls.lock().unwrap()
    }

    fn check(&self) -> Result<(), DomainError> {
        if self.fail {
            return Err(DomainError::new(
                ErrorCode::DatabaseError,
                "Simulated database failure",
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressRepository for MockProgressRepository {
    async fn save(&self, progress: &Progress) -> Result<ProgressId, DomainError> {
        self.check()?;
        *self.save_calls.lock().unwrap() += 1;

        let mut stored = self.stored.lock().unwrap();
        match stored
            .iter_mut()
            .find(|p| p.user_id() == progress.user_id() && p.module_id() == progress.module_id())
        {
            Some(existing) => {
                let id = *existing.id();
                *existing = Progress::reconstitute(
                    id,
                    progress.user_id().clone(),
                    progress.module_id().clone(),
                    progress.lessons().to_vec(),
                    *existing.started_at(),
                    progress.last_accessed_at().copied(),
                    existing.completed_at().or(progress.completed_at()).copied(),
                    *existing.created_at(),
                    *progress.updated_at(),
                );
                Ok(id)
            }
            None => {
                stored.push(progress.clone());
                Ok(*progress.id())
            }
        }
    }

    async fn find_by_user_and_module(
        &self,
        user_id: &UserId,
        module_id: &ModuleId,
    ) -> Result<Option<Progress>, DomainError> {
        self.check()?;
        Ok(self
            .stored
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.user_id() == user_id && p.module_id() == module_id)
            .cloned())
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Progress>, DomainError> {
        self.check()?;
        Ok(self
            .stored
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.user_id() == user_id)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, id: &ProgressId) -> Result<Option<Progress>, DomainError> {
        self.check()?;
        Ok(self
            .stored
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id() == id)
            .cloned())
    }

    async fn delete(&self, id: &ProgressId) -> Result<bool, DomainError> {
        self.check()?;
        let mut stored = self.stored.lock().unwrap();
        let before = stored.len();
        stored.retain(|p| p.id() != id);
        Ok(stored.len() != before)
    }

    async fn get_user_statistics(&self, user_id: &UserId) -> Result<UserStatistics, DomainError> {
        let progress = self.find_by_user(user_id).await?;
        Ok(UserStatistics::from_progress(&progress, Utc::now().date_naive()))
    }

    async fn get_top_users(&self, _limit: u32) -> Result<Vec<TopUser>, DomainError> {
        self.check()?;
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;

    fn progress() -> Progress {
        Progress::new(
            ProgressId::new(),
            UserId::new("user-123").unwrap(),
            ModuleId::new("module-456").unwrap(),
            vec![],
            Timestamp::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn save_under_new_id_keeps_stored_id() {
        let repo = MockProgressRepository::new();
        let first = progress();
        let second = progress();

        let first_id = repo.save(&first).await.unwrap();
        let second_id = repo.save(&second).await.unwrap();

        assert_eq!(first_id, second_id);
        let stored = repo.stored();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id(), first.id());
        assert!(repo.find_by_id(first.id()).await.unwrap().is_some());
        assert!(repo.find_by_id(second.id()).await.unwrap().is_none());
    }
}
