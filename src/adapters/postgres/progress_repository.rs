//! PostgreSQL implementation of ProgressRepository.
//!
//! A Progress is stored as one `progress` row plus one `lesson_progress` row
//! per tracked lesson. Saves run in a single transaction: upsert the parent
//! on `(user_id, module_id)`, drop its lesson rows, then reinsert them.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row};
use tracing::{debug, error};
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, LessonId, LessonProgressStatus, ModuleId, ProgressId, Timestamp, UserId,
};
use crate::domain::progress::{LessonProgress, Progress, TopUser, UserStatistics};
use crate::ports::ProgressRepository;

/// PostgreSQL implementation of ProgressRepository.
#[derive(Clone)]
pub struct PostgresProgressRepository {
    pool: PgPool,
}

impl PostgresProgressRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn save_in_transaction(&self, progress: &Progress) -> Result<ProgressId, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to begin transaction", e))?;

        // The first writer's id and started_at win; completed_at is kept once set.
        let row = sqlx::query(
            r#"
            INSERT INTO progress (
                id, user_id, module_id, started_at, last_accessed_at,
                completed_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id, module_id) DO UPDATE SET
                last_accessed_at = EXCLUDED.last_accessed_at,
                completed_at = COALESCE(progress.completed_at, EXCLUDED.completed_at),
                updated_at = EXCLUDED.updated_at
            RETURNING id
            "#,
        )
        .bind(progress.id().as_uuid())
        .bind(progress.user_id().as_str())
        .bind(progress.module_id().as_str())
        .bind(progress.started_at().as_datetime())
        .bind(progress.last_accessed_at().map(Timestamp::as_datetime))
        .bind(progress.completed_at().map(Timestamp::as_datetime))
        .bind(progress.created_at().as_datetime())
        .bind(progress.updated_at().as_datetime())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DomainError::database("Failed to upsert progress", e))?;

        let stored_id: Uuid = column(&row, "id")?;

        sqlx::query("DELETE FROM lesson_progress WHERE progress_id = $1")
            .bind(stored_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::database("Failed to clear lesson progress", e))?;

        for lesson in progress.lessons() {
            insert_lesson(&mut tx, stored_id, lesson).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit transaction", e))?;

        Ok(ProgressId::from_uuid(stored_id))
    }

    /// Loads lesson rows for the given progress ids, grouped by parent.
    async fn load_lessons(
        &self,
        progress_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<LessonProgress>>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT progress_id, lesson_id, status, started_at, completed_at,
                   time_spent, attempts, last_attempt_at
            FROM lesson_progress
            WHERE progress_id = ANY($1)
            ORDER BY started_at ASC, lesson_id ASC
            "#,
        )
        .bind(progress_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch lesson progress", e))?;

        let mut grouped: HashMap<Uuid, Vec<LessonProgress>> = HashMap::new();
        for row in rows {
            let progress_id: Uuid = column(&row, "progress_id")?;
            grouped
                .entry(progress_id)
                .or_default()
                .push(row_to_lesson(&row)?);
        }
        Ok(grouped)
    }

    /// Turns parent rows into aggregates, preserving row order.
    async fn hydrate(&self, rows: Vec<PgRow>) -> Result<Vec<Progress>, DomainError> {
        let ids = rows
            .iter()
            .map(|row| column::<Uuid>(row, "id"))
            .collect::<Result<Vec<_>, _>>()?;
        let mut lessons = self.load_lessons(&ids).await?;

        rows.iter()
            .map(|row| {
                let id: Uuid = column(row, "id")?;
                row_to_progress(row, lessons.remove(&id).unwrap_or_default())
            })
            .collect()
    }

    async fn activity_days(&self, user_id: &UserId) -> Result<BTreeSet<NaiveDate>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT (ts AT TIME ZONE 'UTC')::date AS day
            FROM progress p
            JOIN lesson_progress lp ON lp.progress_id = p.id
            CROSS JOIN LATERAL (
                VALUES (lp.started_at), (lp.last_attempt_at), (lp.completed_at)
            ) AS activity(ts)
            WHERE p.user_id = $1 AND ts IS NOT NULL
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch activity days", e))?;

        rows.iter().map(|row| column::<NaiveDate>(row, "day")).collect()
    }
}

#[async_trait]
impl ProgressRepository for PostgresProgressRepository {
    async fn save(&self, progress: &Progress) -> Result<ProgressId, DomainError> {
        let stored_id = self.save_in_transaction(progress).await.map_err(|e| {
            error!(
                progress_id = %progress.id(),
                user_id = %progress.user_id(),
                module_id = %progress.module_id(),
                error = %e,
                "Progress save rolled back"
            );
            e
        })?;

        debug!(
            progress_id = %stored_id,
            lessons = progress.lessons().len(),
            "Progress saved"
        );
        Ok(stored_id)
    }

    async fn find_by_user_and_module(
        &self,
        user_id: &UserId,
        module_id: &ModuleId,
    ) -> Result<Option<Progress>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, module_id, started_at, last_accessed_at,
                   completed_at, created_at, updated_at
            FROM progress
            WHERE user_id = $1 AND module_id = $2
            "#,
        )
        .bind(user_id.as_str())
        .bind(module_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch progress", e))?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Progress>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, module_id, started_at, last_accessed_at,
                   completed_at, created_at, updated_at
            FROM progress
            WHERE user_id = $1
            ORDER BY last_accessed_at DESC NULLS LAST, started_at DESC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch progress by user", e))?;

        self.hydrate(rows).await
    }

    async fn find_by_id(&self, id: &ProgressId) -> Result<Option<Progress>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, module_id, started_at, last_accessed_at,
                   completed_at, created_at, updated_at
            FROM progress
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch progress", e))?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &ProgressId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM progress WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to delete progress", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_user_statistics(&self, user_id: &UserId) -> Result<UserStatistics, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(DISTINCT p.id) AS modules_started,
                   COUNT(DISTINCT p.id) FILTER (WHERE p.completed_at IS NOT NULL)
                       AS modules_completed,
                   COUNT(lp.id) FILTER (WHERE lp.status = 'COMPLETED') AS lessons_completed,
                   COALESCE(SUM(lp.time_spent), 0)::BIGINT AS total_time_spent
            FROM progress p
            LEFT JOIN lesson_progress lp ON lp.progress_id = p.id
            WHERE p.user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to aggregate user statistics", e))?;

        let days = self.activity_days(user_id).await?;

        Ok(UserStatistics::from_totals(
            count(&row, "modules_started")?,
            count(&row, "modules_completed")?,
            count(&row, "lessons_completed")?,
            column(&row, "total_time_spent")?,
            &days,
            Utc::now().date_naive(),
        ))
    }

    async fn get_top_users(&self, limit: u32) -> Result<Vec<TopUser>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT p.user_id,
                   COUNT(lp.id) FILTER (WHERE lp.status = 'COMPLETED') AS lessons_completed,
                   COUNT(DISTINCT p.id) FILTER (WHERE p.completed_at IS NOT NULL)
                       AS modules_completed,
                   COALESCE(SUM(lp.time_spent), 0)::BIGINT AS total_time_spent
            FROM progress p
            LEFT JOIN lesson_progress lp ON lp.progress_id = p.id
            GROUP BY p.user_id
            ORDER BY lessons_completed DESC, total_time_spent DESC, p.user_id ASC
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch top users", e))?;

        rows.iter()
            .map(|row| {
                Ok(TopUser {
                    user_id: stored_user_id(column(row, "user_id")?)?,
                    lessons_completed: count(row, "lessons_completed")?,
                    modules_completed: count(row, "modules_completed")?,
                    total_time_spent: column(row, "total_time_spent")?,
                })
            })
            .collect()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Row mapping
// ════════════════════════════════════════════════════════════════════════════

async fn insert_lesson(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    progress_id: Uuid,
    lesson: &LessonProgress,
) -> Result<(), DomainError> {
    let attempts = attempts_column(lesson.attempts())?;

    sqlx::query(
        r#"
        INSERT INTO lesson_progress (
            id, progress_id, lesson_id, status, started_at, completed_at,
            time_spent, attempts, last_attempt_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(progress_id)
    .bind(lesson.lesson_id().as_str())
    .bind(lesson.status().as_str())
    .bind(lesson.started_at().as_datetime())
    .bind(lesson.completed_at().map(Timestamp::as_datetime))
    .bind(lesson.time_spent())
    .bind(attempts)
    .bind(lesson.last_attempt_at().map(Timestamp::as_datetime))
    .execute(&mut **tx)
    .await
    .map_err(|e| DomainError::database("Failed to insert lesson progress", e))?;

    Ok(())
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, DomainError>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| DomainError::database(&format!("Failed to get {}", name), e))
}

/// Reads a `COUNT(...)` column as u32.
fn count(row: &PgRow, name: &str) -> Result<u32, DomainError> {
    stored_count(name, column(row, name)?)
}

fn stored_count(name: &str, value: i64) -> Result<u32, DomainError> {
    u32::try_from(value).map_err(|e| DomainError::database(&format!("Invalid {}", name), e))
}

fn attempts_column(attempts: u32) -> Result<i32, DomainError> {
    i32::try_from(attempts).map_err(|e| DomainError::database("Attempt count out of range", e))
}

fn stored_attempts(attempts: i32) -> Result<u32, DomainError> {
    u32::try_from(attempts).map_err(|e| DomainError::database("Invalid stored attempts", e))
}

fn stored_status(raw: &str) -> Result<LessonProgressStatus, DomainError> {
    raw.parse()
        .map_err(|e| DomainError::database("Invalid stored lesson status", e))
}

fn timestamp(value: Option<DateTime<Utc>>) -> Option<Timestamp> {
    value.map(Timestamp::from_datetime)
}

fn stored_user_id(raw: String) -> Result<UserId, DomainError> {
    UserId::new(raw).map_err(|e| DomainError::database("Invalid stored user_id", e))
}

fn row_to_progress(row: &PgRow, lessons: Vec<LessonProgress>) -> Result<Progress, DomainError> {
    let id: Uuid = column(row, "id")?;
    let module_id: String = column(row, "module_id")?;
    let module_id =
        ModuleId::new(module_id).map_err(|e| DomainError::database("Invalid stored module_id", e))?;

    Ok(Progress::reconstitute(
        ProgressId::from_uuid(id),
        stored_user_id(column(row, "user_id")?)?,
        module_id,
        lessons,
        Timestamp::from_datetime(column(row, "started_at")?),
        timestamp(column(row, "last_accessed_at")?),
        timestamp(column(row, "completed_at")?),
        Timestamp::from_datetime(column(row, "created_at")?),
        Timestamp::from_datetime(column(row, "updated_at")?),
    ))
}

fn row_to_lesson(row: &PgRow) -> Result<LessonProgress, DomainError> {
    let lesson_id: String = column(row, "lesson_id")?;
    let lesson_id =
        LessonId::new(lesson_id).map_err(|e| DomainError::database("Invalid stored lesson_id", e))?;

    let status: String = column(row, "status")?;
    let status = stored_status(&status)?;
    let attempts = stored_attempts(column(row, "attempts")?)?;

    Ok(LessonProgress::reconstitute(
        lesson_id,
        status,
        Timestamp::from_datetime(column(row, "started_at")?),
        timestamp(column(row, "completed_at")?),
        column(row, "time_spent")?,
        attempts,
        timestamp(column(row, "last_attempt_at")?),
    ))
}
