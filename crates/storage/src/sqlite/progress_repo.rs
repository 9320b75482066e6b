use prep_core::model::{CourseId, PracticeProgress, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, i64_to_usize, ser, usize_to_i64};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<PracticeProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT last_index, updated_at
            FROM practice_progress
            WHERE user_id = ?1 AND course_id = ?2
            ",
        )
        .bind(user_id.as_str())
        .bind(course_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let last_index = i64_to_usize(
            "last_index",
            row.try_get::<i64, _>("last_index").map_err(ser)?,
        )?;
        Ok(Some(PracticeProgress::new(
            last_index,
            row.try_get("updated_at").map_err(ser)?,
        )))
    }

    async fn set_progress(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        progress: PracticeProgress,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO practice_progress (user_id, course_id, last_index, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(user_id, course_id) DO UPDATE SET
                last_index = excluded.last_index,
                updated_at = excluded.updated_at
            ",
        )
        .bind(user_id.as_str())
        .bind(course_id.as_str())
        .bind(usize_to_i64("last_index", progress.last_index)?)
        .bind(progress.updated_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
