use std::collections::HashSet;

use chrono::Utc;
use prep_core::model::{BatchId, User, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, parse_role, ser};
use crate::repository::{StorageError, UserRepository};

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn upsert_user(&self, user: &User) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO users (id, name, email, role)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                role = excluded.role
            ",
        )
        .bind(user.id.as_str())
        .bind(user.name.as_str())
        .bind(user.email.as_str())
        .bind(user.role.as_str())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StorageError> {
        let profile = {
            let row = sqlx::query("SELECT id, name, email, role FROM users WHERE id = ?1")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(conn)?;
            match row {
                Some(row) => {
                    let role: String = row.try_get("role").map_err(ser)?;
                    Some(User::new(
                        UserId::new(row.try_get::<String, _>("id").map_err(ser)?),
                        row.try_get::<String, _>("name").map_err(ser)?,
                        row.try_get::<String, _>("email").map_err(ser)?,
                        parse_role(&role)?,
                    ))
                }
                None => None,
            }
        };

        let Some(mut user) = profile else {
            return Ok(None);
        };
        user.passed_batches = self.passed_batches(id).await?;
        Ok(Some(user))
    }

    async fn add_passed_batch(
        &self,
        user_id: &UserId,
        batch_id: &BatchId,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO passed_batches (user_id, batch_id, passed_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id, batch_id) DO NOTHING
            ",
        )
        .bind(user_id.as_str())
        .bind(batch_id.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn passed_batches(&self, user_id: &UserId) -> Result<HashSet<BatchId>, StorageError> {
        let rows = sqlx::query("SELECT batch_id FROM passed_batches WHERE user_id = ?1")
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("batch_id")
                    .map(BatchId::new)
                    .map_err(ser)
            })
            .collect()
    }
}
