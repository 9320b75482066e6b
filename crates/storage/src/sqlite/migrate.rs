use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS courses (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            category TEXT NOT NULL,
            question_time_limit_secs INTEGER NOT NULL CHECK (question_time_limit_secs > 0)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS exam_batches (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            time_limit_minutes INTEGER NOT NULL CHECK (time_limit_minutes > 0),
            sort_order INTEGER NOT NULL,
            pass_threshold INTEGER NOT NULL CHECK (pass_threshold BETWEEN 0 AND 100)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS questions (
            owner_kind TEXT NOT NULL CHECK (owner_kind IN ('course', 'batch')),
            owner_id TEXT NOT NULL,
            position INTEGER NOT NULL CHECK (position >= 0),
            id TEXT NOT NULL,
            text TEXT NOT NULL,
            options TEXT NOT NULL,
            correct_index INTEGER NOT NULL CHECK (correct_index >= 0),
            explanation TEXT NOT NULL,
            PRIMARY KEY (owner_kind, owner_id, position),
            UNIQUE (owner_kind, owner_id, id)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            role TEXT NOT NULL CHECK (role IN ('user', 'admin'))
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS passed_batches (
            user_id TEXT NOT NULL,
            batch_id TEXT NOT NULL,
            passed_at TEXT NOT NULL,
            PRIMARY KEY (user_id, batch_id)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS practice_progress (
            user_id TEXT NOT NULL,
            course_id TEXT NOT NULL,
            last_index INTEGER NOT NULL CHECK (last_index >= 0),
            updated_at TEXT NOT NULL,
            PRIMARY KEY (user_id, course_id)
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_exam_batches_sort_order
            ON exam_batches (sort_order, id);
    ",
];

/// Runs versioned migrations, each inside its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: content, users, progress.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        for statement in SCHEMA_V1 {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
