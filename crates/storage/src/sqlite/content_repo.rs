use prep_core::model::{BatchId, Course, CourseId, ExamBatch, PassThreshold, Question};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};

use super::SqliteRepository;
use super::mapping::{
    OWNER_BATCH, OWNER_COURSE, conn, i64_to_u32, map_question_row, options_to_json, ser,
    usize_to_i64,
};
use crate::repository::{ContentRepository, StorageError};

async fn replace_questions(
    tx: &mut Transaction<'_, Sqlite>,
    owner_kind: &str,
    owner_id: &str,
    questions: &[Question],
) -> Result<(), StorageError> {
    sqlx::query("DELETE FROM questions WHERE owner_kind = ?1 AND owner_id = ?2")
        .bind(owner_kind)
        .bind(owner_id)
        .execute(&mut **tx)
        .await
        .map_err(conn)?;

    for (position, question) in questions.iter().enumerate() {
        sqlx::query(
            r"
            INSERT INTO questions (owner_kind, owner_id, position, id, text, options, correct_index, explanation)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(owner_kind)
        .bind(owner_id)
        .bind(usize_to_i64("position", position)?)
        .bind(question.id().as_str())
        .bind(question.text())
        .bind(options_to_json(question.options())?)
        .bind(usize_to_i64("correct_index", question.correct_index())?)
        .bind(question.explanation())
        .execute(&mut **tx)
        .await
        .map_err(conn)?;
    }

    Ok(())
}

struct CourseHeader {
    id: String,
    name: String,
    description: String,
    category: String,
    question_time_limit_secs: u32,
}

fn course_header(row: &SqliteRow) -> Result<CourseHeader, StorageError> {
    Ok(CourseHeader {
        id: row.try_get("id").map_err(ser)?,
        name: row.try_get("name").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        category: row.try_get("category").map_err(ser)?,
        question_time_limit_secs: i64_to_u32(
            "question_time_limit_secs",
            row.try_get::<i64, _>("question_time_limit_secs").map_err(ser)?,
        )?,
    })
}

struct BatchHeader {
    id: String,
    name: String,
    description: String,
    time_limit_minutes: u32,
    order: i64,
    pass_threshold: PassThreshold,
}

fn batch_header(row: &SqliteRow) -> Result<BatchHeader, StorageError> {
    let threshold = row.try_get::<i64, _>("pass_threshold").map_err(ser)?;
    let pass_threshold = u8::try_from(threshold)
        .map_err(ser)
        .and_then(|v| PassThreshold::new(v).map_err(ser))?;

    Ok(BatchHeader {
        id: row.try_get("id").map_err(ser)?,
        name: row.try_get("name").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        time_limit_minutes: i64_to_u32(
            "time_limit_minutes",
            row.try_get::<i64, _>("time_limit_minutes").map_err(ser)?,
        )?,
        order: row.try_get("sort_order").map_err(ser)?,
        pass_threshold,
    })
}

impl SqliteRepository {
    async fn load_questions(
        &self,
        owner_kind: &str,
        owner_id: &str,
    ) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, text, options, correct_index, explanation
            FROM questions
            WHERE owner_kind = ?1 AND owner_id = ?2
            ORDER BY position ASC
            ",
        )
        .bind(owner_kind)
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_question_row).collect()
    }

    async fn assemble_course(&self, header: CourseHeader) -> Result<Course, StorageError> {
        let questions = self.load_questions(OWNER_COURSE, &header.id).await?;
        Course::new(CourseId::new(header.id), header.name, questions)
            .and_then(|c| c.with_question_time_limit(header.question_time_limit_secs))
            .map(|c| {
                c.with_description(header.description)
                    .with_category(header.category)
            })
            .map_err(ser)
    }

    async fn assemble_batch(&self, header: BatchHeader) -> Result<ExamBatch, StorageError> {
        let questions = self.load_questions(OWNER_BATCH, &header.id).await?;
        let batch = ExamBatch::new(
            BatchId::new(header.id),
            header.name,
            header.time_limit_minutes,
            questions,
        )
        .map_err(ser)?;

        Ok(batch
            .with_description(header.description)
            .with_order(header.order)
            .with_pass_threshold(header.pass_threshold))
    }
}

#[async_trait::async_trait]
impl ContentRepository for SqliteRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO courses (id, name, description, category, question_time_limit_secs)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                category = excluded.category,
                question_time_limit_secs = excluded.question_time_limit_secs
            ",
        )
        .bind(course.id().as_str())
        .bind(course.name())
        .bind(course.description())
        .bind(course.category())
        .bind(i64::from(course.question_time_limit_secs()))
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        replace_questions(&mut tx, OWNER_COURSE, course.id().as_str(), course.questions()).await?;

        tx.commit().await.map_err(conn)
    }

    async fn get_course(&self, id: &CourseId) -> Result<Course, StorageError> {
        let header = {
            let row = sqlx::query(
                r"
                SELECT id, name, description, category, question_time_limit_secs
                FROM courses WHERE id = ?1
                ",
            )
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;
            course_header(&row)?
        };

        self.assemble_course(header).await
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let headers = {
            let rows = sqlx::query(
                r"
                SELECT id, name, description, category, question_time_limit_secs
                FROM courses
                ORDER BY name ASC, id ASC
                ",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
            rows.iter()
                .map(course_header)
                .collect::<Result<Vec<_>, _>>()?
        };
        let mut courses = Vec::with_capacity(headers.len());
        for header in headers {
            courses.push(self.assemble_course(header).await?);
        }
        Ok(courses)
    }

    async fn upsert_batch(&self, batch: &ExamBatch) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO exam_batches (id, name, description, time_limit_minutes, sort_order, pass_threshold)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                time_limit_minutes = excluded.time_limit_minutes,
                sort_order = excluded.sort_order,
                pass_threshold = excluded.pass_threshold
            ",
        )
        .bind(batch.id().as_str())
        .bind(batch.name())
        .bind(batch.description())
        .bind(i64::from(batch.time_limit_minutes()))
        .bind(batch.order())
        .bind(i64::from(batch.pass_threshold().percent()))
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        replace_questions(&mut tx, OWNER_BATCH, batch.id().as_str(), batch.questions()).await?;

        tx.commit().await.map_err(conn)
    }

    async fn get_batch(&self, id: &BatchId) -> Result<ExamBatch, StorageError> {
        let header = {
            let row = sqlx::query(
                r"
                SELECT id, name, description, time_limit_minutes, sort_order, pass_threshold
                FROM exam_batches WHERE id = ?1
                ",
            )
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;
            batch_header(&row)?
        };

        self.assemble_batch(header).await
    }

    async fn list_batches(&self) -> Result<Vec<ExamBatch>, StorageError> {
        let headers = {
            let rows = sqlx::query(
                r"
                SELECT id, name, description, time_limit_minutes, sort_order, pass_threshold
                FROM exam_batches
                ORDER BY sort_order ASC, id ASC
                ",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
            rows.iter()
                .map(batch_header)
                .collect::<Result<Vec<_>, _>>()?
        };
        let mut batches = Vec::with_capacity(headers.len());
        for header in headers {
            batches.push(self.assemble_batch(header).await?);
        }
        Ok(batches)
    }
}
