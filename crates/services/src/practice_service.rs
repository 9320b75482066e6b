use std::sync::Arc;

use tracing::info;

use prep_core::model::{Course, CourseId, PracticeProgress, SessionContext, UserId};
use prep_core::practice::{PracticeSession, PracticeStep};
use storage::repository::{ContentRepository, ProgressRepository, StorageError};

use crate::error::PracticeError;
use crate::progress_writer::ProgressWriter;

/// Lists courses and opens practice sessions at the user's resume point.
#[derive(Clone)]
pub struct PracticeService {
    content: Arc<dyn ContentRepository>,
    progress: Arc<dyn ProgressRepository>,
    writer: ProgressWriter,
}

impl PracticeService {
    #[must_use]
    pub fn new(
        content: Arc<dyn ContentRepository>,
        progress: Arc<dyn ProgressRepository>,
        writer: ProgressWriter,
    ) -> Self {
        Self {
            content,
            progress,
            writer,
        }
    }

    /// # Errors
    ///
    /// Returns `PracticeError::Storage` if courses cannot be read.
    pub async fn list_courses(&self) -> Result<Vec<Course>, PracticeError> {
        Ok(self.content.list_courses().await?)
    }

    /// Saved resume point, if any.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Storage` if progress cannot be read.
    pub async fn progress_for(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<PracticeProgress>, PracticeError> {
        Ok(self.progress.get_progress(user_id, course_id).await?)
    }

    /// Opens a session at the saved resume point, or the first question when
    /// nothing was saved.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::UnknownCourse` for an id not in the content
    /// store, or `PracticeError::Storage` on read failures.
    pub async fn start_practice(
        &self,
        ctx: &SessionContext,
        course_id: &CourseId,
    ) -> Result<PracticeSession, PracticeError> {
        let course = match self.content.get_course(course_id).await {
            Ok(course) => course,
            Err(StorageError::NotFound) => {
                return Err(PracticeError::UnknownCourse(course_id.clone()));
            }
            Err(err) => return Err(err.into()),
        };
        let resume = self.progress_for(ctx.user_id(), course_id).await?;
        let session = PracticeSession::start(course, ctx, resume);

        info!(
            user = %ctx.user_id(),
            course = %course_id,
            start_index = session.current_index(),
            questions = session.question_count(),
            "practice started"
        );
        Ok(session)
    }

    /// Persists the resume point produced by `PracticeSession::advance`.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Persist` if the write keeps failing.
    pub async fn persist_step(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        step: PracticeStep,
    ) -> Result<PracticeProgress, PracticeError> {
        let saved = self
            .writer
            .write(user_id, course_id, step.last_index())
            .await?;
        if step.is_completed() {
            info!(user = %user_id, course = %course_id, "practice course completed");
        }
        Ok(saved)
    }
}
