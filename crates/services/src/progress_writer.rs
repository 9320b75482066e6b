use std::sync::Arc;

use tracing::{debug, error};

use prep_core::Clock;
use prep_core::model::{CourseId, PracticeProgress, UserId};
use storage::repository::ProgressRepository;

use crate::error::PracticeError;
use crate::retry::RetryPolicy;

/// Writes practice resume points with bounded retry.
///
/// Every write is a whole-record upsert, so repeating one after an ambiguous
/// failure leaves the same state.
#[derive(Clone)]
pub struct ProgressWriter {
    progress: Arc<dyn ProgressRepository>,
    retry: RetryPolicy,
    clock: Clock,
}

impl ProgressWriter {
    #[must_use]
    pub fn new(progress: Arc<dyn ProgressRepository>, retry: RetryPolicy, clock: Clock) -> Self {
        Self {
            progress,
            retry,
            clock,
        }
    }

    /// Stores `last_index` as the user's resume point in `course_id`.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Persist` once retries are exhausted or the
    /// failure is not transient.
    pub async fn write(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        last_index: usize,
    ) -> Result<PracticeProgress, PracticeError> {
        let record = PracticeProgress::new(last_index, self.clock.now());
        let progress = &self.progress;

        match self
            .retry
            .run("practice_progress", || {
                progress.set_progress(user_id, course_id, record)
            })
            .await
        {
            Ok(()) => {
                debug!(user = %user_id, course = %course_id, last_index, "progress saved");
                Ok(record)
            }
            Err(err) => {
                error!(user = %user_id, course = %course_id, last_index, error = %err, "progress lost");
                Err(PracticeError::Persist(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prep_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryRepository;

    #[tokio::test]
    async fn write_stamps_with_clock() {
        let repo = InMemoryRepository::new();
        let writer = ProgressWriter::new(Arc::new(repo.clone()), RetryPolicy::no_retry(), fixed_clock());
        let user = UserId::new("u1");
        let course = CourseId::new("c1");

        let written = writer.write(&user, &course, 3).await.unwrap();
        assert_eq!(written, PracticeProgress::new(3, fixed_now()));
        assert_eq!(repo.get_progress(&user, &course).await.unwrap(), Some(written));
    }
}
