use std::sync::Arc;

use tracing::info;

use prep_core::exam::ExamSession;
use prep_core::model::{BatchId, BatchStatus, ExamBatch, SessionContext, UserId, batch_statuses};
use storage::repository::{ContentRepository, UserRepository};

use crate::error::ExamServiceError;
use crate::retry::RetryPolicy;

/// A batch together with what the current user may do with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchListing {
    pub batch: ExamBatch,
    pub status: BatchStatus,
}

/// Lists exam batches, gates them on the unlock chain, and records passes.
#[derive(Clone)]
pub struct ExamService {
    content: Arc<dyn ContentRepository>,
    users: Arc<dyn UserRepository>,
    retry: RetryPolicy,
}

impl ExamService {
    #[must_use]
    pub fn new(content: Arc<dyn ContentRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self {
            content,
            users,
            retry: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// All batches in unlock order with their status for `ctx`'s user.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::Storage` if content or the passed set cannot
    /// be read.
    pub async fn list_batches(
        &self,
        ctx: &SessionContext,
    ) -> Result<Vec<BatchListing>, ExamServiceError> {
        let batches = self.content.list_batches().await?;
        let passed = self.users.passed_batches(ctx.user_id()).await?;
        let statuses = batch_statuses(&batches, &passed);

        Ok(batches
            .into_iter()
            .zip(statuses)
            .map(|(batch, status)| BatchListing { batch, status })
            .collect())
    }

    /// Starts an exam on an unlocked batch.
    ///
    /// Passed batches may be retaken.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::UnknownBatch` for an id not in the content
    /// store, `ExamServiceError::Locked` if the previous batch has not been
    /// passed, or `ExamServiceError::Storage` on read failures.
    pub async fn start_exam(
        &self,
        ctx: &SessionContext,
        batch_id: &BatchId,
    ) -> Result<ExamSession, ExamServiceError> {
        let listing = self
            .list_batches(ctx)
            .await?
            .into_iter()
            .find(|listing| listing.batch.id() == batch_id)
            .ok_or_else(|| ExamServiceError::UnknownBatch(batch_id.clone()))?;

        if !listing.status.is_attemptable() {
            info!(user = %ctx.user_id(), batch = %batch_id, "exam start refused: locked");
            return Err(ExamServiceError::Locked(batch_id.clone()));
        }

        info!(
            user = %ctx.user_id(),
            batch = %batch_id,
            questions = listing.batch.total_questions(),
            "exam started"
        );
        Ok(ExamSession::start(listing.batch, ctx))
    }

    /// Adds `batch_id` to the user's passed set. Recording twice is harmless.
    ///
    /// # Errors
    ///
    /// Returns `ExamServiceError::Persist` once retries are exhausted.
    pub async fn record_pass(
        &self,
        user_id: &UserId,
        batch_id: &BatchId,
    ) -> Result<(), ExamServiceError> {
        let users = &self.users;
        self.retry
            .run("record_pass", || users.add_passed_batch(user_id, batch_id))
            .await
            .map_err(ExamServiceError::Persist)?;
        info!(user = %user_id, batch = %batch_id, "exam pass recorded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prep_core::model::{Question, QuestionId, Role};
    use storage::repository::InMemoryRepository;

    fn batch(id: &str, order: i64) -> ExamBatch {
        let question =
            Question::new(QuestionId::new("q1"), "Q", vec!["a".into(), "b".into()], 0, "")
                .unwrap();
        ExamBatch::new(BatchId::new(id), id, 10, vec![question])
            .unwrap()
            .with_order(order)
    }

    async fn service() -> (ExamService, SessionContext) {
        let repo = InMemoryRepository::new();
        repo.upsert_batch(&batch("b1", 1)).await.unwrap();
        repo.upsert_batch(&batch("b2", 2)).await.unwrap();
        let service = ExamService::new(Arc::new(repo.clone()), Arc::new(repo));
        (service, SessionContext::new(UserId::new("u1"), Role::User))
    }

    #[tokio::test]
    async fn second_batch_unlocks_after_first_pass() {
        let (service, ctx) = service().await;

        let statuses: Vec<_> = service
            .list_batches(&ctx)
            .await
            .unwrap()
            .iter()
            .map(|l| l.status)
            .collect();
        assert_eq!(statuses, vec![BatchStatus::Available, BatchStatus::Locked]);

        let err = service
            .start_exam(&ctx, &BatchId::new("b2"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExamServiceError::Locked(_)));

        service
            .record_pass(ctx.user_id(), &BatchId::new("b1"))
            .await
            .unwrap();
        let session = service
            .start_exam(&ctx, &BatchId::new("b2"))
            .await
            .unwrap();
        assert_eq!(session.batch().id().as_str(), "b2");
    }

    #[tokio::test]
    async fn unknown_batch_is_reported() {
        let (service, ctx) = service().await;
        let err = service
            .start_exam(&ctx, &BatchId::new("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExamServiceError::UnknownBatch(_)));
    }

    #[tokio::test]
    async fn passed_batch_can_be_retaken() {
        let (service, ctx) = service().await;
        service
            .record_pass(ctx.user_id(), &BatchId::new("b1"))
            .await
            .unwrap();
        assert!(service.start_exam(&ctx, &BatchId::new("b1")).await.is_ok());
    }
}
