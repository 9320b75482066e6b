use thiserror::Error;

use crate::model::ids::{BatchId, QuestionId};
use crate::model::question::{Question, first_duplicate_id};
use crate::model::score::PassThreshold;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BatchError {
    #[error("batch name cannot be empty")]
    EmptyName,

    #[error("batch must contain at least one question")]
    NoQuestions,

    #[error("duplicate question id in batch: {0}")]
    DuplicateQuestion(QuestionId),

    #[error("time limit must be > 0 minutes")]
    InvalidTimeLimit,
}

//
// ─── EXAM BATCH ────────────────────────────────────────────────────────────────
//

/// Ordered, gated exam unit with a whole-session time limit.
///
/// Batches are attempted in ascending `order`; passing one unlocks the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamBatch {
    id: BatchId,
    name: String,
    description: String,
    time_limit_minutes: u32,
    order: i64,
    pass_threshold: PassThreshold,
    questions: Vec<Question>,
}

impl ExamBatch {
    /// Time limit given to batches created by the admin import.
    pub const DEFAULT_TIME_LIMIT_MINUTES: u32 = 300;

    /// # Errors
    ///
    /// Returns `BatchError` if the name is blank, the limit is zero, there are
    /// no questions, or two questions share an id.
    pub fn new(
        id: BatchId,
        name: impl Into<String>,
        time_limit_minutes: u32,
        questions: Vec<Question>,
    ) -> Result<Self, BatchError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(BatchError::EmptyName);
        }
        if time_limit_minutes == 0 {
            return Err(BatchError::InvalidTimeLimit);
        }
        if questions.is_empty() {
            return Err(BatchError::NoQuestions);
        }
        if let Some(dup) = first_duplicate_id(&questions) {
            return Err(BatchError::DuplicateQuestion(dup));
        }

        Ok(Self {
            id,
            name,
            description: String::new(),
            time_limit_minutes,
            order: 0,
            pass_threshold: PassThreshold::DEFAULT,
            questions,
        })
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_order(mut self, order: i64) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn with_pass_threshold(mut self, threshold: PassThreshold) -> Self {
        self.pass_threshold = threshold;
        self
    }

    #[must_use]
    pub fn id(&self) -> &BatchId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn time_limit_minutes(&self) -> u32 {
        self.time_limit_minutes
    }

    /// Whole-session countdown in seconds.
    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_minutes.saturating_mul(60)
    }

    #[must_use]
    pub fn order(&self) -> i64 {
        self.order
    }

    #[must_use]
    pub fn pass_threshold(&self) -> PassThreshold {
        self.pass_threshold
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str) -> Question {
        Question::new(QuestionId::new(id), "Q", vec!["a".into(), "b".into()], 1, "").unwrap()
    }

    #[test]
    fn time_limit_converts_to_seconds() {
        let batch = ExamBatch::new(BatchId::new("b1"), "Foundation", 300, vec![question("q")])
            .unwrap();
        assert_eq!(batch.time_limit_secs(), 18_000);
        assert_eq!(batch.pass_threshold(), PassThreshold::DEFAULT);
    }

    #[test]
    fn rejects_zero_time_limit() {
        let err = ExamBatch::new(BatchId::new("b1"), "Foundation", 0, vec![question("q")])
            .unwrap_err();
        assert_eq!(err, BatchError::InvalidTimeLimit);
    }

    #[test]
    fn rejects_empty_batch() {
        let err = ExamBatch::new(BatchId::new("b1"), "Foundation", 10, Vec::new()).unwrap_err();
        assert_eq!(err, BatchError::NoQuestions);
    }
}
