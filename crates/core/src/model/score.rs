use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::question::Question;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("pass threshold must be between 0 and 100, got {0}")]
pub struct InvalidThreshold(pub u8);

/// Minimum percentage a submission needs to pass, in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PassThreshold(u8);

impl PassThreshold {
    /// The benchmark every batch used before thresholds became batch metadata.
    pub const DEFAULT: Self = Self(50);

    /// # Errors
    ///
    /// Returns `InvalidThreshold` if `percent` exceeds 100.
    pub fn new(percent: u8) -> Result<Self, InvalidThreshold> {
        if percent > 100 {
            return Err(InvalidThreshold(percent));
        }
        Ok(Self(percent))
    }

    #[must_use]
    pub fn percent(self) -> u8 {
        self.0
    }
}

impl Default for PassThreshold {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u8> for PassThreshold {
    type Error = InvalidThreshold;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PassThreshold> for u8 {
    fn from(value: PassThreshold) -> Self {
        value.0
    }
}

/// Tally of correct answers over a question sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    correct: usize,
    total: usize,
}

impl Score {
    #[must_use]
    pub fn new(correct: usize, total: usize) -> Self {
        Self {
            correct: correct.min(total),
            total,
        }
    }

    /// Counts questions whose recorded answer equals the correct index.
    ///
    /// Unanswered questions count as incorrect.
    #[must_use]
    pub fn tally(questions: &[Question], answers: &HashMap<QuestionId, usize>) -> Self {
        let correct = questions
            .iter()
            .filter(|q| answers.get(q.id()).is_some_and(|&a| q.is_correct(a)))
            .count();
        Self::new(correct, questions.len())
    }

    #[must_use]
    pub fn correct(&self) -> usize {
        self.correct
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// `100 * correct / total`; zero for an empty tally.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        100.0 * self.correct as f64 / self.total as f64
    }

    /// Compared in integers so 2/4 against 50 % passes without rounding noise.
    #[must_use]
    pub fn passes(&self, threshold: PassThreshold) -> bool {
        if self.total == 0 {
            return false;
        }
        self.correct.saturating_mul(100) >= usize::from(threshold.percent()) * self.total
    }
}
