use thiserror::Error;

use crate::model::ids::{CourseId, QuestionId};
use crate::model::question::{Question, first_duplicate_id};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course name cannot be empty")]
    EmptyName,

    #[error("course must contain at least one question")]
    NoQuestions,

    #[error("duplicate question id in course: {0}")]
    DuplicateQuestion(QuestionId),

    #[error("per-question time limit must be > 0 seconds")]
    InvalidQuestionTimeLimit,
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// Ungated collection of practice questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    id: CourseId,
    name: String,
    description: String,
    category: String,
    questions: Vec<Question>,
    question_time_limit_secs: u32,
}

impl Course {
    /// Per-question countdown used when a course does not override it.
    pub const DEFAULT_QUESTION_TIME_LIMIT_SECS: u32 = 120;

    /// Default category for courses imported without subject metadata.
    pub const DEFAULT_CATEGORY: &'static str = "General";

    /// Creates a course with the default category and per-question limit.
    ///
    /// # Errors
    ///
    /// Returns `CourseError` if the name is blank, there are no questions, or
    /// two questions share an id.
    pub fn new(
        id: CourseId,
        name: impl Into<String>,
        questions: Vec<Question>,
    ) -> Result<Self, CourseError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CourseError::EmptyName);
        }
        if questions.is_empty() {
            return Err(CourseError::NoQuestions);
        }
        if let Some(dup) = first_duplicate_id(&questions) {
            return Err(CourseError::DuplicateQuestion(dup));
        }

        Ok(Self {
            id,
            name,
            description: String::new(),
            category: Self::DEFAULT_CATEGORY.to_owned(),
            questions,
            question_time_limit_secs: Self::DEFAULT_QUESTION_TIME_LIMIT_SECS,
        })
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Overrides the per-question countdown.
    ///
    /// # Errors
    ///
    /// Returns `CourseError::InvalidQuestionTimeLimit` for a zero limit.
    pub fn with_question_time_limit(mut self, secs: u32) -> Result<Self, CourseError> {
        if secs == 0 {
            return Err(CourseError::InvalidQuestionTimeLimit);
        }
        self.question_time_limit_secs = secs;
        Ok(self)
    }

    #[must_use]
    pub fn id(&self) -> &CourseId {
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
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn question_time_limit_secs(&self) -> u32 {
        self.question_time_limit_secs
    }
}
