use thiserror::Error;

use crate::model::{BatchError, CourseError, InvalidThreshold, QuestionError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Batch(#[from] BatchError),
    #[error(transparent)]
    Threshold(#[from] InvalidThreshold),
}
