mod batch;
mod course;
mod ids;
mod progress;
mod question;
mod score;
mod user;

pub use ids::{BatchId, CourseId, ParseIdError, QuestionId, UserId};

pub use batch::{BatchError, ExamBatch};
pub use course::{Course, CourseError};
pub use progress::{BatchStatus, PracticeProgress, batch_status, batch_statuses};
pub use question::{Question, QuestionError};
pub use score::{InvalidThreshold, PassThreshold, Score};
pub use user::{Role, SessionContext, User};
