//! Shared error types for the services crate.

use std::path::PathBuf;

use thiserror::Error;

use prep_core::model::{BatchId, CourseId, UserId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ExamService` and the exam driver.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExamServiceError {
    #[error("exam batch {0} does not exist")]
    UnknownBatch(BatchId),
    #[error("exam batch {0} is locked until the previous batch is passed")]
    Locked(BatchId),
    #[error("pass could not be recorded: {0}")]
    Persist(#[source] StorageError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `PracticeService` and the practice driver.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PracticeError {
    #[error("course {0} does not exist")]
    UnknownCourse(CourseId),
    #[error("progress could not be saved: {0}")]
    Persist(#[source] StorageError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ImportService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ImportError {
    #[error("only admins can import content")]
    Forbidden,
    #[error("{0}")]
    Malformed(String),
    #[error("question {position} is invalid: {source}")]
    InvalidQuestion {
        position: usize,
        #[source]
        source: prep_core::Error,
    },
    #[error(transparent)]
    Content(#[from] prep_core::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while loading `ServicesConfig`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] toml::de::Error),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error("user {0} does not exist")]
    UnknownUser(UserId),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Content(#[from] prep_core::Error),
}
