use async_trait::async_trait;
use prep_core::model::{
    BatchId, Course, CourseId, ExamBatch, PracticeProgress, User, UserId,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    /// Whether retrying the same call may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Connection(_))
    }
}

/// Content store: course and exam-batch snapshots.
///
/// Documents are written whole; a reader never sees a document with only part
/// of its questions.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Create or replace a course and its questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// Fetch a course snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_course(&self, id: &CourseId) -> Result<Course, StorageError>;

    /// List all courses ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or mapping failures.
    async fn list_courses(&self) -> Result<Vec<Course>, StorageError>;

    /// Create or replace an exam batch and its questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the batch cannot be stored.
    async fn upsert_batch(&self, batch: &ExamBatch) -> Result<(), StorageError>;

    /// Fetch a batch snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_batch(&self, id: &BatchId) -> Result<ExamBatch, StorageError>;

    /// List all batches in ascending `order` (the unlock sequence).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or mapping failures.
    async fn list_batches(&self) -> Result<Vec<ExamBatch>, StorageError>;
}

/// Progress store: practice resume points keyed by `(user, course)`.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on read failures. A missing record is `Ok(None)`.
    async fn get_progress(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<PracticeProgress>, StorageError>;

    /// Create or overwrite the resume point. Last write wins.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn set_progress(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        progress: PracticeProgress,
    ) -> Result<(), StorageError>;
}

/// User profiles and their passed exam batches.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create or update profile fields. Does not touch passed batches.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be stored.
    async fn upsert_user(&self, user: &User) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on read failures. A missing user is `Ok(None)`.
    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StorageError>;

    /// Add `batch_id` to the user's passed set. Adding twice is harmless.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn add_passed_batch(
        &self,
        user_id: &UserId,
        batch_id: &BatchId,
    ) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on read failures.
    async fn passed_batches(&self, user_id: &UserId) -> Result<HashSet<BatchId>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    courses: Arc<Mutex<HashMap<CourseId, Course>>>,
    batches: Arc<Mutex<HashMap<BatchId, ExamBatch>>>,
    progress: Arc<Mutex<HashMap<(UserId, CourseId), PracticeProgress>>>,
    users: Arc<Mutex<HashMap<UserId, User>>>,
    passed: Arc<Mutex<HashMap<UserId, HashSet<BatchId>>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl ContentRepository for InMemoryRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut guard = self.courses.lock().map_err(poisoned)?;
        guard.insert(course.id().clone(), course.clone());
        Ok(())
    }

    async fn get_course(&self, id: &CourseId) -> Result<Course, StorageError> {
        let guard = self.courses.lock().map_err(poisoned)?;
        guard.get(id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let guard = self.courses.lock().map_err(poisoned)?;
        let mut courses: Vec<Course> = guard.values().cloned().collect();
        courses.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.id().cmp(b.id())));
        Ok(courses)
    }

    async fn upsert_batch(&self, batch: &ExamBatch) -> Result<(), StorageError> {
        let mut guard = self.batches.lock().map_err(poisoned)?;
        guard.insert(batch.id().clone(), batch.clone());
        Ok(())
    }

    async fn get_batch(&self, id: &BatchId) -> Result<ExamBatch, StorageError> {
        let guard = self.batches.lock().map_err(poisoned)?;
        guard.get(id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_batches(&self) -> Result<Vec<ExamBatch>, StorageError> {
        let guard = self.batches.lock().map_err(poisoned)?;
        let mut batches: Vec<ExamBatch> = guard.values().cloned().collect();
        batches.sort_by(|a, b| a.order().cmp(&b.order()).then_with(|| a.id().cmp(b.id())));
        Ok(batches)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
    ) -> Result<Option<PracticeProgress>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        Ok(guard.get(&(user_id.clone(), course_id.clone())).copied())
    }

    async fn set_progress(
        &self,
        user_id: &UserId,
        course_id: &CourseId,
        progress: PracticeProgress,
    ) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        guard.insert((user_id.clone(), course_id.clone()), progress);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn upsert_user(&self, user: &User) -> Result<(), StorageError> {
        let mut guard = self.users.lock().map_err(poisoned)?;
        let mut profile = user.clone();
        profile.passed_batches.clear();
        guard.insert(user.id.clone(), profile);
        Ok(())
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StorageError> {
        let profile = {
            let guard = self.users.lock().map_err(poisoned)?;
            guard.get(id).cloned()
        };
        let Some(mut user) = profile else {
            return Ok(None);
        };
        user.passed_batches = self.passed_batches(id).await?;
        Ok(Some(user))
    }

    async fn add_passed_batch(
        &self,
        user_id: &UserId,
        batch_id: &BatchId,
    ) -> Result<(), StorageError> {
        let mut guard = self.passed.lock().map_err(poisoned)?;
        guard
            .entry(user_id.clone())
            .or_default()
            .insert(batch_id.clone());
        Ok(())
    }

    async fn passed_batches(&self, user_id: &UserId) -> Result<HashSet<BatchId>, StorageError> {
        let guard = self.passed.lock().map_err(poisoned)?;
        Ok(guard.get(user_id).cloned().unwrap_or_default())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub content: Arc<dyn ContentRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let content: Arc<dyn ContentRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let users: Arc<dyn UserRepository> = Arc::new(repo);
        Self {
            content,
            progress,
            users,
        }
    }
}
