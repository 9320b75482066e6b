use std::sync::Arc;

use prep_core::Clock;
use prep_core::model::{SessionContext, UserId};
use storage::repository::Storage;

use crate::config::ServicesConfig;
use crate::driver::{ExamDriver, PracticeDriver};
use crate::error::AppServicesError;
use crate::exam_service::ExamService;
use crate::import_service::ImportService;
use crate::practice_service::PracticeService;
use crate::progress_writer::ProgressWriter;
use crate::seed::{SeedSummary, seed_sample_data};

/// Assembles app-facing services over one `Storage`.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    config: ServicesConfig,
    exams: ExamService,
    practice: PracticeService,
    imports: ImportService,
}

impl AppServices {
    #[must_use]
    pub fn new(storage: Storage, config: ServicesConfig, clock: Clock) -> Self {
        let exams = ExamService::new(Arc::clone(&storage.content), Arc::clone(&storage.users))
            .with_retry(config.retry);
        let writer = ProgressWriter::new(Arc::clone(&storage.progress), config.retry, clock);
        let practice =
            PracticeService::new(Arc::clone(&storage.content), Arc::clone(&storage.progress), writer);
        let imports = ImportService::new(Arc::clone(&storage.content), config.policy.clone(), clock);

        Self {
            storage,
            config,
            exams,
            practice,
            imports,
        }
    }

    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(
        db_url: &str,
        config: ServicesConfig,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::new(storage, config, clock))
    }

    #[must_use]
    pub fn config(&self) -> &ServicesConfig {
        &self.config
    }

    #[must_use]
    pub fn exams(&self) -> &ExamService {
        &self.exams
    }

    #[must_use]
    pub fn practice(&self) -> &PracticeService {
        &self.practice
    }

    #[must_use]
    pub fn imports(&self) -> &ImportService {
        &self.imports
    }

    #[must_use]
    pub fn exam_driver(&self) -> ExamDriver {
        ExamDriver::new(self.exams.clone())
    }

    #[must_use]
    pub fn practice_driver(&self) -> PracticeDriver {
        PracticeDriver::new(self.practice.clone(), self.config.policy.auto_advance_delay())
    }

    /// Identity and role of a stored user.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::UnknownUser` if no profile exists.
    pub async fn session_context(&self, user_id: &UserId) -> Result<SessionContext, AppServicesError> {
        self.storage
            .users
            .get_user(user_id)
            .await?
            .map(|user| user.context())
            .ok_or_else(|| AppServicesError::UnknownUser(user_id.clone()))
    }

    /// # Errors
    ///
    /// Returns `AppServicesError` if sample content is invalid or cannot be
    /// written.
    pub async fn seed(&self) -> Result<SeedSummary, AppServicesError> {
        seed_sample_data(&self.storage, &self.config.policy).await
    }
}
