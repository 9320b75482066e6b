#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod driver;
pub mod error;
pub mod exam_service;
pub mod import_service;
pub mod practice_service;
pub mod progress_writer;
pub mod retry;
pub mod seed;

pub use prep_core::Clock;

pub use app_services::AppServices;
pub use config::ServicesConfig;
pub use driver::{
    ExamCommand, ExamDriver, ExamEvent, PracticeCommand, PracticeDriver, PracticeEvent,
    SessionHandle, SessionOutcome,
};
pub use error::{AppServicesError, ConfigError, ExamServiceError, ImportError, PracticeError};
pub use exam_service::{BatchListing, ExamService};
pub use import_service::{ImportService, ImportSummary, ImportTarget};
pub use practice_service::PracticeService;
pub use progress_writer::ProgressWriter;
pub use retry::RetryPolicy;
