#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod error;
pub mod sessions;
pub mod sync;

pub use exam_core::Clock;

pub use app_services::ExamServices;
pub use config::EngineConfig;
pub use error::{ConfigError, ExamServicesError, GuardRejection, NotFoundReason, SessionError, SyncError};
pub use sessions::{
    ExamSessionService, LoadRequest, QuestionLimitGate, SessionProgress, SessionState, Step,
    TestSession,
};
pub use sync::{ProgressSync, StoreProgressSync, SyncHandle};
