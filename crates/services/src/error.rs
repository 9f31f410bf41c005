//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{AttemptError, SettingsError, TestId, UserId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by a `ProgressSync` implementation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SyncError {
    #[error("no attempt stored for user {user_id} on test {test_id}")]
    MissingAttempt { user_id: UserId, test_id: TestId },
    #[error("sync worker is no longer running")]
    Closed,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Why a session could not be loaded.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    #[error("no session to resume")]
    NoSession,
    #[error("test has no questions")]
    EmptyTest,
    #[error("test does not exist")]
    UnknownTest,
}

/// A user action that was refused without touching the attempt.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GuardRejection {
    #[error("answer the current question first")]
    AnswerRequired,
    #[error("question already answered")]
    AlreadyAnswered,
    #[error("free question limit reached")]
    LimitReached,
}

/// Errors emitted by `TestSession` transitions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("not found: {0}")]
    NotFound(NotFoundReason),
    #[error("rejected: {0}")]
    Guard(GuardRejection),
    #[error("operation not allowed while the session is {state}")]
    InvalidState { state: &'static str },
    #[error("option {index} out of range for {len} options")]
    OptionOutOfRange { index: usize, len: usize },
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while reading engine configuration from the environment.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{var} must be a non-negative integer, got {raw:?}")]
    InvalidNumber { var: &'static str, raw: String },
    #[error("{var} must be four comma-separated percentages, got {raw:?}")]
    InvalidThresholds { var: &'static str, raw: String },
    #[error("{var} cannot be empty")]
    Empty { var: &'static str },
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Errors emitted while bootstrapping services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExamServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
