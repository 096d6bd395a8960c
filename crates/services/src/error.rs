//! Shared error types for the services crate.

use thiserror::Error;

use cognitia_core::model::{AttemptError, ClassSessionError, PlanError, QuizError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the quiz session workflow.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// A request carried unusable input, e.g. a nil id or an unknown quiz.
    #[error("invalid session input: {0}")]
    Validation(String),
    /// The student has no open attempt to act on.
    #[error("quiz session has not been started")]
    NotStarted,
    /// The attempt was already submitted; results are final.
    #[error("quiz attempt already submitted")]
    AlreadySubmitted,
    #[error(transparent)]
    Attempt(#[from] AttemptError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuizService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `PlanService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlanServiceError {
    #[error("role is not allowed to author plans")]
    Forbidden,
    #[error("plan not found")]
    NotFound,
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ScheduleService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScheduleServiceError {
    #[error("session overlaps an existing session for this teacher")]
    Overlap,
    #[error(transparent)]
    Session(#[from] ClassSessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `GenerationService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerationError {
    #[error("generation is not configured")]
    Disabled,
    #[error("generation returned an empty response")]
    EmptyResponse,
    #[error("generation returned a malformed payload: {0}")]
    MalformedPayload(String),
    #[error("generation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
