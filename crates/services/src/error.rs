//! Shared error types for the services crate.

use thiserror::Error;

use epsilon_core::QuizError;
use epsilon_core::model::{
    AttemptError, MeetingError, MeetingId, ResourceId, ResourceType, UserEmailError,
};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by an `AuthProvider`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthError {
    #[error("not signed in")]
    NotAuthenticated,
    #[error(transparent)]
    InvalidEmail(#[from] UserEmailError),
    #[error("auth provider unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("resource {0} not found")]
    NotFound(ResourceId),
    #[error("resource {id} is a {found}, not a {expected}")]
    WrongKind {
        id: ResourceId,
        expected: ResourceType,
        found: ResourceType,
    },
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
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Attempt(#[from] AttemptError),
}

/// Errors emitted by `MeetingService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MeetingServiceError {
    #[error(transparent)]
    Meeting(#[from] MeetingError),
    #[error("meeting {0} not found")]
    NotFound(MeetingId),
    #[error("invalid month: {year}-{month}")]
    InvalidMonth { year: i32, month: u32 },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `DashboardService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DashboardError {
    #[error(transparent)]
    Progress(#[from] ProgressServiceError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Meeting(#[from] MeetingServiceError),
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
