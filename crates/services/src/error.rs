//! Shared error types for the services crate.

use thiserror::Error;

use assess_core::SessionError;
use assess_core::model::SessionResult;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `AttemptService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AttemptError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// The session finished but the sink refused the result.
    ///
    /// `result` is the frozen outcome; hand it back to `AttemptService::deliver`
    /// to retry.
    #[error("result could not be delivered: {source}")]
    Delivery {
        result: Box<SessionResult>,
        #[source]
        source: StorageError,
    },
}

impl AttemptError {
    /// The undelivered result, if this error carries one.
    #[must_use]
    pub fn undelivered(&self) -> Option<&SessionResult> {
        match self {
            AttemptError::Delivery { result, .. } => Some(&**result),
            _ => None,
        }
    }
}

/// Errors emitted by `SubmissionQueryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QueryError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
