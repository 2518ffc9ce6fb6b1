use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::attempts::{AttemptService, SubmissionQueryService};
use crate::error::AppServicesError;

/// Assembles the services the terminal driver needs from one storage backend.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    attempts: Arc<AttemptService>,
    submissions: Arc<SubmissionQueryService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(storage, clock))
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: Storage, clock: Clock) -> Self {
        let attempts = Arc::new(AttemptService::new(
            clock,
            Arc::clone(&storage.assessments),
            Arc::clone(&storage.sink),
        ));
        let submissions = Arc::new(SubmissionQueryService::new(Arc::clone(
            &storage.submissions,
        )));
        Self {
            storage,
            attempts,
            submissions,
        }
    }

    /// Raw repository handles, for seeding and administration.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn attempts(&self) -> Arc<AttemptService> {
        Arc::clone(&self.attempts)
    }

    #[must_use]
    pub fn submissions(&self) -> Arc<SubmissionQueryService> {
        Arc::clone(&self.submissions)
    }
}
