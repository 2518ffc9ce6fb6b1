#![forbid(unsafe_code)]

pub mod fixtures;
pub mod repository;
pub mod sqlite;

pub use repository::{
    AssessmentListItem, AssessmentRepository, InMemoryRepository, Storage, StorageError,
    StoredSubmission, SubmissionRepository, SubmissionSink,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
