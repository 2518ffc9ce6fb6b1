use assess_core::model::{
    Actor, ActorId, ActorRole, Assessment, AssessmentId, SessionResult, SubmissionId,
};
use async_trait::async_trait;
use std::collections::HashMap;
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

/// Lightweight listing row for an assessment, without its questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentListItem {
    pub id: AssessmentId,
    pub title: String,
    pub duration_minutes: u32,
    pub question_count: usize,
}

impl AssessmentListItem {
    #[must_use]
    pub fn from_assessment(assessment: &Assessment) -> Self {
        Self {
            id: assessment.id(),
            title: assessment.title().to_owned(),
            duration_minutes: assessment.duration_minutes(),
            question_count: assessment.question_count(),
        }
    }
}

/// A delivered result together with who submitted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSubmission {
    pub id: SubmissionId,
    pub actor_id: ActorId,
    pub actor_name: String,
    pub actor_role: ActorRole,
    pub result: SessionResult,
}

/// Question repository: the read side a taking session is built from.
#[async_trait]
pub trait AssessmentRepository: Send + Sync {
    /// Persist or replace an assessment together with its questions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the assessment cannot be stored.
    async fn upsert_assessment(&self, assessment: &Assessment) -> Result<(), StorageError>;

    /// Load an assessment with its full, ordered question list.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_assessment(&self, id: AssessmentId) -> Result<Assessment, StorageError>;

    /// List assessments ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    async fn list_assessments(&self, limit: u32) -> Result<Vec<AssessmentListItem>, StorageError>;
}

/// Submission sink: durable endpoint for finished session results.
///
/// Implementations own deduplication. The bundled backends reject a second
/// result for the same actor, assessment and start time with `Conflict`.
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    /// Store a finished result on behalf of `actor`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` for duplicates, or other storage errors.
    async fn submit_result(
        &self,
        actor: &Actor,
        result: &SessionResult,
    ) -> Result<SubmissionId, StorageError>;
}

/// Read side over delivered submissions.
#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    /// Fetch a single submission.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_submission(&self, id: SubmissionId) -> Result<StoredSubmission, StorageError>;

    /// List submissions for an assessment, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on query failures.
    async fn list_submissions(
        &self,
        assessment_id: AssessmentId,
        limit: u32,
    ) -> Result<Vec<StoredSubmission>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    assessments: Arc<Mutex<HashMap<AssessmentId, Assessment>>>,
    submissions: Arc<Mutex<Vec<StoredSubmission>>>,
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
impl AssessmentRepository for InMemoryRepository {
    async fn upsert_assessment(&self, assessment: &Assessment) -> Result<(), StorageError> {
        let mut guard = self.assessments.lock().map_err(poisoned)?;
        guard.insert(assessment.id(), assessment.clone());
        Ok(())
    }

    async fn get_assessment(&self, id: AssessmentId) -> Result<Assessment, StorageError> {
        let guard = self.assessments.lock().map_err(poisoned)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_assessments(&self, limit: u32) -> Result<Vec<AssessmentListItem>, StorageError> {
        let guard = self.assessments.lock().map_err(poisoned)?;
        let mut items: Vec<_> = guard.values().map(AssessmentListItem::from_assessment).collect();
        items.sort_by_key(|item| item.id);
        items.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(items)
    }
}

#[async_trait]
impl SubmissionSink for InMemoryRepository {
    async fn submit_result(
        &self,
        actor: &Actor,
        result: &SessionResult,
    ) -> Result<SubmissionId, StorageError> {
        // Mirrors the SQLite foreign key on `submissions.assessment_id`.
        let known = self
            .assessments
            .lock()
            .map_err(poisoned)?
            .contains_key(&result.assessment_id);
        if !known {
            return Err(StorageError::NotFound);
        }

        let mut guard = self.submissions.lock().map_err(poisoned)?;
        let duplicate = guard.iter().any(|s| {
            s.actor_id == actor.id
                && s.result.assessment_id == result.assessment_id
                && s.result.started_at == result.started_at
        });
        if duplicate {
            return Err(StorageError::Conflict);
        }

        let id = SubmissionId::try_from(guard.len() + 1)
            .map_err(|_| StorageError::Serialization("submission id overflow".into()))?;
        guard.push(StoredSubmission {
            id,
            actor_id: actor.id,
            actor_name: actor.display_name.clone(),
            actor_role: actor.role,
            result: result.clone(),
        });
        Ok(id)
    }
}

#[async_trait]
impl SubmissionRepository for InMemoryRepository {
    async fn get_submission(&self, id: SubmissionId) -> Result<StoredSubmission, StorageError> {
        let guard = self.submissions.lock().map_err(poisoned)?;
        guard
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_submissions(
        &self,
        assessment_id: AssessmentId,
        limit: u32,
    ) -> Result<Vec<StoredSubmission>, StorageError> {
        let guard = self.submissions.lock().map_err(poisoned)?;
        let mut found: Vec<_> = guard
            .iter()
            .filter(|s| s.result.assessment_id == assessment_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            b.result
                .ended_at
                .cmp(&a.result.ended_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        found.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(found)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub assessments: Arc<dyn AssessmentRepository>,
    pub sink: Arc<dyn SubmissionSink>,
    pub submissions: Arc<dyn SubmissionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            assessments: Arc::new(repo.clone()),
            sink: Arc::new(repo.clone()),
            submissions: Arc::new(repo),
        }
    }
}
