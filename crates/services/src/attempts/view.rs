use chrono::{DateTime, Utc};
use std::sync::Arc;

use assess_core::model::{ActorId, ActorRole, AssessmentId, SubmissionId, SubmitTrigger};
use storage::repository::{StoredSubmission, SubmissionRepository};

use crate::error::QueryError;

/// Presentation-agnostic list item for a delivered submission.
///
/// Timestamps and durations stay raw; formatting belongs to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionListItem {
    pub id: SubmissionId,
    pub actor_id: ActorId,
    pub actor_name: String,
    pub actor_role: ActorRole,
    pub ended_at: DateTime<Utc>,
    pub elapsed_seconds: u64,

    pub answered: usize,
    pub total: usize,
    pub trigger: SubmitTrigger,
}

impl SubmissionListItem {
    #[must_use]
    pub fn from_stored(stored: &StoredSubmission) -> Self {
        let result = &stored.result;
        Self {
            id: stored.id,
            actor_id: stored.actor_id,
            actor_name: stored.actor_name.clone(),
            actor_role: stored.actor_role,
            ended_at: result.ended_at,
            elapsed_seconds: result.elapsed_seconds,
            answered: result.answers.answered_count(),
            total: result.answers.len(),
            trigger: result.trigger,
        }
    }
}

/// Read-only facade over delivered submissions.
#[derive(Clone)]
pub struct SubmissionQueryService {
    submissions: Arc<dyn SubmissionRepository>,
}

impl SubmissionQueryService {
    #[must_use]
    pub fn new(submissions: Arc<dyn SubmissionRepository>) -> Self {
        Self { submissions }
    }

    /// Most recent submissions for an assessment, newest first.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Storage` on repository failures.
    pub async fn recent_for_assessment(
        &self,
        assessment_id: AssessmentId,
        limit: u32,
    ) -> Result<Vec<SubmissionListItem>, QueryError> {
        let rows = self
            .submissions
            .list_submissions(assessment_id, limit)
            .await?;
        Ok(rows.iter().map(SubmissionListItem::from_stored).collect())
    }

    /// Fetch one submission with its full answer set.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Storage` when the submission is missing or storage fails.
    pub async fn get(&self, id: SubmissionId) -> Result<StoredSubmission, QueryError> {
        Ok(self.submissions.get_submission(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assess_core::model::{
        Actor, AnswerSet, AnswerValue, Assessment, Question, QuestionId, SessionResult,
    };
    use assess_core::time::fixed_now;
    use storage::repository::{
        AssessmentRepository, InMemoryRepository, StorageError, SubmissionSink,
    };

    fn build_result(offset_secs: i64, trigger: SubmitTrigger) -> SessionResult {
        let mut answers = AnswerSet::empty_for([QuestionId::new(1), QuestionId::new(2)]);
        answers.set(QuestionId::new(2), AnswerValue::text("done"));
        let started_at = fixed_now() + chrono::Duration::seconds(offset_secs);
        SessionResult {
            assessment_id: AssessmentId::new(3),
            started_at,
            ended_at: started_at + chrono::Duration::seconds(45),
            elapsed_seconds: 45,
            answers,
            trigger,
            score: None,
        }
    }

    #[test]
    fn list_item_counts_answers() {
        let stored = StoredSubmission {
            id: 11,
            actor_id: ActorId::new(4),
            actor_name: "Eli".into(),
            actor_role: ActorRole::Admin,
            result: build_result(0, SubmitTrigger::TimeExpired),
        };

        let item = SubmissionListItem::from_stored(&stored);

        assert_eq!(item.id, 11);
        assert_eq!(item.actor_role, ActorRole::Admin);
        assert_eq!(item.answered, 1);
        assert_eq!(item.total, 2);
        assert_eq!(item.elapsed_seconds, 45);
        assert_eq!(item.trigger, SubmitTrigger::TimeExpired);
    }

    #[tokio::test]
    async fn recent_for_assessment_is_newest_first() {
        let repo = InMemoryRepository::new();
        let assessment = Assessment::new(
            AssessmentId::new(3),
            "Short",
            5,
            2,
            vec![
                Question::essay(QuestionId::new(1), "One", 1).unwrap(),
                Question::essay(QuestionId::new(2), "Two", 1).unwrap(),
            ],
        )
        .unwrap();
        repo.upsert_assessment(&assessment).await.unwrap();
        let actor = Actor::student(ActorId::new(4), "Eli");
        let older = repo
            .submit_result(&actor, &build_result(0, SubmitTrigger::Manual))
            .await
            .unwrap();
        let newer = repo
            .submit_result(&actor, &build_result(300, SubmitTrigger::TimeExpired))
            .await
            .unwrap();

        let svc = SubmissionQueryService::new(Arc::new(repo));
        let items = svc
            .recent_for_assessment(AssessmentId::new(3), 10)
            .await
            .unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![newer, older]);

        let limited = svc
            .recent_for_assessment(AssessmentId::new(3), 1)
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);

        assert!(matches!(
            svc.get(999).await,
            Err(QueryError::Storage(StorageError::NotFound))
        ));
    }
}
