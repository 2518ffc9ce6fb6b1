use std::sync::Arc;

use assess_core::Session;
use assess_core::model::{Actor, AssessmentId, SessionResult, SubmissionId};
use storage::repository::{AssessmentRepository, SubmissionSink};

use crate::Clock;
use crate::error::AttemptError;

/// A result that reached the submission sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub submission_id: SubmissionId,
    pub result: SessionResult,
}

/// Outcome of forwarding elapsed time to a running attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptTick {
    pub remaining_seconds: u64,
    /// Set on the tick that ran the clock out and delivered the answers.
    pub submission: Option<Delivered>,
}

impl AttemptTick {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.submission.is_some()
    }
}

/// Orchestrates attempt start, the countdown and result delivery.
///
/// The `Session` itself stays with the caller; this service only loads the
/// assessment, reads the clock and talks to the sink.
#[derive(Clone)]
pub struct AttemptService {
    clock: Clock,
    assessments: Arc<dyn AssessmentRepository>,
    sink: Arc<dyn SubmissionSink>,
}

impl AttemptService {
    #[must_use]
    pub fn new(
        clock: Clock,
        assessments: Arc<dyn AssessmentRepository>,
        sink: Arc<dyn SubmissionSink>,
    ) -> Self {
        Self {
            clock,
            assessments,
            sink,
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Load an assessment and open a taking session for `actor`.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Storage` if the assessment cannot be loaded, or
    /// `AttemptError::Session` if it has no questions or no time allotted.
    pub async fn start_attempt(
        &self,
        assessment_id: AssessmentId,
        actor: &Actor,
    ) -> Result<Session, AttemptError> {
        let assessment = self.assessments.get_assessment(assessment_id).await?;
        let session = Session::start(&assessment, self.clock.now())?;
        tracing::info!(
            assessment_id = %assessment_id,
            actor_id = %actor.id,
            questions = session.questions().len(),
            remaining_seconds = session.remaining_seconds(),
            "attempt started"
        );
        Ok(session)
    }

    /// Forward elapsed seconds to the session and deliver the result if time ran out.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Session` if the session is already submitted, or
    /// `AttemptError::Delivery` if time expired but the sink refused the result.
    pub async fn tick(
        &self,
        session: &mut Session,
        actor: &Actor,
        elapsed_secs: u64,
    ) -> Result<AttemptTick, AttemptError> {
        let Some(result) = session.tick(elapsed_secs)? else {
            return Ok(AttemptTick {
                remaining_seconds: session.remaining_seconds(),
                submission: None,
            });
        };

        tracing::info!(
            assessment_id = %result.assessment_id,
            actor_id = %actor.id,
            answered = result.answers.answered_count(),
            "time expired, submitting"
        );
        let delivered = self.forward(actor, result).await?;
        Ok(AttemptTick {
            remaining_seconds: 0,
            submission: Some(delivered),
        })
    }

    /// Submit the session now and deliver the result.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Session` if the session is already submitted, or
    /// `AttemptError::Delivery` if the sink refused the result.
    pub async fn submit(
        &self,
        session: &mut Session,
        actor: &Actor,
    ) -> Result<Delivered, AttemptError> {
        let result = session.submit(self.clock.now())?;
        tracing::info!(
            assessment_id = %result.assessment_id,
            actor_id = %actor.id,
            elapsed_seconds = result.elapsed_seconds,
            "attempt submitted"
        );
        self.forward(actor, result).await
    }

    /// Hand an already frozen result to the sink.
    ///
    /// Used to retry after `AttemptError::Delivery`.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Storage` if the sink refuses the result.
    pub async fn deliver(
        &self,
        actor: &Actor,
        result: &SessionResult,
    ) -> Result<SubmissionId, AttemptError> {
        let id = self.sink.submit_result(actor, result).await?;
        tracing::debug!(submission_id = id, actor_id = %actor.id, "result delivered");
        Ok(id)
    }

    async fn forward(
        &self,
        actor: &Actor,
        result: SessionResult,
    ) -> Result<Delivered, AttemptError> {
        match self.sink.submit_result(actor, &result).await {
            Ok(submission_id) => {
                tracing::debug!(submission_id, actor_id = %actor.id, "result delivered");
                Ok(Delivered {
                    submission_id,
                    result,
                })
            }
            Err(source) => {
                tracing::warn!(
                    assessment_id = %result.assessment_id,
                    actor_id = %actor.id,
                    error = %source,
                    "result delivery failed"
                );
                Err(AttemptError::Delivery {
                    result: Box::new(result),
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assess_core::model::{
        ActorId, AnswerValue, Assessment, ChoiceOption, Question, QuestionId, SubmitTrigger,
    };
    use assess_core::time::fixed_now;
    use assess_core::{SessionError, SessionStatus};
    use chrono::Duration;
    use storage::repository::{InMemoryRepository, StorageError, SubmissionRepository};

    fn build_assessment(minutes: u32) -> Assessment {
        Assessment::new(
            AssessmentId::new(1),
            "Quiz",
            minutes,
            10,
            vec![
                Question::multiple_choice(
                    QuestionId::new(1),
                    "Pick",
                    5,
                    vec![
                        ChoiceOption::new("A", "a", false),
                        ChoiceOption::new("B", "b", true),
                    ],
                )
                .unwrap(),
                Question::essay(QuestionId::new(2), "Write", 5).unwrap(),
            ],
        )
        .unwrap()
    }

    async fn service_with(repo: &InMemoryRepository, minutes: u32) -> AttemptService {
        repo.upsert_assessment(&build_assessment(minutes))
            .await
            .unwrap();
        AttemptService::new(
            Clock::fixed(fixed_now() + Duration::seconds(30)),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    fn actor() -> Actor {
        Actor::student(ActorId::new(7), "Dana")
    }

    #[tokio::test]
    async fn missing_assessment_fails_before_session_exists() {
        let repo = InMemoryRepository::new();
        let svc = AttemptService::new(
            Clock::fixed(fixed_now()),
            Arc::new(repo.clone()),
            Arc::new(repo),
        );
        let err = svc
            .start_attempt(AssessmentId::new(9), &actor())
            .await
            .unwrap_err();
        assert!(matches!(err, AttemptError::Storage(StorageError::NotFound)));
    }

    #[tokio::test]
    async fn zero_duration_is_rejected_at_start() {
        let repo = InMemoryRepository::new();
        let svc = service_with(&repo, 0).await;
        let err = svc
            .start_attempt(AssessmentId::new(1), &actor())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AttemptError::Session(SessionError::InvalidAssessment(_))
        ));
    }

    #[tokio::test]
    async fn expiring_tick_delivers_once() {
        let repo = InMemoryRepository::new();
        let svc = service_with(&repo, 1).await;
        let actor = actor();
        let mut session = svc.start_attempt(AssessmentId::new(1), &actor).await.unwrap();
        session
            .record_answer(QuestionId::new(1), AnswerValue::choice("B"))
            .unwrap();

        let tick = svc.tick(&mut session, &actor, 59).await.unwrap();
        assert_eq!(tick.remaining_seconds, 1);
        assert!(!tick.is_expired());

        let tick = svc.tick(&mut session, &actor, 1).await.unwrap();
        let delivered = tick.submission.expect("auto-submitted");
        assert_eq!(delivered.result.trigger, SubmitTrigger::TimeExpired);
        assert_eq!(delivered.result.elapsed_seconds, 60);
        assert_eq!(session.status(), SessionStatus::Submitted);

        let stored = repo.get_submission(delivered.submission_id).await.unwrap();
        assert_eq!(stored.result, delivered.result);

        let err = svc.tick(&mut session, &actor, 1).await.unwrap_err();
        assert!(matches!(err, AttemptError::Session(SessionError::SessionClosed)));
    }

    #[tokio::test]
    async fn manual_submit_uses_service_clock() {
        let repo = InMemoryRepository::new();
        let svc = service_with(&repo, 5).await;
        let actor = actor();
        let mut session = svc.start_attempt(AssessmentId::new(1), &actor).await.unwrap();

        let delivered = svc.submit(&mut session, &actor).await.unwrap();
        assert_eq!(delivered.result.trigger, SubmitTrigger::Manual);
        assert_eq!(delivered.result.elapsed_seconds, 0);
        assert_eq!(delivered.result.ended_at, svc.clock().now());
    }

    #[tokio::test]
    async fn rejected_delivery_keeps_the_result() {
        let repo = InMemoryRepository::new();
        let svc = service_with(&repo, 5).await;
        let actor = actor();

        let mut first = svc.start_attempt(AssessmentId::new(1), &actor).await.unwrap();
        svc.submit(&mut first, &actor).await.unwrap();

        // Same actor, same start instant: the sink treats it as a duplicate.
        let mut second = svc.start_attempt(AssessmentId::new(1), &actor).await.unwrap();
        let err = svc.submit(&mut second, &actor).await.unwrap_err();
        let result = err.undelivered().cloned().expect("result carried");
        assert!(matches!(
            err,
            AttemptError::Delivery {
                source: StorageError::Conflict,
                ..
            }
        ));
        assert_eq!(result.assessment_id, AssessmentId::new(1));
        assert!(second.is_submitted());
    }
}
