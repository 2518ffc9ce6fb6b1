use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use assess_core::model::{
    Actor, ActorId, AnswerValue, Assessment, AssessmentId, ChoiceOption, Question, QuestionId,
    SessionResult, SubmissionId, SubmitTrigger,
};
use assess_core::time::fixed_now;
use services::{AttemptError, AttemptService, Clock, SubmissionQueryService};
use storage::repository::{
    AssessmentRepository, InMemoryRepository, StorageError, SubmissionSink,
};

fn sample_assessment() -> Assessment {
    Assessment::new(
        AssessmentId::new(1),
        "Smoke Quiz",
        1,
        10,
        vec![
            Question::multiple_choice(
                QuestionId::new(1),
                "Q1",
                5,
                vec![
                    ChoiceOption::new("A", "first", false),
                    ChoiceOption::new("B", "second", true),
                ],
            )
            .unwrap(),
            Question::essay(QuestionId::new(2), "Q2", 5).unwrap(),
        ],
    )
    .unwrap()
}

/// Sink that refuses the first `failures` deliveries before passing through.
struct FlakySink {
    inner: InMemoryRepository,
    failures: AtomicUsize,
}

#[async_trait::async_trait]
impl SubmissionSink for FlakySink {
    async fn submit_result(
        &self,
        actor: &Actor,
        result: &SessionResult,
    ) -> Result<SubmissionId, StorageError> {
        let left = self.failures.load(Ordering::SeqCst);
        if left > 0 {
            self.failures.store(left - 1, Ordering::SeqCst);
            return Err(StorageError::Connection("sink offline".into()));
        }
        self.inner.submit_result(actor, result).await
    }
}

#[tokio::test]
async fn countdown_expiry_delivers_answers() {
    let repo = InMemoryRepository::new();
    repo.upsert_assessment(&sample_assessment()).await.unwrap();

    let attempts = AttemptService::new(
        Clock::fixed(fixed_now()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    );
    let actor = Actor::student(ActorId::new(1), "Smoke");

    let mut session = attempts
        .start_attempt(AssessmentId::new(1), &actor)
        .await
        .unwrap();
    session
        .record_answer(QuestionId::new(1), AnswerValue::choice("B"))
        .unwrap();
    assert!(session.go_to_next());
    session
        .record_answer(QuestionId::new(2), AnswerValue::text("x"))
        .unwrap();

    let mut delivered = None;
    for _ in 0..60 {
        let tick = attempts.tick(&mut session, &actor, 1).await.unwrap();
        if let Some(done) = tick.submission {
            delivered = Some(done);
            break;
        }
    }
    let delivered = delivered.expect("auto-submitted after sixty ticks");

    assert_eq!(delivered.result.trigger, SubmitTrigger::TimeExpired);
    assert_eq!(delivered.result.elapsed_seconds, 60);
    assert_eq!(
        delivered.result.answers.get(QuestionId::new(1)),
        Some(&AnswerValue::choice("B"))
    );
    assert_eq!(
        delivered.result.answers.get(QuestionId::new(2)),
        Some(&AnswerValue::text("x"))
    );

    let queries = SubmissionQueryService::new(Arc::new(repo));
    let items = queries
        .recent_for_assessment(AssessmentId::new(1), 10)
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, delivered.submission_id);
    assert_eq!(items[0].answered, 2);
    assert_eq!(items[0].actor_name, "Smoke");
}

#[tokio::test]
async fn failed_delivery_can_be_retried() {
    let repo = InMemoryRepository::new();
    repo.upsert_assessment(&sample_assessment()).await.unwrap();
    let actor = Actor::student(ActorId::new(2), "Retry");

    let mut clock = Clock::fixed(fixed_now());
    let starter = AttemptService::new(clock, Arc::new(repo.clone()), Arc::new(repo.clone()));
    let mut session = starter
        .start_attempt(AssessmentId::new(1), &actor)
        .await
        .unwrap();

    clock.advance(chrono::Duration::seconds(20));
    let attempts = AttemptService::new(
        clock,
        Arc::new(repo.clone()),
        Arc::new(FlakySink {
            inner: repo.clone(),
            failures: AtomicUsize::new(1),
        }),
    );

    let err = attempts.submit(&mut session, &actor).await.unwrap_err();
    let AttemptError::Delivery { result, source } = err else {
        panic!("expected delivery failure");
    };
    assert!(matches!(source, StorageError::Connection(_)));
    assert!(session.is_submitted());
    assert_eq!(result.elapsed_seconds, 20);
    assert_eq!(result.trigger, SubmitTrigger::Manual);

    let id = attempts.deliver(&actor, &result).await.unwrap();
    let queries = SubmissionQueryService::new(Arc::new(repo));
    let stored = queries.get(id).await.unwrap();
    assert_eq!(stored.result, *result);

    // The sink deduplicates a second delivery of the same attempt.
    assert!(matches!(
        attempts.deliver(&actor, &result).await,
        Err(AttemptError::Storage(StorageError::Conflict))
    ));
}
