use assess_core::model::{
    Actor, ActorId, AnswerValue, Assessment, AssessmentId, Question, QuestionId,
};
use assess_core::time::fixed_now;
use services::{AppServices, Clock};
use storage::repository::AssessmentRepository;

#[tokio::test]
async fn sqlite_attempt_submit_and_list() {
    let services = AppServices::new_sqlite(
        "sqlite:file:memdb_services_flow?mode=memory&cache=shared",
        Clock::fixed(fixed_now()),
    )
    .await
    .expect("connect sqlite");

    let assessment = Assessment::new(
        AssessmentId::new(5),
        "Essay only",
        10,
        4,
        vec![
            Question::essay(QuestionId::new(1), "First", 2).unwrap(),
            Question::practical(QuestionId::new(2), "Show it", 2).unwrap(),
        ],
    )
    .unwrap();
    services
        .storage()
        .assessments
        .upsert_assessment(&assessment)
        .await
        .expect("seed assessment");

    let actor = Actor::student(ActorId::new(3), "Flo");
    let attempts = services.attempts();
    let mut session = attempts
        .start_attempt(AssessmentId::new(5), &actor)
        .await
        .expect("start");
    session
        .record_answer(QuestionId::new(1), AnswerValue::text("stored in sqlite"))
        .expect("answer");
    let delivered = attempts.submit(&mut session, &actor).await.expect("submit");

    let stored = services
        .submissions()
        .get(delivered.submission_id)
        .await
        .expect("get");
    assert_eq!(stored.result, delivered.result);
    assert_eq!(
        stored.result.answers.get(QuestionId::new(2)),
        Some(&AnswerValue::Empty)
    );

    let items = services
        .submissions()
        .recent_for_assessment(AssessmentId::new(5), 5)
        .await
        .expect("list");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].answered, 1);
    assert_eq!(items[0].total, 2);
}
